use chrono::NaiveDate;
use sqlx::{Pool, Postgres};
use tracing::{Instrument, instrument};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{PatientStatisticRow, PatientStatisticsFilter},
};

/**
 * Database response type for querying raw patient statistic rows.
 */
pub type QueryPatientStatisticDbResp = (NaiveDate, i32, i32, i32, i32, i32, i32);

/**
 * Database response type for facility rows used in the type distribution.
 */
pub type QueryFacilityTypeDbResp = (String, i32);

/**
 * Database response type for facility rows used in the district summary.
 */
pub type QueryDistrictFacilityDbResp = (String, i32, i32);

/**
 * Database response type for active staff rows joined to their district.
 */
pub type QueryDistrictStaffDbResp = (i64, String);

/**
 * SQL query counting all facilities.
 */
const QUERY_COUNT_FACILITIES: &str = "SELECT COUNT(*) FROM health_facilities";

/**
 * SQL query counting active medical staff.
 */
const QUERY_COUNT_ACTIVE_STAFF: &str = "SELECT COUNT(*) FROM medical_staff WHERE status = 'active'";

/**
 * SQL query summing total bed capacity. Coalesced so an empty table yields 0.
 */
const QUERY_SUM_TOTAL_BEDS: &str = "SELECT COALESCE(SUM(beds_total), 0) FROM health_facilities";

/**
 * SQL query summing available beds. Coalesced so an empty table yields 0.
 */
const QUERY_SUM_AVAILABLE_BEDS: &str = "SELECT COALESCE(SUM(beds_available), 0) FROM health_facilities";

/**
 * SQL query counting operational equipment.
 */
const QUERY_COUNT_OPERATIONAL_EQUIPMENT: &str = "SELECT COUNT(*) FROM equipment WHERE status = 'operational'";

/**
 * SQL query checking whether a facility exists.
 */
const QUERY_FACILITY_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM health_facilities WHERE id = $1)";

/**
 * SQL query to retrieve patient statistic rows filtered by optional facility and
 * inclusive date bounds. Absent filters are bound as NULL so a single
 * parameterized statement covers every filter combination.
 */
const QUERY_PATIENT_STATISTICS: &str = "SELECT date, outpatients, inpatients, emergency_cases, surgeries, births, deaths
                                 FROM patient_statistics
                                 WHERE ($1::bigint IS NULL OR facility_id = $1) AND
                                 ($2::date IS NULL OR date >= $2) AND
                                 ($3::date IS NULL OR date <= $3)
                                 ORDER BY date, id";

/**
 * SQL query to retrieve facility type and bed capacity rows in insertion order.
 */
const QUERY_FACILITY_TYPE_ROWS: &str = "SELECT type, beds_total FROM health_facilities ORDER BY id";

/**
 * SQL query to retrieve facility district and bed rows in insertion order.
 */
const QUERY_DISTRICT_FACILITY_ROWS: &str = "SELECT district, beds_total, beds_available FROM health_facilities ORDER BY id";

/**
 * SQL query to retrieve active staff ids joined to the district of their facility.
 */
const QUERY_DISTRICT_STAFF_ROWS: &str = "SELECT s.id, f.district
                                 FROM medical_staff s, health_facilities f
                                 WHERE s.facility_id = f.id AND s.status = 'active'";

/**
 * DAO for statistics aggregation reads.
 */
pub struct StatisticsDao {}

impl StatisticsDao {
    /**
     * Creates a new instance of `StatisticsDao`.
     *
     * # Returns
     * A new instance of `StatisticsDao`.
     */
    pub fn new() -> Self {
        StatisticsDao {}
    }

    /**
     * Counts all facility rows.
     */
    #[instrument(skip(self, connection_pool), fields(result))]
    pub async fn count_facilities(&self, connection_pool: &Pool<Postgres>) -> Result<i64, ApplicationError> {
        Self::fetch_scalar(connection_pool, QUERY_COUNT_FACILITIES).await
    }

    /**
     * Counts medical staff rows with status active.
     */
    #[instrument(skip(self, connection_pool), fields(result))]
    pub async fn count_active_staff(&self, connection_pool: &Pool<Postgres>) -> Result<i64, ApplicationError> {
        Self::fetch_scalar(connection_pool, QUERY_COUNT_ACTIVE_STAFF).await
    }

    /**
     * Sums bed capacity across all facilities.
     */
    #[instrument(skip(self, connection_pool), fields(result))]
    pub async fn sum_total_beds(&self, connection_pool: &Pool<Postgres>) -> Result<i64, ApplicationError> {
        Self::fetch_scalar(connection_pool, QUERY_SUM_TOTAL_BEDS).await
    }

    /**
     * Sums available beds across all facilities.
     */
    #[instrument(skip(self, connection_pool), fields(result))]
    pub async fn sum_available_beds(&self, connection_pool: &Pool<Postgres>) -> Result<i64, ApplicationError> {
        Self::fetch_scalar(connection_pool, QUERY_SUM_AVAILABLE_BEDS).await
    }

    /**
     * Counts equipment rows with status operational.
     */
    #[instrument(skip(self, connection_pool), fields(result))]
    pub async fn count_operational_equipment(&self, connection_pool: &Pool<Postgres>) -> Result<i64, ApplicationError> {
        Self::fetch_scalar(connection_pool, QUERY_COUNT_OPERATIONAL_EQUIPMENT).await
    }

    /**
     * Checks whether a facility with the given id exists.
     *
     * # Arguments
     * `connection_pool`: The database connection pool.
     * `facility_id`: The facility id to check.
     *
     * # Returns
     * True if the facility exists, or an `ApplicationError`.
     */
    #[instrument(skip(self, connection_pool), fields(result))]
    pub async fn facility_exists(&self, connection_pool: &Pool<Postgres>, facility_id: i64) -> Result<bool, ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query_scalar(QUERY_FACILITY_EXISTS)
            .bind(facility_id)
            .fetch_one(connection_pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to check facility existence: {err}")))
    }

    /**
     * Retrieves raw patient statistic rows matching the validated filter.
     * Filters compose conjunctively; absent filters are bound as NULL.
     *
     * # Arguments
     * `connection_pool`: The database connection pool.
     * `filter`: Validated facility and date range filter.
     *
     * # Returns
     * A Result containing the matching rows or an `ApplicationError`.
     */
    #[instrument(skip(self, connection_pool), fields(result))]
    pub async fn get_patient_statistic_rows(&self, connection_pool: &Pool<Postgres>, filter: PatientStatisticsFilter) -> Result<Vec<PatientStatisticRow>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryPatientStatisticDbResp> = sqlx::query_as(QUERY_PATIENT_STATISTICS)
            .bind(filter.facility_id)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .fetch_all(connection_pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query for patient statistics: {err}")))?;
        Ok(results
            .into_iter()
            .map(|(date, outpatients, inpatients, emergency_cases, surgeries, births, deaths)| PatientStatisticRow { date, outpatients, inpatients, emergency_cases, surgeries, births, deaths })
            .collect())
    }

    /**
     * Retrieves (type, beds_total) rows for all facilities in insertion order.
     */
    #[instrument(skip(self, connection_pool), fields(result))]
    pub async fn get_facility_type_rows(&self, connection_pool: &Pool<Postgres>) -> Result<Vec<QueryFacilityTypeDbResp>, ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query_as(QUERY_FACILITY_TYPE_ROWS)
            .fetch_all(connection_pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query for facility type rows: {err}")))
    }

    /**
     * Retrieves (district, beds_total, beds_available) rows for all facilities in
     * insertion order.
     */
    #[instrument(skip(self, connection_pool), fields(result))]
    pub async fn get_district_facility_rows(&self, connection_pool: &Pool<Postgres>) -> Result<Vec<QueryDistrictFacilityDbResp>, ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query_as(QUERY_DISTRICT_FACILITY_ROWS)
            .fetch_all(connection_pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query for district facility rows: {err}")))
    }

    /**
     * Retrieves (staff id, district) rows for all active staff.
     */
    #[instrument(skip(self, connection_pool), fields(result))]
    pub async fn get_district_staff_rows(&self, connection_pool: &Pool<Postgres>) -> Result<Vec<QueryDistrictStaffDbResp>, ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query_as(QUERY_DISTRICT_STAFF_ROWS)
            .fetch_all(connection_pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query for district staff rows: {err}")))
    }

    /**
     * Executes a single-value aggregate query.
     */
    async fn fetch_scalar(connection_pool: &Pool<Postgres>, query: &str) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query_scalar(query)
            .fetch_one(connection_pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute aggregate query: {err}")))
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_overview_counts_on_empty_store() {
        let pool = init_db().await;
        let statistics_dao = StatisticsDao::new();
        assert_eq!(statistics_dao.count_facilities(&pool).await.unwrap(), 0);
        assert_eq!(statistics_dao.count_active_staff(&pool).await.unwrap(), 0);
        assert_eq!(statistics_dao.sum_total_beds(&pool).await.unwrap(), 0);
        assert_eq!(statistics_dao.sum_available_beds(&pool).await.unwrap(), 0);
        assert_eq!(statistics_dao.count_operational_equipment(&pool).await.unwrap(), 0);
    }

    #[sqlx::test]
    async fn test_patient_statistic_rows_unfiltered() {
        let pool = init_db().await;
        let statistics_dao = StatisticsDao::new();
        let filter = PatientStatisticsFilter { facility_id: None, start_date: None, end_date: None };
        let result = statistics_dao.get_patient_statistic_rows(&pool, filter).await;
        assert!(result.is_ok());
    }

    #[sqlx::test]
    async fn test_facility_exists_unknown_id() {
        let pool = init_db().await;
        let statistics_dao = StatisticsDao::new();
        let exists = statistics_dao.facility_exists(&pool, 999_999).await.unwrap();
        assert!(!exists);
    }

    #[sqlx::test]
    async fn test_patient_statistic_rows_date_range_and_facility_filter() {
        let pool = init_db().await;
        let statistics_dao = StatisticsDao::new();
        let facility_id = insert_facility(&pool, "Filter Test Hospital A").await;
        let other_facility_id = insert_facility(&pool, "Filter Test Hospital B").await;
        insert_statistic(&pool, facility_id, date(2024, 1, 1), 10).await;
        insert_statistic(&pool, facility_id, date(2024, 1, 15), 20).await;
        insert_statistic(&pool, facility_id, date(2024, 2, 1), 30).await;
        insert_statistic(&pool, other_facility_id, date(2024, 1, 15), 40).await;

        // Full range for one facility: all three dates, the other facility excluded.
        let wide = PatientStatisticsFilter { facility_id: Some(facility_id), start_date: Some(date(2024, 1, 1)), end_date: Some(date(2024, 2, 1)) };
        let rows = statistics_dao.get_patient_statistic_rows(&pool, wide).await.unwrap();
        assert_eq!(rows.len(), 3);
        let mid_row = rows.iter().find(|row| row.date == date(2024, 1, 15)).unwrap();
        assert_eq!(mid_row.outpatients, 20);

        // Narrowing the end bound must never yield a date past the new bound,
        // and the bound itself stays included.
        let narrowed = PatientStatisticsFilter { facility_id: Some(facility_id), start_date: Some(date(2024, 1, 1)), end_date: Some(date(2024, 1, 15)) };
        let rows = statistics_dao.get_patient_statistic_rows(&pool, narrowed).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.date <= date(2024, 1, 15)));
        assert!(rows.iter().any(|row| row.date == date(2024, 1, 15)));

        // Facility filter alone restricts to that facility's rows.
        let by_other = PatientStatisticsFilter { facility_id: Some(other_facility_id), start_date: None, end_date: None };
        let rows = statistics_dao.get_patient_statistic_rows(&pool, by_other).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].outpatients, 40);

        delete_facility(&pool, facility_id).await; // Cascade removes the statistic rows
        delete_facility(&pool, other_facility_id).await;
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn insert_facility(pool: &PgPool, name: &str) -> i64 {
        let row: (i64,) = sqlx::query_as("INSERT INTO health_facilities (name, type, district, beds_total, beds_available) VALUES ($1, 'hospital', 'Filter Test District', 10, 5) RETURNING id")
            .bind(name)
            .fetch_one(pool)
            .await
            .unwrap();
        row.0
    }

    async fn insert_statistic(pool: &PgPool, facility_id: i64, day: NaiveDate, outpatients: i32) {
        sqlx::query("INSERT INTO patient_statistics (facility_id, date, outpatients) VALUES ($1, $2, $3)")
            .bind(facility_id)
            .bind(day)
            .bind(outpatients)
            .execute(pool)
            .await
            .unwrap();
    }

    async fn delete_facility(pool: &PgPool, facility_id: i64) {
        sqlx::query("DELETE FROM health_facilities WHERE id = $1").bind(facility_id).execute(pool).await.unwrap();
    }

    /**
     * Initialize the database connection pool.
     */
    async fn init_db() -> PgPool {
        dotenv::from_filename("./sqlx-postgresql-migration/.env-test").ok();
        let pool = PgPool::connect(dotenv::var("DATABASE_URL").unwrap().as_str()).await.unwrap();
        sqlx::migrate!("./sqlx-postgresql-migration/migrations").run(&pool).await.unwrap();
        pool
    }
}
