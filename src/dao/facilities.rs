use sqlx::{PgConnection, Pool, Postgres};
use tracing::{Instrument, instrument};

use crate::dao::handle_database_error;
use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{FacilityDetailType, FacilityUpsertInputType},
};

/**
 * Database response type for querying a facility with derived counts.
 */
pub type QueryFacilityDbResp = (i64, String, String, String, Option<String>, Option<String>, Option<String>, Option<String>, i32, i32, Option<f64>, Option<f64>, i64, i64);

/**
 * SQL query to retrieve all facilities with their active staff and operational
 * equipment counts. DISTINCT on the joined ids so duplicate join rows never
 * inflate either count.
 */
const QUERY_FACILITY_LIST: &str = "SELECT f.id, f.name, f.type, f.district, f.subdistrict, f.address, f.phone, f.email, f.beds_total, f.beds_available, f.latitude, f.longitude,
                                 COUNT(DISTINCT s.id) AS staff_count, COUNT(DISTINCT e.id) AS equipment_count
                                 FROM health_facilities f
                                 LEFT JOIN medical_staff s ON f.id = s.facility_id AND s.status = 'active'
                                 LEFT JOIN equipment e ON f.id = e.facility_id AND e.status = 'operational'
                                 GROUP BY f.id
                                 ORDER BY f.name";

/**
 * SQL query to retrieve a single facility with its derived counts.
 */
const QUERY_FACILITY_DETAIL: &str = "SELECT f.id, f.name, f.type, f.district, f.subdistrict, f.address, f.phone, f.email, f.beds_total, f.beds_available, f.latitude, f.longitude,
                                 COUNT(DISTINCT s.id) AS staff_count, COUNT(DISTINCT e.id) AS equipment_count
                                 FROM health_facilities f
                                 LEFT JOIN medical_staff s ON f.id = s.facility_id AND s.status = 'active'
                                 LEFT JOIN equipment e ON f.id = e.facility_id AND e.status = 'operational'
                                 WHERE f.id = $1
                                 GROUP BY f.id";

/**
 * SQL query to add a new facility.
 */
const ADD_FACILITY: &str = "INSERT INTO health_facilities (name, type, district, subdistrict, address, phone, email, beds_total, beds_available, latitude, longitude)
                                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING id";

/**
 * SQL query to update an existing facility.
 */
const UPDATE_FACILITY: &str = "UPDATE health_facilities SET name = $1, type = $2, district = $3, subdistrict = $4, address = $5, phone = $6, email = $7,
                                 beds_total = $8, beds_available = $9, latitude = $10, longitude = $11 WHERE id = $12";

/**
 * SQL query to delete a facility.
 */
const DELETE_FACILITY: &str = "DELETE FROM health_facilities WHERE id = $1";

/**
 * DAO for facility record operations.
 */
pub struct FacilityDao {}

impl FacilityDao {
    /**
     * Creates a new instance of `FacilityDao`.
     *
     * # Returns
     * A new instance of `FacilityDao`.
     */
    pub fn new() -> Self {
        FacilityDao {}
    }

    /**
     * Retrieves all facilities ordered by name, with derived staff and equipment counts.
     *
     * # Arguments
     * `connection_pool`: The database connection pool.
     *
     * # Returns
     * A Result containing the facility list or an `ApplicationError`.
     */
    #[instrument(skip(self, connection_pool), fields(result))]
    pub async fn get_facility_list(&self, connection_pool: &Pool<Postgres>) -> Result<Vec<FacilityDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryFacilityDbResp> = sqlx::query_as(QUERY_FACILITY_LIST)
            .fetch_all(connection_pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get facility list: {err}")))?;
        Ok(results.into_iter().map(Self::map_facility_row).collect())
    }

    /**
     * Retrieves a single facility by id.
     *
     * # Arguments
     * `connection_pool`: The database connection pool.
     * `facility_id`: The id of the facility.
     *
     * # Returns
     * A Result containing the facility or a `NotFound` `ApplicationError`.
     */
    #[instrument(skip(self, connection_pool), fields(result))]
    pub async fn get_facility(&self, connection_pool: &Pool<Postgres>, facility_id: i64) -> Result<FacilityDetailType, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryFacilityDbResp> = sqlx::query_as(QUERY_FACILITY_DETAIL)
            .bind(facility_id)
            .fetch_optional(connection_pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get facility: {err}")))?;
        result.map(Self::map_facility_row).ok_or_else(|| ApplicationError::new(ErrorType::NotFound, "Facility not found".to_string()))
    }

    /**
     * Adds a new facility to the database.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `facility_input`: The validated facility input.
     *
     * # Returns
     * A Result containing the generated facility id or an `ApplicationError`.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_facility(&self, transaction: &mut PgConnection, facility_input: FacilityUpsertInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let new_id: (i64,) = sqlx::query_as(ADD_FACILITY)
            .bind(facility_input.name)
            .bind(facility_input.facility_type)
            .bind(facility_input.district)
            .bind(facility_input.subdistrict)
            .bind(facility_input.address)
            .bind(facility_input.phone)
            .bind(facility_input.email)
            .bind(facility_input.beds_total)
            .bind(facility_input.beds_available)
            .bind(facility_input.latitude)
            .bind(facility_input.longitude)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(new_id.0)
    }

    /**
     * Updates an existing facility in the database.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `facility_id`: The id of the facility to update.
     * `facility_input`: The validated facility input.
     *
     * # Returns
     * A result indicating success or failure of the operation.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update_facility(&self, transaction: &mut PgConnection, facility_id: i64, facility_input: FacilityUpsertInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_FACILITY)
            .bind(facility_input.name)
            .bind(facility_input.facility_type)
            .bind(facility_input.district)
            .bind(facility_input.subdistrict)
            .bind(facility_input.address)
            .bind(facility_input.phone)
            .bind(facility_input.email)
            .bind(facility_input.beds_total)
            .bind(facility_input.beds_available)
            .bind(facility_input.latitude)
            .bind(facility_input.longitude)
            .bind(facility_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        if result.rows_affected() == 0 {
            tracing::debug!("Facility with id {} not found for update", facility_id);
            return Err(ApplicationError::new(ErrorType::NotFound, "Facility not found".to_string()));
        }
        if result.rows_affected() > 1 {
            tracing::warn!("Multiple facilities attempted updated. Rolled back");
            return Err(ApplicationError::new(ErrorType::Application, "Multiple facilities attempted updated. Rolled back".to_string()));
        }
        Ok(())
    }

    /**
     * Deletes a facility from the database by its id.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `facility_id`: The id of the facility to delete.
     *
     * # Returns
     * A result indicating success or failure of the operation.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_facility(&self, transaction: &mut PgConnection, facility_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_FACILITY)
            .bind(facility_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to delete facility: {err}")))?;
        if result.rows_affected() == 0 {
            tracing::debug!("Facility with id {} not found for deletion", facility_id);
            return Err(ApplicationError::new(ErrorType::NotFound, "Facility not found".to_string()));
        }
        if result.rows_affected() > 1 {
            tracing::warn!("Multiple facilities attempted deleted. Rolled back");
            return Err(ApplicationError::new(ErrorType::Application, "Multiple facilities attempted deleted. Rolled back".to_string()));
        }
        Ok(())
    }

    fn map_facility_row(row: QueryFacilityDbResp) -> FacilityDetailType {
        let (id, name, facility_type, district, subdistrict, address, phone, email, beds_total, beds_available, latitude, longitude, staff_count, equipment_count) = row;
        FacilityDetailType { id, name, facility_type, district, subdistrict, address, phone, email, beds_total, beds_available, latitude, longitude, staff_count, equipment_count }
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_add_then_get_then_delete_facility() {
        let pool = init_db().await;
        let facility_dao = FacilityDao::new();
        let mut transaction = pool.begin().await.unwrap();
        let facility_input = FacilityUpsertInputType {
            name: "Test Hospital".to_string(),
            facility_type: "hospital".to_string(),
            district: "Test District".to_string(),
            subdistrict: None,
            address: None,
            phone: None,
            email: None,
            beds_total: 100,
            beds_available: 40,
            latitude: None,
            longitude: None,
        };
        let add_result = facility_dao.add_facility(&mut transaction, facility_input.clone()).await;
        assert!(add_result.is_ok());
        let facility_id = add_result.unwrap();
        let update_result = facility_dao.update_facility(&mut transaction, facility_id, facility_input).await;
        assert!(update_result.is_ok());
        let delete_result = facility_dao.delete_facility(&mut transaction, facility_id).await;
        assert!(delete_result.is_ok());
        transaction.rollback().await.unwrap(); // Rollback the transaction to avoid leaving test data in the database
    }

    #[sqlx::test]
    async fn test_get_facility_not_found() {
        let pool = init_db().await;
        let facility_dao = FacilityDao::new();
        let result = facility_dao.get_facility(&pool, 999_999).await;
        assert!(result.is_err());
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
