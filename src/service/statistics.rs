use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::{
    dao::statistics::{QueryDistrictFacilityDbResp, QueryDistrictStaffDbResp, QueryFacilityTypeDbResp, StatisticsDao},
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{DailyPatientTotals, DistrictSummaryRow, FacilityTypeGroup, OverviewOutputType, PatientStatisticRow, PatientStatisticsFilter},
    },
};

/**
 * Service computing derived metrics from the record store: the overview
 * snapshot, the filtered patient statistics series, the facility type
 * distribution and the district summary. All operations are read only and
 * re-read the store on every call.
 */
pub struct StatisticsService {
    /**
     * The DAO for statistics reads.
     */
    statistics_dao: StatisticsDao,
    /**
     * Connection pool for database operations.
     */
    connection_pool: Arc<Pool<Postgres>>,
}

impl StatisticsService {
    /**
     * Creates a new instance of `StatisticsService`.
     *
     * # Arguments
     * `statistics_dao`: The DAO for statistics reads.
     * `connection_pool`: Connection pool for database operations.
     *
     * # Returns
     * A new instance of `StatisticsService`.
     */
    pub fn new(statistics_dao: StatisticsDao, connection_pool: Arc<Pool<Postgres>>) -> Self {
        StatisticsService { statistics_dao, connection_pool }
    }

    /**
     * Computes the overview snapshot. The five sub-aggregates are issued as
     * concurrent read tasks and joined; the first failure aborts the whole
     * snapshot so a partial result is never returned. The occupancy rate is
     * derived from the two summed bed figures.
     *
     * # Returns
     * A Result containing the `OverviewOutputType` or an `ApplicationError`.
     */
    pub async fn get_overview(&self) -> Result<OverviewOutputType, ApplicationError> {
        let pool = self.connection_pool.as_ref();
        let (total_facilities, total_staff, total_beds, available_beds, operational_equipment) = futures_util::try_join!(
            self.statistics_dao.count_facilities(pool),
            self.statistics_dao.count_active_staff(pool),
            self.statistics_dao.sum_total_beds(pool),
            self.statistics_dao.sum_available_beds(pool),
            self.statistics_dao.count_operational_equipment(pool),
        )?;
        Ok(OverviewOutputType { total_facilities, total_staff, total_beds, available_beds, bed_occupancy_rate: Self::occupancy_rate(total_beds, available_beds), operational_equipment })
    }

    /**
     * Computes the date ordered patient statistics series for the given filter.
     * An unknown facility id is rejected before the statistics query runs.
     *
     * # Arguments
     * `filter`: Validated facility and date range filter.
     *
     * # Returns
     * A Result containing the daily series or an `ApplicationError`.
     */
    pub async fn get_patient_statistics(&self, filter: PatientStatisticsFilter) -> Result<Vec<DailyPatientTotals>, ApplicationError> {
        let pool = self.connection_pool.as_ref();
        if let Some(facility_id) = filter.facility_id {
            if !self.statistics_dao.facility_exists(pool, facility_id).await? {
                return Err(ApplicationError::new(ErrorType::NotFound, "Facility not found".to_string()));
            }
        }
        let rows = self.statistics_dao.get_patient_statistic_rows(pool, filter).await?;
        Ok(Self::aggregate_daily(rows))
    }

    /**
     * Computes the facility type distribution.
     *
     * # Returns
     * A Result containing the per type groups or an `ApplicationError`.
     */
    pub async fn get_facility_distribution(&self) -> Result<Vec<FacilityTypeGroup>, ApplicationError> {
        let rows = self.statistics_dao.get_facility_type_rows(self.connection_pool.as_ref()).await?;
        Ok(Self::group_by_type(rows))
    }

    /**
     * Computes the district summary.
     *
     * # Returns
     * A Result containing the per district rollups or an `ApplicationError`.
     */
    pub async fn get_district_summary(&self) -> Result<Vec<DistrictSummaryRow>, ApplicationError> {
        let pool = self.connection_pool.as_ref();
        let (facility_rows, staff_rows) = futures_util::try_join!(self.statistics_dao.get_district_facility_rows(pool), self.statistics_dao.get_district_staff_rows(pool))?;
        Ok(Self::summarize_districts(facility_rows, staff_rows))
    }

    /**
     * Computes the bed occupancy rate as a percentage rounded to one decimal.
     * Defined as 0 when no beds are registered.
     *
     * # Arguments
     * `total_beds`: Summed bed capacity across all facilities.
     * `available_beds`: Summed available beds across all facilities.
     *
     * # Returns
     * The occupancy percentage.
     */
    fn occupancy_rate(total_beds: i64, available_beds: i64) -> f64 {
        if total_beds <= 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = (total_beds - available_beds) as f64 / total_beds as f64 * 100.0;
        (rate * 10.0).round() / 10.0
    }

    /**
     * Groups raw patient statistic rows by calendar date, summing the six
     * counters across rows sharing a date. The result is ordered ascending by
     * date.
     *
     * # Arguments
     * `rows`: Raw rows, already filtered.
     *
     * # Returns
     * One entry per distinct date present in the rows.
     */
    fn aggregate_daily(rows: Vec<PatientStatisticRow>) -> Vec<DailyPatientTotals> {
        let mut daily: BTreeMap<chrono::NaiveDate, DailyPatientTotals> = BTreeMap::new();
        for row in rows {
            let entry = daily
                .entry(row.date)
                .or_insert_with(|| DailyPatientTotals { date: row.date, outpatients: 0, inpatients: 0, emergency_cases: 0, surgeries: 0, births: 0, deaths: 0 });
            entry.outpatients += i64::from(row.outpatients);
            entry.inpatients += i64::from(row.inpatients);
            entry.emergency_cases += i64::from(row.emergency_cases);
            entry.surgeries += i64::from(row.surgeries);
            entry.births += i64::from(row.births);
            entry.deaths += i64::from(row.deaths);
        }
        daily.into_values().collect()
    }

    /**
     * Groups facilities by type, preserving first encounter order for groups,
     * then orders by count descending. The sort is stable so ties keep the
     * first encountered type first.
     *
     * # Arguments
     * `rows`: (type, beds_total) rows in insertion order.
     *
     * # Returns
     * One group per distinct facility type.
     */
    fn group_by_type(rows: Vec<QueryFacilityTypeDbResp>) -> Vec<FacilityTypeGroup> {
        let mut groups: Vec<FacilityTypeGroup> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (facility_type, beds_total) in rows {
            let index = *positions.entry(facility_type.clone()).or_insert_with(|| {
                groups.push(FacilityTypeGroup { facility_type, count: 0, total_beds: 0 });
                groups.len() - 1
            });
            groups[index].count += 1;
            groups[index].total_beds += i64::from(beds_total);
        }
        groups.sort_by(|a, b| b.count.cmp(&a.count));
        groups
    }

    /**
     * Groups facilities by district, counting facilities, summing beds and
     * counting distinct active staff referencing any facility in the district.
     * Ordered by facility count descending with stable ties.
     *
     * # Arguments
     * `facility_rows`: (district, beds_total, beds_available) rows in insertion order.
     * `staff_rows`: (staff id, district) rows for active staff; duplicates counted once.
     *
     * # Returns
     * One rollup per distinct district.
     */
    fn summarize_districts(facility_rows: Vec<QueryDistrictFacilityDbResp>, staff_rows: Vec<QueryDistrictStaffDbResp>) -> Vec<DistrictSummaryRow> {
        let mut staff_by_district: HashMap<String, HashSet<i64>> = HashMap::new();
        for (staff_id, district) in staff_rows {
            staff_by_district.entry(district).or_default().insert(staff_id);
        }
        let mut rows: Vec<DistrictSummaryRow> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (district, beds_total, beds_available) in facility_rows {
            let index = *positions.entry(district.clone()).or_insert_with(|| {
                let staff_count = staff_by_district.get(&district).map_or(0, |ids| ids.len() as i64);
                rows.push(DistrictSummaryRow { district, facility_count: 0, total_beds: 0, available_beds: 0, staff_count });
                rows.len() - 1
            });
            rows[index].facility_count += 1;
            rows[index].total_beds += i64::from(beds_total);
            rows[index].available_beds += i64::from(beds_available);
        }
        rows.sort_by(|a, b| b.facility_count.cmp(&a.facility_count));
        rows
    }
}

#[cfg(test)]
mod test {
    use chrono::NaiveDate;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stat_row(date: NaiveDate, outpatients: i32) -> PatientStatisticRow {
        PatientStatisticRow { date, outpatients, inpatients: 1, emergency_cases: 2, surgeries: 0, births: 0, deaths: 1 }
    }

    #[test]
    fn test_occupancy_rate_summed_totals() {
        // Two facilities: 100/40 and 20/20 beds -> 60 of 120 in use.
        assert_eq!(StatisticsService::occupancy_rate(120, 60), 50.0);
    }

    #[test]
    fn test_occupancy_rate_zero_total_beds() {
        assert_eq!(StatisticsService::occupancy_rate(0, 0), 0.0);
        assert_eq!(StatisticsService::occupancy_rate(0, 15), 0.0);
    }

    #[test]
    fn test_occupancy_rate_rounded_to_one_decimal() {
        // 1 of 3 beds in use -> 33.333... -> 33.3.
        assert_eq!(StatisticsService::occupancy_rate(3, 2), 33.3);
        // 2 of 3 beds in use -> 66.666... -> 66.7.
        assert_eq!(StatisticsService::occupancy_rate(3, 1), 66.7);
    }

    #[test]
    fn test_occupancy_rate_within_bounds() {
        for total in 1..50i64 {
            for available in 0..=total {
                let rate = StatisticsService::occupancy_rate(total, available);
                assert!((0.0..=100.0).contains(&rate), "rate {rate} out of bounds for {total}/{available}");
            }
        }
    }

    #[test]
    fn test_aggregate_daily_merges_same_date() {
        // Two rows for the same facility and date must collapse into one entry.
        let rows = vec![stat_row(date(2024, 1, 1), 10), stat_row(date(2024, 1, 1), 5)];
        let series = StatisticsService::aggregate_daily(rows);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].date, date(2024, 1, 1));
        assert_eq!(series[0].outpatients, 15);
        assert_eq!(series[0].inpatients, 2);
        assert_eq!(series[0].emergency_cases, 4);
        assert_eq!(series[0].deaths, 2);
    }

    #[test]
    fn test_aggregate_daily_orders_ascending() {
        let rows = vec![stat_row(date(2024, 3, 1), 1), stat_row(date(2024, 1, 1), 2), stat_row(date(2024, 2, 1), 3)];
        let series = StatisticsService::aggregate_daily(rows);
        let dates: Vec<NaiveDate> = series.iter().map(|entry| entry.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 2, 1), date(2024, 3, 1)]);
    }

    #[test]
    fn test_aggregate_daily_preserves_counter_sums() {
        let rows = vec![stat_row(date(2024, 1, 1), 10), stat_row(date(2024, 1, 2), 20), stat_row(date(2024, 1, 1), 30)];
        let raw_total: i64 = rows.iter().map(|row| i64::from(row.outpatients)).sum();
        let series = StatisticsService::aggregate_daily(rows);
        let series_total: i64 = series.iter().map(|entry| entry.outpatients).sum();
        assert_eq!(series_total, raw_total);
    }

    #[test]
    fn test_aggregate_daily_empty_rows() {
        let series = StatisticsService::aggregate_daily(vec![]);
        assert!(series.is_empty());
    }

    #[test]
    fn test_group_by_type_counts_cover_all_facilities() {
        let rows = vec![
            ("clinic".to_string(), 20),
            ("hospital".to_string(), 100),
            ("clinic".to_string(), 10),
            ("health_center".to_string(), 5),
            ("clinic".to_string(), 15),
        ];
        let total = rows.len() as i64;
        let groups = StatisticsService::group_by_type(rows);
        assert_eq!(groups.iter().map(|group| group.count).sum::<i64>(), total);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].facility_type, "clinic");
        assert_eq!(groups[0].count, 3);
        assert_eq!(groups[0].total_beds, 45);
    }

    #[test]
    fn test_group_by_type_stable_tie_break() {
        // hospital and clinic both occur twice; hospital was encountered first.
        let rows = vec![("hospital".to_string(), 80), ("clinic".to_string(), 20), ("hospital".to_string(), 60), ("clinic".to_string(), 10)];
        let groups = StatisticsService::group_by_type(rows);
        assert_eq!(groups[0].facility_type, "hospital");
        assert_eq!(groups[1].facility_type, "clinic");
    }

    #[test]
    fn test_summarize_districts_concrete_scenario() {
        let facility_rows = vec![("A".to_string(), 100, 40), ("A".to_string(), 20, 20)];
        let summary = StatisticsService::summarize_districts(facility_rows, vec![]);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].district, "A");
        assert_eq!(summary[0].facility_count, 2);
        assert_eq!(summary[0].total_beds, 120);
        assert_eq!(summary[0].available_beds, 60);
        assert_eq!(summary[0].staff_count, 0);
    }

    #[test]
    fn test_summarize_districts_distinct_staff() {
        // Staff id 7 appears twice, as a duplicated join row would produce.
        let facility_rows = vec![("A".to_string(), 10, 5), ("B".to_string(), 10, 5)];
        let staff_rows = vec![(7, "A".to_string()), (7, "A".to_string()), (8, "A".to_string()), (9, "B".to_string())];
        let summary = StatisticsService::summarize_districts(facility_rows, staff_rows);
        let district_a = summary.iter().find(|row| row.district == "A").unwrap();
        assert_eq!(district_a.staff_count, 2);
        let district_b = summary.iter().find(|row| row.district == "B").unwrap();
        assert_eq!(district_b.staff_count, 1);
    }

    #[test]
    fn test_summarize_districts_ordered_by_facility_count() {
        let facility_rows = vec![("A".to_string(), 10, 5), ("B".to_string(), 10, 5), ("B".to_string(), 10, 5)];
        let summary = StatisticsService::summarize_districts(facility_rows, vec![]);
        assert_eq!(summary[0].district, "B");
        assert_eq!(summary[1].district, "A");
    }

    #[test]
    fn test_overview_output_empty_store_shape() {
        let output = OverviewOutputType {
            total_facilities: 0,
            total_staff: 0,
            total_beds: 0,
            available_beds: 0,
            bed_occupancy_rate: StatisticsService::occupancy_rate(0, 0),
            operational_equipment: 0,
        };
        assert_eq!(output.bed_occupancy_rate, 0.0);
        assert!(output.bed_occupancy_rate.is_finite());
    }
}
