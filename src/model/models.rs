use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * The enumerated facility categories known to the system.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacilityType {
    Hospital,
    Clinic,
    HealthCenter,
    SubHealthCenter,
}

impl FacilityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacilityType::Hospital => "hospital",
            FacilityType::Clinic => "clinic",
            FacilityType::HealthCenter => "health_center",
            FacilityType::SubHealthCenter => "sub_health_center",
        }
    }
}

impl FromStr for FacilityType {
    type Err = ApplicationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "hospital" => Ok(FacilityType::Hospital),
            "clinic" => Ok(FacilityType::Clinic),
            "health_center" => Ok(FacilityType::HealthCenter),
            "sub_health_center" => Ok(FacilityType::SubHealthCenter),
            other => Err(ApplicationError::new(ErrorType::Validation, format!("Unknown facility type: {other}"))),
        }
    }
}

impl fmt::Display for FacilityType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/**
 * Details of a single health facility, including derived staff and equipment counts.
 */
#[derive(Debug, Clone)]
pub struct FacilityDetailType {
    pub id: i64,
    pub name: String,
    pub facility_type: String,
    pub district: String,
    pub subdistrict: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub beds_total: i32,
    pub beds_available: i32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub staff_count: i64,
    pub equipment_count: i64,
}

/**
 * Input for creating or updating a facility record.
 */
#[derive(Debug, Clone)]
pub struct FacilityUpsertInputType {
    pub name: String,
    pub facility_type: String,
    pub district: String,
    pub subdistrict: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub beds_total: i32,
    pub beds_available: i32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl FacilityUpsertInputType {
    /**
     * Validates the facility input.
     *
     * # Returns
     * The validated input or an `ApplicationError` if a field is missing or invalid.
     */
    pub fn validate(self) -> Result<Self, ApplicationError> {
        if self.name.trim().is_empty() {
            return Err(ApplicationError::new(ErrorType::Validation, "Facility name is required".to_string()));
        }
        if self.district.trim().is_empty() {
            return Err(ApplicationError::new(ErrorType::Validation, "District is required".to_string()));
        }
        FacilityType::from_str(&self.facility_type)?;
        if self.beds_total < 0 || self.beds_available < 0 {
            return Err(ApplicationError::new(ErrorType::Validation, "Bed counts must be non-negative".to_string()));
        }
        Ok(self)
    }
}

/**
 * Unvalidated filter parameters for the patient statistics series.
 * Dates are raw ISO strings until `validate` parses them.
 */
#[derive(Debug, Clone)]
pub struct PatientStatisticsFilterInput {
    pub facility_id: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl PatientStatisticsFilterInput {
    /**
     * Validates the filter, parsing the optional ISO dates and checking range order.
     *
     * # Returns
     * A `PatientStatisticsFilter` or a validation `ApplicationError`.
     */
    pub fn validate(self) -> Result<PatientStatisticsFilter, ApplicationError> {
        let start_date = self.start_date.map(|value| parse_iso_date(&value)).transpose()?;
        let end_date = self.end_date.map(|value| parse_iso_date(&value)).transpose()?;
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                return Err(ApplicationError::new(ErrorType::Validation, "Start date must not be after end date".to_string()));
            }
        }
        Ok(PatientStatisticsFilter { facility_id: self.facility_id, start_date, end_date })
    }
}

fn parse_iso_date(value: &str) -> Result<NaiveDate, ApplicationError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|err| ApplicationError::new(ErrorType::Validation, format!("Invalid date '{value}': {err}")))
}

/**
 * Validated, conjunctive filter for the patient statistics series.
 * An absent field imposes no constraint.
 */
#[derive(Debug, Clone, Copy)]
pub struct PatientStatisticsFilter {
    pub facility_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/**
 * A raw patient statistic row as stored, before daily aggregation.
 */
#[derive(Debug, Clone)]
pub struct PatientStatisticRow {
    pub date: NaiveDate,
    pub outpatients: i32,
    pub inpatients: i32,
    pub emergency_cases: i32,
    pub surgeries: i32,
    pub births: i32,
    pub deaths: i32,
}

/**
 * Summed patient activity counters for one calendar date.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyPatientTotals {
    pub date: NaiveDate,
    pub outpatients: i64,
    pub inpatients: i64,
    pub emergency_cases: i64,
    pub surgeries: i64,
    pub births: i64,
    pub deaths: i64,
}

/**
 * Store-wide snapshot of facility, staff, bed and equipment totals.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct OverviewOutputType {
    pub total_facilities: i64,
    pub total_staff: i64,
    pub total_beds: i64,
    pub available_beds: i64,
    /**
     * Percentage of beds in use, computed from the summed totals and
     * rounded to one decimal. 0 when no beds are registered.
     */
    pub bed_occupancy_rate: f64,
    pub operational_equipment: i64,
}

/**
 * Per-facility-type rollup of count and summed bed capacity.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilityTypeGroup {
    pub facility_type: String,
    pub count: i64,
    pub total_beds: i64,
}

/**
 * Per-district rollup of facilities, beds and distinct active staff.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistrictSummaryRow {
    pub district: String,
    pub facility_count: i64,
    pub total_beds: i64,
    pub available_beds: i64,
    pub staff_count: i64,
}

/**
 * A stored user record, including the password hash for credential checks.
 */
#[derive(Debug, Clone)]
pub struct UserDetailType {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

/**
 * Input for registering a new user.
 */
#[derive(Debug, Clone)]
pub struct RegisterInputType {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

impl RegisterInputType {
    pub fn validate(self) -> Result<Self, ApplicationError> {
        if self.username.trim().is_empty() || self.email.trim().is_empty() || self.password.is_empty() {
            return Err(ApplicationError::new(ErrorType::Validation, "Username, email and password are required".to_string()));
        }
        Ok(self)
    }
}

/**
 * Input for logging in an existing user.
 */
#[derive(Debug, Clone)]
pub struct LoginInputType {
    pub username: String,
    pub password: String,
}

impl LoginInputType {
    pub fn validate(self) -> Result<Self, ApplicationError> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(ApplicationError::new(ErrorType::Validation, "Username and password are required".to_string()));
        }
        Ok(self)
    }
}

/**
 * Result of a successful login.
 */
#[derive(Debug, Clone)]
pub struct LoginOutputType {
    pub token: String,
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_facility_type_parse_roundtrip() {
        for value in ["hospital", "clinic", "health_center", "sub_health_center"] {
            let parsed = FacilityType::from_str(value).unwrap();
            assert_eq!(parsed.as_str(), value);
        }
        assert!(FacilityType::from_str("pharmacy").is_err());
    }

    #[test]
    fn test_patient_statistics_filter_valid_dates() {
        let input = PatientStatisticsFilterInput { facility_id: Some(3), start_date: Some("2024-01-01".to_string()), end_date: Some("2024-02-01".to_string()) };
        let filter = input.validate().unwrap();
        assert_eq!(filter.facility_id, Some(3));
        assert_eq!(filter.start_date, Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert_eq!(filter.end_date, Some(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()));
    }

    #[test]
    fn test_patient_statistics_filter_absent_fields() {
        let input = PatientStatisticsFilterInput { facility_id: None, start_date: None, end_date: None };
        let filter = input.validate().unwrap();
        assert!(filter.facility_id.is_none());
        assert!(filter.start_date.is_none());
        assert!(filter.end_date.is_none());
    }

    #[test]
    fn test_patient_statistics_filter_malformed_date() {
        let input = PatientStatisticsFilterInput { facility_id: None, start_date: Some("01/02/2024".to_string()), end_date: None };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_patient_statistics_filter_reversed_range() {
        let input = PatientStatisticsFilterInput { facility_id: None, start_date: Some("2024-02-01".to_string()), end_date: Some("2024-01-01".to_string()) };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_facility_input_requires_known_type() {
        let input = FacilityUpsertInputType {
            name: "Mueang District Hospital".to_string(),
            facility_type: "field_hospital".to_string(),
            district: "Mueang".to_string(),
            subdistrict: None,
            address: None,
            phone: None,
            email: None,
            beds_total: 10,
            beds_available: 5,
            latitude: None,
            longitude: None,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_register_input_requires_all_fields() {
        let input = RegisterInputType { username: "admin".to_string(), email: "".to_string(), password: "secret".to_string(), role: "viewer".to_string() };
        assert!(input.validate().is_err());
    }
}
