use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{DailyPatientTotals, DistrictSummaryRow, FacilityDetailType, FacilityTypeGroup, FacilityUpsertInputType, LoginInputType, LoginOutputType, OverviewOutputType, PatientStatisticsFilterInput, RegisterInputType},
};

/***************** Auth models *********************/

/**
 * Request structure for logging in.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl From<LoginRequest> for LoginInputType {
    fn from(request: LoginRequest) -> Self {
        LoginInputType { username: request.username, password: request.password }
    }
}

/**
 * Response structure for a successful login.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: UserElement,
}

/**
 * The user details returned alongside an issued token.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserElement {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
}

impl From<LoginOutputType> for LoginResponse {
    fn from(output: LoginOutputType) -> Self {
        LoginResponse { token: output.token, user: UserElement { id: output.user_id, username: output.username, email: output.email, role: output.role } }
    }
}

/**
 * Request structure for registering a new user. The role defaults to viewer.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
}

impl From<RegisterRequest> for RegisterInputType {
    fn from(request: RegisterRequest) -> Self {
        RegisterInputType { username: request.username, email: request.email, password: request.password, role: request.role.unwrap_or_else(|| "viewer".to_string()) }
    }
}

/***************** Facility models *********************/

/**
 * Request structure for creating or updating a facility.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityUpsertRequest {
    pub name: String,
    #[serde(rename = "type")]
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

impl From<FacilityUpsertRequest> for FacilityUpsertInputType {
    fn from(request: FacilityUpsertRequest) -> Self {
        FacilityUpsertInputType {
            name: request.name,
            facility_type: request.facility_type,
            district: request.district,
            subdistrict: request.subdistrict,
            address: request.address,
            phone: request.phone,
            email: request.email,
            beds_total: request.beds_total,
            beds_available: request.beds_available,
            latitude: request.latitude,
            longitude: request.longitude,
        }
    }
}

/**
 * A single facility as returned by the facility endpoints, with derived
 * active staff and operational equipment counts.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityDetailElement {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
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

impl From<FacilityDetailType> for FacilityDetailElement {
    fn from(facility: FacilityDetailType) -> Self {
        FacilityDetailElement {
            id: facility.id,
            name: facility.name,
            facility_type: facility.facility_type,
            district: facility.district,
            subdistrict: facility.subdistrict,
            address: facility.address,
            phone: facility.phone,
            email: facility.email,
            beds_total: facility.beds_total,
            beds_available: facility.beds_available,
            latitude: facility.latitude,
            longitude: facility.longitude,
            staff_count: facility.staff_count,
            equipment_count: facility.equipment_count,
        }
    }
}

/**
 * Response structure returned after creating a facility.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityAddResponse {
    pub id: i64,
}

/***************** Statistics models *********************/

/**
 * Query parameters for the patient statistics series. All filters are
 * optional and compose conjunctively; dates are ISO calendar dates.
 * Both camelCase and snake_case parameter spellings are accepted.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientStatsQuery {
    #[serde(alias = "facility_id")]
    pub facility_id: Option<i64>,
    #[serde(alias = "start_date")]
    pub start_date: Option<String>,
    #[serde(alias = "end_date")]
    pub end_date: Option<String>,
}

impl From<PatientStatsQuery> for PatientStatisticsFilterInput {
    fn from(query: PatientStatsQuery) -> Self {
        PatientStatisticsFilterInput { facility_id: query.facility_id, start_date: query.start_date, end_date: query.end_date }
    }
}

/**
 * One day of summed patient activity counters.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientStatEntryElement {
    pub date: NaiveDate,
    pub outpatients: i64,
    pub inpatients: i64,
    pub emergency_cases: i64,
    pub surgeries: i64,
    pub births: i64,
    pub deaths: i64,
}

impl From<DailyPatientTotals> for PatientStatEntryElement {
    fn from(entry: DailyPatientTotals) -> Self {
        PatientStatEntryElement {
            date: entry.date,
            outpatients: entry.outpatients,
            inpatients: entry.inpatients,
            emergency_cases: entry.emergency_cases,
            surgeries: entry.surgeries,
            births: entry.births,
            deaths: entry.deaths,
        }
    }
}

/**
 * Response structure for the overview snapshot. The occupancy rate is
 * rendered with one decimal, matching the dashboard contract.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
    pub total_facilities: i64,
    pub total_staff: i64,
    pub total_beds: i64,
    pub available_beds: i64,
    pub bed_occupancy_rate: String,
    pub operational_equipment: i64,
}

impl From<OverviewOutputType> for OverviewResponse {
    fn from(output: OverviewOutputType) -> Self {
        OverviewResponse {
            total_facilities: output.total_facilities,
            total_staff: output.total_staff,
            total_beds: output.total_beds,
            available_beds: output.available_beds,
            bed_occupancy_rate: format!("{:.1}", output.bed_occupancy_rate),
            operational_equipment: output.operational_equipment,
        }
    }
}

/**
 * One facility type group in the distribution.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityDistributionElement {
    #[serde(rename = "type")]
    pub facility_type: String,
    pub count: i64,
    pub total_beds: i64,
}

impl From<FacilityTypeGroup> for FacilityDistributionElement {
    fn from(group: FacilityTypeGroup) -> Self {
        FacilityDistributionElement { facility_type: group.facility_type, count: group.count, total_beds: group.total_beds }
    }
}

/**
 * One district rollup in the district summary.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictSummaryElement {
    pub district: String,
    pub facility_count: i64,
    pub total_beds: i64,
    pub available_beds: i64,
    pub staff_count: i64,
}

impl From<DistrictSummaryRow> for DistrictSummaryElement {
    fn from(row: DistrictSummaryRow) -> Self {
        DistrictSummaryElement { district: row.district, facility_count: row.facility_count, total_beds: row.total_beds, available_beds: row.available_beds, staff_count: row.staff_count }
    }
}

/***************** Error models *********************/

/**
 * Custom error response for the application.
 */
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /**
     * The error code associated with the error type.
     */
    pub code: u16,
    /**
     * A human-readable message describing the error.
     */
    pub message: String,
}

impl ResponseError for ApplicationError {
    /**
     * Generates an error response for the application error.
     */
    fn error_response(&self) -> HttpResponse {
        let error_response = ErrorResponse { code: get_error_code(&self.error_type), message: self.message.clone() };
        HttpResponse::build(get_statuscode(&self.error_type.clone())).json(&error_response)
    }
}

/**
* Maps application errors to HTTP status codes.
*
* # Arguments
* `application_error`: The type of error that occurred.
*
* # Returns
* The corresponding HTTP status code.
*/
fn get_statuscode(application_error: &ErrorType) -> StatusCode {
    match application_error {
        ErrorType::JwtAuthorization => StatusCode::UNAUTHORIZED,
        ErrorType::Initialization => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorType::Validation => StatusCode::BAD_REQUEST,
        ErrorType::NotFound => StatusCode::NOT_FOUND,
        ErrorType::ConstraintViolation => StatusCode::BAD_REQUEST,
        ErrorType::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorType::Application => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/**
 * Maps application errors to error codes.
 *
 * # Arguments
 * `application_error`: The type of error that occurred.
 *
 * # Returns
 * The corresponding error code.
 */
fn get_error_code(application_error: &ErrorType) -> u16 {
    match application_error {
        ErrorType::JwtAuthorization => 1000,
        ErrorType::Initialization => 1001,
        ErrorType::Validation => 1002,
        ErrorType::DatabaseError => 1003,
        ErrorType::NotFound => 1004,
        ErrorType::ConstraintViolation => 1005,
        ErrorType::Application => 1006,
    }
}
