use actix_web::{
    HttpRequest, HttpResponse, delete, get, post, put,
    web::{self, Path},
};
use tracing::{Instrument, instrument};

use crate::{
    api::{
        rest::{
            DistrictSummaryElement, FacilityAddResponse, FacilityDetailElement, FacilityDistributionElement, FacilityUpsertRequest, LoginRequest, LoginResponse, OverviewResponse,
            PatientStatEntryElement, PatientStatsQuery, RegisterRequest,
        },
        state::AppState,
    },
    model::{
        apperror::ApplicationError,
        models::{FacilityUpsertInputType, LoginInputType, PatientStatisticsFilterInput, RegisterInputType},
    },
};

/**
 * Endpoint to log in and obtain a token.
 */
#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "login", trace_id = get_trace_id(&http_request), result))]
#[post("/api/auth/login")]
pub async fn login(http_request: HttpRequest, request_body: web::Json<LoginRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let login_input = LoginInputType::from(request_body.into_inner()).validate()?;
    let output = app_state.auth_service.login(login_input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(LoginResponse::from(output)))
}

/**
 * Endpoint to register a new user.
 */
#[instrument(level = "info", skip(http_request, request_body, app_state), fields(service = "register", trace_id = get_trace_id(&http_request), result))]
#[post("/api/auth/register")]
pub async fn register(http_request: HttpRequest, request_body: web::Json<RegisterRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let register_input = RegisterInputType::from(request_body.into_inner()).validate()?;
    app_state.auth_service.register(register_input).instrument(span).await?;
    Ok(HttpResponse::Created().finish())
}

/**
 * Endpoint to retrieve all facilities with derived staff and equipment counts.
 */
#[instrument(skip(http_request, app_state), fields(service = "listFacilities", trace_id = get_trace_id(&http_request), result))]
#[get("/api/facilities")]
pub async fn facilities_list(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let _ = app_state.jwt_service.validate(&http_request)?;
    let facilities = app_state.facility_service.get_facility_list().instrument(span).await?;
    let elements: Vec<FacilityDetailElement> = facilities.into_iter().map(FacilityDetailElement::from).collect();
    Ok(HttpResponse::Ok().json(elements))
}

/**
 * Endpoint to retrieve a single facility.
 */
#[instrument(skip(http_request, app_state), fields(service = "getFacility", trace_id = get_trace_id(&http_request), result))]
#[get("/api/facilities/{facilityId}")]
pub async fn facility_get(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let _ = app_state.jwt_service.validate(&http_request)?;
    let facility_id = path.into_inner();
    let facility = app_state.facility_service.get_facility(facility_id).instrument(span).await?;
    Ok(HttpResponse::Ok().json(FacilityDetailElement::from(facility)))
}

/**
 * Endpoint to add a new facility.
 */
#[instrument(skip(http_request, request_body, app_state), fields(service = "addFacility", trace_id = get_trace_id(&http_request), result))]
#[post("/api/facilities")]
pub async fn facility_add(http_request: HttpRequest, request_body: web::Json<FacilityUpsertRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let _ = app_state.jwt_service.validate(&http_request)?;
    let facility_input = FacilityUpsertInputType::from(request_body.into_inner()).validate()?;
    let facility_id = app_state.facility_service.add_facility(facility_input).instrument(span).await?;
    Ok(HttpResponse::Created().json(FacilityAddResponse { id: facility_id }))
}

/**
 * Endpoint to update an existing facility.
 */
#[instrument(skip(http_request, request_body, app_state), fields(service = "updateFacility", trace_id = get_trace_id(&http_request), result))]
#[put("/api/facilities/{facilityId}")]
pub async fn facility_update(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<FacilityUpsertRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let _ = app_state.jwt_service.validate(&http_request)?;
    let facility_id = path.into_inner();
    let facility_input = FacilityUpsertInputType::from(request_body.into_inner()).validate()?;
    app_state.facility_service.update_facility(facility_id, facility_input).instrument(span).await?;
    Ok(HttpResponse::Ok().finish())
}

/**
 * Endpoint to delete a facility.
 */
#[instrument(skip(http_request, app_state), fields(service = "deleteFacility", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/facilities/{facilityId}")]
pub async fn facility_delete(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let _ = app_state.jwt_service.validate(&http_request)?;
    let facility_id = path.into_inner();
    app_state.facility_service.delete_facility(facility_id).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/**
 * Endpoint to retrieve the overview snapshot.
 */
#[instrument(skip(http_request, app_state), fields(service = "statisticsOverview", trace_id = get_trace_id(&http_request), result))]
#[get("/api/statistics/overview")]
pub async fn statistics_overview(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let _ = app_state.jwt_service.validate(&http_request)?;
    let overview = app_state.statistics_service.get_overview().instrument(span).await?;
    Ok(HttpResponse::Ok().json(OverviewResponse::from(overview)))
}

/**
 * Endpoint to retrieve the patient statistics series, optionally filtered by
 * facility and inclusive date range.
 */
#[instrument(skip(http_request, app_state), fields(service = "patientStatistics", trace_id = get_trace_id(&http_request), result))]
#[get("/api/statistics/patient-stats")]
pub async fn patient_statistics(http_request: HttpRequest, query: web::Query<PatientStatsQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let _ = app_state.jwt_service.validate(&http_request)?;
    let filter = PatientStatisticsFilterInput::from(query.into_inner()).validate()?;
    let series = app_state.statistics_service.get_patient_statistics(filter).instrument(span).await?;
    let elements: Vec<PatientStatEntryElement> = series.into_iter().map(PatientStatEntryElement::from).collect();
    Ok(HttpResponse::Ok().json(elements))
}

/**
 * Endpoint to retrieve the facility type distribution.
 */
#[instrument(skip(http_request, app_state), fields(service = "facilityDistribution", trace_id = get_trace_id(&http_request), result))]
#[get("/api/statistics/facility-distribution")]
pub async fn facility_distribution(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let _ = app_state.jwt_service.validate(&http_request)?;
    let groups = app_state.statistics_service.get_facility_distribution().instrument(span).await?;
    let elements: Vec<FacilityDistributionElement> = groups.into_iter().map(FacilityDistributionElement::from).collect();
    Ok(HttpResponse::Ok().json(elements))
}

/**
 * Endpoint to retrieve the district summary.
 */
#[instrument(skip(http_request, app_state), fields(service = "districtSummary", trace_id = get_trace_id(&http_request), result))]
#[get("/api/statistics/district-summary")]
pub async fn district_summary(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let _ = app_state.jwt_service.validate(&http_request)?;
    let rows = app_state.statistics_service.get_district_summary().instrument(span).await?;
    let elements: Vec<DistrictSummaryElement> = rows.into_iter().map(DistrictSummaryElement::from).collect();
    Ok(HttpResponse::Ok().json(elements))
}

/**
 * Liveness endpoint. Not authenticated.
 */
#[get("/api/health")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "message": "Health Dashboard API is running" }))
}

/**
 * Retrieves the trace ID from the HTTP request headers.
 * If the trace ID is not present, a new UUID is generated.
 */
fn get_trace_id(http_request: &HttpRequest) -> String {
    http_request.headers().get("X-Trace-ID")
        .and_then(|v| v.to_str().ok().map(std::string::ToString::to_string))
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

#[cfg(test)]
mod test {
    use actix_web::test::TestRequest;

    use super::*;

    #[actix_web::test]
    async fn test_get_trace_id_exists() {
        let request = TestRequest::default()
            .insert_header(("X-Trace-ID", "test"))
            .to_http_request();
        let trace_id = get_trace_id(&request);
        assert_eq!(trace_id, "test");
    }


    #[actix_web::test]
    async fn test_get_trace_id_not_exists() {
        let request = TestRequest::default()
            .to_http_request();
        let trace_id = get_trace_id(&request);
        assert!(!trace_id.is_empty());
    }
}
