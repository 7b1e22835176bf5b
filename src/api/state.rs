use crate::{
    api::security::JwtSecurityService,
    service::{auth::AuthService, facilities::FacilityService, statistics::StatisticsService},
};

/**
* Represents the application state shared across the Actix web application.
*/
pub struct AppState {
    /**
     * The JWT security service for handling authentication and authorization.
     */
    pub jwt_service: JwtSecurityService,
    /**
     * The auth service for login and registration.
     */
    pub auth_service: AuthService,
    /**
     * The facility service for facility record operations.
     */
    pub facility_service: FacilityService,
    /**
     * The statistics service for aggregation operations.
     */
    pub statistics_service: StatisticsService,
}

/**
 * Creates a new instance of `AppState`.
 *
 * # Arguments
 * `jwt_service`: The JWT security service for handling authentication and authorization.
 * `auth_service`: The auth service for login and registration.
 * `facility_service`: The facility service for facility record operations.
 * `statistics_service`: The statistics service for aggregation operations.
 */
impl AppState {
    pub fn new(jwt_service: JwtSecurityService, auth_service: AuthService, facility_service: FacilityService, statistics_service: StatisticsService) -> Self {
        AppState { jwt_service, auth_service, facility_service, statistics_service }
    }
}
