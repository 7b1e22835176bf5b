use std::str::FromStr;

use actix_web::{FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    config::{AppSecurity, JwtKey},
};

/**
 * The claims carried by issued and validated tokens.
 */
#[derive(Debug, Serialize, Deserialize)]
pub struct Claim {
    pub sub: String,
    pub username: String,
    pub role: String,
    pub iat: usize,
    pub exp: usize,
}

/**
 * JWT Security Service for validating bearer tokens and issuing new ones.
 */
#[derive(Clone)]
pub struct JwtSecurityService {
    /**
     * The decoding key used to verify JWT tokens.
     */
    decoding_key: DecodingKey,
    /**
     * The encoding key used to sign issued tokens.
     */
    encoding_key: EncodingKey,
    /**
     * The algorithm used for signing and validation.
     */
    algorithm: Algorithm,
    /**
     * The validation rules for JWT tokens.
     */
    validation: Validation,
    /**
     * Lifetime of issued tokens in seconds.
     */
    token_lifetime_secs: u64,
}

impl JwtSecurityService {
    /**
     * Creates a new instance of JwtSecurityService from the security configuration.
     * Asymmetric algorithms read PEM key files; hmac algorithms use the shared secret.
     *
     * # Arguments
     * `app_security`: Security configuration with algorithm, key material and token lifetime.
     *
     * # Returns
     * A Result containing the JwtSecurityService or an ApplicationError if initialization fails.
     */
    pub fn new(app_security: &AppSecurity) -> Result<Self, ApplicationError> {
        let algorithm = Algorithm::from_str(&app_security.algorithm).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Invalid algorithm: {err}")))?;
        let (decoding_key, encoding_key) = match (&app_security.key, algorithm) {
            (JwtKey::SharedSecret { secret }, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) => {
                (DecodingKey::from_secret(secret.as_bytes()), EncodingKey::from_secret(secret.as_bytes()))
            }
            (JwtKey::KeyPair { public_key_file, private_key_file }, Algorithm::RS256 | Algorithm::RS384 | Algorithm::RS512) => {
                let public_pem = std::fs::read(public_key_file).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to read public key file: {err}")))?;
                let private_pem = std::fs::read(private_key_file).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to read private key file: {err}")))?;
                (
                    DecodingKey::from_rsa_pem(&public_pem).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to create decoding key: {err}")))?,
                    EncodingKey::from_rsa_pem(&private_pem).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to create encoding key: {err}")))?,
                )
            }
            (JwtKey::KeyPair { public_key_file, private_key_file }, Algorithm::ES256 | Algorithm::ES384) => {
                let public_pem = std::fs::read(public_key_file).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to read public key file: {err}")))?;
                let private_pem = std::fs::read(private_key_file).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to read private key file: {err}")))?;
                (
                    DecodingKey::from_ec_pem(&public_pem).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to create decoding key: {err}")))?,
                    EncodingKey::from_ec_pem(&private_pem).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to create encoding key: {err}")))?,
                )
            }
            _ => return Err(ApplicationError::new(ErrorType::Initialization, "Key material does not match the configured algorithm".to_string())),
        };
        let validation = Validation::new(algorithm);
        Ok(JwtSecurityService { decoding_key, encoding_key, algorithm, validation, token_lifetime_secs: app_security.token_lifetime_secs })
    }

    /**
     * Validates the JWT token from the HTTP request.
     *
     * # Arguments
     * `http_request`: The HTTP request containing the JWT token in the Authorization header.
     *
     * # Returns
     * A Result containing the token claims or an ApplicationError if validation fails.
     */
    pub fn validate(&self, http_request: &HttpRequest) -> Result<Claim, ApplicationError> {
        let credentials = BearerAuth::from_request(http_request, &mut actix_web::dev::Payload::None).into_inner().ok();
        let Some(credentials) = credentials else {
            return Err(ApplicationError::new(ErrorType::JwtAuthorization, "Unauthorized".to_string()));
        };
        match jsonwebtoken::decode::<Claim>(credentials.token(), &self.decoding_key, &self.validation) {
            Ok(token_data) => Ok(token_data.claims),
            Err(err) => {
                tracing::debug!("JWT validation error: {err}");
                Err(ApplicationError::new(ErrorType::JwtAuthorization, "Unauthorized".to_string()))
            }
        }
    }

    /**
     * Issues a signed token for the given user.
     *
     * # Arguments
     * `user_id`: The id of the user.
     * `username`: The username of the user.
     * `role`: The role of the user.
     *
     * # Returns
     * A Result containing the encoded token or an ApplicationError.
     */
    pub fn generate(&self, user_id: i64, username: &str, role: &str) -> Result<String, ApplicationError> {
        let issued_at = usize::try_from(chrono::Utc::now().timestamp()).map_err(|err| ApplicationError::new(ErrorType::Application, format!("Failed to compute token timestamps: {err}")))?;
        let lifetime = usize::try_from(self.token_lifetime_secs).map_err(|err| ApplicationError::new(ErrorType::Application, format!("Failed to compute token timestamps: {err}")))?;
        let claim = Claim { sub: user_id.to_string(), username: username.to_string(), role: role.to_string(), iat: issued_at, exp: issued_at + lifetime };
        jsonwebtoken::encode(&Header::new(self.algorithm), &claim, &self.encoding_key).map_err(|err| ApplicationError::new(ErrorType::Application, format!("Failed to encode token: {err}")))
    }
}

#[cfg(test)]
mod test {
    use actix_web::test::TestRequest;

    use super::*;

    fn hmac_security() -> AppSecurity {
        AppSecurity { algorithm: "HS256".to_string(), key: JwtKey::SharedSecret { secret: "unit-test-secret".to_string() }, token_lifetime_secs: 3600 }
    }

    #[test]
    fn test_jwt_security_service_initialization_success() {
        let jwt_service = JwtSecurityService::new(&hmac_security());
        assert!(jwt_service.is_ok());
    }

    #[test]
    fn test_jwt_security_service_initialization_invalid_algorithm() {
        let security = AppSecurity { algorithm: "XX256".to_string(), key: JwtKey::SharedSecret { secret: "unit-test-secret".to_string() }, token_lifetime_secs: 3600 };
        let jwt_service = JwtSecurityService::new(&security);
        assert!(jwt_service.is_err());
    }

    #[test]
    fn test_jwt_security_service_initialization_mismatched_key() {
        let security = AppSecurity { algorithm: "RS256".to_string(), key: JwtKey::SharedSecret { secret: "unit-test-secret".to_string() }, token_lifetime_secs: 3600 };
        let jwt_service = JwtSecurityService::new(&security);
        assert!(jwt_service.is_err());
    }

    #[test]
    fn test_generate_then_validate_roundtrip() {
        let jwt_service = JwtSecurityService::new(&hmac_security()).unwrap();
        let token = jwt_service.generate(42, "admin", "admin").unwrap();
        let req = TestRequest::with_uri("/api/statistics/overview").insert_header(("Authorization", format!("Bearer {token}"))).to_http_request();
        let claim = jwt_service.validate(&req).unwrap();
        assert_eq!(claim.sub, "42");
        assert_eq!(claim.username, "admin");
        assert_eq!(claim.role, "admin");
    }

    #[test]
    fn test_validate_missing_token() {
        let jwt_service = JwtSecurityService::new(&hmac_security()).unwrap();
        let req = TestRequest::with_uri("/api/statistics/overview").to_http_request();
        assert!(jwt_service.validate(&req).is_err());
    }

    #[test]
    fn test_validate_token_signed_with_other_secret() {
        let jwt_service = JwtSecurityService::new(&hmac_security()).unwrap();
        let other_security = AppSecurity { algorithm: "HS256".to_string(), key: JwtKey::SharedSecret { secret: "another-secret".to_string() }, token_lifetime_secs: 3600 };
        let other_service = JwtSecurityService::new(&other_security).unwrap();
        let token = other_service.generate(42, "admin", "admin").unwrap();
        let req = TestRequest::with_uri("/api/statistics/overview").insert_header(("Authorization", format!("Bearer {token}"))).to_http_request();
        assert!(jwt_service.validate(&req).is_err());
    }
}
