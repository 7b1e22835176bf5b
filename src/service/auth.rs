use std::sync::Arc;

use bcrypt::{DEFAULT_COST, hash, verify};
use sqlx::{Pool, Postgres};

use crate::{
    api::security::JwtSecurityService,
    dao::users::UserDao,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{LoginInputType, LoginOutputType, RegisterInputType},
    },
};

/**
 * Represents the service for credential checks and user registration.
 */
pub struct AuthService {
    /**
     * The DAO for user operations.
     */
    user_dao: UserDao,
    /**
     * The JWT security service used to issue tokens after a successful login.
     */
    jwt_service: JwtSecurityService,
    /**
     * Connection pool for database operations.
     */
    connection_pool: Arc<Pool<Postgres>>,
}

impl AuthService {
    /**
     * Creates a new instance of `AuthService`.
     *
     * # Arguments
     * `user_dao`: The DAO for user operations.
     * `jwt_service`: The JWT security service.
     * `connection_pool`: Connection pool for database operations.
     *
     * # Returns
     * A new instance of `AuthService`.
     */
    pub fn new(user_dao: UserDao, jwt_service: JwtSecurityService, connection_pool: Arc<Pool<Postgres>>) -> Self {
        AuthService { user_dao, jwt_service, connection_pool }
    }

    /**
     * Verifies the given credentials and issues a token.
     * Unknown usernames and wrong passwords produce the same error so the
     * response does not reveal which part failed.
     *
     * # Arguments
     * `login_input`: Validated username and password.
     *
     * # Returns
     * A Result containing the token and user details or an `ApplicationError`.
     */
    pub async fn login(&self, login_input: LoginInputType) -> Result<LoginOutputType, ApplicationError> {
        let user = self.user_dao.get_user_by_username(self.connection_pool.as_ref(), &login_input.username).await?;
        let Some(user) = user else {
            return Err(ApplicationError::new(ErrorType::JwtAuthorization, "Invalid credentials".to_string()));
        };
        let password_matches = verify(&login_input.password, &user.password_hash).unwrap_or(false);
        if !password_matches {
            return Err(ApplicationError::new(ErrorType::JwtAuthorization, "Invalid credentials".to_string()));
        }
        let token = self.jwt_service.generate(user.id, &user.username, &user.role)?;
        Ok(LoginOutputType { token, user_id: user.id, username: user.username, email: user.email, role: user.role })
    }

    /**
     * Registers a new user with a bcrypt hashed password.
     *
     * # Arguments
     * `register_input`: Validated registration details.
     *
     * # Returns
     * A Result indicating success or an `ApplicationError`.
     */
    pub async fn register(&self, register_input: RegisterInputType) -> Result<(), ApplicationError> {
        let password_hash = hash(&register_input.password, DEFAULT_COST).map_err(|err| ApplicationError::new(ErrorType::Application, format!("Failed to hash password: {err}")))?;
        let mut transaction = self.connection_pool.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        match self.user_dao.add_user(&mut transaction, &register_input.username, &register_input.email, &password_hash, &register_input.role).await {
            Ok(()) => transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?,
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                return Err(err);
            }
        }
        Ok(())
    }
}
