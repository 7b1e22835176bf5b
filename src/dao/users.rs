use sqlx::{PgConnection, Pool, Postgres};
use tracing::{Instrument, instrument};

use crate::dao::handle_database_error;
use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::UserDetailType,
};

/**
 * Database response type for querying a user row.
 */
pub type QueryUserDbResp = (i64, String, String, String, String);

/**
 * SQL query to retrieve a user by username.
 */
const QUERY_USER_BY_USERNAME: &str = "SELECT id, username, email, password, role FROM users WHERE username = $1";

/**
 * SQL query to add a new user.
 */
const ADD_USER: &str = "INSERT INTO users (username, email, password, role) VALUES ($1, $2, $3, $4)";

/**
 * DAO for user record operations.
 */
pub struct UserDao {}

impl UserDao {
    /**
     * Creates a new instance of `UserDao`.
     *
     * # Returns
     * A new instance of `UserDao`.
     */
    pub fn new() -> Self {
        UserDao {}
    }

    /**
     * Retrieves a user by username.
     *
     * # Arguments
     * `connection_pool`: The database connection pool.
     * `username`: The username to look up.
     *
     * # Returns
     * A Result containing the user if present, or an `ApplicationError`.
     */
    #[instrument(skip(self, connection_pool), fields(result))]
    pub async fn get_user_by_username(&self, connection_pool: &Pool<Postgres>, username: &str) -> Result<Option<UserDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryUserDbResp> = sqlx::query_as(QUERY_USER_BY_USERNAME)
            .bind(username)
            .fetch_optional(connection_pool)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get user: {err}")))?;
        Ok(result.map(|(id, username, email, password_hash, role)| UserDetailType { id, username, email, password_hash, role }))
    }

    /**
     * Adds a new user to the database.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `username`: The username of the new user.
     * `email`: The email of the new user.
     * `password_hash`: The bcrypt hash of the user's password.
     * `role`: The role of the new user.
     *
     * # Returns
     * A result indicating success or failure of the operation.
     */
    #[instrument(skip(self, transaction, password_hash), fields(result))]
    pub async fn add_user(&self, transaction: &mut PgConnection, username: &str, email: &str, password_hash: &str, role: &str) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query(ADD_USER)
            .bind(username)
            .bind(email)
            .bind(password_hash)
            .bind(role)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(err.as_database_error()))?;
        Ok(())
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use sqlx::PgPool;

    #[sqlx::test]
    async fn test_add_then_get_user() {
        let pool = init_db().await;
        let user_dao = UserDao::new();
        let mut transaction = pool.begin().await.unwrap();
        let add_result = user_dao.add_user(&mut transaction, "test_user", "test@example.com", "$2b$10$hash", "viewer").await;
        assert!(add_result.is_ok());
        transaction.rollback().await.unwrap(); // Rollback the transaction to avoid leaving test data in the database
        let missing = user_dao.get_user_by_username(&pool, "no_such_user").await.unwrap();
        assert!(missing.is_none());
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
