use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::{
    dao::facilities::FacilityDao,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{FacilityDetailType, FacilityUpsertInputType},
    },
};

/**
 * Represents the service for managing facility records.
 */
pub struct FacilityService {
    /**
     * The DAO for facility operations.
     */
    facility_dao: FacilityDao,
    /**
     * Connection pool for database operations.
     */
    connection_pool: Arc<Pool<Postgres>>,
}

impl FacilityService {
    /**
     * Creates a new instance of `FacilityService`.
     *
     * # Arguments
     * `facility_dao`: The DAO for facility operations.
     * `connection_pool`: Connection pool for database operations.
     *
     * # Returns
     * A new instance of `FacilityService`.
     */
    pub fn new(facility_dao: FacilityDao, connection_pool: Arc<Pool<Postgres>>) -> Self {
        FacilityService { facility_dao, connection_pool }
    }

    /**
     * Retrieves all facilities with derived staff and equipment counts.
     *
     * # Returns
     * A Result containing the facility list or an `ApplicationError`.
     */
    pub async fn get_facility_list(&self) -> Result<Vec<FacilityDetailType>, ApplicationError> {
        self.facility_dao.get_facility_list(self.connection_pool.as_ref()).await
    }

    /**
     * Retrieves a single facility by id.
     *
     * # Arguments
     * `facility_id`: The id of the facility.
     *
     * # Returns
     * A Result containing the facility or an `ApplicationError`.
     */
    pub async fn get_facility(&self, facility_id: i64) -> Result<FacilityDetailType, ApplicationError> {
        self.facility_dao.get_facility(self.connection_pool.as_ref(), facility_id).await
    }

    /**
     * Adds a new facility.
     *
     * # Arguments
     * `facility_input`: The validated facility input.
     *
     * # Returns
     * A Result containing the generated facility id or an `ApplicationError`.
     */
    pub async fn add_facility(&self, facility_input: FacilityUpsertInputType) -> Result<i64, ApplicationError> {
        let mut transaction = self.connection_pool.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        match self.facility_dao.add_facility(&mut transaction, facility_input).await {
            Ok(facility_id) => {
                transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
                Ok(facility_id)
            }
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                Err(err)
            }
        }
    }

    /**
     * Updates an existing facility.
     *
     * # Arguments
     * `facility_id`: The id of the facility to update.
     * `facility_input`: The validated facility input.
     *
     * # Returns
     * A Result indicating success or an `ApplicationError`.
     */
    pub async fn update_facility(&self, facility_id: i64, facility_input: FacilityUpsertInputType) -> Result<(), ApplicationError> {
        let mut transaction = self.connection_pool.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        match self.facility_dao.update_facility(&mut transaction, facility_id, facility_input).await {
            Ok(()) => transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?,
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                return Err(err);
            }
        }
        Ok(())
    }

    /**
     * Deletes a facility by its id.
     *
     * # Arguments
     * `facility_id`: The id of the facility to delete.
     *
     * # Returns
     * A Result indicating success or an `ApplicationError`.
     */
    pub async fn delete_facility(&self, facility_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = self.connection_pool.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))?;
        match self.facility_dao.delete_facility(&mut transaction, facility_id).await {
            Ok(()) => transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?,
            Err(err) => {
                transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
                return Err(err);
            }
        }
        Ok(())
    }
}
