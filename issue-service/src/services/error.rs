use thiserror::Error;
use tracker_core::error::AppError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Stored id out of range: {0}")]
    IdOutOfRange(i64),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Migration(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::IdOutOfRange(id) => {
                AppError::InternalError(anyhow::anyhow!("Stored id out of range: {}", id))
            }
        }
    }
}
