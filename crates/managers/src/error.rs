use schoolnet_core::error::CoreError;
use schoolnet_core::types::DbId;
use schoolnet_events::{DeliveryError, NotifyError};

/// Error returned by manager operations.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),
}

impl ManagerError {
    pub fn not_found(entity: &'static str, id: DbId) -> Self {
        Self::Core(CoreError::not_found(entity, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Core(CoreError::Validation(message.into()))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Core(CoreError::Conflict(message.into()))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Core(CoreError::Forbidden(message.into()))
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;
