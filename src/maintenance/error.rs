use thiserror::Error;

use crate::database::StoreError;

#[derive(Debug, Error)]
pub enum MaintenanceError {
    #[error("Invalid relation mapping: {0}")]
    InvalidMapping(String),

    #[error("Application not found for domain '{0}'")]
    UnknownDomain(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type MaintenanceResult<T> = Result<T, MaintenanceError>;
