//! Record store error types

use checklist_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("No local storage is available in this environment")]
    UnsupportedEnvironment,

    #[error("Failed to open record store: {0}")]
    OpenFailure(#[source] StorageError),

    #[error("Record store not initialized, call initialize() first")]
    Uninitialized,

    #[error("Transaction failed: {0}")]
    TransactionFailure(#[source] StorageError),
}
