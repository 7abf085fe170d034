//! Checklist Core
//!
//! Application wiring for the inspection checklist: configuration, logging,
//! and the single record store the rest of the app borrows.

mod checklist;
mod config;
mod error;

pub use checklist::Checklist;
pub use config::Config;
pub use error::CoreError;

// Re-export the record store surface
pub use checklist_records::{
    PhotoRecord, RecordError, RecordStore, SessionState, StorageError, StorageLocation,
    StoreState, Verification, VerificationStatus,
};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
///
/// Filter comes from `RUST_LOG`, defaulting to `info`. Later calls keep the
/// subscriber installed by the first one.
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice() {
        init_logging();
        init_logging();
        tracing::info!(component = "checklist-core", "Logging initialized");
    }
}
