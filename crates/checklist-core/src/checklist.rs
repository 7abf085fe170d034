//! Application state container
//!
//! Holds the one record store for the process. It is opened once by
//! [`Checklist::initialize`] and stays open until the process exits.

use checklist_records::RecordStore;

use crate::config::Config;
use crate::Result;

pub struct Checklist {
    config: Config,
    records: RecordStore,
}

impl Checklist {
    pub fn new(config: Config) -> Self {
        let records = RecordStore::new(config.storage_location());

        Self { config, records }
    }

    /// Open the record store; safe to call more than once
    pub async fn initialize(&self) -> Result<()> {
        self.records.initialize().await?;

        tracing::info!(
            database_path = ?self.config.database_path,
            in_memory = self.config.in_memory,
            "Checklist storage ready"
        );

        Ok(())
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreError;
    use checklist_records::{RecordError, SessionState, StoreState, VerificationStatus};

    #[tokio::test]
    async fn test_initialize_in_memory() {
        let app = Checklist::new(Config::in_memory());
        assert_eq!(app.records().state(), StoreState::Uninitialized);

        app.initialize().await.unwrap();
        app.initialize().await.unwrap();
        assert_eq!(app.records().state(), StoreState::Ready);

        let session = SessionState::new("A1", VerificationStatus::Error).with_photo("front", vec![7]);
        let id = app.records().add_verification_and_photos(&session).await.unwrap();
        assert_eq!(app.records().get_photos_for_verification(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_initialize_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let app = Checklist::new(Config::new(dir.path().to_path_buf()));

        app.initialize().await.unwrap();
        assert!(dir.path().join("checklist.db").exists());
    }

    #[tokio::test]
    async fn test_missing_location_is_unsupported() {
        let app = Checklist::new(Config {
            database_path: None,
            in_memory: false,
        });

        let err = app.initialize().await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Records(RecordError::UnsupportedEnvironment)
        ));
    }
}
