//! Checklist Local Record Store
//!
//! - A Verification is one persisted inspection outcome for a product
//! - Photos are stored alongside, keyed by the verification they document
//! - Records are immutable once written; the only deletion is a full wipe
//! - Every operation resolves once its transaction commits or aborts

mod error;
mod session;
mod store;
mod verification;

pub use error::RecordError;
pub use session::SessionState;
pub use store::{RecordStore, StoreState};
pub use verification::{PhotoRecord, Verification, VerificationStatus};

pub use checklist_storage::{StorageError, StorageLocation};

pub type Result<T> = std::result::Result<T, RecordError>;
