//! Database connection and transactions

use parking_lot::Mutex;
use rusqlite::{Connection, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::schema::ensure_schema;
use crate::Result;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the engine keeps its data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    /// A database file on the local device
    File(PathBuf),
    /// A private in-memory database that lives as long as its handle
    Memory,
}

/// Shared handle to the open engine.
///
/// Clones point at the same connection. Access is serialized through the
/// mutex, so each closure passed to [`Database::transaction`] sees an
/// isolated view until it commits.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(location: &StorageLocation) -> Result<Self> {
        match location {
            StorageLocation::File(path) => Self::open_file(path),
            StorageLocation::Memory => Self::open_in_memory(),
        }
    }

    pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        // WAL mode so reads don't wait on the writer
        let _: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        ensure_schema(&mut conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Run `f` inside a write transaction.
    ///
    /// Commits only when `f` returns `Ok`; on error the transaction is
    /// dropped and rolled back, leaving no partial writes visible.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageError;

    fn count(db: &Database, table: &str) -> i64 {
        db.with_connection(|conn| {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?)
        })
        .unwrap()
    }

    #[test]
    fn test_open_in_memory() {
        let db = Database::open(&StorageLocation::Memory).unwrap();
        assert_eq!(count(&db, "verifications"), 0);
        assert_eq!(count(&db, "photos"), 0);
    }

    #[test]
    fn test_open_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("checklist.db");

        let db = Database::open(&StorageLocation::File(path.clone())).unwrap();
        assert!(path.exists());
        assert_eq!(count(&db, "verifications"), 0);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();

        let result: Result<()> = db.transaction(|conn| {
            conn.execute(
                "INSERT INTO photos (verificacion_id, parametro, blob, fecha)
                 VALUES (1, 'front', x'00', '2024-01-01T00:00:00Z')",
                [],
            )?;
            Err(StorageError::TaskFailed("abort".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(count(&db, "photos"), 0);
    }

    #[test]
    fn test_clones_share_connection() {
        let db = Database::open_in_memory().unwrap();
        let other = db.clone();

        db.transaction(|conn| {
            conn.execute(
                "INSERT INTO photos (verificacion_id, parametro, blob, fecha)
                 VALUES (7, 'side', x'01', '2024-01-01T00:00:00Z')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        assert_eq!(count(&other, "photos"), 1);
    }
}
