//! Record store
//!
//! Owns the engine handle for the lifetime of the process. Engine work runs on
//! the blocking pool, so a caller that drops a pending future does not cancel
//! the transaction; it still commits or aborts on its own.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

use checklist_storage::{Database, StorageError, StorageLocation};

use crate::error::RecordError;
use crate::session::SessionState;
use crate::verification::{PhotoRecord, Verification, VerificationStatus};
use crate::Result;

const VERIFICATION_COLUMNS: &str = "id, sku, descripcion, factor_estiba, status, fecha, \
     inspector, turno, ubicacion, observaciones, parametros, total_fotos";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Uninitialized,
    Initializing,
    /// Terminal for the life of the store
    Ready,
}

pub struct RecordStore {
    /// `None` when the host offers no local storage
    location: Option<StorageLocation>,
    db: Arc<OnceCell<Database>>,
    /// Number of `initialize` calls currently in flight
    pending_inits: Arc<AtomicUsize>,
}

impl RecordStore {
    pub fn new(location: Option<StorageLocation>) -> Self {
        Self {
            location,
            db: Arc::new(OnceCell::new()),
            pending_inits: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Some(StorageLocation::Memory))
    }

    pub fn state(&self) -> StoreState {
        if self.db.initialized() {
            StoreState::Ready
        } else if self.pending_inits.load(Ordering::Acquire) > 0 {
            StoreState::Initializing
        } else {
            StoreState::Uninitialized
        }
    }

    /// Open the engine and make sure both collections exist.
    ///
    /// Concurrent callers share a single open. Once this has succeeded,
    /// further calls return immediately. A failure leaves the store
    /// uninitialized so the call can be retried. The open runs on its own
    /// task, so a caller that stops waiting still leaves the store ready.
    pub async fn initialize(&self) -> Result<()> {
        let location = self
            .location
            .clone()
            .ok_or(RecordError::UnsupportedEnvironment)?;

        let pending = PendingInit::enter(Arc::clone(&self.pending_inits));
        let cell = Arc::clone(&self.db);

        let task = tokio::spawn(async move {
            let _pending = pending;

            cell.get_or_try_init(|| async move {
                let opened =
                    tokio::task::spawn_blocking(move || -> checklist_storage::Result<Database> {
                        let db = Database::open(&location)?;
                        tracing::info!(location = ?location, "Opened record store");
                        Ok(db)
                    })
                    .await;

                flatten_join(opened).map_err(RecordError::OpenFailure)
            })
            .await
            .map(|_| ())
        });

        match task.await {
            Ok(result) => result,
            Err(e) => Err(RecordError::OpenFailure(StorageError::TaskFailed(
                e.to_string(),
            ))),
        }
    }

    /// Store one verification and its photos in a single transaction.
    ///
    /// `fecha` is stamped here rather than taken from the caller. Returns the
    /// identity assigned to the new verification.
    pub async fn add_verification_and_photos(&self, session: &SessionState) -> Result<i64> {
        let fecha = Utc::now();
        let session = session.clone();

        let (id, photos) = self
            .run(move |db| db.transaction(|conn| insert_verification(conn, &session, fecha)))
            .await?;

        tracing::debug!(verification_id = id, photos, "Stored verification");
        Ok(id)
    }

    pub async fn get_verifications(&self) -> Result<Vec<Verification>> {
        self.run(|db| {
            db.with_connection(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {VERIFICATION_COLUMNS} FROM verifications ORDER BY id"
                ))?;
                let verifications = stmt
                    .query_map([], verification_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(verifications)
            })
        })
        .await
    }

    /// Absence is `Ok(None)`, not an error.
    pub async fn get_verification_by_id(&self, id: i64) -> Result<Option<Verification>> {
        self.run(move |db| {
            db.with_connection(|conn| {
                let verification = conn
                    .query_row(
                        &format!("SELECT {VERIFICATION_COLUMNS} FROM verifications WHERE id = ?1"),
                        [id],
                        verification_from_row,
                    )
                    .optional()?;
                Ok(verification)
            })
        })
        .await
    }

    pub async fn get_verifications_by_sku(&self, sku: &str) -> Result<Vec<Verification>> {
        let sku = sku.to_string();

        self.run(move |db| {
            db.with_connection(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {VERIFICATION_COLUMNS} FROM verifications WHERE sku = ?1 ORDER BY id"
                ))?;
                let verifications = stmt
                    .query_map([&sku], verification_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(verifications)
            })
        })
        .await
    }

    pub async fn get_photos_for_verification(&self, verification_id: i64) -> Result<Vec<PhotoRecord>> {
        self.run(move |db| {
            db.with_connection(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, verificacion_id, parametro, blob, fecha FROM photos
                     WHERE verificacion_id = ?1
                     ORDER BY id",
                )?;
                let photos = stmt
                    .query_map([verification_id], photo_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(photos)
            })
        })
        .await
    }

    /// Remove every verification and every photo.
    ///
    /// Both collections are cleared in one transaction: either both are
    /// empty afterwards or neither changed.
    pub async fn delete_all_data(&self) -> Result<()> {
        let (verifications, photos) = self
            .run(|db| {
                db.transaction(|conn| {
                    let verifications = conn.execute("DELETE FROM verifications", [])?;
                    let photos = conn.execute("DELETE FROM photos", [])?;
                    Ok((verifications, photos))
                })
            })
            .await?;

        tracing::info!(verifications, photos, "Deleted all records");
        Ok(())
    }

    fn database(&self) -> Result<Database> {
        self.db.get().cloned().ok_or(RecordError::Uninitialized)
    }

    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> checklist_storage::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.database()?;
        let outcome = tokio::task::spawn_blocking(move || f(&db)).await;
        flatten_join(outcome).map_err(RecordError::TransactionFailure)
    }
}

impl Clone for RecordStore {
    fn clone(&self) -> Self {
        Self {
            location: self.location.clone(),
            db: Arc::clone(&self.db),
            pending_inits: Arc::clone(&self.pending_inits),
        }
    }
}

/// Counts an in-flight `initialize` until the open finishes.
struct PendingInit(Arc<AtomicUsize>);

impl PendingInit {
    fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for PendingInit {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

fn flatten_join<T>(
    outcome: std::result::Result<checklist_storage::Result<T>, tokio::task::JoinError>,
) -> checklist_storage::Result<T> {
    match outcome {
        Ok(result) => result,
        Err(e) => Err(StorageError::TaskFailed(e.to_string())),
    }
}

fn insert_verification(
    conn: &Connection,
    session: &SessionState,
    fecha: DateTime<Utc>,
) -> checklist_storage::Result<(i64, usize)> {
    let fecha = format_fecha(&fecha);
    let parametros = serde_json::to_string(&session.parametros)?;

    conn.execute(
        "INSERT INTO verifications
         (sku, descripcion, factor_estiba, status, fecha, inspector, turno,
          ubicacion, observaciones, parametros, total_fotos)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        rusqlite::params![
            session.sku,
            session.descripcion,
            session.factor_estiba,
            session.status.as_str(),
            fecha,
            session.inspector,
            session.turno,
            session.ubicacion,
            session.notes,
            parametros,
            session.fotos_adjuntas,
        ],
    )?;
    let id = conn.last_insert_rowid();

    let mut stmt = conn.prepare(
        "INSERT INTO photos (verificacion_id, parametro, blob, fecha) VALUES (?1, ?2, ?3, ?4)",
    )?;
    let mut stored = 0;
    for (parametro, blob) in session.attached_photos() {
        stmt.execute(rusqlite::params![id, parametro, blob, fecha])?;
        stored += 1;
    }

    Ok((id, stored))
}

// Fixed nanosecond width keeps the text in chronological order for the fecha index
fn format_fecha(fecha: &DateTime<Utc>) -> String {
    fecha.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_fecha(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn verification_from_row(row: &Row<'_>) -> rusqlite::Result<Verification> {
    let status: String = row.get(4)?;
    let status = status
        .parse::<VerificationStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, e.into()))?;

    let fecha: String = row.get(5)?;
    let parametros: String = row.get(10)?;
    let parametros = serde_json::from_str(&parametros)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))?;

    Ok(Verification {
        id: row.get(0)?,
        sku: row.get(1)?,
        descripcion: row.get(2)?,
        // NaN is bound as NULL
        factor_estiba: row.get::<_, Option<f64>>(3)?.unwrap_or(f64::NAN),
        status,
        fecha: parse_fecha(5, &fecha)?,
        inspector: row.get(6)?,
        turno: row.get(7)?,
        ubicacion: row.get(8)?,
        observaciones: row.get(9)?,
        parametros,
        total_fotos: row.get(11)?,
    })
}

fn photo_from_row(row: &Row<'_>) -> rusqlite::Result<PhotoRecord> {
    let fecha: String = row.get(4)?;

    Ok(PhotoRecord {
        id: row.get(0)?,
        verificacion_id: row.get(1)?,
        parametro: row.get(2)?,
        blob: row.get(3)?,
        fecha: parse_fecha(4, &fecha)?,
    })
}
