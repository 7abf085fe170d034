//! Schema setup
//!
//! Collections are created by presence check, so running the step on an
//! already-initialized database changes nothing. `user_version` records the
//! layout so an older build refuses a database written by a newer one.

use rusqlite::{Connection, TransactionBehavior};

use crate::error::StorageError;
use crate::Result;

pub const SCHEMA_VERSION: i32 = 1;

pub fn ensure_schema(conn: &mut Connection) -> Result<()> {
    // Immediate so two processes opening the same file can't both create tables
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let found: i32 = tx.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if found > SCHEMA_VERSION {
        return Err(StorageError::SchemaTooNew {
            found,
            supported: SCHEMA_VERSION,
        });
    }

    if !table_exists(&tx, "verifications")? {
        tracing::info!("Creating verifications collection");
        tx.execute_batch(
            r#"
            CREATE TABLE verifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sku TEXT NOT NULL,
                descripcion TEXT NOT NULL DEFAULT '',
                factor_estiba REAL,
                status TEXT NOT NULL,
                fecha TEXT NOT NULL,
                inspector TEXT NOT NULL DEFAULT '',
                turno TEXT NOT NULL DEFAULT '',
                ubicacion TEXT NOT NULL DEFAULT '',
                observaciones TEXT NOT NULL DEFAULT '',
                parametros TEXT NOT NULL DEFAULT 'null',
                total_fotos INTEGER NOT NULL DEFAULT 0
            );
        "#,
        )?;
    }

    if !table_exists(&tx, "photos")? {
        tracing::info!("Creating photos collection");
        // verificacion_id is a plain column: nothing enforces the reference
        tx.execute_batch(
            r#"
            CREATE TABLE photos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                verificacion_id INTEGER NOT NULL,
                parametro TEXT NOT NULL,
                blob BLOB NOT NULL,
                fecha TEXT NOT NULL
            );
        "#,
        )?;
    }

    tx.execute_batch(
        r#"
        CREATE INDEX IF NOT EXISTS idx_verifications_sku ON verifications(sku);
        CREATE INDEX IF NOT EXISTS idx_verifications_fecha ON verifications(fecha);
        CREATE INDEX IF NOT EXISTS idx_photos_verificacion_id ON photos(verificacion_id);
    "#,
    )?;

    if found < SCHEMA_VERSION {
        tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }

    tx.commit()?;
    Ok(())
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        [name],
        |row| row.get(0),
    )?;
    Ok(exists)
}
