//! SQLite-backed storage.
//!
//! There is no pool: every operation opens its own connection through
//! [`Database::connect`] and releases it when the operation returns.

mod bulk;
mod repository;

pub use repository::Repository;

use crate::config::RegistryConfig;
use crate::core::{RegistryError, Result, Value};
use crate::models::{Exec, Student, Teacher};
use crate::schema::marshal::{insert_arguments, scan_row, update_arguments};
use crate::schema::statement::{create_table, create_unique_index};
use crate::schema::{Record, StatementKind, generate};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params_from_iter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the registry database file.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.database_path.clone()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens a fresh connection for one operation.
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }

    /// Creates any missing tables from the declared record schemas.
    pub fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        for ddl in [
            create_table::<Exec>()?,
            create_table::<Student>()?,
            create_table::<Teacher>()?,
            create_unique_index::<Exec>("username")?,
        ] {
            conn.execute(&ddl, [])?;
        }
        info!(path = %self.path.display(), "registry schema ready");
        Ok(())
    }

    pub fn repository<R: Record>(&self) -> Repository<R> {
        Repository::new(self.clone())
    }
}

// Statement helpers shared by single-row and bulk paths. A `Transaction`
// derefs to `Connection`, so both run through the same code.

pub(crate) fn fetch<R: Record>(conn: &Connection, identity: i64) -> Result<Option<R>> {
    let sql = generate::<R>(StatementKind::Select)?;
    let record = conn
        .query_row(&sql, [identity], |row| scan_row::<R>(row))
        .optional()?;
    Ok(record)
}

pub(crate) fn query<R: Record>(conn: &Connection, sql: &str, arguments: &[Value]) -> Result<Vec<R>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(arguments.iter()), |row| scan_row::<R>(row))?;
    let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

/// Inserts `record` and writes the assigned identity back into it.
pub(crate) fn insert<R: Record>(conn: &Connection, record: &mut R) -> Result<()> {
    let sql = generate::<R>(StatementKind::Insert)?;
    conn.execute(&sql, params_from_iter(insert_arguments(record)))
        .map_err(rejected_write)?;
    record.set_identity(conn.last_insert_rowid());
    Ok(())
}

/// Writes the whole row; returns the number of rows touched.
pub(crate) fn update<R: Record>(conn: &Connection, record: &R) -> Result<usize> {
    let sql = generate::<R>(StatementKind::Update)?;
    let affected = conn
        .execute(&sql, params_from_iter(update_arguments(record)))
        .map_err(rejected_write)?;
    Ok(affected)
}

/// Constraint violations are the caller's data clashing with stored rows.
fn rejected_write(err: rusqlite::Error) -> RegistryError {
    match err {
        rusqlite::Error::SqliteFailure(failure, message)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            RegistryError::invalid_input(
                message.unwrap_or_else(|| "constraint violation".to_string()),
            )
        }
        other => other.into(),
    }
}

pub(crate) fn delete<R: Record>(conn: &Connection, identity: i64) -> Result<usize> {
    let sql = generate::<R>(StatementKind::Delete)?;
    let affected = conn.execute(&sql, [identity])?;
    Ok(affected)
}
