//! Student schema definition and materialization.
//!
//! # Responsibility
//! - Own the `students` DDL (constraints and secondary index).
//! - Create it idempotently and stamp `PRAGMA user_version`.
//! - Capture the process-wide schema load timestamp.
//!
//! # Invariants
//! - `SCHEMA_VERSION` is the only version this binary understands; there is
//!   no migration chain.
//! - A database stamped with a newer version is rejected, never rewritten.

use crate::db::{DbError, DbResult};
use chrono::{Local, NaiveDateTime};
use once_cell::sync::Lazy;
use rusqlite::Connection;

/// Version written to `PRAGMA user_version` once the schema exists.
pub const SCHEMA_VERSION: u32 = 1;

/// Table name backing [`crate::Student`].
pub const STUDENTS_TABLE: &str = "students";

/// Columns the repository reads and writes, in select order.
pub const STUDENT_COLUMNS: &[&str] = &[
    "id",
    "name",
    "email",
    "grade",
    "birthday",
    "enrolled_date",
];

const STUDENTS_SQL: &str = include_str!("students.sql");

static SCHEMA_LOADED_AT: Lazy<NaiveDateTime> = Lazy::new(|| Local::now().naive_local());

/// Returns the timestamp captured the first time a schema was materialized in
/// this process (or the first call, whichever happens earlier).
pub fn schema_loaded_at() -> NaiveDateTime {
    *SCHEMA_LOADED_AT
}

/// Creates the `students` table and index when missing.
pub fn apply_schema(conn: &mut Connection) -> DbResult<()> {
    Lazy::force(&SCHEMA_LOADED_AT);

    let current_version = current_user_version(conn)?;
    if current_version > SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: SCHEMA_VERSION,
        });
    }

    if current_version == SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    tx.execute_batch(STUDENTS_SQL)?;
    tx.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    tx.commit()?;

    Ok(())
}

/// Reads `PRAGMA user_version` from the connection.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
