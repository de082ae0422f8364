/// Database migration management
///
/// This module creates the SQLite schema and keeps track of its version.
/// Upgrades are destructive: when an older schema is found, the app tables
/// are dropped and recreated, and any prior data is discarded.

use rusqlite::{Connection, OptionalExtension};
use crate::storage::StorageError;

/// Current database schema version
///
/// Increment this whenever the table layout changes.
pub const CURRENT_VERSION: i32 = 3;

/// Tables owned by the application, children before parents
const APP_TABLES: [&str; 3] = ["habit_entry", "habit", "diary_entry"];

/// Initialize the database schema
///
/// This creates all required tables and indexes if they don't exist. An
/// existing database from an older version is wiped first.
pub fn initialize_database(conn: &Connection) -> Result<(), StorageError> {
    // Create version tracking table first
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        [],
    )?;

    let current_version = get_current_version(conn)?;

    if current_version > CURRENT_VERSION {
        return Err(StorageError::Migration(format!(
            "Database schema version {} is newer than supported version {}",
            current_version, CURRENT_VERSION
        )));
    }

    if current_version < CURRENT_VERSION {
        if current_version > 0 {
            tracing::warn!(
                "Schema version {} is outdated, discarding data and recreating at version {}",
                current_version,
                CURRENT_VERSION
            );
            drop_app_tables(conn)?;
        }
        create_schema(conn)?;
        set_version(conn, CURRENT_VERSION)?;
    }

    Ok(())
}

/// Get the current database schema version, zero for a fresh database
pub fn get_current_version(conn: &Connection) -> Result<i32, StorageError> {
    let version = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get::<_, i32>(0)
        })
        .optional()?;

    Ok(version.unwrap_or(0))
}

/// Set the database schema version
fn set_version(conn: &Connection, version: i32) -> Result<(), StorageError> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

fn drop_app_tables(conn: &Connection) -> Result<(), StorageError> {
    for table in APP_TABLES {
        conn.execute(&format!("DROP TABLE IF EXISTS {}", table), [])?;
    }
    Ok(())
}

/// Create the tables and indexes for the current version
fn create_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS diary_entry (
            uid INTEGER PRIMARY KEY AUTOINCREMENT,
            entry_date TEXT NOT NULL,
            abstinent INTEGER NOT NULL DEFAULT 0,
            exercised INTEGER NOT NULL DEFAULT 0,
            for_myself TEXT NOT NULL DEFAULT '',
            for_others TEXT NOT NULL DEFAULT '',
            unexpressed_emotions TEXT DEFAULT NULL,
            something_good TEXT DEFAULT NULL,
            anticipation TEXT DEFAULT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS habit (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            create_date_time TEXT NOT NULL,
            next_due_date_time TEXT NOT NULL,
            priority INTEGER NOT NULL DEFAULT 0,
            seconds_until_next INTEGER NOT NULL DEFAULT 0,
            is_favourite INTEGER NOT NULL DEFAULT 0,
            is_archived INTEGER NOT NULL DEFAULT 0,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            is_snoozed INTEGER NOT NULL DEFAULT 0,
            snooze_date_time TEXT DEFAULT NULL,
            snooze_duration INTEGER NOT NULL DEFAULT 0,
            snooze_duration_unit TEXT NOT NULL DEFAULT '',
            snooze_count INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS habit_entry (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            habit_id INTEGER NOT NULL,
            done_when TEXT NOT NULL,
            FOREIGN KEY (habit_id) REFERENCES habit (id) ON DELETE CASCADE
        )",
        [],
    )?;

    create_indexes(conn)?;

    tracing::info!("Created database schema v{}", CURRENT_VERSION);
    Ok(())
}

fn create_indexes(conn: &Connection) -> Result<(), StorageError> {
    // One diary entry per calendar date
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_diary_entry_entry_date
         ON diary_entry (entry_date)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_habit_next_due
         ON habit (next_due_date_time)",
        [],
    )?;

    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_habit_entry_unique
         ON habit_entry (habit_id, done_when)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_habit_entry_done_when
         ON habit_entry (done_when)",
        [],
    )?;

    Ok(())
}
