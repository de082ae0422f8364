/// Storage layer for persisting diary and habit data
///
/// This module defines the data-access traits the repositories are written
/// against, plus two implementations: SQLite for real use and an in-memory
/// store with fake data for tests and demos.

pub mod sqlite;
pub mod memory;
pub mod migrations;

// Re-export the main storage types
pub use sqlite::*;
pub use memory::*;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::domain::{
    DiaryEntry, DiaryEntryId, DomainError, Habit, HabitEntry, HabitId, YearMonth,
};

/// How many entries the "most recent" query returns (the longest month)
pub const MOST_RECENT_LIMIT: usize = 31;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Diary entry not found: {uid}")]
    DiaryEntryNotFound { uid: String },

    #[error("Habit not found: {habit_id}")]
    HabitNotFound { habit_id: String },

    #[error("Habit {habit_id} was already marked done at {done_at}")]
    AlreadyDone { habit_id: String, done_at: String },

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Invalid stored data: {0}")]
    Domain(#[from] DomainError),
}

/// Data access for diary entries
pub trait DiaryEntryDao: Send + Sync {
    /// Get a diary entry by its row id
    fn get_diary_entry_by_uid(&self, uid: DiaryEntryId) -> Result<Option<DiaryEntry>, StorageError>;

    /// Get the entry written for a date, if any
    fn get_diary_entry_by_date(&self, entry_date: NaiveDate) -> Result<Option<DiaryEntry>, StorageError>;

    /// Newest entries first, at most `MOST_RECENT_LIMIT`
    fn get_diary_entries_most_recent(&self) -> Result<Vec<DiaryEntry>, StorageError>;

    /// Entries dated inside `month`, oldest first
    fn get_diary_entries_by_month(&self, month: YearMonth) -> Result<Vec<DiaryEntry>, StorageError>;

    fn get_all_diary_entries(&self) -> Result<Vec<DiaryEntry>, StorageError>;

    /// Insert or replace an entry, returning its stored id
    ///
    /// An entry for a date that already has one replaces the old record.
    fn insert_diary_entry(&self, entry: &DiaryEntry) -> Result<DiaryEntryId, StorageError>;

    /// Delete an entry, returning whether anything was removed
    fn delete_diary_entry_by_uid(&self, uid: DiaryEntryId) -> Result<bool, StorageError>;
}

/// Data access for habits and their completion entries
pub trait HabitDao: Send + Sync {
    fn get_habit(&self, habit_id: HabitId) -> Result<Option<Habit>, StorageError>;

    /// Habits due at `now` that are neither archived nor deleted
    ///
    /// Favourites come first, then higher priority.
    fn get_all_habits(&self, now: NaiveDateTime) -> Result<Vec<Habit>, StorageError>;

    /// Same as `get_all_habits` but without snoozed habits
    fn get_all_habits_not_snoozed(&self, now: NaiveDateTime) -> Result<Vec<Habit>, StorageError>;

    /// Every habit that isn't flagged deleted, regardless of due time
    fn list_habits(&self) -> Result<Vec<Habit>, StorageError>;

    /// Insert or replace a habit, returning its stored id
    fn insert_habit(&self, habit: &Habit) -> Result<HabitId, StorageError>;

    fn insert_habits(&self, habits: &[Habit]) -> Result<Vec<HabitId>, StorageError>;

    fn update_habit(&self, habit: &Habit) -> Result<(), StorageError>;

    /// Remove a habit and, through the cascade, all of its entries
    fn delete_habit(&self, habit_id: HabitId) -> Result<bool, StorageError>;

    fn delete_habits(&self, habit_ids: &[HabitId]) -> Result<usize, StorageError>;

    /// Move the habit's due time forward and record a completion at `now`
    fn mark_habit_as_done(&self, habit_id: HabitId, now: NaiveDateTime) -> Result<HabitEntry, StorageError>;

    /// All completions of a habit, oldest first
    fn get_all_habit_entries(&self, habit_id: HabitId) -> Result<Vec<HabitEntry>, StorageError>;

    /// Completions strictly after `after`, oldest first
    fn get_habit_entries_after(
        &self,
        habit_id: HabitId,
        after: NaiveDateTime,
    ) -> Result<Vec<HabitEntry>, StorageError>;

    /// Remove the newest completion of a habit, returning it
    fn delete_most_recent_habit_entry(&self, habit_id: HabitId) -> Result<Option<HabitEntry>, StorageError>;

    /// Clear the snooze on every habit whose snooze ran out by `now`
    fn release_expired_snoozes(&self, now: NaiveDateTime) -> Result<usize, StorageError>;
}
