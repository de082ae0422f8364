/// Public library interface for the Happy Day diary and habit tracker
///
/// This module wires storage, repositories and view models together and
/// exports the types used by the command-line front end and by tests.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;

// Internal modules
mod domain;
mod storage;
mod repository;
mod viewmodel;
pub mod commands;
pub mod config;

// Re-export public modules and types
pub use domain::*;
pub use storage::{
    DiaryEntryDao, HabitDao, InMemoryStorage, SqliteStorage, StorageError, MOST_RECENT_LIMIT,
};
pub use storage::migrations::CURRENT_VERSION as SCHEMA_VERSION;
pub use repository::{
    observe, ChangeNotifier, DefaultDiaryEntryRepository, DefaultHabitRepository,
    DiaryEntryRepository, HabitRepository,
};
pub use viewmodel::{
    DiaryCalendarViewModel, DiaryEntriesViewModel, DiaryEntryViewModel, HabitBoard,
    HabitChanges, HabitViewModel, UiState,
};

/// Errors that can occur while running the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The assembled application
///
/// Owns one repository per record kind and hands out view models wired to
/// them. Every view model created from the same app sees the same data and
/// the same change notifications.
#[derive(Clone)]
pub struct HappyDay {
    diary: Arc<dyn DiaryEntryRepository>,
    habits: Arc<dyn HabitRepository>,
}

impl HappyDay {
    /// Open (or create) the SQLite database at `db_path`
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, AppError> {
        tracing::info!("Opening Happy Day database: {:?}", db_path.as_ref());
        let storage = Arc::new(SqliteStorage::new(db_path)?);
        Ok(Self::from_storage(storage))
    }

    /// An app backed by a throwaway in-memory SQLite database
    pub fn in_memory() -> Result<Self, AppError> {
        let storage = Arc::new(SqliteStorage::open_in_memory()?);
        Ok(Self::from_storage(storage))
    }

    /// An app backed by the fake in-memory store, pre-filled with sample data
    pub fn with_fake_data(now: chrono::NaiveDateTime) -> Self {
        Self::from_storage(Arc::new(InMemoryStorage::with_fake_data(now)))
    }

    /// Wire repositories around a store implementing both DAOs
    pub fn from_storage<S>(storage: Arc<S>) -> Self
    where
        S: DiaryEntryDao + HabitDao + 'static,
    {
        Self::from_repositories(
            Arc::new(DefaultDiaryEntryRepository::new(Arc::clone(&storage))),
            Arc::new(DefaultHabitRepository::new(storage)),
        )
    }

    pub fn from_repositories(
        diary: Arc<dyn DiaryEntryRepository>,
        habits: Arc<dyn HabitRepository>,
    ) -> Self {
        Self { diary, habits }
    }

    pub fn diary_repository(&self) -> Arc<dyn DiaryEntryRepository> {
        Arc::clone(&self.diary)
    }

    pub fn habit_repository(&self) -> Arc<dyn HabitRepository> {
        Arc::clone(&self.habits)
    }

    pub fn diary_entries_view_model(&self) -> DiaryEntriesViewModel {
        DiaryEntriesViewModel::new(self.diary_repository())
    }

    pub fn diary_calendar_view_model(&self, month: YearMonth) -> DiaryCalendarViewModel {
        DiaryCalendarViewModel::new(self.diary_repository(), month)
    }

    pub fn diary_entry_view_model(&self, date: NaiveDate) -> DiaryEntryViewModel {
        DiaryEntryViewModel::new(self.diary_repository(), date)
    }

    pub fn habit_view_model(&self, include_snoozed: bool) -> HabitViewModel {
        HabitViewModel::with_snoozed(self.habit_repository(), include_snoozed)
    }
}
