/// Domain module containing the diary and habit records
///
/// This module defines the core entities (DiaryEntry, Habit, HabitEntry) and
/// their validation rules. These are the records the rest of the application
/// stores, queries and displays.

pub mod diary;
pub mod habit;
pub mod entry;
pub mod types;

// Re-export public types for easy access
pub use diary::*;
pub use habit::*;
pub use entry::*;
pub use types::*;

use thiserror::Error;

/// Errors that can occur during domain operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid habit name: {0}")]
    InvalidHabitName(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid month: {0}")]
    InvalidMonth(String),

    #[error("Invalid value: {message}")]
    InvalidValue { message: String },
}
