/// HabitEntry entity for tracking habit completions
///
/// Each time a habit is marked as done, one HabitEntry is recorded with the
/// moment it happened. Entries belong to their habit and go away with it.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{EntryId, HabitId};

/// A record of completing a habit once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitEntry {
    /// Row id, zero until stored
    pub id: EntryId,
    /// Which habit this entry is for
    pub habit_id: HabitId,
    /// When the habit was done
    pub done_at: NaiveDateTime,
}

impl HabitEntry {
    /// Create an entry from existing data (used when loading from database)
    pub fn from_existing(id: EntryId, habit_id: HabitId, done_at: NaiveDateTime) -> Self {
        Self { id, habit_id, done_at }
    }
}
