/// DiaryEntry entity for daily journal records
///
/// A diary entry holds a day's reflections plus two yes/no habit flags.
/// There is at most one entry per calendar date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{DiaryEntryId, DomainError, DATE_FORMAT};

/// Longest accepted free-text field, in characters
pub const MAX_TEXT_LEN: usize = 5000;

/// One day's journal entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryEntry {
    /// Row id, zero until stored
    pub uid: DiaryEntryId,
    /// The day this entry is about (unique)
    pub entry_date: NaiveDate,
    /// Stayed abstinent that day
    pub abstinent: bool,
    /// Exercised that day
    pub exercised: bool,
    /// What I did for myself
    pub for_myself: String,
    /// What I did for others
    pub for_others: String,
    pub unexpressed_emotions: Option<String>,
    pub something_good: Option<String>,
    /// Something I'm looking forward to
    pub anticipation: Option<String>,
}

impl DiaryEntry {
    /// An empty, unsaved entry for the given date
    ///
    /// This is what the edit screen shows when nothing has been written for
    /// a day yet.
    pub fn for_date(entry_date: NaiveDate) -> Self {
        Self {
            uid: DiaryEntryId::default(),
            entry_date,
            abstinent: false,
            exercised: false,
            for_myself: String::new(),
            for_others: String::new(),
            unexpressed_emotions: None,
            something_good: None,
            anticipation: None,
        }
    }

    /// The entry date as `yyyy-MM-dd`
    pub fn entry_date_formatted(&self) -> String {
        self.entry_date.format(DATE_FORMAT).to_string()
    }

    /// Whether any field differs from the default for this date
    pub fn has_content(&self) -> bool {
        self.abstinent
            || self.exercised
            || !self.for_myself.trim().is_empty()
            || !self.for_others.trim().is_empty()
            || Self::has_text(&self.unexpressed_emotions)
            || Self::has_text(&self.something_good)
            || Self::has_text(&self.anticipation)
    }

    /// Check the entry can be saved
    ///
    /// Entries cannot be written for days after `today`, and no text field
    /// may exceed `MAX_TEXT_LEN` characters.
    pub fn validate(&self, today: NaiveDate) -> Result<(), DomainError> {
        if self.entry_date > today {
            return Err(DomainError::InvalidDate(format!(
                "Cannot write a diary entry for a future date ({})",
                self.entry_date_formatted()
            )));
        }

        let fields: [(&str, Option<&str>); 5] = [
            ("for_myself", Some(self.for_myself.as_str())),
            ("for_others", Some(self.for_others.as_str())),
            ("unexpressed_emotions", self.unexpressed_emotions.as_deref()),
            ("something_good", self.something_good.as_deref()),
            ("anticipation", self.anticipation.as_deref()),
        ];
        for (name, value) in fields {
            if let Some(text) = value {
                if text.chars().count() > MAX_TEXT_LEN {
                    return Err(DomainError::Validation {
                        message: format!(
                            "{} cannot be longer than {} characters",
                            name, MAX_TEXT_LEN
                        ),
                    });
                }
            }
        }

        Ok(())
    }

    fn has_text(value: &Option<String>) -> bool {
        value.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}
