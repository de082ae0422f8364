/// Habit entity and related functionality
///
/// This module defines the Habit struct that represents a recurring task the
/// user wants to keep up with, along with its due/snooze bookkeeping.

use chrono::{Datelike, Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, HabitId, SnoozeUnit};

/// One day, the default recurrence interval
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Upper bound for recurrence intervals and snoozes (ten years)
pub const MAX_SPAN_SECONDS: i64 = 10 * 366 * SECONDS_PER_DAY;

/// Last year that fits the four-digit storage format
const MAX_STORED_YEAR: i32 = 9999;

/// A habit represents something the user wants to do regularly
///
/// Once a habit is done its next due time moves forward by
/// `seconds_until_next`. Habits that are archived, deleted, snoozed or not
/// yet due drop out of the active list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    /// Row id, zero until stored
    pub id: HabitId,
    /// Display name (e.g., "Exercised", "Called a friend")
    pub name: String,
    pub description: String,
    /// When this habit was created
    pub created_at: NaiveDateTime,
    /// When this habit shows up in the active list again
    pub next_due_at: NaiveDateTime,
    /// Higher sorts first among habits with the same favourite flag
    pub priority: i32,
    /// Added to the completion time to get the next due time
    pub seconds_until_next: i64,

    pub is_favourite: bool,
    pub is_archived: bool,
    pub is_deleted: bool,
    pub is_snoozed: bool,

    /// When the current snooze runs out
    pub snoozed_until: Option<NaiveDateTime>,
    pub snooze_duration: u32,
    pub snooze_unit: SnoozeUnit,
    /// How many times this habit has been snoozed
    pub snooze_count: u32,
}

impl Habit {
    /// Create a new habit with validation
    ///
    /// The habit is due straight away; `now` is used for both the creation
    /// and the first due time.
    pub fn new(
        name: String,
        description: String,
        priority: i32,
        seconds_until_next: i64,
        now: NaiveDateTime,
    ) -> Result<Self, DomainError> {
        Self::validate_name(&name)?;
        Self::validate_description(&description)?;
        Self::validate_interval(seconds_until_next)?;

        Ok(Self {
            id: HabitId::default(),
            name: name.trim().to_string(),
            description,
            created_at: now,
            next_due_at: now,
            priority,
            seconds_until_next,
            is_favourite: false,
            is_archived: false,
            is_deleted: false,
            is_snoozed: false,
            snoozed_until: None,
            snooze_duration: 0,
            snooze_unit: SnoozeUnit::default(),
            snooze_count: 0,
        })
    }

    /// Builder-style favourite flag
    pub fn favourite(mut self, is_favourite: bool) -> Self {
        self.is_favourite = is_favourite;
        self
    }

    /// Whether the habit's next due time has been reached
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.next_due_at <= now
    }

    /// Whether the habit belongs in the active list at `now`
    pub fn is_active(&self, now: NaiveDateTime, include_snoozed: bool) -> bool {
        !self.is_archived
            && !self.is_deleted
            && (include_snoozed || !self.is_snoozed)
            && self.is_due(now)
    }

    /// Record that the habit was done at `now`
    pub fn mark_done(&mut self, now: NaiveDateTime) {
        self.next_due_at = now + Duration::seconds(self.seconds_until_next);
    }

    /// Hide the habit for `duration` `unit`s starting at `now`
    pub fn snooze(
        &mut self,
        now: NaiveDateTime,
        duration: u32,
        unit: SnoozeUnit,
    ) -> Result<(), DomainError> {
        if duration == 0 {
            return Err(DomainError::InvalidValue {
                message: "Snooze duration must be greater than 0".to_string(),
            });
        }

        let span = unit.duration(duration);
        if span.num_seconds() > MAX_SPAN_SECONDS {
            return Err(DomainError::InvalidValue {
                message: format!("Snooze of {} {} exceeds ten years", duration, unit),
            });
        }
        let until = now
            .checked_add_signed(span)
            .filter(|until| until.year() <= MAX_STORED_YEAR)
            .ok_or_else(|| DomainError::InvalidValue {
                message: format!("Snooze of {} {} ends past the supported date range", duration, unit),
            })?;

        self.is_snoozed = true;
        self.snoozed_until = Some(until);
        self.snooze_duration = duration;
        self.snooze_unit = unit;
        self.snooze_count += 1;
        Ok(())
    }

    /// Whether the snooze has run out at `now`
    pub fn snooze_expired(&self, now: NaiveDateTime) -> bool {
        self.is_snoozed && self.snoozed_until.is_some_and(|until| until <= now)
    }

    /// End the current snooze
    pub fn wake(&mut self) {
        self.is_snoozed = false;
        self.snoozed_until = None;
    }

    pub fn archive(&mut self) {
        self.is_archived = true;
    }

    /// Update the editable properties with validation
    pub fn update(
        &mut self,
        name: Option<String>,
        description: Option<String>,
        priority: Option<i32>,
        seconds_until_next: Option<i64>,
        is_favourite: Option<bool>,
    ) -> Result<(), DomainError> {
        // Validate new values before applying them
        if let Some(ref new_name) = name {
            Self::validate_name(new_name)?;
        }
        if let Some(ref new_desc) = description {
            Self::validate_description(new_desc)?;
        }
        if let Some(interval) = seconds_until_next {
            Self::validate_interval(interval)?;
        }

        if let Some(new_name) = name {
            self.name = new_name.trim().to_string();
        }
        if let Some(new_description) = description {
            self.description = new_description;
        }
        if let Some(new_priority) = priority {
            self.priority = new_priority;
        }
        if let Some(interval) = seconds_until_next {
            self.seconds_until_next = interval;
        }
        if let Some(flag) = is_favourite {
            self.is_favourite = flag;
        }

        Ok(())
    }

    // Validation helper methods

    /// Validate habit name according to business rules
    fn validate_name(name: &str) -> Result<(), DomainError> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(DomainError::InvalidHabitName(
                "Habit name cannot be empty".to_string()
            ));
        }

        if trimmed.chars().count() > 100 {
            return Err(DomainError::InvalidHabitName(
                "Habit name cannot be longer than 100 characters".to_string()
            ));
        }

        Ok(())
    }

    fn validate_description(description: &str) -> Result<(), DomainError> {
        if description.chars().count() > 500 {
            return Err(DomainError::Validation {
                message: "Description cannot be longer than 500 characters".to_string()
            });
        }
        Ok(())
    }

    fn validate_interval(seconds: i64) -> Result<(), DomainError> {
        if seconds < 0 {
            return Err(DomainError::InvalidValue {
                message: "Recurrence interval cannot be negative".to_string()
            });
        }
        // Keeps the date arithmetic in range
        if seconds > MAX_SPAN_SECONDS {
            return Err(DomainError::InvalidValue {
                message: "Recurrence interval cannot exceed ten years".to_string()
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 16)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_create_valid_habit() {
        let habit = Habit::new(
            "  Exercised ".to_string(),
            "Did I exercise today?".to_string(),
            2,
            SECONDS_PER_DAY,
            at(9, 0),
        );

        assert!(habit.is_ok());
        let habit = habit.unwrap();
        assert_eq!(habit.name, "Exercised");
        assert!(habit.is_due(at(9, 0)));
        assert!(habit.is_active(at(9, 0), false));
        assert_eq!(habit.snooze_count, 0);
    }

    #[test]
    fn test_invalid_habit_name() {
        let result = Habit::new(" ".to_string(), String::new(), 0, SECONDS_PER_DAY, at(9, 0));
        assert!(matches!(result, Err(DomainError::InvalidHabitName(_))));
    }

    #[test]
    fn test_negative_interval_invalid() {
        let result = Habit::new("Read".to_string(), String::new(), 0, -1, at(9, 0));
        assert!(result.is_err());
    }

    #[test]
    fn test_mark_done_moves_due_time() {
        let mut habit =
            Habit::new("Read".to_string(), String::new(), 0, 3600, at(9, 0)).unwrap();

        habit.mark_done(at(10, 0));

        assert_eq!(habit.next_due_at, at(11, 0));
        assert!(!habit.is_active(at(10, 30), true));
        assert!(habit.is_active(at(11, 0), true));
    }

    #[test]
    fn test_snooze_and_wake() {
        let mut habit =
            Habit::new("Read".to_string(), String::new(), 0, 3600, at(9, 0)).unwrap();

        habit.snooze(at(9, 0), 2, SnoozeUnit::Hours).unwrap();
        assert!(habit.is_snoozed);
        assert_eq!(habit.snoozed_until, Some(at(11, 0)));
        assert_eq!(habit.snooze_count, 1);
        assert!(!habit.is_active(at(9, 30), false));
        assert!(habit.is_active(at(9, 30), true));
        assert!(!habit.snooze_expired(at(10, 59)));
        assert!(habit.snooze_expired(at(11, 0)));

        habit.wake();
        assert!(!habit.is_snoozed);
        assert!(habit.is_active(at(11, 0), false));

        assert!(habit.snooze(at(9, 0), 0, SnoozeUnit::Days).is_err());
    }

    #[test]
    fn test_oversized_snooze_rejected() {
        let mut habit =
            Habit::new("Read".to_string(), String::new(), 0, 3600, at(9, 0)).unwrap();

        let result = habit.snooze(at(9, 0), 200_000_000, SnoozeUnit::Days);
        assert!(matches!(result, Err(DomainError::InvalidValue { .. })));
        let result = habit.snooze(at(9, 0), u32::MAX, SnoozeUnit::Weeks);
        assert!(matches!(result, Err(DomainError::InvalidValue { .. })));
        assert!(!habit.is_snoozed);
        assert_eq!(habit.snooze_count, 0);

        habit.snooze(at(9, 0), 52, SnoozeUnit::Weeks).unwrap();
        assert!(habit.is_snoozed);
    }

    #[test]
    fn test_snooze_past_year_9999_rejected() {
        let mut habit =
            Habit::new("Read".to_string(), String::new(), 0, 3600, at(9, 0)).unwrap();
        let late = NaiveDate::from_ymd_opt(9999, 12, 30)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();

        assert!(habit.snooze(late, 3, SnoozeUnit::Days).is_err());
        assert!(habit.snooze(late, 1, SnoozeUnit::Days).is_ok());
    }

    #[test]
    fn test_update_validates_before_applying() {
        let mut habit =
            Habit::new("Read".to_string(), String::new(), 0, 3600, at(9, 0)).unwrap();

        let result = habit.update(Some("Write".to_string()), None, Some(3), Some(-5), None);
        assert!(result.is_err());
        assert_eq!(habit.name, "Read");
        assert_eq!(habit.priority, 0);

        habit
            .update(Some(" Write ".to_string()), None, Some(3), Some(7200), Some(true))
            .unwrap();
        assert_eq!(habit.name, "Write");
        assert_eq!(habit.priority, 3);
        assert_eq!(habit.seconds_until_next, 7200);
        assert!(habit.is_favourite);
    }

    #[test]
    fn test_archived_habit_inactive() {
        let mut habit =
            Habit::new("Read".to_string(), String::new(), 0, 3600, at(9, 0)).unwrap();
        habit.archive();

        assert!(!habit.is_active(at(12, 0), true));
    }
}
