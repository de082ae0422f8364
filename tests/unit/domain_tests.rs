/// Basic unit tests for the domain types
use chrono::{Duration, NaiveDate, NaiveDateTime};
use happy_day::*;

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 16)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

#[cfg(test)]
mod domain_unit_tests {
    use super::*;

    #[test]
    fn test_habit_creation() {
        let habit = Habit::new(
            "Test Habit".to_string(),
            "A test habit".to_string(),
            2,
            SECONDS_PER_DAY,
            now(),
        );

        assert!(habit.is_ok());
        let habit = habit.unwrap();
        assert_eq!(habit.name, "Test Habit");
        assert!(!habit.id.is_persisted());
        assert!(habit.is_due(now()));
    }

    #[test]
    fn test_habit_validation() {
        assert!(Habit::new("".to_string(), String::new(), 0, 60, now()).is_err());
        assert!(Habit::new("x".repeat(101), String::new(), 0, 60, now()).is_err());
        assert!(Habit::new("Ok".to_string(), String::new(), 0, -1, now()).is_err());
    }

    #[test]
    fn test_mark_done_moves_due_time() {
        let mut habit = Habit::new("Walk".to_string(), String::new(), 0, 3600, now()).unwrap();
        habit.mark_done(now());

        assert!(!habit.is_due(now()));
        assert!(habit.is_due(now() + Duration::hours(1)));
    }

    #[test]
    fn test_snooze_rejects_zero() {
        let mut habit = Habit::new("Walk".to_string(), String::new(), 0, 3600, now()).unwrap();
        assert!(habit.snooze(now(), 0, SnoozeUnit::Hours).is_err());
        assert!(!habit.is_snoozed);
    }

    #[test]
    fn test_diary_entry_defaults() {
        let date = now().date();
        let entry = DiaryEntry::for_date(date);

        assert!(!entry.uid.is_persisted());
        assert!(!entry.has_content());
        assert!(entry.validate(date).is_ok());
        assert!(entry.validate(date - Duration::days(1)).is_err());
    }

    #[test]
    fn test_year_month_parsing() {
        let month: YearMonth = "2024-12".parse().unwrap();
        assert_eq!(month.next().to_string(), "2025-01");
        assert!(month.contains(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()));
        assert!("2024-13".parse::<YearMonth>().is_err());
    }
}
