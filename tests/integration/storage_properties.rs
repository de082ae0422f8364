/// Storage behaviour checked through the public API
use chrono::{Duration, NaiveDate, NaiveDateTime};
use happy_day::*;
use tempfile::TempDir;

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 16)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn open_storage(dir: &TempDir) -> SqliteStorage {
    SqliteStorage::new(dir.path().join("HappyDayDatabase.db")).expect("Failed to open storage")
}

fn entry_on(date: NaiveDate) -> DiaryEntry {
    let mut entry = DiaryEntry::for_date(date);
    entry.for_myself = format!("Walked on {}", date);
    entry
}

/// A second completion in the same second is refused without side effects
fn check_repeated_done_rejected(storage: &dyn HabitDao) {
    let habit = Habit::new("Stretch".to_string(), String::new(), 0, 3600, now()).unwrap();
    let habit_id = storage.insert_habit(&habit).unwrap();

    storage.mark_habit_as_done(habit_id, now()).unwrap();
    let due_after_first = storage.get_habit(habit_id).unwrap().unwrap().next_due_at;

    let repeated = storage.mark_habit_as_done(habit_id, now());
    assert!(matches!(repeated, Err(StorageError::AlreadyDone { .. })));
    assert_eq!(storage.get_all_habit_entries(habit_id).unwrap().len(), 1);
    assert_eq!(
        storage.get_habit(habit_id).unwrap().unwrap().next_due_at,
        due_after_first
    );

    // A different habit may be done in the same second
    let other = Habit::new("Floss".to_string(), String::new(), 0, 3600, now()).unwrap();
    let other_id = storage.insert_habit(&other).unwrap();
    assert!(storage.mark_habit_as_done(other_id, now()).is_ok());
}

/// Habits flagged deleted stay out of every listing
fn check_deleted_habits_hidden(storage: &dyn HabitDao) {
    let kept = Habit::new("Kept".to_string(), String::new(), 0, 3600, now()).unwrap();
    let mut gone = Habit::new("Gone".to_string(), String::new(), 9, 3600, now()).unwrap();
    gone.is_deleted = true;
    let mut gone_favourite = Habit::new("Gone too".to_string(), String::new(), 0, 3600, now())
        .unwrap()
        .favourite(true);
    gone_favourite.is_deleted = true;

    let ids = storage
        .insert_habits(&[kept, gone, gone_favourite])
        .unwrap();
    let visible = |habits: Vec<Habit>| habits.into_iter().map(|h| h.id).collect::<Vec<_>>();

    assert_eq!(visible(storage.get_all_habits(now()).unwrap()), vec![ids[0]]);
    assert_eq!(
        visible(storage.get_all_habits_not_snoozed(now()).unwrap()),
        vec![ids[0]]
    );
    assert_eq!(visible(storage.list_habits().unwrap()), vec![ids[0]]);
    assert!(storage.get_habit(ids[1]).unwrap().unwrap().is_deleted);
}

#[cfg(test)]
mod storage_property_tests {
    use super::*;

    #[test]
    fn test_most_recent_returns_all_newest_first() {
        let dir = TempDir::new().unwrap();
        let storage = open_storage(&dir);

        for offset in [4, 0, 2, 1, 3] {
            storage
                .insert_diary_entry(&entry_on(now().date() - Duration::days(offset)))
                .unwrap();
        }

        let recent = storage.get_diary_entries_most_recent().unwrap();
        assert_eq!(recent.len(), 5);
        assert!(recent.windows(2).all(|w| w[0].entry_date > w[1].entry_date));
        assert_eq!(recent[0].entry_date, now().date());
    }

    #[test]
    fn test_most_recent_is_capped() {
        let dir = TempDir::new().unwrap();
        let storage = open_storage(&dir);

        for offset in 0..(MOST_RECENT_LIMIT as i64 + 5) {
            storage
                .insert_diary_entry(&entry_on(now().date() - Duration::days(offset)))
                .unwrap();
        }

        assert_eq!(storage.get_diary_entries_most_recent().unwrap().len(), MOST_RECENT_LIMIT);
    }

    #[test]
    fn test_month_filter() {
        let dir = TempDir::new().unwrap();
        let storage = open_storage(&dir);

        for date in ["2024-01-31", "2024-02-01", "2024-02-29", "2024-03-01", "2023-02-15"] {
            storage.insert_diary_entry(&entry_on(parse_date(date).unwrap())).unwrap();
        }

        let february = storage
            .get_diary_entries_by_month("2024-02".parse().unwrap())
            .unwrap();
        let dates: Vec<String> = february.iter().map(|e| e.entry_date_formatted()).collect();
        assert_eq!(dates.len(), 2);
        assert!(dates.contains(&"2024-02-01".to_string()));
        assert!(dates.contains(&"2024-02-29".to_string()));
    }

    #[test]
    fn test_entry_round_trip_and_replace() {
        let dir = TempDir::new().unwrap();
        let storage = open_storage(&dir);
        let date = parse_date("2024-03-10").unwrap();

        let mut entry = DiaryEntry::for_date(date);
        entry.abstinent = true;
        entry.for_myself = "Cooked dinner".to_string();
        entry.for_others = "Called my sister".to_string();
        entry.unexpressed_emotions = Some("Worried about work".to_string());
        entry.something_good = Some("Found a café".to_string());
        entry.anticipation = None;

        entry.uid = storage.insert_diary_entry(&entry).unwrap();
        let loaded = storage.get_diary_entry_by_date(date).unwrap().unwrap();
        assert_eq!(loaded, entry);

        let mut replacement = DiaryEntry::for_date(date);
        replacement.for_myself = "Second thoughts".to_string();
        storage.insert_diary_entry(&replacement).unwrap();

        assert_eq!(storage.get_all_diary_entries().unwrap().len(), 1);
        let loaded = storage.get_diary_entry_by_date(date).unwrap().unwrap();
        assert_eq!(loaded.for_myself, "Second thoughts");
        assert!(!loaded.abstinent);
    }

    #[test]
    fn test_habit_delete_cascades() {
        let dir = TempDir::new().unwrap();
        let storage = open_storage(&dir);

        let habit = Habit::new("Stretch".to_string(), String::new(), 0, 3600, now()).unwrap();
        let habit_id = storage.insert_habit(&habit).unwrap();
        for hours in 0..3 {
            storage
                .mark_habit_as_done(habit_id, now() + Duration::hours(hours * 2))
                .unwrap();
        }
        assert_eq!(storage.get_all_habit_entries(habit_id).unwrap().len(), 3);

        assert!(storage.delete_habit(habit_id).unwrap());
        assert!(storage.get_all_habit_entries(habit_id).unwrap().is_empty());
        assert!(storage.get_habit(habit_id).unwrap().is_none());
    }

    #[test]
    fn test_snoozed_and_archived_excluded() {
        let dir = TempDir::new().unwrap();
        let storage = open_storage(&dir);

        let ids = storage
            .insert_habits(&[
                Habit::new("Read".to_string(), String::new(), 0, 3600, now()).unwrap(),
                Habit::new("Run".to_string(), String::new(), 0, 3600, now()).unwrap(),
                Habit::new("Write".to_string(), String::new(), 0, 3600, now()).unwrap(),
            ])
            .unwrap();

        let mut snoozed = storage.get_habit(ids[0]).unwrap().unwrap();
        snoozed.snooze(now(), 1, SnoozeUnit::Days).unwrap();
        storage.update_habit(&snoozed).unwrap();

        let mut archived = storage.get_habit(ids[1]).unwrap().unwrap();
        archived.archive();
        storage.update_habit(&archived).unwrap();

        let active = storage.get_all_habits_not_snoozed(now()).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, ids[2]);

        let with_snoozed = storage.get_all_habits(now()).unwrap();
        assert_eq!(with_snoozed.len(), 2);
        assert!(with_snoozed.iter().all(|h| h.id != ids[1]));
    }

    #[test]
    fn test_data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let date = parse_date("2024-03-01").unwrap();

        {
            let storage = open_storage(&dir);
            storage.insert_diary_entry(&entry_on(date)).unwrap();
            let habit = Habit::new("Floss".to_string(), String::new(), 0, 3600, now()).unwrap();
            let habit_id = storage.insert_habit(&habit).unwrap();
            storage.mark_habit_as_done(habit_id, now()).unwrap();
        }

        let storage = open_storage(&dir);
        assert!(storage.get_diary_entry_by_date(date).unwrap().is_some());
        let habits = storage.list_habits().unwrap();
        assert_eq!(habits.len(), 1);
        assert_eq!(storage.get_all_habit_entries(habits[0].id).unwrap().len(), 1);
    }

    #[test]
    fn test_repeated_done_rejected_in_sqlite() {
        let dir = TempDir::new().unwrap();
        check_repeated_done_rejected(&open_storage(&dir));
    }

    #[test]
    fn test_repeated_done_rejected_in_memory() {
        check_repeated_done_rejected(&InMemoryStorage::new());
    }

    #[test]
    fn test_deleted_habits_hidden_in_sqlite() {
        let dir = TempDir::new().unwrap();
        check_deleted_habits_hidden(&open_storage(&dir));
    }

    #[test]
    fn test_deleted_habits_hidden_in_memory() {
        check_deleted_habits_hidden(&InMemoryStorage::new());
    }
}
