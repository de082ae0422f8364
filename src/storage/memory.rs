/// In-memory storage used for tests and demos
///
/// Runs the same filters and orderings as the SQLite queries over plain
/// vectors, and can be pre-filled with fake diary entries and habits.

use std::cmp::Reverse;
use std::sync::{Mutex, MutexGuard};

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::domain::{
    format_datetime, DiaryEntry, DiaryEntryId, EntryId, Habit, HabitEntry, HabitId, YearMonth,
    SECONDS_PER_DAY,
};
use crate::storage::{DiaryEntryDao, HabitDao, StorageError, MOST_RECENT_LIMIT};

#[derive(Debug, Default)]
struct MemoryState {
    diary_entries: Vec<DiaryEntry>,
    habits: Vec<Habit>,
    habit_entries: Vec<HabitEntry>,
    next_diary_uid: i64,
    next_habit_id: i64,
    next_entry_id: i64,
}

impl MemoryState {
    fn allocate(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn upsert_habit(&mut self, habit: &Habit) -> HabitId {
        let mut stored = habit.clone();
        if stored.id.is_persisted() {
            self.next_habit_id = self.next_habit_id.max(stored.id.0);
            if let Some(existing) = self.habits.iter_mut().find(|h| h.id == stored.id) {
                *existing = stored.clone();
                return stored.id;
            }
        } else {
            stored.id = HabitId(Self::allocate(&mut self.next_habit_id));
        }

        let habit_id = stored.id;
        self.habits.push(stored);
        habit_id
    }

    fn delete_habit(&mut self, habit_id: HabitId) -> bool {
        let before = self.habits.len();
        self.habits.retain(|h| h.id != habit_id);
        // ON DELETE CASCADE
        self.habit_entries.retain(|e| e.habit_id != habit_id);
        self.habits.len() < before
    }

    fn active_habits(&self, now: NaiveDateTime, include_snoozed: bool) -> Vec<Habit> {
        let mut habits: Vec<Habit> = self
            .habits
            .iter()
            .filter(|h| h.is_active(now, include_snoozed))
            .cloned()
            .collect();
        sort_for_display(&mut habits);
        habits
    }
}

/// Favourites first, then priority descending, then insertion order
fn sort_for_display(habits: &mut [Habit]) {
    habits.sort_by_key(|h| (Reverse(h.is_favourite), Reverse(h.priority), h.id));
}

/// Storage that keeps everything in process memory
///
/// Behaves like `SqliteStorage`: one diary entry per date, cascading habit
/// deletes, and the same active-habit filtering and ordering.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    state: Mutex<MemoryState>,
}

impl InMemoryStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with fake data relative to `now`
    ///
    /// Ten diary entries cover the last ten days, alternating the yes/no
    /// flags. Two habits are due, and the first has three completions spread
    /// over the last thirty days.
    pub fn with_fake_data(now: NaiveDateTime) -> Self {
        let storage = Self::new();
        {
            let mut state = storage.lock_unpoisoned();
            let today = now.date();

            for i in 1..=10i64 {
                let mut entry = DiaryEntry::for_date(today - Duration::days(i - 1));
                entry.uid = DiaryEntryId(MemoryState::allocate(&mut state.next_diary_uid));
                entry.for_myself = format!("For myself {}", i);
                entry.for_others = format!("For others {}", i);
                entry.unexpressed_emotions = Some(format!("Unexpressed emotions {}", i));
                entry.something_good = Some(format!("Something good {}", i));
                entry.anticipation = Some(format!("Anticipation {}", i));
                entry.abstinent = i % 2 == 1;
                entry.exercised = i % 2 == 1;
                state.diary_entries.push(entry);
            }

            for (name, description) in [
                ("Abstinent", "Have I stayed abstinent today?"),
                ("Exercised", "Have I exercised today?"),
            ] {
                let habit = Habit {
                    id: HabitId::default(),
                    name: name.to_string(),
                    description: description.to_string(),
                    created_at: now - Duration::days(30),
                    next_due_at: now,
                    priority: 0,
                    seconds_until_next: SECONDS_PER_DAY,
                    is_favourite: false,
                    is_archived: false,
                    is_deleted: false,
                    is_snoozed: false,
                    snoozed_until: None,
                    snooze_duration: 0,
                    snooze_unit: Default::default(),
                    snooze_count: 0,
                };
                state.upsert_habit(&habit);
            }

            let first = HabitId(1);
            for days_ago in [3, 11, 24] {
                let id = EntryId(MemoryState::allocate(&mut state.next_entry_id));
                state
                    .habit_entries
                    .push(HabitEntry::from_existing(id, first, now - Duration::days(days_ago)));
            }
        }
        storage
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|_| StorageError::Connection("In-memory store lock poisoned".to_string()))
    }

    fn lock_unpoisoned(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DiaryEntryDao for InMemoryStorage {
    fn get_diary_entry_by_uid(&self, uid: DiaryEntryId) -> Result<Option<DiaryEntry>, StorageError> {
        let state = self.lock()?;
        Ok(state.diary_entries.iter().find(|e| e.uid == uid).cloned())
    }

    fn get_diary_entry_by_date(&self, entry_date: NaiveDate) -> Result<Option<DiaryEntry>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .diary_entries
            .iter()
            .find(|e| e.entry_date == entry_date)
            .cloned())
    }

    fn get_diary_entries_most_recent(&self) -> Result<Vec<DiaryEntry>, StorageError> {
        let state = self.lock()?;
        let mut entries = state.diary_entries.clone();
        entries.sort_by_key(|e| Reverse(e.entry_date));
        entries.truncate(MOST_RECENT_LIMIT);
        Ok(entries)
    }

    fn get_diary_entries_by_month(&self, month: YearMonth) -> Result<Vec<DiaryEntry>, StorageError> {
        let state = self.lock()?;
        let mut entries: Vec<DiaryEntry> = state
            .diary_entries
            .iter()
            .filter(|e| month.contains(e.entry_date))
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.entry_date);
        Ok(entries)
    }

    fn get_all_diary_entries(&self) -> Result<Vec<DiaryEntry>, StorageError> {
        let state = self.lock()?;
        let mut entries = state.diary_entries.clone();
        entries.sort_by_key(|e| e.entry_date);
        Ok(entries)
    }

    fn insert_diary_entry(&self, entry: &DiaryEntry) -> Result<DiaryEntryId, StorageError> {
        let mut state = self.lock()?;

        // Replace on conflict with either the id or the date
        state
            .diary_entries
            .retain(|e| e.entry_date != entry.entry_date && !(entry.uid.is_persisted() && e.uid == entry.uid));

        let mut stored = entry.clone();
        if stored.uid.is_persisted() {
            state.next_diary_uid = state.next_diary_uid.max(stored.uid.0);
        } else {
            stored.uid = DiaryEntryId(MemoryState::allocate(&mut state.next_diary_uid));
        }

        let uid = stored.uid;
        state.diary_entries.push(stored);
        Ok(uid)
    }

    fn delete_diary_entry_by_uid(&self, uid: DiaryEntryId) -> Result<bool, StorageError> {
        let mut state = self.lock()?;
        let before = state.diary_entries.len();
        state.diary_entries.retain(|e| e.uid != uid);
        Ok(state.diary_entries.len() < before)
    }
}

impl HabitDao for InMemoryStorage {
    fn get_habit(&self, habit_id: HabitId) -> Result<Option<Habit>, StorageError> {
        let state = self.lock()?;
        Ok(state.habits.iter().find(|h| h.id == habit_id).cloned())
    }

    fn get_all_habits(&self, now: NaiveDateTime) -> Result<Vec<Habit>, StorageError> {
        Ok(self.lock()?.active_habits(now, true))
    }

    fn get_all_habits_not_snoozed(&self, now: NaiveDateTime) -> Result<Vec<Habit>, StorageError> {
        Ok(self.lock()?.active_habits(now, false))
    }

    fn list_habits(&self) -> Result<Vec<Habit>, StorageError> {
        let state = self.lock()?;
        let mut habits: Vec<Habit> = state.habits.iter().filter(|h| !h.is_deleted).cloned().collect();
        sort_for_display(&mut habits);
        Ok(habits)
    }

    fn insert_habit(&self, habit: &Habit) -> Result<HabitId, StorageError> {
        Ok(self.lock()?.upsert_habit(habit))
    }

    fn insert_habits(&self, habits: &[Habit]) -> Result<Vec<HabitId>, StorageError> {
        let mut state = self.lock()?;
        Ok(habits.iter().map(|h| state.upsert_habit(h)).collect())
    }

    fn update_habit(&self, habit: &Habit) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        match state.habits.iter_mut().find(|h| h.id == habit.id) {
            Some(existing) => {
                *existing = habit.clone();
                Ok(())
            }
            None => Err(StorageError::HabitNotFound {
                habit_id: habit.id.to_string(),
            }),
        }
    }

    fn delete_habit(&self, habit_id: HabitId) -> Result<bool, StorageError> {
        Ok(self.lock()?.delete_habit(habit_id))
    }

    fn delete_habits(&self, habit_ids: &[HabitId]) -> Result<usize, StorageError> {
        let mut state = self.lock()?;
        Ok(habit_ids.iter().filter(|id| state.delete_habit(**id)).count())
    }

    fn mark_habit_as_done(&self, habit_id: HabitId, now: NaiveDateTime) -> Result<HabitEntry, StorageError> {
        let mut state = self.lock()?;
        // Stored completions are compared at whole seconds
        let done_when = format_datetime(&now);
        let repeated = state
            .habit_entries
            .iter()
            .any(|e| e.habit_id == habit_id && format_datetime(&e.done_at) == done_when);
        let habit = state
            .habits
            .iter_mut()
            .find(|h| h.id == habit_id)
            .ok_or_else(|| StorageError::HabitNotFound {
                habit_id: habit_id.to_string(),
            })?;
        if repeated {
            return Err(StorageError::AlreadyDone {
                habit_id: habit_id.to_string(),
                done_at: done_when,
            });
        }
        habit.mark_done(now);

        let id = EntryId(MemoryState::allocate(&mut state.next_entry_id));
        let entry = HabitEntry::from_existing(id, habit_id, now);
        state.habit_entries.push(entry.clone());
        Ok(entry)
    }

    fn get_all_habit_entries(&self, habit_id: HabitId) -> Result<Vec<HabitEntry>, StorageError> {
        let state = self.lock()?;
        let mut entries: Vec<HabitEntry> = state
            .habit_entries
            .iter()
            .filter(|e| e.habit_id == habit_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| (e.done_at, e.id));
        Ok(entries)
    }

    fn get_habit_entries_after(
        &self,
        habit_id: HabitId,
        after: NaiveDateTime,
    ) -> Result<Vec<HabitEntry>, StorageError> {
        let mut entries = self.get_all_habit_entries(habit_id)?;
        entries.retain(|e| e.done_at > after);
        Ok(entries)
    }

    fn delete_most_recent_habit_entry(&self, habit_id: HabitId) -> Result<Option<HabitEntry>, StorageError> {
        let mut state = self.lock()?;
        let newest = state
            .habit_entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.habit_id == habit_id)
            .max_by_key(|(_, e)| (e.done_at, e.id))
            .map(|(index, _)| index);

        Ok(newest.map(|index| state.habit_entries.remove(index)))
    }

    fn release_expired_snoozes(&self, now: NaiveDateTime) -> Result<usize, StorageError> {
        let mut state = self.lock()?;
        let mut released = 0;
        for habit in state.habits.iter_mut().filter(|h| h.snooze_expired(now)) {
            habit.wake();
            released += 1;
        }
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 16)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_fake_data() {
        let storage = InMemoryStorage::with_fake_data(now());

        let recent = storage.get_diary_entries_most_recent().unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].entry_date, now().date());
        assert!(recent.windows(2).all(|w| w[0].entry_date > w[1].entry_date));

        let habits = storage.get_all_habits_not_snoozed(now()).unwrap();
        assert_eq!(habits.len(), 2);
        let entries = storage.get_all_habit_entries(habits[0].id).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.done_at >= now() - Duration::days(30)));
    }

    #[test]
    fn test_month_filter() {
        let storage = InMemoryStorage::with_fake_data(now());
        let march: YearMonth = "2024-03".parse().unwrap();

        let entries = storage.get_diary_entries_by_month(march).unwrap();
        assert_eq!(entries.len(), 10);
        assert!(entries.iter().all(|e| march.contains(e.entry_date)));
        assert!(storage
            .get_diary_entries_by_month(march.previous())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_delete_habit_cascades() {
        let storage = InMemoryStorage::with_fake_data(now());

        assert!(storage.delete_habit(HabitId(1)).unwrap());
        assert!(storage.get_all_habit_entries(HabitId(1)).unwrap().is_empty());
        assert_eq!(storage.list_habits().unwrap().len(), 1);
    }

    #[test]
    fn test_insert_same_date_replaces() {
        let storage = InMemoryStorage::new();
        let date = now().date();
        let mut entry = DiaryEntry::for_date(date);
        entry.for_others = "first".to_string();
        storage.insert_diary_entry(&entry).unwrap();
        entry.for_others = "second".to_string();
        storage.insert_diary_entry(&entry).unwrap();

        let all = storage.get_all_diary_entries().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].for_others, "second");
    }

    #[test]
    fn test_delete_most_recent_entry() {
        let storage = InMemoryStorage::with_fake_data(now());

        let removed = storage
            .delete_most_recent_habit_entry(HabitId(1))
            .unwrap()
            .unwrap();
        assert_eq!(removed.done_at, now() - Duration::days(3));
        assert_eq!(storage.get_all_habit_entries(HabitId(1)).unwrap().len(), 2);
        assert!(storage.delete_most_recent_habit_entry(HabitId(2)).unwrap().is_none());
    }
}
