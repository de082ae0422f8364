/// Habit repository
///
/// Async wrapper around a `HabitDao`, including the completion history and
/// snooze bookkeeping the habit board needs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::watch;

use crate::domain::{Habit, HabitEntry, HabitId};
use crate::repository::{run_blocking, ChangeNotifier};
use crate::storage::{HabitDao, StorageError};

#[async_trait]
pub trait HabitRepository: Send + Sync {
    async fn get_habit(&self, habit_id: HabitId) -> Result<Option<Habit>, StorageError>;

    async fn get_all_habits(&self, now: NaiveDateTime) -> Result<Vec<Habit>, StorageError>;

    async fn get_all_habits_not_snoozed(&self, now: NaiveDateTime) -> Result<Vec<Habit>, StorageError>;

    async fn list_habits(&self) -> Result<Vec<Habit>, StorageError>;

    async fn insert_habit(&self, habit: Habit) -> Result<HabitId, StorageError>;

    async fn insert_habits(&self, habits: Vec<Habit>) -> Result<Vec<HabitId>, StorageError>;

    async fn update_habit(&self, habit: Habit) -> Result<(), StorageError>;

    async fn delete_habit(&self, habit_id: HabitId) -> Result<bool, StorageError>;

    async fn delete_habits(&self, habit_ids: Vec<HabitId>) -> Result<usize, StorageError>;

    async fn mark_habit_as_done(&self, habit_id: HabitId, now: NaiveDateTime) -> Result<HabitEntry, StorageError>;

    async fn get_all_habit_entries(&self, habit_id: HabitId) -> Result<Vec<HabitEntry>, StorageError>;

    async fn get_habit_entries_after(
        &self,
        habit_id: HabitId,
        after: NaiveDateTime,
    ) -> Result<Vec<HabitEntry>, StorageError>;

    async fn delete_most_recent_habit_entry(&self, habit_id: HabitId) -> Result<Option<HabitEntry>, StorageError>;

    async fn release_expired_snoozes(&self, now: NaiveDateTime) -> Result<usize, StorageError>;

    /// Receiver that ticks after every successful write
    fn changes(&self) -> watch::Receiver<u64>;
}

/// Repository backed by any `HabitDao`
pub struct DefaultHabitRepository<D: ?Sized> {
    dao: Arc<D>,
    notifier: ChangeNotifier,
}

impl<D: HabitDao + ?Sized + 'static> DefaultHabitRepository<D> {
    pub fn new(dao: Arc<D>) -> Self {
        Self {
            dao,
            notifier: ChangeNotifier::new(),
        }
    }
}

#[async_trait]
impl<D: HabitDao + ?Sized + 'static> HabitRepository for DefaultHabitRepository<D> {
    async fn get_habit(&self, habit_id: HabitId) -> Result<Option<Habit>, StorageError> {
        run_blocking(&self.dao, move |dao| dao.get_habit(habit_id)).await
    }

    async fn get_all_habits(&self, now: NaiveDateTime) -> Result<Vec<Habit>, StorageError> {
        run_blocking(&self.dao, move |dao| dao.get_all_habits(now)).await
    }

    async fn get_all_habits_not_snoozed(&self, now: NaiveDateTime) -> Result<Vec<Habit>, StorageError> {
        run_blocking(&self.dao, move |dao| dao.get_all_habits_not_snoozed(now)).await
    }

    async fn list_habits(&self) -> Result<Vec<Habit>, StorageError> {
        run_blocking(&self.dao, |dao| dao.list_habits()).await
    }

    async fn insert_habit(&self, habit: Habit) -> Result<HabitId, StorageError> {
        let habit_id = run_blocking(&self.dao, move |dao| dao.insert_habit(&habit)).await?;

        tracing::info!("Saved habit {}", habit_id);
        self.notifier.notify();
        Ok(habit_id)
    }

    async fn insert_habits(&self, habits: Vec<Habit>) -> Result<Vec<HabitId>, StorageError> {
        let ids = run_blocking(&self.dao, move |dao| dao.insert_habits(&habits)).await?;

        tracing::info!("Saved {} habits", ids.len());
        self.notifier.notify();
        Ok(ids)
    }

    async fn update_habit(&self, habit: Habit) -> Result<(), StorageError> {
        let habit_id = habit.id;
        run_blocking(&self.dao, move |dao| dao.update_habit(&habit)).await?;

        tracing::info!("Updated habit {}", habit_id);
        self.notifier.notify();
        Ok(())
    }

    async fn delete_habit(&self, habit_id: HabitId) -> Result<bool, StorageError> {
        let deleted = run_blocking(&self.dao, move |dao| dao.delete_habit(habit_id)).await?;

        if deleted {
            tracing::info!("Deleted habit {} and its entries", habit_id);
            self.notifier.notify();
        }
        Ok(deleted)
    }

    async fn delete_habits(&self, habit_ids: Vec<HabitId>) -> Result<usize, StorageError> {
        let deleted = run_blocking(&self.dao, move |dao| dao.delete_habits(&habit_ids)).await?;

        if deleted > 0 {
            tracing::info!("Deleted {} habits", deleted);
            self.notifier.notify();
        }
        Ok(deleted)
    }

    async fn mark_habit_as_done(&self, habit_id: HabitId, now: NaiveDateTime) -> Result<HabitEntry, StorageError> {
        let entry = run_blocking(&self.dao, move |dao| dao.mark_habit_as_done(habit_id, now)).await?;

        tracing::info!("Habit {} done at {}", habit_id, now);
        self.notifier.notify();
        Ok(entry)
    }

    async fn get_all_habit_entries(&self, habit_id: HabitId) -> Result<Vec<HabitEntry>, StorageError> {
        run_blocking(&self.dao, move |dao| dao.get_all_habit_entries(habit_id)).await
    }

    async fn get_habit_entries_after(
        &self,
        habit_id: HabitId,
        after: NaiveDateTime,
    ) -> Result<Vec<HabitEntry>, StorageError> {
        run_blocking(&self.dao, move |dao| dao.get_habit_entries_after(habit_id, after)).await
    }

    async fn delete_most_recent_habit_entry(&self, habit_id: HabitId) -> Result<Option<HabitEntry>, StorageError> {
        let removed =
            run_blocking(&self.dao, move |dao| dao.delete_most_recent_habit_entry(habit_id)).await?;

        if removed.is_some() {
            self.notifier.notify();
        }
        Ok(removed)
    }

    async fn release_expired_snoozes(&self, now: NaiveDateTime) -> Result<usize, StorageError> {
        let released = run_blocking(&self.dao, move |dao| dao.release_expired_snoozes(now)).await?;

        if released > 0 {
            tracing::info!("Woke {} snoozed habits", released);
            self.notifier.notify();
        }
        Ok(released)
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.notifier.subscribe()
    }
}
