/// View model for the habit board
///
/// Shows the habits that are due, each with its completion history, and
/// forwards done/snooze/archive/delete actions to the repository.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use tokio::sync::watch;

use crate::domain::{self, Habit, HabitEntry, HabitId, SnoozeUnit};
use crate::repository::HabitRepository;
use crate::storage::StorageError;
use crate::viewmodel::UiState;
use crate::AppError;

/// Due habits and the completion history of each
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HabitBoard {
    pub habits: Vec<Habit>,
    pub entries: HashMap<HabitId, Vec<HabitEntry>>,
}

impl HabitBoard {
    pub fn entries_for(&self, habit_id: HabitId) -> &[HabitEntry] {
        self.entries.get(&habit_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Edits to apply to a stored habit
#[derive(Debug, Clone, Default)]
pub struct HabitChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i32>,
    pub seconds_until_next: Option<i64>,
    pub is_favourite: Option<bool>,
}

pub struct HabitViewModel {
    repository: Arc<dyn HabitRepository>,
    include_snoozed: bool,
    state: watch::Sender<UiState<HabitBoard>>,
    current: watch::Sender<Option<Habit>>,
}

impl HabitViewModel {
    /// A board that hides snoozed habits
    pub fn new(repository: Arc<dyn HabitRepository>) -> Self {
        Self::with_snoozed(repository, false)
    }

    pub fn with_snoozed(repository: Arc<dyn HabitRepository>, include_snoozed: bool) -> Self {
        let (state, _) = watch::channel(UiState::Loading);
        let (current, _) = watch::channel(None);
        Self {
            repository,
            include_snoozed,
            state,
            current,
        }
    }

    pub fn ui_state(&self) -> UiState<HabitBoard> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UiState<HabitBoard>> {
        self.state.subscribe()
    }

    /// Reload the board as of `now`
    ///
    /// Snoozes that have run out are released first so those habits show up
    /// again.
    pub async fn refresh(&self, now: NaiveDateTime) {
        let board = self.load_board(now).await;
        self.state.send_replace(UiState::from_result(board));
    }

    async fn load_board(&self, now: NaiveDateTime) -> Result<HabitBoard, StorageError> {
        self.repository.release_expired_snoozes(now).await?;

        let habits = if self.include_snoozed {
            self.repository.get_all_habits(now).await?
        } else {
            self.repository.get_all_habits_not_snoozed(now).await?
        };

        let mut entries = HashMap::with_capacity(habits.len());
        for habit in &habits {
            let history = self.repository.get_all_habit_entries(habit.id).await?;
            entries.insert(habit.id, history);
        }

        Ok(HabitBoard { habits, entries })
    }

    /// Reload the board after every repository write
    pub async fn run(&self) {
        let mut changes = self.repository.changes();
        changes.borrow_and_update();

        self.refresh(domain::now()).await;
        while changes.changed().await.is_ok() {
            self.refresh(domain::now()).await;
        }
    }

    /// Habit being edited, not yet saved
    pub fn current_habit(&self) -> Option<Habit> {
        self.current.borrow().clone()
    }

    pub fn update_current_habit(&self, habit: Habit) {
        self.current.send_replace(Some(habit));
    }

    /// Store the habit being edited, if any
    pub async fn save_current_habit(&self) -> Result<Option<HabitId>, AppError> {
        match self.current_habit() {
            Some(habit) => {
                let habit_id = self.insert_habit(habit.clone()).await?;
                self.current.send_replace(Some(Habit { id: habit_id, ..habit }));
                Ok(Some(habit_id))
            }
            None => Ok(None),
        }
    }

    pub async fn insert_habit(&self, habit: Habit) -> Result<HabitId, AppError> {
        Ok(self.repository.insert_habit(habit).await?)
    }

    pub async fn mark_habit_as_done(&self, habit_id: HabitId, now: NaiveDateTime) -> Result<HabitEntry, AppError> {
        Ok(self.repository.mark_habit_as_done(habit_id, now).await?)
    }

    /// Undo the latest completion
    pub async fn delete_most_recent_habit_entry(&self, habit_id: HabitId) -> Result<Option<HabitEntry>, AppError> {
        self.require_habit(habit_id).await?;
        Ok(self.repository.delete_most_recent_habit_entry(habit_id).await?)
    }

    pub async fn snooze_habit(
        &self,
        habit_id: HabitId,
        now: NaiveDateTime,
        duration: u32,
        unit: SnoozeUnit,
    ) -> Result<Habit, AppError> {
        let mut habit = self.require_habit(habit_id).await?;
        habit.snooze(now, duration, unit)?;
        self.repository.update_habit(habit.clone()).await?;
        Ok(habit)
    }

    /// End a snooze early
    pub async fn wake_habit(&self, habit_id: HabitId) -> Result<Habit, AppError> {
        let mut habit = self.require_habit(habit_id).await?;
        habit.wake();
        self.repository.update_habit(habit.clone()).await?;
        Ok(habit)
    }

    /// Change a stored habit's details; fields left as `None` are kept
    pub async fn edit_habit(&self, habit_id: HabitId, changes: HabitChanges) -> Result<Habit, AppError> {
        let mut habit = self.require_habit(habit_id).await?;
        habit.update(
            changes.name,
            changes.description,
            changes.priority,
            changes.seconds_until_next,
            changes.is_favourite,
        )?;
        self.repository.update_habit(habit.clone()).await?;
        Ok(habit)
    }

    pub async fn archive_habit(&self, habit_id: HabitId) -> Result<Habit, AppError> {
        let mut habit = self.require_habit(habit_id).await?;
        habit.archive();
        self.repository.update_habit(habit.clone()).await?;
        Ok(habit)
    }

    /// Remove a habit and its whole history
    pub async fn delete_habit(&self, habit_id: HabitId) -> Result<bool, AppError> {
        Ok(self.repository.delete_habit(habit_id).await?)
    }

    /// Completions of one habit, optionally only those after `since`
    pub async fn habit_history(
        &self,
        habit_id: HabitId,
        since: Option<NaiveDateTime>,
    ) -> Result<(Habit, Vec<HabitEntry>), AppError> {
        let habit = self.require_habit(habit_id).await?;
        let entries = match since {
            Some(after) => self.repository.get_habit_entries_after(habit_id, after).await?,
            None => self.repository.get_all_habit_entries(habit_id).await?,
        };
        Ok((habit, entries))
    }

    /// Every habit that hasn't been deleted, due or not
    pub async fn all_habits(&self) -> Result<Vec<Habit>, AppError> {
        Ok(self.repository.list_habits().await?)
    }

    async fn require_habit(&self, habit_id: HabitId) -> Result<Habit, AppError> {
        self.repository
            .get_habit(habit_id)
            .await?
            .ok_or_else(|| {
                StorageError::HabitNotFound {
                    habit_id: habit_id.to_string(),
                }
                .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DefaultHabitRepository;
    use crate::storage::InMemoryStorage;
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 16)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn view_model() -> HabitViewModel {
        let storage = Arc::new(InMemoryStorage::with_fake_data(now()));
        HabitViewModel::new(Arc::new(DefaultHabitRepository::new(storage)))
    }

    #[tokio::test]
    async fn test_board_loads_entries() {
        let view_model = view_model();
        view_model.refresh(now()).await;

        let state = view_model.ui_state();
        let board = state.success().unwrap();
        assert_eq!(board.habits.len(), 2);
        assert_eq!(board.entries_for(HabitId(1)).len(), 3);
        assert!(board.entries_for(HabitId(2)).is_empty());
    }

    #[tokio::test]
    async fn test_done_hides_until_due() {
        let view_model = view_model();

        view_model.mark_habit_as_done(HabitId(1), now()).await.unwrap();
        view_model.refresh(now()).await;
        let state = view_model.ui_state();
        let board = state.success().unwrap();
        assert_eq!(board.habits.len(), 1);
        assert_eq!(board.habits[0].id, HabitId(2));

        view_model.refresh(now() + Duration::days(1)).await;
        assert_eq!(view_model.ui_state().success().unwrap().habits.len(), 2);
    }

    #[tokio::test]
    async fn test_snooze_then_expire() {
        let view_model = view_model();

        let habit = view_model
            .snooze_habit(HabitId(2), now(), 3, SnoozeUnit::Hours)
            .await
            .unwrap();
        assert_eq!(habit.snooze_count, 1);

        view_model.refresh(now() + Duration::hours(1)).await;
        assert_eq!(view_model.ui_state().success().unwrap().habits.len(), 1);

        view_model.refresh(now() + Duration::hours(3)).await;
        assert_eq!(view_model.ui_state().success().unwrap().habits.len(), 2);
    }

    #[tokio::test]
    async fn test_undo_and_missing_habit() {
        let view_model = view_model();

        let removed = view_model.delete_most_recent_habit_entry(HabitId(1)).await.unwrap();
        assert!(removed.is_some());

        assert!(matches!(
            view_model.delete_most_recent_habit_entry(HabitId(99)).await,
            Err(AppError::Storage(StorageError::HabitNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_edit_habit() {
        let view_model = view_model();

        let edited = view_model
            .edit_habit(
                HabitId(2),
                HabitChanges {
                    priority: Some(5),
                    is_favourite: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.name, "Exercised");
        assert_eq!(edited.priority, 5);

        view_model.refresh(now()).await;
        assert_eq!(view_model.ui_state().success().unwrap().habits[0].id, HabitId(2));

        let rejected = view_model
            .edit_habit(
                HabitId(2),
                HabitChanges {
                    name: Some("   ".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(rejected, Err(AppError::Domain(_))));
        assert!(matches!(
            view_model.edit_habit(HabitId(99), HabitChanges::default()).await,
            Err(AppError::Storage(StorageError::HabitNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_current_habit_draft() {
        let view_model = view_model();
        assert!(view_model.save_current_habit().await.unwrap().is_none());

        let draft = Habit::new("Journal".to_string(), String::new(), 1, 3600, now()).unwrap();
        view_model.update_current_habit(draft);
        assert_eq!(view_model.all_habits().await.unwrap().len(), 2);

        let habit_id = view_model.save_current_habit().await.unwrap().unwrap();
        assert_eq!(view_model.current_habit().unwrap().id, habit_id);
        assert_eq!(view_model.all_habits().await.unwrap().len(), 3);
    }
}
