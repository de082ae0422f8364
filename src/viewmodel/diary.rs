/// View models for the diary screens
///
/// `DiaryEntriesViewModel` backs the recent-entries list,
/// `DiaryCalendarViewModel` the month calendar, and `DiaryEntryViewModel`
/// the single-day edit form.

use std::sync::Arc;

use chrono::NaiveDate;
use futures::StreamExt;
use tokio::sync::watch;

use crate::domain::{DiaryEntry, DiaryEntryId, YearMonth};
use crate::repository::{observe, DiaryEntryRepository};
use crate::storage::StorageError;
use crate::viewmodel::UiState;
use crate::AppError;

/// Most recent diary entries, newest first
pub struct DiaryEntriesViewModel {
    repository: Arc<dyn DiaryEntryRepository>,
    state: watch::Sender<UiState<Vec<DiaryEntry>>>,
}

impl DiaryEntriesViewModel {
    pub fn new(repository: Arc<dyn DiaryEntryRepository>) -> Self {
        let (state, _) = watch::channel(UiState::Loading);
        Self { repository, state }
    }

    /// Snapshot of the current state
    pub fn ui_state(&self) -> UiState<Vec<DiaryEntry>> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UiState<Vec<DiaryEntry>>> {
        self.state.subscribe()
    }

    /// Query once and publish the result
    pub async fn refresh(&self) {
        let result = self.repository.get_diary_entries_most_recent().await;
        self.state.send_replace(UiState::from_result(result));
    }

    /// Keep the state in sync with the repository
    ///
    /// Publishes immediately and again after every write, until the
    /// repository's change feed closes or the task is dropped.
    pub async fn run(&self) {
        let repository = Arc::clone(&self.repository);
        let updates = observe(self.repository.changes(), move || {
            let repository = Arc::clone(&repository);
            async move { repository.get_diary_entries_most_recent().await }
        });
        futures::pin_mut!(updates);

        while let Some(result) = updates.next().await {
            self.state.send_replace(UiState::from_result(result));
        }
    }

    pub async fn add_diary_entry(&self, entry: DiaryEntry) -> Result<DiaryEntryId, StorageError> {
        self.repository.insert_diary_entry(entry).await
    }
}

/// A month of diary entries plus the days picked in the calendar
pub struct DiaryCalendarViewModel {
    repository: Arc<dyn DiaryEntryRepository>,
    month: watch::Sender<YearMonth>,
    selection: watch::Sender<Vec<NaiveDate>>,
    state: watch::Sender<UiState<Vec<DiaryEntry>>>,
}

impl DiaryCalendarViewModel {
    pub fn new(repository: Arc<dyn DiaryEntryRepository>, month: YearMonth) -> Self {
        let (month, _) = watch::channel(month);
        let (selection, _) = watch::channel(Vec::new());
        let (state, _) = watch::channel(UiState::Loading);
        Self {
            repository,
            month,
            selection,
            state,
        }
    }

    pub fn month(&self) -> YearMonth {
        *self.month.borrow()
    }

    pub fn ui_state(&self) -> UiState<Vec<DiaryEntry>> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UiState<Vec<DiaryEntry>>> {
        self.state.subscribe()
    }

    /// Switch to another month and load it
    pub async fn on_month_changed(&self, month: YearMonth) {
        tracing::debug!("Calendar month changed to {}", month);
        self.month.send_replace(month);
        self.state.send_replace(UiState::Loading);
        self.refresh().await;
    }

    pub fn on_selection_changed(&self, selection: Vec<NaiveDate>) {
        self.selection.send_replace(selection);
    }

    /// Loaded entries whose date is currently selected
    pub fn selected_entries(&self) -> Vec<DiaryEntry> {
        let selection = self.selection.borrow();
        let state = self.state.borrow();
        state
            .success()
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| selection.contains(&e.entry_date))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn refresh(&self) {
        let month = self.month();
        let result = self.repository.get_diary_entries_by_month(month).await;

        // Drop results for a month the user has already left
        if self.month() == month {
            self.state.send_replace(UiState::from_result(result));
        }
    }

    /// Re-query the current month after every repository write
    pub async fn run(&self) {
        let mut changes = self.repository.changes();
        changes.borrow_and_update();

        self.refresh().await;
        while changes.changed().await.is_ok() {
            self.refresh().await;
        }
    }
}

/// The single-day edit form
///
/// Holds a draft entry that the form edits freely; nothing is written until
/// `save` is called.
pub struct DiaryEntryViewModel {
    repository: Arc<dyn DiaryEntryRepository>,
    draft: watch::Sender<DiaryEntry>,
}

impl DiaryEntryViewModel {
    pub fn new(repository: Arc<dyn DiaryEntryRepository>, date: NaiveDate) -> Self {
        let (draft, _) = watch::channel(DiaryEntry::for_date(date));
        Self { repository, draft }
    }

    /// The current draft
    pub fn entry(&self) -> DiaryEntry {
        self.draft.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DiaryEntry> {
        self.draft.subscribe()
    }

    /// Load the entry for `date` into the draft
    ///
    /// A day with nothing written yet yields a fresh default entry for that
    /// date rather than an error.
    pub async fn load(&self, date: NaiveDate) -> Result<DiaryEntry, StorageError> {
        let entry = self
            .repository
            .get_diary_entry_by_date(date)
            .await?
            .unwrap_or_else(|| DiaryEntry::for_date(date));

        tracing::debug!("Diary draft loaded for {} (uid {})", date, entry.uid);
        self.draft.send_replace(entry.clone());
        Ok(entry)
    }

    /// Replace the draft without saving it
    pub fn update(&self, entry: DiaryEntry) {
        self.draft.send_replace(entry);
    }

    /// Validate and store the draft
    pub async fn save(&self, today: NaiveDate) -> Result<DiaryEntry, AppError> {
        let mut entry = self.entry();
        entry.validate(today)?;

        entry.uid = self.repository.insert_diary_entry(entry.clone()).await?;
        self.draft.send_replace(entry.clone());
        Ok(entry)
    }

    /// Delete the stored entry behind the draft
    ///
    /// The draft falls back to an empty entry for the same date. Returns
    /// false when the draft was never saved.
    pub async fn delete(&self) -> Result<bool, AppError> {
        let entry = self.entry();
        if !entry.uid.is_persisted() {
            return Ok(false);
        }

        let deleted = self.repository.delete_diary_entry_by_uid(entry.uid).await?;
        self.draft.send_replace(DiaryEntry::for_date(entry.entry_date));
        Ok(deleted)
    }
}
