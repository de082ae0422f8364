/// Diary entry repository
///
/// Thin async wrapper around a `DiaryEntryDao` that publishes a change
/// notification after each write.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::watch;

use crate::domain::{DiaryEntry, DiaryEntryId, YearMonth};
use crate::repository::{run_blocking, ChangeNotifier};
use crate::storage::{DiaryEntryDao, StorageError};

/// Everything the diary screens need from storage
#[async_trait]
pub trait DiaryEntryRepository: Send + Sync {
    async fn get_diary_entry_by_uid(&self, uid: DiaryEntryId) -> Result<Option<DiaryEntry>, StorageError>;

    async fn get_diary_entry_by_date(&self, entry_date: NaiveDate) -> Result<Option<DiaryEntry>, StorageError>;

    async fn get_diary_entries_most_recent(&self) -> Result<Vec<DiaryEntry>, StorageError>;

    async fn get_diary_entries_by_month(&self, month: YearMonth) -> Result<Vec<DiaryEntry>, StorageError>;

    async fn get_all_diary_entries(&self) -> Result<Vec<DiaryEntry>, StorageError>;

    async fn insert_diary_entry(&self, entry: DiaryEntry) -> Result<DiaryEntryId, StorageError>;

    async fn delete_diary_entry_by_uid(&self, uid: DiaryEntryId) -> Result<bool, StorageError>;

    /// Receiver that ticks after every successful write
    fn changes(&self) -> watch::Receiver<u64>;
}

/// Repository backed by any `DiaryEntryDao`
pub struct DefaultDiaryEntryRepository<D: ?Sized> {
    dao: Arc<D>,
    notifier: ChangeNotifier,
}

impl<D: DiaryEntryDao + ?Sized + 'static> DefaultDiaryEntryRepository<D> {
    pub fn new(dao: Arc<D>) -> Self {
        Self {
            dao,
            notifier: ChangeNotifier::new(),
        }
    }
}

#[async_trait]
impl<D: DiaryEntryDao + ?Sized + 'static> DiaryEntryRepository for DefaultDiaryEntryRepository<D> {
    async fn get_diary_entry_by_uid(&self, uid: DiaryEntryId) -> Result<Option<DiaryEntry>, StorageError> {
        run_blocking(&self.dao, move |dao| dao.get_diary_entry_by_uid(uid)).await
    }

    async fn get_diary_entry_by_date(&self, entry_date: NaiveDate) -> Result<Option<DiaryEntry>, StorageError> {
        tracing::debug!("Loading diary entry for {}", entry_date);
        run_blocking(&self.dao, move |dao| dao.get_diary_entry_by_date(entry_date)).await
    }

    async fn get_diary_entries_most_recent(&self) -> Result<Vec<DiaryEntry>, StorageError> {
        run_blocking(&self.dao, |dao| dao.get_diary_entries_most_recent()).await
    }

    async fn get_diary_entries_by_month(&self, month: YearMonth) -> Result<Vec<DiaryEntry>, StorageError> {
        run_blocking(&self.dao, move |dao| dao.get_diary_entries_by_month(month)).await
    }

    async fn get_all_diary_entries(&self) -> Result<Vec<DiaryEntry>, StorageError> {
        run_blocking(&self.dao, |dao| dao.get_all_diary_entries()).await
    }

    async fn insert_diary_entry(&self, entry: DiaryEntry) -> Result<DiaryEntryId, StorageError> {
        let entry_date = entry.entry_date;
        let uid = run_blocking(&self.dao, move |dao| dao.insert_diary_entry(&entry)).await?;

        tracing::info!("Saved diary entry {} for {}", uid, entry_date);
        self.notifier.notify();
        Ok(uid)
    }

    async fn delete_diary_entry_by_uid(&self, uid: DiaryEntryId) -> Result<bool, StorageError> {
        let deleted = run_blocking(&self.dao, move |dao| dao.delete_diary_entry_by_uid(uid)).await?;

        if deleted {
            tracing::info!("Deleted diary entry {}", uid);
            self.notifier.notify();
        }
        Ok(deleted)
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.notifier.subscribe()
    }
}
