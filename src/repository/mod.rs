/// Repositories sitting between the view models and the storage layer
///
/// Each repository forwards to a DAO on the blocking thread pool and bumps a
/// change counter after every successful write. `observe` turns that counter
/// into a stream of fresh query results, which is what the view models
/// subscribe to.

pub mod diary;
pub mod habit;

pub use diary::*;
pub use habit::*;

use std::future::Future;
use std::sync::Arc;

use futures::stream::{self, Stream};
use tokio::sync::watch;

use crate::storage::StorageError;

/// Run a DAO call on the blocking pool
async fn run_blocking<D, T, F>(dao: &Arc<D>, call: F) -> Result<T, StorageError>
where
    D: ?Sized + Send + Sync + 'static,
    T: Send + 'static,
    F: FnOnce(&D) -> Result<T, StorageError> + Send + 'static,
{
    let dao = Arc::clone(dao);
    tokio::task::spawn_blocking(move || call(dao.as_ref()))
        .await
        .map_err(|e| StorageError::Connection(format!("Storage task failed: {}", e)))?
}

/// Change counter shared by a repository and its observers
#[derive(Debug)]
pub struct ChangeNotifier {
    sender: watch::Sender<u64>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(0);
        Self { sender }
    }

    /// Signal that the underlying data changed
    pub fn notify(&self) {
        self.sender.send_modify(|version| *version += 1);
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.sender.subscribe()
    }

    /// Number of changes published so far
    pub fn version(&self) -> u64 {
        *self.sender.borrow()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-run `query` now and after every change notification
///
/// The first item is produced immediately. The stream ends once the
/// repository that owns the notifier is dropped.
pub fn observe<T, F, Fut>(
    mut changes: watch::Receiver<u64>,
    query: F,
) -> impl Stream<Item = Result<T, StorageError>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    changes.borrow_and_update();

    stream::unfold((changes, query, true), |(mut changes, mut query, first)| async move {
        if !first && changes.changed().await.is_err() {
            return None;
        }
        let result = query().await;
        Some((result, (changes, query, false)))
    })
}
