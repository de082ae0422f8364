/// View-state holders for the diary and habit screens
///
/// Each holder owns a `watch` channel with the current screen state, fills it
/// from its repository, and forwards user actions back to the repository.

pub mod diary;
pub mod habit;

pub use diary::*;
pub use habit::*;

use serde::Serialize;

use crate::storage::StorageError;

/// What a screen is currently showing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "lowercase")]
pub enum UiState<T> {
    Loading,
    Error(String),
    Success(T),
}

impl<T> UiState<T> {
    /// Map a query result into a display state
    pub fn from_result(result: Result<T, StorageError>) -> Self {
        match result {
            Ok(data) => UiState::Success(data),
            Err(e) => {
                tracing::warn!("Query failed: {}", e);
                UiState::Error(e.to_string())
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, UiState::Loading)
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            UiState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            UiState::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl<T> Default for UiState<T> {
    fn default() -> Self {
        UiState::Loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_result() {
        let ok: UiState<u32> = UiState::from_result(Ok(3));
        assert_eq!(ok.success(), Some(&3));

        let failed: UiState<u32> = UiState::from_result(Err(StorageError::Connection("gone".to_string())));
        assert!(failed.error().unwrap().contains("gone"));
        assert!(UiState::<u32>::default().is_loading());
    }

    #[test]
    fn test_serialized_shape() {
        let state = UiState::Success(vec![1, 2]);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["state"], "success");
        assert_eq!(json["data"][1], 2);
    }
}
