/// Commands behind the command-line front end
///
/// Each command takes a serde-deserializable params struct, drives the
/// matching view model, and returns a serializable response that can be
/// rendered as text or printed as JSON.

pub mod diary;
pub mod habit;

pub use diary::*;
pub use habit::*;

use serde::Serialize;

use crate::{AppError, StorageError, UiState};

/// Human-readable rendering of a command response
pub trait Render {
    fn render(&self) -> String;
}

/// Format a response for the terminal
pub fn format_response<R: Render + Serialize>(response: &R, json: bool) -> Result<String, AppError> {
    if json {
        Ok(serde_json::to_string_pretty(response)?)
    } else {
        Ok(response.render())
    }
}

/// Response for commands that only report an outcome
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

impl Render for StatusResponse {
    fn render(&self) -> String {
        self.message.clone()
    }
}

/// Unwrap a refreshed screen state, turning an error state back into an error
fn into_result<T>(state: UiState<T>) -> Result<T, AppError> {
    match state {
        UiState::Success(data) => Ok(data),
        UiState::Error(message) => Err(StorageError::Connection(message).into()),
        UiState::Loading => Err(StorageError::Connection("Data is still loading".to_string()).into()),
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
