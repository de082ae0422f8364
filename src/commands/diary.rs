/// Diary commands: show, write, list and delete entries

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::commands::{into_result, yes_no, Render, StatusResponse};
use crate::domain::{parse_date, DiaryEntry, DiaryEntryId, YearMonth};
use crate::{AppError, HappyDay, StorageError};

/// Parameters for showing one day's entry
#[derive(Debug, Default, Deserialize)]
pub struct ShowEntryParams {
    /// `YYYY-MM-DD`, defaults to today
    pub date: Option<String>,
    /// Look the entry up by id instead of by date
    pub uid: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ShowEntryResponse {
    pub entry: DiaryEntry,
    /// False when nothing has been written for the day yet
    pub stored: bool,
    pub message: String,
}

impl Render for ShowEntryResponse {
    fn render(&self) -> String {
        format!("{}\n{}", self.message, render_entry(&self.entry))
    }
}

/// Parameters for writing (or amending) one day's entry
///
/// Fields left out keep whatever is already stored for that day.
#[derive(Debug, Default, Deserialize)]
pub struct WriteEntryParams {
    pub date: Option<String>,
    pub for_myself: Option<String>,
    pub for_others: Option<String>,
    pub unexpressed_emotions: Option<String>,
    pub something_good: Option<String>,
    pub anticipation: Option<String>,
    pub abstinent: Option<bool>,
    pub exercised: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct WriteEntryResponse {
    pub success: bool,
    pub uid: DiaryEntryId,
    pub entry: DiaryEntry,
    pub message: String,
}

impl Render for WriteEntryResponse {
    fn render(&self) -> String {
        self.message.clone()
    }
}

/// Parameters for a month view
#[derive(Debug, Default, Deserialize)]
pub struct MonthEntriesParams {
    /// `YYYY-MM`, defaults to the current month
    pub month: Option<String>,
    /// Days to highlight, `YYYY-MM-DD`
    #[serde(default)]
    pub selected: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EntryListResponse {
    pub month: Option<YearMonth>,
    pub entries: Vec<DiaryEntry>,
    /// Entries among `entries` that were selected
    pub selected: Vec<DiaryEntry>,
    pub message: String,
}

impl Render for EntryListResponse {
    fn render(&self) -> String {
        let mut out = self.message.clone();
        for entry in &self.entries {
            out.push('\n');
            out.push_str(&render_summary(entry));
        }
        for entry in &self.selected {
            out.push_str("\n\n");
            out.push_str(&render_entry(entry));
        }
        out
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteEntryParams {
    pub uid: i64,
}

fn resolve_date(date: Option<&str>, today: NaiveDate) -> Result<NaiveDate, AppError> {
    match date {
        Some(value) => Ok(parse_date(value)?),
        None => Ok(today),
    }
}

fn render_entry(entry: &DiaryEntry) -> String {
    let optional = |value: &Option<String>| value.clone().unwrap_or_default();
    format!(
        "📅 {}\n  Abstinent: {}\n  Exercised: {}\n  For myself: {}\n  For others: {}\n  \
         Unexpressed emotions: {}\n  Something good: {}\n  Looking forward to: {}",
        entry.entry_date_formatted(),
        yes_no(entry.abstinent),
        yes_no(entry.exercised),
        entry.for_myself,
        entry.for_others,
        optional(&entry.unexpressed_emotions),
        optional(&entry.something_good),
        optional(&entry.anticipation),
    )
}

fn render_summary(entry: &DiaryEntry) -> String {
    let flags = format!(
        "{}{}",
        if entry.abstinent { "A" } else { "-" },
        if entry.exercised { "E" } else { "-" }
    );
    let headline = [entry.for_myself.as_str(), entry.for_others.as_str()]
        .into_iter()
        .find(|s| !s.trim().is_empty())
        .unwrap_or("");
    format!("  #{:<4} {} [{}] {}", entry.uid, entry.entry_date_formatted(), flags, headline)
}

/// Show the entry for a date, or an empty one when nothing is stored
///
/// An explicit id must exist.
pub async fn show_entry(
    app: &HappyDay,
    params: ShowEntryParams,
    today: NaiveDate,
) -> Result<ShowEntryResponse, AppError> {
    let entry = match params.uid {
        Some(uid) => app
            .diary_repository()
            .get_diary_entry_by_uid(DiaryEntryId(uid))
            .await?
            .ok_or_else(|| StorageError::DiaryEntryNotFound {
                uid: uid.to_string(),
            })?,
        None => {
            let date = resolve_date(params.date.as_deref(), today)?;
            app.diary_entry_view_model(date).load(date).await?
        }
    };
    let stored = entry.uid.is_persisted();

    let message = if stored {
        format!("Diary entry #{} for {}", entry.uid, entry.entry_date_formatted())
    } else {
        format!("Nothing written for {} yet", entry.entry_date_formatted())
    };

    Ok(ShowEntryResponse {
        entry,
        stored,
        message,
    })
}

/// Write a day's entry, merging the given fields into what is stored
pub async fn write_entry(
    app: &HappyDay,
    params: WriteEntryParams,
    today: NaiveDate,
) -> Result<WriteEntryResponse, AppError> {
    let date = resolve_date(params.date.as_deref(), today)?;
    let view_model = app.diary_entry_view_model(date);
    let mut entry = view_model.load(date).await?;
    let existed = entry.uid.is_persisted();

    if let Some(text) = params.for_myself {
        entry.for_myself = text;
    }
    if let Some(text) = params.for_others {
        entry.for_others = text;
    }
    if let Some(text) = params.unexpressed_emotions {
        entry.unexpressed_emotions = Some(text);
    }
    if let Some(text) = params.something_good {
        entry.something_good = Some(text);
    }
    if let Some(text) = params.anticipation {
        entry.anticipation = Some(text);
    }
    if let Some(flag) = params.abstinent {
        entry.abstinent = flag;
    }
    if let Some(flag) = params.exercised {
        entry.exercised = flag;
    }

    view_model.update(entry);
    let saved = view_model.save(today).await?;

    let message = if existed {
        format!("✅ Updated diary entry for {}", saved.entry_date_formatted())
    } else {
        format!("✅ Saved diary entry for {}", saved.entry_date_formatted())
    };

    Ok(WriteEntryResponse {
        success: true,
        uid: saved.uid,
        entry: saved,
        message,
    })
}

/// The most recent entries, newest first
pub async fn recent_entries(app: &HappyDay) -> Result<EntryListResponse, AppError> {
    let view_model = app.diary_entries_view_model();
    view_model.refresh().await;

    let entries = into_result(view_model.ui_state())?;
    Ok(EntryListResponse {
        month: None,
        message: format!("{} recent diary entries", entries.len()),
        entries,
        selected: Vec::new(),
    })
}

/// Entries of one month, with optional selected days shown in full
pub async fn month_entries(
    app: &HappyDay,
    params: MonthEntriesParams,
    today: NaiveDate,
) -> Result<EntryListResponse, AppError> {
    let month = match params.month.as_deref() {
        Some(value) => value.parse::<YearMonth>()?,
        None => YearMonth::of(today),
    };
    let selection = params
        .selected
        .iter()
        .map(|value| parse_date(value))
        .collect::<Result<Vec<_>, _>>()?;

    let view_model = app.diary_calendar_view_model(month);
    view_model.refresh().await;
    view_model.on_selection_changed(selection);

    let selected = view_model.selected_entries();
    let entries = into_result(view_model.ui_state())?;
    Ok(EntryListResponse {
        month: Some(month),
        message: format!("{} diary entries in {}", entries.len(), month),
        entries,
        selected,
    })
}

pub async fn delete_entry(app: &HappyDay, params: DeleteEntryParams) -> Result<StatusResponse, AppError> {
    let uid = DiaryEntryId(params.uid);
    let deleted = app.diary_repository().delete_diary_entry_by_uid(uid).await?;

    Ok(StatusResponse {
        success: deleted,
        message: if deleted {
            format!("🗑️ Deleted diary entry #{}", uid)
        } else {
            format!("No diary entry #{}", uid)
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 16)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_write_merges_fields() {
        let app = HappyDay::in_memory().unwrap();
        let today = now().date();

        write_entry(
            &app,
            WriteEntryParams {
                for_myself: Some("Read a book".to_string()),
                exercised: Some(true),
                ..Default::default()
            },
            today,
        )
        .await
        .unwrap();

        let response = write_entry(
            &app,
            WriteEntryParams {
                something_good: Some("Sunny".to_string()),
                ..Default::default()
            },
            today,
        )
        .await
        .unwrap();

        assert!(response.message.contains("Updated"));
        assert_eq!(response.entry.for_myself, "Read a book");
        assert!(response.entry.exercised);
        assert_eq!(response.entry.something_good.as_deref(), Some("Sunny"));
    }

    #[tokio::test]
    async fn test_show_unwritten_day() {
        let app = HappyDay::in_memory().unwrap();

        let response = show_entry(
            &app,
            ShowEntryParams {
                date: Some("2024-03-01".to_string()),
                uid: None,
            },
            now().date(),
        )
        .await
        .unwrap();

        assert!(!response.stored);
        assert!(response.render().contains("2024-03-01"));
    }

    #[tokio::test]
    async fn test_show_by_uid() {
        let app = HappyDay::with_fake_data(now());

        let found = show_entry(
            &app,
            ShowEntryParams {
                date: None,
                uid: Some(1),
            },
            now().date(),
        )
        .await
        .unwrap();
        assert!(found.stored);
        assert_eq!(found.entry.entry_date, now().date());

        let missing = show_entry(
            &app,
            ShowEntryParams {
                date: None,
                uid: Some(99),
            },
            now().date(),
        )
        .await;
        assert!(matches!(
            missing,
            Err(AppError::Storage(StorageError::DiaryEntryNotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_month_with_selection() {
        let app = HappyDay::with_fake_data(now());

        let response = month_entries(
            &app,
            MonthEntriesParams {
                month: Some("2024-03".to_string()),
                selected: vec!["2024-03-15".to_string()],
            },
            now().date(),
        )
        .await
        .unwrap();

        assert_eq!(response.entries.len(), 10);
        assert_eq!(response.selected.len(), 1);
        assert!(response.render().contains("Something good 2"));
    }

    #[tokio::test]
    async fn test_bad_month_rejected() {
        let app = HappyDay::in_memory().unwrap();
        let result = month_entries(
            &app,
            MonthEntriesParams {
                month: Some("2024/03".to_string()),
                selected: Vec::new(),
            },
            now().date(),
        )
        .await;

        assert!(matches!(result, Err(AppError::Domain(_))));
    }
}
