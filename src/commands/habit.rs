/// Habit commands: list, create, complete, snooze and remove habits

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::commands::{into_result, Render, StatusResponse};
use crate::domain::{
    format_datetime, parse_date, DomainError, Habit, HabitEntry, HabitId, SnoozeUnit,
    SECONDS_PER_DAY,
};
use crate::{AppError, HabitChanges, HappyDay};

/// Parameters for listing habits
#[derive(Debug, Default, Deserialize)]
pub struct ListHabitsParams {
    /// Include habits that are currently snoozed
    #[serde(default)]
    pub include_snoozed: bool,
    /// List every stored habit, due or not
    #[serde(default)]
    pub all: bool,
}

/// One habit as shown in a listing
#[derive(Debug, Serialize)]
pub struct HabitSummary {
    pub habit_id: HabitId,
    pub name: String,
    pub description: String,
    pub priority: i32,
    pub is_favourite: bool,
    pub is_archived: bool,
    pub is_snoozed: bool,
    pub next_due_at: String,
    pub snoozed_until: Option<String>,
    pub completions: usize,
    pub last_done_at: Option<String>,
}

impl HabitSummary {
    fn from_habit(habit: &Habit, entries: &[HabitEntry]) -> Self {
        Self {
            habit_id: habit.id,
            name: habit.name.clone(),
            description: habit.description.clone(),
            priority: habit.priority,
            is_favourite: habit.is_favourite,
            is_archived: habit.is_archived,
            is_snoozed: habit.is_snoozed,
            next_due_at: format_datetime(&habit.next_due_at),
            snoozed_until: habit.snoozed_until.as_ref().map(format_datetime),
            completions: entries.len(),
            last_done_at: entries.iter().map(|e| e.done_at).max().as_ref().map(format_datetime),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListHabitsResponse {
    pub habits: Vec<HabitSummary>,
    pub message: String,
}

impl Render for ListHabitsResponse {
    fn render(&self) -> String {
        let mut out = self.message.clone();
        for habit in &self.habits {
            let mut marks = String::new();
            if habit.is_favourite {
                marks.push('★');
            }
            if habit.is_snoozed {
                marks.push_str(" (snoozed)");
            }
            if habit.is_archived {
                marks.push_str(" (archived)");
            }
            out.push_str(&format!(
                "\n  #{:<4} {}{}  done {} times, due {}",
                habit.habit_id, habit.name, marks, habit.completions, habit.next_due_at
            ));
            if !habit.description.is_empty() {
                out.push_str(&format!("\n        {}", habit.description));
            }
        }
        out
    }
}

/// Parameters for creating a habit
#[derive(Debug, Default, Deserialize)]
pub struct CreateHabitParams {
    pub name: String,
    pub description: Option<String>,
    pub priority: Option<i32>,
    /// Interval between completions, e.g. `12h`, `1d`, `2w` or plain seconds
    pub every: Option<String>,
    #[serde(default)]
    pub favourite: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateHabitResponse {
    pub success: bool,
    pub habit_id: HabitId,
    pub message: String,
}

impl Render for CreateHabitResponse {
    fn render(&self) -> String {
        self.message.clone()
    }
}

/// Parameters for commands that act on a single habit
#[derive(Debug, Deserialize)]
pub struct HabitIdParams {
    pub habit_id: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkDoneResponse {
    pub success: bool,
    pub entry: HabitEntry,
    pub next_due_at: Option<String>,
    pub message: String,
}

impl Render for MarkDoneResponse {
    fn render(&self) -> String {
        self.message.clone()
    }
}

#[derive(Debug, Deserialize)]
pub struct SnoozeHabitParams {
    pub habit_id: i64,
    pub duration: u32,
    /// minutes, hours, days or weeks; days when omitted
    pub unit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HabitChangeResponse {
    pub success: bool,
    pub habit: HabitSummary,
    pub message: String,
}

impl Render for HabitChangeResponse {
    fn render(&self) -> String {
        self.message.clone()
    }
}

/// Parameters for editing a habit; omitted fields keep their value
#[derive(Debug, Default, Deserialize)]
pub struct EditHabitParams {
    pub habit_id: i64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i32>,
    pub every: Option<String>,
    pub favourite: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct HabitHistoryParams {
    pub habit_id: i64,
    /// Only completions after this day, `YYYY-MM-DD`
    pub since: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HabitHistoryResponse {
    pub habit: HabitSummary,
    pub entries: Vec<HabitEntry>,
    pub message: String,
}

impl Render for HabitHistoryResponse {
    fn render(&self) -> String {
        let mut out = self.message.clone();
        for entry in &self.entries {
            out.push_str(&format!("\n  ✓ {}", format_datetime(&entry.done_at)));
        }
        out
    }
}

/// Parse a habit interval into seconds
///
/// Accepts a bare number of seconds or an amount followed by a snooze unit
/// suffix (`30m`, `12h`, `1d`, `2w`).
pub fn parse_interval(value: &str) -> Result<i64, DomainError> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<i64>() {
        return Ok(seconds);
    }

    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (amount, unit) = value.split_at(split);
    let amount = amount.parse::<u32>().map_err(|_| DomainError::InvalidValue {
        message: format!("Invalid interval '{}'. Use e.g. 12h, 1d or 2w", value),
    })?;
    let unit = unit.parse::<SnoozeUnit>()?;
    Ok(unit.duration(amount).num_seconds())
}

/// List due habits, or every habit with `all`
pub async fn list_habits(
    app: &HappyDay,
    params: ListHabitsParams,
    now: NaiveDateTime,
) -> Result<ListHabitsResponse, AppError> {
    let view_model = app.habit_view_model(params.include_snoozed);

    let habits = if params.all {
        let repository = app.habit_repository();
        repository.release_expired_snoozes(now).await?;

        let mut summaries = Vec::new();
        for habit in view_model.all_habits().await? {
            let entries = repository.get_all_habit_entries(habit.id).await?;
            summaries.push(HabitSummary::from_habit(&habit, &entries));
        }
        summaries
    } else {
        view_model.refresh(now).await;
        let board = into_result(view_model.ui_state())?;
        board
            .habits
            .iter()
            .map(|habit| HabitSummary::from_habit(habit, board.entries_for(habit.id)))
            .collect()
    };

    let message = match (habits.len(), params.all) {
        (0, false) => "🎉 Nothing due right now".to_string(),
        (0, true) => "No habits yet".to_string(),
        (n, false) => format!("📋 {} habits due", n),
        (n, true) => format!("📋 {} habits", n),
    };

    Ok(ListHabitsResponse { habits, message })
}

pub async fn create_habit(
    app: &HappyDay,
    params: CreateHabitParams,
    now: NaiveDateTime,
) -> Result<CreateHabitResponse, AppError> {
    let seconds_until_next = match params.every.as_deref() {
        Some(value) => parse_interval(value)?,
        None => SECONDS_PER_DAY,
    };

    let habit = Habit::new(
        params.name,
        params.description.unwrap_or_default(),
        params.priority.unwrap_or(0),
        seconds_until_next,
        now,
    )?
    .favourite(params.favourite);

    let view_model = app.habit_view_model(false);
    let name = habit.name.clone();
    view_model.update_current_habit(habit);
    let habit_id = view_model.save_current_habit().await?.unwrap_or_default();

    tracing::info!("Created habit {} ({})", habit_id, name);
    Ok(CreateHabitResponse {
        success: true,
        habit_id,
        message: format!("✅ Created habit '{}' with id {}", name, habit_id),
    })
}

/// Record a completion now and push the habit's next due time
pub async fn mark_done(
    app: &HappyDay,
    params: HabitIdParams,
    now: NaiveDateTime,
) -> Result<MarkDoneResponse, AppError> {
    let habit_id = HabitId(params.habit_id);
    let view_model = app.habit_view_model(true);
    let entry = view_model.mark_habit_as_done(habit_id, now).await?;

    let habit = app.habit_repository().get_habit(habit_id).await?;
    let next_due_at = habit.as_ref().map(|h| format_datetime(&h.next_due_at));
    let name = habit.map(|h| h.name).unwrap_or_default();

    let message = match &next_due_at {
        Some(due) => format!("✅ Marked '{}' as done. Next due {}", name, due),
        None => format!("✅ Marked habit {} as done", habit_id),
    };

    Ok(MarkDoneResponse {
        success: true,
        entry,
        next_due_at,
        message,
    })
}

/// Remove the latest completion of a habit
pub async fn undo_done(app: &HappyDay, params: HabitIdParams) -> Result<StatusResponse, AppError> {
    let habit_id = HabitId(params.habit_id);
    let removed = app
        .habit_view_model(true)
        .delete_most_recent_habit_entry(habit_id)
        .await?;

    Ok(match removed {
        Some(entry) => StatusResponse {
            success: true,
            message: format!(
                "↩️ Removed completion of habit {} from {}",
                habit_id,
                format_datetime(&entry.done_at)
            ),
        },
        None => StatusResponse {
            success: false,
            message: format!("Habit {} has no completions to undo", habit_id),
        },
    })
}

pub async fn snooze_habit(
    app: &HappyDay,
    params: SnoozeHabitParams,
    now: NaiveDateTime,
) -> Result<HabitChangeResponse, AppError> {
    let unit = match params.unit.as_deref() {
        Some(value) => value.parse::<SnoozeUnit>()?,
        None => SnoozeUnit::default(),
    };

    let habit = app
        .habit_view_model(true)
        .snooze_habit(HabitId(params.habit_id), now, params.duration, unit)
        .await?;

    let message = format!(
        "😴 Snoozed '{}' for {} {}",
        habit.name,
        params.duration,
        unit.as_str()
    );
    habit_change(app, habit, message).await
}

pub async fn edit_habit(app: &HappyDay, params: EditHabitParams) -> Result<HabitChangeResponse, AppError> {
    let changes = HabitChanges {
        name: params.name,
        description: params.description,
        priority: params.priority,
        seconds_until_next: params.every.as_deref().map(parse_interval).transpose()?,
        is_favourite: params.favourite,
    };

    let habit = app
        .habit_view_model(true)
        .edit_habit(HabitId(params.habit_id), changes)
        .await?;

    let message = format!("✏️ Updated '{}'", habit.name);
    habit_change(app, habit, message).await
}

/// End a snooze early
pub async fn wake_habit(app: &HappyDay, params: HabitIdParams) -> Result<HabitChangeResponse, AppError> {
    let habit = app
        .habit_view_model(true)
        .wake_habit(HabitId(params.habit_id))
        .await?;

    let message = format!("⏰ '{}' is awake again", habit.name);
    habit_change(app, habit, message).await
}

pub async fn archive_habit(app: &HappyDay, params: HabitIdParams) -> Result<HabitChangeResponse, AppError> {
    let habit = app
        .habit_view_model(true)
        .archive_habit(HabitId(params.habit_id))
        .await?;

    let message = format!("📦 Archived '{}'", habit.name);
    habit_change(app, habit, message).await
}

/// Delete a habit together with its completions
pub async fn delete_habit(app: &HappyDay, params: HabitIdParams) -> Result<StatusResponse, AppError> {
    let habit_id = HabitId(params.habit_id);
    let deleted = app.habit_view_model(true).delete_habit(habit_id).await?;

    Ok(StatusResponse {
        success: deleted,
        message: if deleted {
            format!("🗑️ Deleted habit {} and its history", habit_id)
        } else {
            format!("No habit with id {}", habit_id)
        },
    })
}

pub async fn habit_history(
    app: &HappyDay,
    params: HabitHistoryParams,
) -> Result<HabitHistoryResponse, AppError> {
    let since = params
        .since
        .as_deref()
        .map(parse_date)
        .transpose()?
        .map(start_of_day);

    let (habit, entries) = app
        .habit_view_model(true)
        .habit_history(HabitId(params.habit_id), since)
        .await?;

    let message = format!("📈 '{}' done {} times", habit.name, entries.len());
    Ok(HabitHistoryResponse {
        habit: HabitSummary::from_habit(&habit, &entries),
        entries,
        message,
    })
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

async fn habit_change(app: &HappyDay, habit: Habit, message: String) -> Result<HabitChangeResponse, AppError> {
    let entries = app.habit_repository().get_all_habit_entries(habit.id).await?;
    tracing::debug!(
        "Habit {} changed: snoozed={}, archived={}",
        habit.id,
        habit.is_snoozed,
        habit.is_archived
    );
    Ok(HabitChangeResponse {
        success: true,
        habit: HabitSummary::from_habit(&habit, &entries),
        message,
    })
}
