/// End-to-end command workflows on a file-backed app
use chrono::{Duration, NaiveDate, NaiveDateTime};
use happy_day::commands::*;
use happy_day::*;
use tempfile::TempDir;

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 16)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

#[cfg(test)]
mod command_workflow_tests {
    use super::*;

    #[tokio::test]
    async fn test_diary_workflow() {
        let dir = TempDir::new().unwrap();
        let app = HappyDay::open(dir.path().join("diary.db")).expect("Failed to open app");
        let today = now().date();

        let written = write_entry(
            &app,
            WriteEntryParams {
                date: Some("2024-03-14".to_string()),
                for_myself: Some("Slept in".to_string()),
                abstinent: Some(true),
                ..Default::default()
            },
            today,
        )
        .await
        .unwrap();
        assert!(written.uid.is_persisted());

        let future = write_entry(
            &app,
            WriteEntryParams {
                date: Some("2024-03-20".to_string()),
                ..Default::default()
            },
            today,
        )
        .await;
        assert!(matches!(future, Err(AppError::Domain(_))));

        let shown = show_entry(
            &app,
            ShowEntryParams {
                date: Some("2024-03-14".to_string()),
                uid: None,
            },
            today,
        )
        .await
        .unwrap();
        assert!(shown.stored);
        assert_eq!(shown.entry.for_myself, "Slept in");

        let recent = recent_entries(&app).await.unwrap();
        assert_eq!(recent.entries.len(), 1);

        let month = month_entries(&app, MonthEntriesParams::default(), today).await.unwrap();
        assert_eq!(month.entries.len(), 1);
        let json = format_response(&month, true).unwrap();
        assert!(json.contains("\"month\": \"2024-03\""));

        let deleted = delete_entry(&app, DeleteEntryParams { uid: written.uid.0 }).await.unwrap();
        assert!(deleted.success);
        assert!(recent_entries(&app).await.unwrap().entries.is_empty());
    }

    #[tokio::test]
    async fn test_habit_workflow_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("habits.db");

        let habit_id = {
            let app = HappyDay::open(&path).unwrap();
            let created = create_habit(
                &app,
                CreateHabitParams {
                    name: "Water plants".to_string(),
                    every: Some("2d".to_string()),
                    ..Default::default()
                },
                now(),
            )
            .await
            .unwrap();
            mark_done(&app, HabitIdParams { habit_id: created.habit_id.0 }, now())
                .await
                .unwrap();
            created.habit_id
        };

        let app = HappyDay::open(&path).unwrap();
        let due = list_habits(&app, ListHabitsParams::default(), now()).await.unwrap();
        assert!(due.habits.is_empty());

        let later = now() + Duration::days(2);
        let due = list_habits(&app, ListHabitsParams::default(), later).await.unwrap();
        assert_eq!(due.habits.len(), 1);
        assert_eq!(due.habits[0].completions, 1);

        let history = habit_history(
            &app,
            HabitHistoryParams {
                habit_id: habit_id.0,
                since: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(history.entries.len(), 1);
        assert_eq!(history.entries[0].done_at, now());
    }

    #[tokio::test]
    async fn test_snooze_expires_on_refresh() {
        let dir = TempDir::new().unwrap();
        let app = HappyDay::open(dir.path().join("snooze.db")).unwrap();

        let created = create_habit(
            &app,
            CreateHabitParams {
                name: "Call parents".to_string(),
                ..Default::default()
            },
            now(),
        )
        .await
        .unwrap();

        snooze_habit(
            &app,
            SnoozeHabitParams {
                habit_id: created.habit_id.0,
                duration: 30,
                unit: Some("minutes".to_string()),
            },
            now(),
        )
        .await
        .unwrap();

        let due = list_habits(&app, ListHabitsParams::default(), now()).await.unwrap();
        assert!(due.habits.is_empty());

        let due = list_habits(&app, ListHabitsParams::default(), now() + Duration::minutes(31))
            .await
            .unwrap();
        assert_eq!(due.habits.len(), 1);
        assert!(!due.habits[0].is_snoozed);
    }
}
