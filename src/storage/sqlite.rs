/// SQLite implementation of the storage interfaces
///
/// This module provides the concrete SQLite implementation for storing and
/// retrieving diary entries, habits and habit entries. It handles all SQL
/// queries and the conversion between rows and domain types.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::{
    format_datetime, parse_datetime, DiaryEntry, DiaryEntryId, DomainError, EntryId, Habit,
    HabitEntry, HabitId, SnoozeUnit, YearMonth,
};
use crate::storage::{migrations, DiaryEntryDao, HabitDao, StorageError, MOST_RECENT_LIMIT};

const DIARY_COLUMNS: &str = "uid, entry_date, abstinent, exercised, for_myself, for_others, \
     unexpressed_emotions, something_good, anticipation";

const HABIT_COLUMNS: &str = "id, name, description, create_date_time, next_due_date_time, \
     priority, seconds_until_next, is_favourite, is_archived, is_deleted, is_snoozed, \
     snooze_date_time, snooze_duration, snooze_duration_unit, snooze_count";

/// Active-list filter shared by both habit queries
const ACTIVE_HABITS_FILTER: &str =
    "is_archived = 0 AND is_deleted = 0 AND next_due_date_time <= ?1";

const ACTIVE_HABITS_ORDER: &str = "ORDER BY is_favourite DESC, priority DESC, id ASC";

/// SQLite-based storage implementation
///
/// This struct holds a single connection to the database. The connection
/// sits behind a mutex so the storage can be shared between async tasks;
/// SQLite serializes the writes themselves.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    ///
    /// This opens the database file and runs any necessary migrations
    /// to ensure the schema is up to date.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db_path = db_path.as_ref();
        let conn = Connection::open(db_path)
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;

        let storage = Self::from_connection(conn)?;
        tracing::info!("SQLite storage initialized at: {:?}", db_path);
        Ok(storage)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        // Habit entries rely on ON DELETE CASCADE
        conn.execute("PRAGMA foreign_keys = ON", [])
            .map_err(|e| StorageError::Connection(format!("Failed to enable foreign keys: {}", e)))?;

        migrations::initialize_database(&conn)?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Connection("Database connection lock poisoned".to_string()))
    }

    fn query_diary_entries(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<DiaryEntry>, StorageError> {
        let mut stmt = conn.prepare(sql)?;
        let entry_iter = stmt.query_map(params, diary_entry_from_row)?;

        let mut entries = Vec::new();
        for entry in entry_iter {
            entries.push(entry?);
        }
        Ok(entries)
    }

    fn query_habits(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Habit>, StorageError> {
        let mut stmt = conn.prepare(sql)?;
        let habit_iter = stmt.query_map(params, habit_from_row)?;

        let mut habits = Vec::new();
        for habit in habit_iter {
            habits.push(habit?);
        }
        Ok(habits)
    }

    fn query_habit_entries(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<HabitEntry>, StorageError> {
        let mut stmt = conn.prepare(sql)?;
        let entry_iter = stmt.query_map(params, habit_entry_from_row)?;

        let mut entries = Vec::new();
        for entry in entry_iter {
            entries.push(entry?);
        }
        Ok(entries)
    }

    fn get_habit_with(conn: &Connection, habit_id: HabitId) -> Result<Option<Habit>, StorageError> {
        let habit = conn
            .query_row(
                &format!("SELECT {} FROM habit WHERE id = ?1", HABIT_COLUMNS),
                params![habit_id.0],
                habit_from_row,
            )
            .optional()?;
        Ok(habit)
    }

    /// Upsert one habit on an open connection or transaction
    ///
    /// Existing rows are updated in place rather than replaced, so the
    /// cascade never wipes a habit's entries when it is saved again.
    fn upsert_habit(conn: &Connection, habit: &Habit) -> Result<HabitId, StorageError> {
        let id = habit.id.is_persisted().then_some(habit.id.0);

        conn.execute(
            "INSERT INTO habit (
                id, name, description, create_date_time, next_due_date_time, priority,
                seconds_until_next, is_favourite, is_archived, is_deleted, is_snoozed,
                snooze_date_time, snooze_duration, snooze_duration_unit, snooze_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                create_date_time = excluded.create_date_time,
                next_due_date_time = excluded.next_due_date_time,
                priority = excluded.priority,
                seconds_until_next = excluded.seconds_until_next,
                is_favourite = excluded.is_favourite,
                is_archived = excluded.is_archived,
                is_deleted = excluded.is_deleted,
                is_snoozed = excluded.is_snoozed,
                snooze_date_time = excluded.snooze_date_time,
                snooze_duration = excluded.snooze_duration,
                snooze_duration_unit = excluded.snooze_duration_unit,
                snooze_count = excluded.snooze_count",
            params![
                id,
                habit.name,
                habit.description,
                format_datetime(&habit.created_at),
                format_datetime(&habit.next_due_at),
                habit.priority,
                habit.seconds_until_next,
                habit.is_favourite,
                habit.is_archived,
                habit.is_deleted,
                habit.is_snoozed,
                habit.snoozed_until.as_ref().map(format_datetime),
                habit.snooze_duration,
                habit.snooze_unit.as_str(),
                habit.snooze_count,
            ],
        )?;

        // last_insert_rowid is untouched when the upsert took the update path
        Ok(match id {
            Some(existing) => HabitId(existing),
            None => HabitId(conn.last_insert_rowid()),
        })
    }
}

/// Turn a domain parse failure into a rusqlite column error
fn conversion_error(idx: usize, err: DomainError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn datetime_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let value: String = row.get(idx)?;
    parse_datetime(&value).map_err(|e| conversion_error(idx, e))
}

fn diary_entry_from_row(row: &Row<'_>) -> rusqlite::Result<DiaryEntry> {
    Ok(DiaryEntry {
        uid: DiaryEntryId(row.get(0)?),
        entry_date: row.get::<_, NaiveDate>(1)?,
        abstinent: row.get(2)?,
        exercised: row.get(3)?,
        for_myself: row.get(4)?,
        for_others: row.get(5)?,
        unexpressed_emotions: row.get(6)?,
        something_good: row.get(7)?,
        anticipation: row.get(8)?,
    })
}

fn habit_from_row(row: &Row<'_>) -> rusqlite::Result<Habit> {
    let snoozed_until: Option<String> = row.get(11)?;
    let snoozed_until = snoozed_until
        .map(|value| parse_datetime(&value).map_err(|e| conversion_error(11, e)))
        .transpose()?;
    let snooze_unit: String = row.get(13)?;

    Ok(Habit {
        id: HabitId(row.get(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: datetime_column(row, 3)?,
        next_due_at: datetime_column(row, 4)?,
        priority: row.get(5)?,
        seconds_until_next: row.get(6)?,
        is_favourite: row.get(7)?,
        is_archived: row.get(8)?,
        is_deleted: row.get(9)?,
        is_snoozed: row.get(10)?,
        snoozed_until,
        snooze_duration: row.get(12)?,
        snooze_unit: SnoozeUnit::from_stored(&snooze_unit),
        snooze_count: row.get(14)?,
    })
}

fn habit_entry_from_row(row: &Row<'_>) -> rusqlite::Result<HabitEntry> {
    Ok(HabitEntry::from_existing(
        EntryId(row.get(0)?),
        HabitId(row.get(1)?),
        datetime_column(row, 2)?,
    ))
}

impl DiaryEntryDao for SqliteStorage {
    fn get_diary_entry_by_uid(&self, uid: DiaryEntryId) -> Result<Option<DiaryEntry>, StorageError> {
        let conn = self.conn()?;
        let entry = conn
            .query_row(
                &format!("SELECT {} FROM diary_entry WHERE uid = ?1", DIARY_COLUMNS),
                params![uid.0],
                diary_entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    fn get_diary_entry_by_date(&self, entry_date: NaiveDate) -> Result<Option<DiaryEntry>, StorageError> {
        let conn = self.conn()?;
        let entry = conn
            .query_row(
                &format!("SELECT {} FROM diary_entry WHERE entry_date = ?1", DIARY_COLUMNS),
                params![entry_date],
                diary_entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    fn get_diary_entries_most_recent(&self) -> Result<Vec<DiaryEntry>, StorageError> {
        let conn = self.conn()?;
        Self::query_diary_entries(
            &conn,
            &format!(
                "SELECT {} FROM diary_entry ORDER BY entry_date DESC LIMIT ?1",
                DIARY_COLUMNS
            ),
            params![MOST_RECENT_LIMIT as i64],
        )
    }

    fn get_diary_entries_by_month(&self, month: YearMonth) -> Result<Vec<DiaryEntry>, StorageError> {
        let conn = self.conn()?;
        Self::query_diary_entries(
            &conn,
            &format!(
                "SELECT {} FROM diary_entry WHERE strftime('%Y-%m', entry_date) = ?1 \
                 ORDER BY entry_date ASC",
                DIARY_COLUMNS
            ),
            params![month.to_string()],
        )
    }

    fn get_all_diary_entries(&self) -> Result<Vec<DiaryEntry>, StorageError> {
        let conn = self.conn()?;
        Self::query_diary_entries(
            &conn,
            &format!("SELECT {} FROM diary_entry ORDER BY entry_date ASC", DIARY_COLUMNS),
            [],
        )
    }

    fn insert_diary_entry(&self, entry: &DiaryEntry) -> Result<DiaryEntryId, StorageError> {
        let conn = self.conn()?;
        let uid = entry.uid.is_persisted().then_some(entry.uid.0);

        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO diary_entry ({}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                DIARY_COLUMNS
            ),
            params![
                uid,
                entry.entry_date,
                entry.abstinent,
                entry.exercised,
                entry.for_myself,
                entry.for_others,
                entry.unexpressed_emotions,
                entry.something_good,
                entry.anticipation,
            ],
        )?;

        let stored = DiaryEntryId(conn.last_insert_rowid());
        tracing::debug!("Stored diary entry {} for {}", stored, entry.entry_date_formatted());
        Ok(stored)
    }

    fn delete_diary_entry_by_uid(&self, uid: DiaryEntryId) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        let rows_affected = conn.execute("DELETE FROM diary_entry WHERE uid = ?1", params![uid.0])?;

        tracing::debug!("Deleted diary entry {} ({} rows)", uid, rows_affected);
        Ok(rows_affected > 0)
    }
}

impl HabitDao for SqliteStorage {
    fn get_habit(&self, habit_id: HabitId) -> Result<Option<Habit>, StorageError> {
        let conn = self.conn()?;
        Self::get_habit_with(&conn, habit_id)
    }

    fn get_all_habits(&self, now: NaiveDateTime) -> Result<Vec<Habit>, StorageError> {
        let conn = self.conn()?;
        Self::query_habits(
            &conn,
            &format!(
                "SELECT {} FROM habit WHERE {} {}",
                HABIT_COLUMNS, ACTIVE_HABITS_FILTER, ACTIVE_HABITS_ORDER
            ),
            params![format_datetime(&now)],
        )
    }

    fn get_all_habits_not_snoozed(&self, now: NaiveDateTime) -> Result<Vec<Habit>, StorageError> {
        let conn = self.conn()?;
        Self::query_habits(
            &conn,
            &format!(
                "SELECT {} FROM habit WHERE {} AND is_snoozed = 0 {}",
                HABIT_COLUMNS, ACTIVE_HABITS_FILTER, ACTIVE_HABITS_ORDER
            ),
            params![format_datetime(&now)],
        )
    }

    fn list_habits(&self) -> Result<Vec<Habit>, StorageError> {
        let conn = self.conn()?;
        Self::query_habits(
            &conn,
            &format!(
                "SELECT {} FROM habit WHERE is_deleted = 0 {}",
                HABIT_COLUMNS, ACTIVE_HABITS_ORDER
            ),
            [],
        )
    }

    fn insert_habit(&self, habit: &Habit) -> Result<HabitId, StorageError> {
        let conn = self.conn()?;
        let habit_id = Self::upsert_habit(&conn, habit)?;

        tracing::debug!("Stored habit: {} ({})", habit.name, habit_id);
        Ok(habit_id)
    }

    fn insert_habits(&self, habits: &[Habit]) -> Result<Vec<HabitId>, StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut ids = Vec::with_capacity(habits.len());
        for habit in habits {
            ids.push(Self::upsert_habit(&tx, habit)?);
        }
        tx.commit()?;

        tracing::debug!("Stored {} habits", ids.len());
        Ok(ids)
    }

    fn update_habit(&self, habit: &Habit) -> Result<(), StorageError> {
        let conn = self.conn()?;
        if Self::get_habit_with(&conn, habit.id)?.is_none() {
            return Err(StorageError::HabitNotFound {
                habit_id: habit.id.to_string(),
            });
        }

        Self::upsert_habit(&conn, habit)?;
        tracing::debug!("Updated habit: {} ({})", habit.name, habit.id);
        Ok(())
    }

    fn delete_habit(&self, habit_id: HabitId) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        let rows_affected = conn.execute("DELETE FROM habit WHERE id = ?1", params![habit_id.0])?;

        tracing::debug!("Deleted habit {} ({} rows)", habit_id, rows_affected);
        Ok(rows_affected > 0)
    }

    fn delete_habits(&self, habit_ids: &[HabitId]) -> Result<usize, StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut deleted = 0;
        for habit_id in habit_ids {
            deleted += tx.execute("DELETE FROM habit WHERE id = ?1", params![habit_id.0])?;
        }
        tx.commit()?;

        Ok(deleted)
    }

    fn mark_habit_as_done(&self, habit_id: HabitId, now: NaiveDateTime) -> Result<HabitEntry, StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut habit = Self::get_habit_with(&tx, habit_id)?.ok_or_else(|| {
            StorageError::HabitNotFound {
                habit_id: habit_id.to_string(),
            }
        })?;

        let done_when = format_datetime(&now);
        let repeated = tx
            .query_row(
                "SELECT 1 FROM habit_entry WHERE habit_id = ?1 AND done_when = ?2",
                params![habit_id.0, done_when],
                |_| Ok(()),
            )
            .optional()?;
        if repeated.is_some() {
            return Err(StorageError::AlreadyDone {
                habit_id: habit_id.to_string(),
                done_at: done_when,
            });
        }
        habit.mark_done(now);

        tx.execute(
            "UPDATE habit SET next_due_date_time = ?2 WHERE id = ?1",
            params![habit_id.0, format_datetime(&habit.next_due_at)],
        )?;
        tx.execute(
            "INSERT INTO habit_entry (habit_id, done_when) VALUES (?1, ?2)",
            params![habit_id.0, done_when],
        )?;
        let entry = HabitEntry::from_existing(EntryId(tx.last_insert_rowid()), habit_id, now);

        tx.commit()?;

        tracing::debug!(
            "Marked habit {} as done, next due {}",
            habit_id,
            format_datetime(&habit.next_due_at)
        );
        Ok(entry)
    }

    fn get_all_habit_entries(&self, habit_id: HabitId) -> Result<Vec<HabitEntry>, StorageError> {
        let conn = self.conn()?;
        Self::query_habit_entries(
            &conn,
            "SELECT id, habit_id, done_when FROM habit_entry
             WHERE habit_id = ?1
             ORDER BY done_when ASC, id ASC",
            params![habit_id.0],
        )
    }

    fn get_habit_entries_after(
        &self,
        habit_id: HabitId,
        after: NaiveDateTime,
    ) -> Result<Vec<HabitEntry>, StorageError> {
        let conn = self.conn()?;
        Self::query_habit_entries(
            &conn,
            "SELECT id, habit_id, done_when FROM habit_entry
             WHERE habit_id = ?1 AND done_when > ?2
             ORDER BY done_when ASC, id ASC",
            params![habit_id.0, format_datetime(&after)],
        )
    }

    fn delete_most_recent_habit_entry(&self, habit_id: HabitId) -> Result<Option<HabitEntry>, StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let newest = tx
            .query_row(
                "SELECT id, habit_id, done_when FROM habit_entry
                 WHERE habit_id = ?1
                 ORDER BY done_when DESC, id DESC
                 LIMIT 1",
                params![habit_id.0],
                habit_entry_from_row,
            )
            .optional()?;

        if let Some(ref entry) = newest {
            tx.execute("DELETE FROM habit_entry WHERE id = ?1", params![entry.id.0])?;
            tracing::debug!("Deleted habit entry {} of habit {}", entry.id, habit_id);
        }
        tx.commit()?;

        Ok(newest)
    }

    fn release_expired_snoozes(&self, now: NaiveDateTime) -> Result<usize, StorageError> {
        let conn = self.conn()?;
        let released = conn.execute(
            "UPDATE habit SET is_snoozed = 0, snooze_date_time = NULL
             WHERE is_snoozed = 1
               AND snooze_date_time IS NOT NULL
               AND snooze_date_time <= ?1",
            params![format_datetime(&now)],
        )?;

        if released > 0 {
            tracing::debug!("Released {} expired snoozes", released);
        }
        Ok(released)
    }
}
