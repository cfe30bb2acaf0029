//! Habit repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/read/update/delete plus the completion and bulk reset
//!   writes over the `habits` table.
//! - Offer a transaction boundary for multi-step operations such as
//!   pick-and-complete.
//!
//! # Invariants
//! - Mutations return the post-write row via `RETURNING`, so callers never
//!   observe a snapshot from a different statement.
//! - `reset_completed_today` is a single statement and therefore atomic.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::habit::{
    Frequency, Habit, HabitId, HabitPatch, HabitValidationError, NewHabit,
};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const HABIT_COLUMNS: &str = "id, name, description, frequency, streak, completed_today";

const REQUIRED_COLUMNS: [&str; 8] = [
    "id",
    "name",
    "description",
    "frequency",
    "streak",
    "completed_today",
    "created_at",
    "updated_at",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from habit persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(HabitValidationError),
    Db(DbError),
    /// Connection schema is not at the version this build expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "habit repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "habit repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "habit repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted habit data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HabitValidationError> for RepoError {
    fn from(value: HabitValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage operations consumed by the habit service.
pub trait HabitRepository {
    /// Inserts a habit with `streak = 0` and `completed_today = false`.
    fn create_habit(&self, habit: &NewHabit) -> RepoResult<Habit>;
    fn get_habit(&self, id: HabitId) -> RepoResult<Option<Habit>>;
    /// All habits ordered by id ascending.
    fn list_habits(&self) -> RepoResult<Vec<Habit>>;
    /// Applies the present fields of `patch`; `None` when `id` is absent.
    fn update_habit(&self, id: HabitId, patch: &HabitPatch) -> RepoResult<Option<Habit>>;
    /// Hard-deletes and returns the removed snapshot.
    fn delete_habit(&self, id: HabitId) -> RepoResult<Option<Habit>>;
    /// `streak += 1`, `completed_today = true`.
    fn complete_habit(&self, id: HabitId) -> RepoResult<Option<Habit>>;
    /// Same transition as [`HabitRepository::complete_habit`], applied only
    /// when the stored `completed_today` still equals `expected_completed_today`.
    ///
    /// Returns `None` when the row is gone or its flag changed.
    fn complete_habit_if(
        &self,
        id: HabitId,
        expected_completed_today: bool,
    ) -> RepoResult<Option<Habit>>;
    /// Clears `completed_today` on every row; returns rows touched.
    fn reset_completed_today(&self) -> RepoResult<usize>;
    /// Runs `f` inside a write transaction. Commits on `Ok`, rolls back on `Err`.
    fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        Self: Sized,
        E: From<RepoError>,
        F: FnOnce(&Self) -> Result<T, E>;
}

/// SQLite-backed habit repository borrowing a migrated connection.
pub struct SqliteHabitRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHabitRepository<'conn> {
    /// Creates a repository after checking the connection schema.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_habit_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_one(&self, sql: &str, params: impl rusqlite::Params) -> RepoResult<Option<Habit>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_habit_row(row)?)),
            None => Ok(None),
        }
    }
}

impl HabitRepository for SqliteHabitRepository<'_> {
    fn create_habit(&self, habit: &NewHabit) -> RepoResult<Habit> {
        let habit = habit.normalized()?;
        let created = self.query_one(
            &format!(
                "INSERT INTO habits (name, description, frequency, streak, completed_today)
                 VALUES (?1, ?2, ?3, 0, 0)
                 RETURNING {HABIT_COLUMNS};"
            ),
            params![
                habit.name.as_str(),
                habit.description.as_deref(),
                habit.frequency.as_str(),
            ],
        )?;

        created.ok_or_else(|| RepoError::InvalidData("insert returned no row".to_string()))
    }

    fn get_habit(&self, id: HabitId) -> RepoResult<Option<Habit>> {
        self.query_one(
            &format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?1;"),
            [id],
        )
    }

    fn list_habits(&self) -> RepoResult<Vec<Habit>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {HABIT_COLUMNS} FROM habits ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut habits = Vec::new();
        while let Some(row) = rows.next()? {
            habits.push(parse_habit_row(row)?);
        }
        Ok(habits)
    }

    fn update_habit(&self, id: HabitId, patch: &HabitPatch) -> RepoResult<Option<Habit>> {
        let patch = patch.normalized()?;
        if patch.is_empty() {
            return self.get_habit(id);
        }

        let (set_description, description) = match &patch.description {
            Some(value) => (true, value.as_deref()),
            None => (false, None),
        };

        self.query_one(
            &format!(
                "UPDATE habits
                 SET
                    name = COALESCE(?2, name),
                    description = CASE WHEN ?3 = 1 THEN ?4 ELSE description END,
                    frequency = COALESCE(?5, frequency),
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1
                 RETURNING {HABIT_COLUMNS};"
            ),
            params![
                id,
                patch.name.as_deref(),
                bool_to_int(set_description),
                description,
                patch.frequency.as_deref(),
            ],
        )
    }

    fn delete_habit(&self, id: HabitId) -> RepoResult<Option<Habit>> {
        self.query_one(
            &format!("DELETE FROM habits WHERE id = ?1 RETURNING {HABIT_COLUMNS};"),
            [id],
        )
    }

    fn complete_habit(&self, id: HabitId) -> RepoResult<Option<Habit>> {
        self.query_one(
            &format!(
                "UPDATE habits
                 SET
                    streak = streak + 1,
                    completed_today = 1,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1
                 RETURNING {HABIT_COLUMNS};"
            ),
            [id],
        )
    }

    fn complete_habit_if(
        &self,
        id: HabitId,
        expected_completed_today: bool,
    ) -> RepoResult<Option<Habit>> {
        self.query_one(
            &format!(
                "UPDATE habits
                 SET
                    streak = streak + 1,
                    completed_today = 1,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1
                   AND completed_today = ?2
                 RETURNING {HABIT_COLUMNS};"
            ),
            params![id, bool_to_int(expected_completed_today)],
        )
    }

    fn reset_completed_today(&self) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE habits
             SET
                completed_today = 0,
                updated_at = (strftime('%s', 'now') * 1000);",
            [],
        )?;
        Ok(changed)
    }

    fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<RepoError>,
        F: FnOnce(&Self) -> Result<T, E>,
    {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(|err| E::from(RepoError::from(err)))?;
        let value = f(self)?;
        tx.commit().map_err(|err| E::from(RepoError::from(err)))?;
        Ok(value)
    }
}

fn parse_habit_row(row: &Row<'_>) -> RepoResult<Habit> {
    let id: HabitId = row.get("id")?;

    let streak_raw: i64 = row.get("streak")?;
    let streak = u32::try_from(streak_raw).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid streak value `{streak_raw}` in habits.streak for id {id}"
        ))
    })?;

    let completed_today = match row.get::<_, i64>("completed_today")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid completed_today value `{other}` in habits.completed_today for id {id}"
            )));
        }
    };

    let frequency: String = row.get("frequency")?;

    Ok(Habit {
        id,
        name: row.get("name")?,
        description: row.get("description")?,
        frequency: Frequency::from(frequency),
        streak,
        completed_today,
    })
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_habit_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "habits")? {
        return Err(RepoError::MissingRequiredTable("habits"));
    }

    for column in REQUIRED_COLUMNS {
        if !table_has_column(conn, "habits", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "habits",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
