//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per entity.
//! - Keep SQL, transactions and relation bookkeeping inside this boundary.
//!
//! # Invariants
//! - Every multi-row write runs in one `BEGIN IMMEDIATE` transaction.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`) in
//!   addition to DB transport errors.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::user::ConflictField;
use crate::model::EntityKind;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod project_repo;
pub mod task_repo;
pub mod user_repo;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by all entity repositories.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound { entity: EntityKind, id: i64 },
    Conflict(Vec<ConflictField>),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Conflict(fields) => write!(f, "already taken: {}", join_fields(fields)),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
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

pub(crate) fn join_fields(fields: &[ConflictField]) -> String {
    fields
        .iter()
        .map(ConflictField::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Starts an immediate write transaction on a shared connection.
///
/// Repositories borrow `&Connection`, so the unchecked constructor is used;
/// callers must not nest these.
pub(crate) fn begin_write(conn: &Connection) -> RepoResult<Transaction<'_>> {
    Ok(Transaction::new_unchecked(
        conn,
        TransactionBehavior::Immediate,
    )?)
}

/// Checks that `conn` is migrated and carries `tables`.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    tables: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

/// Returns whether a row with `id` exists in `table`.
///
/// `table` must be a trusted identifier, never caller input.
pub(crate) fn row_exists(conn: &Connection, table: &'static str, id: i64) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1);"),
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn require_row(
    conn: &Connection,
    entity: EntityKind,
    id: i64,
) -> RepoResult<()> {
    let table = match entity {
        EntityKind::User => "users",
        EntityKind::Project => "projects",
        EntityKind::Task => "tasks",
    };
    if row_exists(conn, table, id)? {
        Ok(())
    } else {
        Err(RepoError::NotFound { entity, id })
    }
}

/// Collects the first column of every row returned by `sql` bound to `key`.
pub(crate) fn load_id_set(conn: &Connection, sql: &str, key: i64) -> RepoResult<BTreeSet<i64>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let mut rows = stmt.query([key])?;
    let mut ids = BTreeSet::new();
    while let Some(row) = rows.next()? {
        ids.insert(row.get::<_, i64>(0)?);
    }
    Ok(ids)
}

pub(crate) fn count_to_u64(count: i64) -> RepoResult<u64> {
    u64::try_from(count).map_err(|_| RepoError::InvalidData(format!("negative row count {count}")))
}

/// Escapes `%`, `_` and `\` so the term matches literally inside
/// `LIKE ... ESCAPE '\'`.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean `{other}` in {column}"
        ))),
    }
}

pub(crate) fn date_to_db(date: Option<NaiveDate>) -> Option<String> {
    date.map(|value| value.format(DATE_FORMAT).to_string())
}

pub(crate) fn parse_date(value: Option<String>, column: &str) -> RepoResult<Option<NaiveDate>> {
    value
        .map(|text| {
            NaiveDate::parse_from_str(&text, DATE_FORMAT).map_err(|_| {
                RepoError::InvalidData(format!("invalid date `{text}` in {column}"))
            })
        })
        .transpose()
}

pub(crate) fn instant_to_db(instant: Option<DateTime<Utc>>) -> Option<i64> {
    instant.map(|value| value.timestamp_millis())
}

pub(crate) fn parse_instant(value: Option<i64>, column: &str) -> RepoResult<Option<DateTime<Utc>>> {
    value
        .map(|millis| {
            DateTime::from_timestamp_millis(millis).ok_or_else(|| {
                RepoError::InvalidData(format!("invalid timestamp `{millis}` in {column}"))
            })
        })
        .transpose()
}
