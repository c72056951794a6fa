//! SQLite bootstrap for the taskboard schema.
//!
//! # Responsibility
//! - Open connections and apply the `users`/`projects`/`tasks`/
//!   `project_members` migrations in version order.
//! - Register the SQL functions the repositories rely on.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Repositories refuse connections that are not at the latest version.
//! - `fold(text)` lowercases with full Unicode case mapping, so
//!   `fold(a) LIKE fold(b)` is case-insensitive beyond ASCII.

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, open_db_with_config};

pub type DbResult<T> = Result<T, DbError>;

/// Name of the Unicode case-folding scalar function.
pub const FOLD_FUNCTION: &str = "fold";

/// Registers the scalar functions used by repository queries.
pub fn register_sql_functions(conn: &Connection) -> DbResult<()> {
    conn.create_scalar_function(
        FOLD_FUNCTION,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|value| value.to_lowercase()))
        },
    )?;
    Ok(())
}

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

#[cfg(test)]
mod tests {
    use super::register_sql_functions;
    use rusqlite::Connection;

    #[test]
    fn fold_lowercases_unicode_and_passes_null() {
        let conn = Connection::open_in_memory().unwrap();
        register_sql_functions(&conn).unwrap();

        let folded: String = conn
            .query_row("SELECT fold('ÜBER Straße ÉTÉ');", [], |row| row.get(0))
            .unwrap();
        assert_eq!(folded, "über straße été");

        let null: Option<String> = conn
            .query_row("SELECT fold(NULL);", [], |row| row.get(0))
            .unwrap();
        assert_eq!(null, None);
    }
}
