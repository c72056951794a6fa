//! User repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist users and enforce username/email uniqueness atomically.
//! - Hydrate the derived relation sets (owned, member-of, assigned).
//! - Run the user delete cascade.
//!
//! # Invariants
//! - Uniqueness checks and the write they guard share one transaction.
//! - Both unique fields are checked before reporting, so a conflict lists
//!   every violated field.
//! - Deleting a user removes owned projects (and their tasks), clears the
//!   user's task assignments and drops the user's membership rows.

use crate::model::page::{Page, PageRequest};
use crate::model::user::{ConflictField, NewUser, User, UserPatch, UserRole};
use crate::model::{EntityKind, ProjectId, UserId};
use crate::repo::project_repo::purge_project;
use crate::repo::{
    begin_write, bool_to_int, count_to_u64, ensure_connection_ready, int_to_bool, load_id_set,
    require_row, RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Params, Row};

const USER_SELECT_SQL: &str = "SELECT
    u.id,
    u.username,
    u.email,
    u.full_name,
    u.password_hash,
    u.role,
    u.enabled,
    u.created_at,
    u.updated_at
FROM users u";

const OWNED_PROJECTS_SQL: &str = "SELECT id FROM projects WHERE owner_id = ?1;";
const MEMBER_PROJECTS_SQL: &str = "SELECT project_id FROM project_members WHERE user_id = ?1;";
const ASSIGNED_TASKS_SQL: &str = "SELECT id FROM tasks WHERE assignee_id = ?1;";

/// Summary of rows removed by a user delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserDeleteOutcome {
    pub projects_deleted: usize,
    pub tasks_deleted: usize,
    pub tasks_unassigned: usize,
}

/// Repository interface for user persistence.
pub trait UserRepository {
    /// Inserts a user after checking both unique fields.
    fn create_user(&self, user: &NewUser) -> RepoResult<UserId>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// Lists users ordered by id.
    fn list_users(&self, page: &PageRequest) -> RepoResult<Page<User>>;
    fn list_by_role(&self, role: UserRole) -> RepoResult<Vec<User>>;
    /// Lists users holding a membership row for `project_id`.
    fn list_project_members(&self, project_id: ProjectId) -> RepoResult<Vec<User>>;
    /// Applies `patch` to the stored row inside one write transaction,
    /// rejecting an email held by another user. Returns whether the email
    /// changed.
    fn update_user(&self, id: UserId, patch: &UserPatch) -> RepoResult<bool>;
    fn delete_user(&self, id: UserId) -> RepoResult<UserDeleteOutcome>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["users", "projects", "project_members", "tasks"])?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &NewUser) -> RepoResult<UserId> {
        let tx = begin_write(self.conn)?;
        let taken = taken_fields(&tx, Some(&user.username), Some(&user.email), None)?;
        if !taken.is_empty() {
            return Err(RepoError::Conflict(taken));
        }

        tx.execute(
            "INSERT INTO users (
                username,
                email,
                full_name,
                password_hash,
                role,
                enabled
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                user.username.as_str(),
                user.email.as_str(),
                user.full_name.as_str(),
                user.password_hash.as_str(),
                user.role.as_str(),
                bool_to_int(user.enabled),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        query_one_user(
            self.conn,
            &format!("{USER_SELECT_SQL} WHERE u.id = ?1;"),
            [id],
        )
    }

    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        query_one_user(
            self.conn,
            &format!("{USER_SELECT_SQL} WHERE u.username = ?1;"),
            [username],
        )
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        query_one_user(
            self.conn,
            &format!("{USER_SELECT_SQL} WHERE u.email = ?1;"),
            [email],
        )
    }

    fn list_users(&self, page: &PageRequest) -> RepoResult<Page<User>> {
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))?;
        let applied_limit = page.applied_limit();
        let items = query_users(
            self.conn,
            &format!("{USER_SELECT_SQL} ORDER BY u.id ASC LIMIT ?1 OFFSET ?2;"),
            params![i64::from(applied_limit), i64::from(page.offset)],
        )?;
        Ok(Page {
            items,
            total: count_to_u64(total)?,
            applied_limit,
            offset: page.offset,
        })
    }

    fn list_by_role(&self, role: UserRole) -> RepoResult<Vec<User>> {
        query_users(
            self.conn,
            &format!("{USER_SELECT_SQL} WHERE u.role = ?1 ORDER BY u.id ASC;"),
            [role.as_str()],
        )
    }

    fn list_project_members(&self, project_id: ProjectId) -> RepoResult<Vec<User>> {
        query_users(
            self.conn,
            &format!(
                "{USER_SELECT_SQL}
                 INNER JOIN project_members pm ON pm.user_id = u.id
                 WHERE pm.project_id = ?1
                 ORDER BY u.id ASC;"
            ),
            [project_id],
        )
    }

    fn update_user(&self, id: UserId, patch: &UserPatch) -> RepoResult<bool> {
        let tx = begin_write(self.conn)?;
        let mut user = query_one_user(&tx, &format!("{USER_SELECT_SQL} WHERE u.id = ?1;"), [id])?
            .ok_or(RepoError::NotFound {
                entity: EntityKind::User,
                id,
            })?;
        let email_changed = patch.changed_email(&user).is_some();
        patch.apply_to(&mut user);

        if email_changed {
            let taken = taken_fields(&tx, None, Some(&user.email), Some(id))?;
            if !taken.is_empty() {
                return Err(RepoError::Conflict(taken));
            }
        }

        tx.execute(
            "UPDATE users
             SET
                full_name = ?2,
                email = ?3,
                enabled = ?4,
                role = ?5,
                updated_at = MAX(updated_at + 1, CAST(unixepoch('subsec') * 1000 AS INTEGER))
             WHERE id = ?1;",
            params![
                id,
                user.full_name.as_str(),
                user.email.as_str(),
                bool_to_int(user.enabled),
                user.role.as_str(),
            ],
        )?;
        tx.commit()?;
        Ok(email_changed)
    }

    fn delete_user(&self, id: UserId) -> RepoResult<UserDeleteOutcome> {
        let tx = begin_write(self.conn)?;
        require_row(&tx, EntityKind::User, id)?;

        let mut outcome = UserDeleteOutcome::default();
        for project_id in load_id_set(&tx, OWNED_PROJECTS_SQL, id)? {
            outcome.tasks_deleted += purge_project(&tx, project_id)?;
            outcome.projects_deleted += 1;
        }

        outcome.tasks_unassigned = tx.execute(
            "UPDATE tasks
             SET assignee_id = NULL,
                 updated_at = MAX(updated_at + 1, CAST(unixepoch('subsec') * 1000 AS INTEGER))
             WHERE assignee_id = ?1;",
            [id],
        )?;
        tx.execute("DELETE FROM project_members WHERE user_id = ?1;", [id])?;
        tx.execute("DELETE FROM users WHERE id = ?1;", [id])?;

        tx.commit()?;
        Ok(outcome)
    }
}

/// Returns the unique fields already held by a user other than `exclude_id`.
fn taken_fields(
    conn: &Connection,
    username: Option<&str>,
    email: Option<&str>,
    exclude_id: Option<UserId>,
) -> RepoResult<Vec<ConflictField>> {
    let mut taken = Vec::new();
    if let Some(username) = username {
        if value_taken(conn, "username", username, exclude_id)? {
            taken.push(ConflictField::Username);
        }
    }
    if let Some(email) = email {
        if value_taken(conn, "email", email, exclude_id)? {
            taken.push(ConflictField::Email);
        }
    }
    Ok(taken)
}

fn value_taken(
    conn: &Connection,
    column: &'static str,
    value: &str,
    exclude_id: Option<UserId>,
) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(
                SELECT 1
                FROM users
                WHERE {column} = ?1
                  AND (?2 IS NULL OR id != ?2)
            );"
        ),
        params![value, exclude_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn query_one_user<P: Params>(conn: &Connection, sql: &str, params: P) -> RepoResult<Option<User>> {
    let user = conn
        .query_row(sql, params, |row| Ok(parse_user_row(row)))
        .optional()?
        .transpose()?;
    match user {
        Some(mut user) => {
            hydrate_relations(conn, &mut user)?;
            Ok(Some(user))
        }
        None => Ok(None),
    }
}

fn query_users<P: Params>(conn: &Connection, sql: &str, params: P) -> RepoResult<Vec<User>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut users = Vec::new();
    while let Some(row) = rows.next()? {
        users.push(parse_user_row(row)?);
    }
    for user in &mut users {
        hydrate_relations(conn, user)?;
    }
    Ok(users)
}

fn hydrate_relations(conn: &Connection, user: &mut User) -> RepoResult<()> {
    user.owned_project_ids = load_id_set(conn, OWNED_PROJECTS_SQL, user.id)?;
    user.member_project_ids = load_id_set(conn, MEMBER_PROJECTS_SQL, user.id)?;
    user.assigned_task_ids = load_id_set(conn, ASSIGNED_TASKS_SQL, user.id)?;
    Ok(())
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let role_text: String = row.get("role")?;
    let role = UserRole::parse(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in users.role"))
    })?;

    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        email: row.get("email")?,
        full_name: row.get("full_name")?,
        password_hash: row.get("password_hash")?,
        role,
        enabled: int_to_bool(row.get("enabled")?, "users.enabled")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        owned_project_ids: Default::default(),
        member_project_ids: Default::default(),
        assigned_task_ids: Default::default(),
    })
}
