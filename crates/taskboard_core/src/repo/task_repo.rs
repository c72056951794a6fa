//! Task repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist tasks and the `tasks.assignee_id` relation.
//! - Provide the filtered, searched and paginated task views.
//!
//! # Invariants
//! - Due dates are stored as epoch milliseconds.
//! - Assignment verifies task and user inside one write transaction.

use crate::model::page::{Page, PageRequest};
use crate::model::task::{NewTask, Task, TaskChanges, TaskPriority, TaskStatus};
use crate::model::{EntityKind, ProjectId, TaskId, UserId};
use crate::repo::{
    begin_write, count_to_u64, ensure_connection_ready, instant_to_db, like_pattern,
    parse_instant, require_row, RepoError, RepoResult,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Params, Row};

const TASK_SELECT_SQL: &str = "SELECT
    t.id,
    t.title,
    t.description,
    t.status,
    t.priority,
    t.due_date,
    t.project_id,
    t.assignee_id,
    t.created_at,
    t.updated_at
FROM tasks t";

/// Repository interface for task persistence.
pub trait TaskRepository {
    /// Inserts a normalized task. The project reference is enforced by the
    /// schema only.
    fn create_task(&self, task: &NewTask) -> RepoResult<TaskId>;
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    fn list_tasks(&self) -> RepoResult<Vec<Task>>;
    fn list_by_project(&self, project_id: ProjectId) -> RepoResult<Vec<Task>>;
    fn list_by_assignee(&self, assignee_id: UserId) -> RepoResult<Vec<Task>>;
    fn list_by_status(&self, status: TaskStatus, page: &PageRequest) -> RepoResult<Page<Task>>;
    fn list_by_project_and_status(
        &self,
        project_id: ProjectId,
        status: TaskStatus,
    ) -> RepoResult<Vec<Task>>;
    /// Tasks with a due date strictly before `instant`, earliest first.
    fn list_due_before(&self, instant: DateTime<Utc>, page: &PageRequest)
        -> RepoResult<Page<Task>>;
    /// Tasks of `assignee_id` past due at `now` and not `DONE`.
    fn list_overdue_for_assignee(
        &self,
        assignee_id: UserId,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<Task>>;
    fn count_by_project_and_status(
        &self,
        project_id: ProjectId,
        status: TaskStatus,
    ) -> RepoResult<u64>;
    /// Case-insensitive substring match on the title.
    fn search_by_title(&self, term: &str, page: &PageRequest) -> RepoResult<Page<Task>>;
    /// Replaces every descriptive column.
    fn update_task(&self, id: TaskId, changes: &TaskChanges) -> RepoResult<()>;
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;
    /// Sets or clears the assignee and returns the previous one.
    fn assign_task(&self, id: TaskId, assignee_id: Option<UserId>) -> RepoResult<Option<UserId>>;
    fn set_status(&self, id: TaskId, status: TaskStatus) -> RepoResult<()>;
    fn set_priority(&self, id: TaskId, priority: TaskPriority) -> RepoResult<()>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["users", "projects", "tasks"])?;
        Ok(Self { conn })
    }

    fn paged(
        &self,
        filter_sql: &str,
        order_sql: &str,
        filter_value: &dyn rusqlite::ToSql,
        page: &PageRequest,
    ) -> RepoResult<Page<Task>> {
        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM tasks t WHERE {filter_sql};"),
            [filter_value],
            |row| row.get(0),
        )?;
        let applied_limit = page.applied_limit();
        let items = query_tasks(
            self.conn,
            &format!(
                "{TASK_SELECT_SQL}
                 WHERE {filter_sql}
                 ORDER BY {order_sql}
                 LIMIT ?2 OFFSET ?3;"
            ),
            params![
                filter_value,
                i64::from(applied_limit),
                i64::from(page.offset)
            ],
        )?;
        Ok(Page {
            items,
            total: count_to_u64(total)?,
            applied_limit,
            offset: page.offset,
        })
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(&self, task: &NewTask) -> RepoResult<TaskId> {
        self.conn.execute(
            "INSERT INTO tasks (
                title,
                description,
                status,
                priority,
                due_date,
                project_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                task.title.as_str(),
                task.description.as_deref(),
                task.status.as_str(),
                task.priority.as_str(),
                instant_to_db(task.due_date),
                task.project_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        self.conn
            .query_row(
                &format!("{TASK_SELECT_SQL} WHERE t.id = ?1;"),
                [id],
                |row| Ok(parse_task_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        query_tasks(
            self.conn,
            &format!("{TASK_SELECT_SQL} ORDER BY t.id ASC;"),
            [],
        )
    }

    fn list_by_project(&self, project_id: ProjectId) -> RepoResult<Vec<Task>> {
        query_tasks(
            self.conn,
            &format!("{TASK_SELECT_SQL} WHERE t.project_id = ?1 ORDER BY t.id ASC;"),
            [project_id],
        )
    }

    fn list_by_assignee(&self, assignee_id: UserId) -> RepoResult<Vec<Task>> {
        query_tasks(
            self.conn,
            &format!("{TASK_SELECT_SQL} WHERE t.assignee_id = ?1 ORDER BY t.id ASC;"),
            [assignee_id],
        )
    }

    fn list_by_status(&self, status: TaskStatus, page: &PageRequest) -> RepoResult<Page<Task>> {
        self.paged("t.status = ?1", "t.id ASC", &status.as_str(), page)
    }

    fn list_by_project_and_status(
        &self,
        project_id: ProjectId,
        status: TaskStatus,
    ) -> RepoResult<Vec<Task>> {
        query_tasks(
            self.conn,
            &format!(
                "{TASK_SELECT_SQL}
                 WHERE t.project_id = ?1 AND t.status = ?2
                 ORDER BY t.id ASC;"
            ),
            params![project_id, status.as_str()],
        )
    }

    fn list_due_before(
        &self,
        instant: DateTime<Utc>,
        page: &PageRequest,
    ) -> RepoResult<Page<Task>> {
        self.paged(
            "t.due_date IS NOT NULL AND t.due_date < ?1",
            "t.due_date ASC, t.id ASC",
            &instant.timestamp_millis(),
            page,
        )
    }

    fn list_overdue_for_assignee(
        &self,
        assignee_id: UserId,
        now: DateTime<Utc>,
    ) -> RepoResult<Vec<Task>> {
        query_tasks(
            self.conn,
            &format!(
                "{TASK_SELECT_SQL}
                 WHERE t.assignee_id = ?1
                   AND t.due_date IS NOT NULL
                   AND t.due_date < ?2
                   AND t.status != ?3
                 ORDER BY t.due_date ASC, t.id ASC;"
            ),
            params![
                assignee_id,
                now.timestamp_millis(),
                TaskStatus::Done.as_str()
            ],
        )
    }

    fn count_by_project_and_status(
        &self,
        project_id: ProjectId,
        status: TaskStatus,
    ) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE project_id = ?1 AND status = ?2;",
            params![project_id, status.as_str()],
            |row| row.get(0),
        )?;
        count_to_u64(count)
    }

    fn search_by_title(&self, term: &str, page: &PageRequest) -> RepoResult<Page<Task>> {
        let pattern = like_pattern(term);
        self.paged("fold(t.title) LIKE fold(?1) ESCAPE '\\'", "t.id ASC", &pattern, page)
    }

    fn update_task(&self, id: TaskId, changes: &TaskChanges) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                title = ?2,
                description = ?3,
                status = ?4,
                priority = ?5,
                due_date = ?6,
                updated_at = MAX(updated_at + 1, CAST(unixepoch('subsec') * 1000 AS INTEGER))
             WHERE id = ?1;",
            params![
                id,
                changes.title.as_str(),
                changes.description.as_deref(),
                changes.status.as_str(),
                changes.priority.as_str(),
                instant_to_db(changes.due_date),
            ],
        )?;
        ensure_changed(changed, id)
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1;", [id])?;
        ensure_changed(deleted, id)
    }

    fn assign_task(&self, id: TaskId, assignee_id: Option<UserId>) -> RepoResult<Option<UserId>> {
        let tx = begin_write(self.conn)?;
        let previous: Option<UserId> = tx
            .query_row(
                "SELECT assignee_id FROM tasks WHERE id = ?1;",
                [id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(RepoError::NotFound {
                entity: EntityKind::Task,
                id,
            })?;
        if let Some(user_id) = assignee_id {
            require_row(&tx, EntityKind::User, user_id)?;
        }

        tx.execute(
            "UPDATE tasks
             SET assignee_id = ?2,
                 updated_at = MAX(updated_at + 1, CAST(unixepoch('subsec') * 1000 AS INTEGER))
             WHERE id = ?1;",
            params![id, assignee_id],
        )?;
        tx.commit()?;
        Ok(previous)
    }

    fn set_status(&self, id: TaskId, status: TaskStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET status = ?2,
                 updated_at = MAX(updated_at + 1, CAST(unixepoch('subsec') * 1000 AS INTEGER))
             WHERE id = ?1;",
            params![id, status.as_str()],
        )?;
        ensure_changed(changed, id)
    }

    fn set_priority(&self, id: TaskId, priority: TaskPriority) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET priority = ?2,
                 updated_at = MAX(updated_at + 1, CAST(unixepoch('subsec') * 1000 AS INTEGER))
             WHERE id = ?1;",
            params![id, priority.as_str()],
        )?;
        ensure_changed(changed, id)
    }
}

fn ensure_changed(changed: usize, id: TaskId) -> RepoResult<()> {
    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: EntityKind::Task,
            id,
        });
    }
    Ok(())
}

fn query_tasks<P: Params>(conn: &Connection, sql: &str, params: P) -> RepoResult<Vec<Task>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut tasks = Vec::new();
    while let Some(row) = rows.next()? {
        tasks.push(parse_task_row(row)?);
    }
    Ok(tasks)
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let status_text: String = row.get("status")?;
    let status = TaskStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in tasks.status"))
    })?;
    let priority_text: String = row.get("priority")?;
    let priority = TaskPriority::parse(&priority_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid priority `{priority_text}` in tasks.priority"
        ))
    })?;

    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status,
        priority,
        due_date: parse_instant(row.get("due_date")?, "tasks.due_date")?,
        project_id: row.get("project_id")?,
        assignee_id: row.get("assignee_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
