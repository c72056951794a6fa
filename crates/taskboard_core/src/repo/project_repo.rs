//! Project repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist projects and their membership join rows.
//! - Move tasks between projects and perform orphan removal.
//! - Run the project delete cascade.
//!
//! # Invariants
//! - `member_ids` and `task_ids` are read from `project_members` and
//!   `tasks.project_id`; nothing else stores them.
//! - Relation writes verify both endpoints inside the write transaction.

use crate::model::page::{Page, PageRequest};
use crate::model::project::{NewProject, Project, ProjectChanges, ProjectStatus};
use crate::model::{EntityKind, ProjectId, TaskId, UserId};
use crate::repo::{
    begin_write, count_to_u64, date_to_db, ensure_connection_ready, like_pattern, load_id_set,
    parse_date, require_row, RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Params, Row};

const PROJECT_SELECT_SQL: &str = "SELECT
    p.id,
    p.name,
    p.description,
    p.start_date,
    p.end_date,
    p.status,
    p.owner_id,
    p.created_at,
    p.updated_at
FROM projects p";

const MEMBER_IDS_SQL: &str = "SELECT user_id FROM project_members WHERE project_id = ?1;";
const TASK_IDS_SQL: &str = "SELECT id FROM tasks WHERE project_id = ?1;";

/// Repository interface for project persistence.
pub trait ProjectRepository {
    /// Inserts a normalized project. The owner reference is enforced by the
    /// schema only.
    fn create_project(&self, project: &NewProject) -> RepoResult<ProjectId>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    fn list_projects(&self) -> RepoResult<Vec<Project>>;
    fn list_by_owner(&self, owner_id: UserId) -> RepoResult<Vec<Project>>;
    fn list_by_member(&self, member_id: UserId) -> RepoResult<Vec<Project>>;
    fn list_by_status(&self, status: ProjectStatus, page: &PageRequest)
        -> RepoResult<Page<Project>>;
    /// Case-insensitive substring match on the name. Wildcards in `term`
    /// match literally.
    fn search_by_name(&self, term: &str, page: &PageRequest) -> RepoResult<Page<Project>>;
    fn count_by_status(&self, status: ProjectStatus) -> RepoResult<u64>;
    /// Replaces every descriptive column.
    fn update_project(&self, id: ProjectId, changes: &ProjectChanges) -> RepoResult<()>;
    /// Deletes the project with its tasks and membership rows.
    ///
    /// Returns the number of tasks removed.
    fn delete_project(&self, id: ProjectId) -> RepoResult<usize>;
    /// Returns `true` when a new membership row was written.
    fn add_member(&self, project_id: ProjectId, user_id: UserId) -> RepoResult<bool>;
    /// Returns `true` when a membership row was removed.
    fn remove_member(&self, project_id: ProjectId, user_id: UserId) -> RepoResult<bool>;
    /// Points `task_id` at `project_id` and returns the previous project.
    fn attach_task(&self, project_id: ProjectId, task_id: TaskId) -> RepoResult<ProjectId>;
    /// Deletes `task_id` when it belongs to `project_id`.
    ///
    /// Returns `false` when the task belongs to another project.
    fn detach_task(&self, project_id: ProjectId, task_id: TaskId) -> RepoResult<bool>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["users", "projects", "project_members", "tasks"])?;
        Ok(Self { conn })
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create_project(&self, project: &NewProject) -> RepoResult<ProjectId> {
        self.conn.execute(
            "INSERT INTO projects (
                name,
                description,
                start_date,
                end_date,
                status,
                owner_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                project.name.as_str(),
                project.description.as_deref(),
                date_to_db(project.start_date),
                date_to_db(project.end_date),
                project.status.as_str(),
                project.owner_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        let project = self
            .conn
            .query_row(
                &format!("{PROJECT_SELECT_SQL} WHERE p.id = ?1;"),
                [id],
                |row| Ok(parse_project_row(row)),
            )
            .optional()?
            .transpose()?;
        match project {
            Some(mut project) => {
                hydrate_relations(self.conn, &mut project)?;
                Ok(Some(project))
            }
            None => Ok(None),
        }
    }

    fn list_projects(&self) -> RepoResult<Vec<Project>> {
        query_projects(
            self.conn,
            &format!("{PROJECT_SELECT_SQL} ORDER BY p.id ASC;"),
            [],
        )
    }

    fn list_by_owner(&self, owner_id: UserId) -> RepoResult<Vec<Project>> {
        query_projects(
            self.conn,
            &format!("{PROJECT_SELECT_SQL} WHERE p.owner_id = ?1 ORDER BY p.id ASC;"),
            [owner_id],
        )
    }

    fn list_by_member(&self, member_id: UserId) -> RepoResult<Vec<Project>> {
        query_projects(
            self.conn,
            &format!(
                "{PROJECT_SELECT_SQL}
                 INNER JOIN project_members pm ON pm.project_id = p.id
                 WHERE pm.user_id = ?1
                 ORDER BY p.id ASC;"
            ),
            [member_id],
        )
    }

    fn list_by_status(
        &self,
        status: ProjectStatus,
        page: &PageRequest,
    ) -> RepoResult<Page<Project>> {
        let total = self.count_by_status(status)?;
        let applied_limit = page.applied_limit();
        let items = query_projects(
            self.conn,
            &format!(
                "{PROJECT_SELECT_SQL}
                 WHERE p.status = ?1
                 ORDER BY p.id ASC
                 LIMIT ?2 OFFSET ?3;"
            ),
            params![
                status.as_str(),
                i64::from(applied_limit),
                i64::from(page.offset)
            ],
        )?;
        Ok(Page {
            items,
            total,
            applied_limit,
            offset: page.offset,
        })
    }

    fn search_by_name(&self, term: &str, page: &PageRequest) -> RepoResult<Page<Project>> {
        let pattern = like_pattern(term);
        let total: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM projects WHERE fold(name) LIKE fold(?1) ESCAPE '\\';",
            [pattern.as_str()],
            |row| row.get(0),
        )?;
        let applied_limit = page.applied_limit();
        let items = query_projects(
            self.conn,
            &format!(
                "{PROJECT_SELECT_SQL}
                 WHERE fold(p.name) LIKE fold(?1) ESCAPE '\\'
                 ORDER BY p.id ASC
                 LIMIT ?2 OFFSET ?3;"
            ),
            params![
                pattern.as_str(),
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

    fn count_by_status(&self, status: ProjectStatus) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM projects WHERE status = ?1;",
            [status.as_str()],
            |row| row.get(0),
        )?;
        count_to_u64(count)
    }

    fn update_project(&self, id: ProjectId, changes: &ProjectChanges) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE projects
             SET
                name = ?2,
                description = ?3,
                start_date = ?4,
                end_date = ?5,
                status = ?6,
                updated_at = MAX(updated_at + 1, CAST(unixepoch('subsec') * 1000 AS INTEGER))
             WHERE id = ?1;",
            params![
                id,
                changes.name.as_str(),
                changes.description.as_deref(),
                date_to_db(changes.start_date),
                date_to_db(changes.end_date),
                changes.status.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: EntityKind::Project,
                id,
            });
        }
        Ok(())
    }

    fn delete_project(&self, id: ProjectId) -> RepoResult<usize> {
        let tx = begin_write(self.conn)?;
        require_row(&tx, EntityKind::Project, id)?;
        let tasks_deleted = purge_project(&tx, id)?;
        tx.commit()?;
        Ok(tasks_deleted)
    }

    fn add_member(&self, project_id: ProjectId, user_id: UserId) -> RepoResult<bool> {
        let tx = begin_write(self.conn)?;
        require_row(&tx, EntityKind::Project, project_id)?;
        require_row(&tx, EntityKind::User, user_id)?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO project_members (project_id, user_id)
             VALUES (?1, ?2);",
            [project_id, user_id],
        )?;
        if inserted > 0 {
            touch_project(&tx, project_id)?;
        }
        tx.commit()?;
        Ok(inserted > 0)
    }

    fn remove_member(&self, project_id: ProjectId, user_id: UserId) -> RepoResult<bool> {
        let tx = begin_write(self.conn)?;
        require_row(&tx, EntityKind::Project, project_id)?;
        require_row(&tx, EntityKind::User, user_id)?;
        let removed = tx.execute(
            "DELETE FROM project_members WHERE project_id = ?1 AND user_id = ?2;",
            [project_id, user_id],
        )?;
        if removed > 0 {
            touch_project(&tx, project_id)?;
        }
        tx.commit()?;
        Ok(removed > 0)
    }

    fn attach_task(&self, project_id: ProjectId, task_id: TaskId) -> RepoResult<ProjectId> {
        let tx = begin_write(self.conn)?;
        require_row(&tx, EntityKind::Project, project_id)?;
        let previous: ProjectId = tx
            .query_row(
                "SELECT project_id FROM tasks WHERE id = ?1;",
                [task_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(RepoError::NotFound {
                entity: EntityKind::Task,
                id: task_id,
            })?;

        if previous != project_id {
            tx.execute(
                "UPDATE tasks
                 SET project_id = ?2,
                     updated_at = MAX(updated_at + 1, CAST(unixepoch('subsec') * 1000 AS INTEGER))
                 WHERE id = ?1;",
                [task_id, project_id],
            )?;
        }
        tx.commit()?;
        Ok(previous)
    }

    fn detach_task(&self, project_id: ProjectId, task_id: TaskId) -> RepoResult<bool> {
        let tx = begin_write(self.conn)?;
        require_row(&tx, EntityKind::Project, project_id)?;
        require_row(&tx, EntityKind::Task, task_id)?;
        let deleted = tx.execute(
            "DELETE FROM tasks WHERE id = ?1 AND project_id = ?2;",
            [task_id, project_id],
        )?;
        tx.commit()?;
        Ok(deleted > 0)
    }
}

/// Deletes a project together with its tasks and membership rows.
///
/// Runs on the caller's transaction and returns the number of tasks deleted.
pub(crate) fn purge_project(conn: &Connection, project_id: ProjectId) -> RepoResult<usize> {
    let tasks_deleted = conn.execute("DELETE FROM tasks WHERE project_id = ?1;", [project_id])?;
    conn.execute(
        "DELETE FROM project_members WHERE project_id = ?1;",
        [project_id],
    )?;
    conn.execute("DELETE FROM projects WHERE id = ?1;", [project_id])?;
    Ok(tasks_deleted)
}

fn touch_project(conn: &Connection, project_id: ProjectId) -> RepoResult<()> {
    conn.execute(
        "UPDATE projects
         SET updated_at = MAX(updated_at + 1, CAST(unixepoch('subsec') * 1000 AS INTEGER))
         WHERE id = ?1;",
        [project_id],
    )?;
    Ok(())
}

fn query_projects<P: Params>(conn: &Connection, sql: &str, params: P) -> RepoResult<Vec<Project>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut projects = Vec::new();
    while let Some(row) = rows.next()? {
        projects.push(parse_project_row(row)?);
    }
    for project in &mut projects {
        hydrate_relations(conn, project)?;
    }
    Ok(projects)
}

fn hydrate_relations(conn: &Connection, project: &mut Project) -> RepoResult<()> {
    project.member_ids = load_id_set(conn, MEMBER_IDS_SQL, project.id)?;
    project.task_ids = load_id_set(conn, TASK_IDS_SQL, project.id)?;
    Ok(())
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let status_text: String = row.get("status")?;
    let status = ProjectStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in projects.status"))
    })?;

    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        start_date: parse_date(row.get("start_date")?, "projects.start_date")?,
        end_date: parse_date(row.get("end_date")?, "projects.end_date")?,
        status,
        owner_id: row.get("owner_id")?,
        member_ids: Default::default(),
        task_ids: Default::default(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
