//! Task store.
//!
//! # Invariants
//! - New tasks default to `TODO`/`MEDIUM` and start unassigned.
//! - Reassignment moves the task out of the previous assignee's set.
//! - Status transitions are unconstrained.

use crate::model::page::{Page, PageRequest};
use crate::model::task::{Task, TaskChanges, TaskDraft, TaskPriority, TaskStatus};
use crate::model::{EntityKind, ProjectId, TaskId, UserId};
use crate::repo::task_repo::TaskRepository;
use crate::service::{log_write, ServiceError, ServiceResult};
use chrono::{DateTime, Utc};
use std::time::Instant;

/// Task store facade over repository implementations.
pub struct TaskService<R: TaskRepository> {
    repo: R,
}

impl<R: TaskRepository> TaskService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one task inside `draft.project_id`.
    ///
    /// The project is not checked here; a dangling id fails on the schema
    /// constraint as `ServiceError::Repo`.
    pub fn create(&self, draft: TaskDraft) -> ServiceResult<Task> {
        let started_at = Instant::now();
        let project_id = draft.project_id;
        let result = self
            .repo
            .create_task(&draft.into_new_task())
            .map_err(ServiceError::from)
            .and_then(|id| self.read_back(id, "created task not found in read-back"));
        let subject = match &result {
            Ok(task) => format!("task_id={} project_id={project_id}", task.id),
            Err(_) => format!("project_id={project_id}"),
        };
        log_write("task_create", "task", &subject, started_at, result)
    }

    pub fn get_by_id(&self, id: TaskId) -> ServiceResult<Task> {
        self.repo
            .get_task(id)?
            .ok_or_else(|| ServiceError::not_found(EntityKind::Task, id))
    }

    pub fn list_all(&self) -> ServiceResult<Vec<Task>> {
        Ok(self.repo.list_tasks()?)
    }

    pub fn list_by_project(&self, project_id: ProjectId) -> ServiceResult<Vec<Task>> {
        Ok(self.repo.list_by_project(project_id)?)
    }

    pub fn list_by_assignee(&self, assignee_id: UserId) -> ServiceResult<Vec<Task>> {
        Ok(self.repo.list_by_assignee(assignee_id)?)
    }

    pub fn list_by_status(
        &self,
        status: TaskStatus,
        page: &PageRequest,
    ) -> ServiceResult<Page<Task>> {
        Ok(self.repo.list_by_status(status, page)?)
    }

    pub fn list_by_project_and_status(
        &self,
        project_id: ProjectId,
        status: TaskStatus,
    ) -> ServiceResult<Vec<Task>> {
        Ok(self.repo.list_by_project_and_status(project_id, status)?)
    }

    /// Tasks due strictly before `instant`, earliest first.
    pub fn list_due_before(
        &self,
        instant: DateTime<Utc>,
        page: &PageRequest,
    ) -> ServiceResult<Page<Task>> {
        Ok(self.repo.list_due_before(instant, page)?)
    }

    /// Open tasks of `assignee_id` whose due date has passed at `now`.
    pub fn list_overdue_for_assignee(
        &self,
        assignee_id: UserId,
        now: DateTime<Utc>,
    ) -> ServiceResult<Vec<Task>> {
        Ok(self.repo.list_overdue_for_assignee(assignee_id, now)?)
    }

    pub fn count_by_project_and_status(
        &self,
        project_id: ProjectId,
        status: TaskStatus,
    ) -> ServiceResult<u64> {
        Ok(self.repo.count_by_project_and_status(project_id, status)?)
    }

    pub fn search_by_title(&self, term: &str, page: &PageRequest) -> ServiceResult<Page<Task>> {
        Ok(self.repo.search_by_title(term, page)?)
    }

    /// Replaces title, description, status, priority and due date.
    pub fn update(&self, id: TaskId, changes: &TaskChanges) -> ServiceResult<Task> {
        let started_at = Instant::now();
        let result = self
            .repo
            .update_task(id, changes)
            .map_err(ServiceError::from)
            .and_then(|()| self.read_back(id, "updated task not found in read-back"));
        log_write("task_update", "task", &format!("task_id={id}"), started_at, result)
    }

    pub fn delete(&self, id: TaskId) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = self.repo.delete_task(id).map_err(ServiceError::from);
        log_write("task_delete", "task", &format!("task_id={id}"), started_at, result)
    }

    /// Assigns the task to `user_id`, replacing any previous assignee.
    pub fn assign(&self, task_id: TaskId, user_id: UserId) -> ServiceResult<Task> {
        self.set_assignee("task_assign", task_id, Some(user_id))
    }

    pub fn unassign(&self, task_id: TaskId) -> ServiceResult<Task> {
        self.set_assignee("task_unassign", task_id, None)
    }

    pub fn update_status(&self, task_id: TaskId, status: TaskStatus) -> ServiceResult<Task> {
        let started_at = Instant::now();
        let result = self
            .repo
            .set_status(task_id, status)
            .map_err(ServiceError::from)
            .and_then(|()| self.read_back(task_id, "task missing after status update"));
        log_write(
            "task_update_status",
            "task",
            &format!("task_id={task_id} task_status={}", status.as_str()),
            started_at,
            result,
        )
    }

    pub fn update_priority(&self, task_id: TaskId, priority: TaskPriority) -> ServiceResult<Task> {
        let started_at = Instant::now();
        let result = self
            .repo
            .set_priority(task_id, priority)
            .map_err(ServiceError::from)
            .and_then(|()| self.read_back(task_id, "task missing after priority update"));
        log_write(
            "task_update_priority",
            "task",
            &format!("task_id={task_id} priority={}", priority.as_str()),
            started_at,
            result,
        )
    }

    fn set_assignee(
        &self,
        event: &'static str,
        task_id: TaskId,
        assignee_id: Option<UserId>,
    ) -> ServiceResult<Task> {
        let started_at = Instant::now();
        let mut previous_assignee = None;
        let result = self
            .repo
            .assign_task(task_id, assignee_id)
            .map_err(ServiceError::from)
            .and_then(|previous| {
                previous_assignee = previous;
                self.read_back(task_id, "task missing after assignment")
            });
        log_write(
            event,
            "task",
            &format!(
                "task_id={task_id} assignee_id={} previous_assignee_id={}",
                format_id(assignee_id),
                format_id(previous_assignee)
            ),
            started_at,
            result,
        )
    }

    fn read_back(&self, id: TaskId, details: &'static str) -> ServiceResult<Task> {
        self.repo
            .get_task(id)?
            .ok_or(ServiceError::InconsistentState(details))
    }
}

fn format_id(id: Option<i64>) -> String {
    id.map_or_else(|| "none".to_string(), |value| value.to_string())
}
