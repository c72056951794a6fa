//! Project store.
//!
//! # Responsibility
//! - Create projects with the `ACTIVE` default and replace them wholesale.
//! - Maintain membership and task containment.
//!
//! # Invariants
//! - Deleting a project deletes its tasks in the same transaction.
//! - `add_member`/`remove_member` are idempotent.
//! - `remove_task` deletes the task (orphan removal) only when it belongs to
//!   the project.

use crate::model::page::{Page, PageRequest};
use crate::model::project::{Project, ProjectChanges, ProjectDraft, ProjectStatus};
use crate::model::{EntityKind, ProjectId, TaskId, UserId};
use crate::repo::project_repo::ProjectRepository;
use crate::service::{log_write, ServiceError, ServiceResult};
use log::info;
use std::time::Instant;

/// Project store facade over repository implementations.
pub struct ProjectService<R: ProjectRepository> {
    repo: R,
}

impl<R: ProjectRepository> ProjectService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one project owned by `draft.owner_id`.
    ///
    /// The owner is not checked here; a dangling id fails on the schema
    /// constraint as `ServiceError::Repo`.
    pub fn create(&self, draft: ProjectDraft) -> ServiceResult<Project> {
        let started_at = Instant::now();
        let owner_id = draft.owner_id;
        let result = self
            .repo
            .create_project(&draft.into_new_project())
            .map_err(ServiceError::from)
            .and_then(|id| self.read_back(id, "created project not found in read-back"));
        let subject = match &result {
            Ok(project) => format!("project_id={} owner_id={owner_id}", project.id),
            Err(_) => format!("owner_id={owner_id}"),
        };
        log_write("project_create", "project", &subject, started_at, result)
    }

    pub fn get_by_id(&self, id: ProjectId) -> ServiceResult<Project> {
        self.repo
            .get_project(id)?
            .ok_or_else(|| ServiceError::not_found(EntityKind::Project, id))
    }

    pub fn list_all(&self) -> ServiceResult<Vec<Project>> {
        Ok(self.repo.list_projects()?)
    }

    pub fn list_by_owner(&self, owner_id: UserId) -> ServiceResult<Vec<Project>> {
        Ok(self.repo.list_by_owner(owner_id)?)
    }

    pub fn list_by_member(&self, member_id: UserId) -> ServiceResult<Vec<Project>> {
        Ok(self.repo.list_by_member(member_id)?)
    }

    pub fn list_by_status(
        &self,
        status: ProjectStatus,
        page: &PageRequest,
    ) -> ServiceResult<Page<Project>> {
        Ok(self.repo.list_by_status(status, page)?)
    }

    /// Case-insensitive name search. `%` and `_` match literally.
    pub fn search_by_name(&self, term: &str, page: &PageRequest) -> ServiceResult<Page<Project>> {
        Ok(self.repo.search_by_name(term, page)?)
    }

    pub fn count_by_status(&self, status: ProjectStatus) -> ServiceResult<u64> {
        Ok(self.repo.count_by_status(status)?)
    }

    /// Replaces name, description, dates and status.
    pub fn update(&self, id: ProjectId, changes: &ProjectChanges) -> ServiceResult<Project> {
        let started_at = Instant::now();
        let result = self
            .repo
            .update_project(id, changes)
            .map_err(ServiceError::from)
            .and_then(|()| self.read_back(id, "updated project not found in read-back"));
        log_write(
            "project_update",
            "project",
            &format!("project_id={id}"),
            started_at,
            result,
        )
    }

    /// Deletes the project, its tasks and its membership rows.
    pub fn delete(&self, id: ProjectId) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = self.repo.delete_project(id).map_err(ServiceError::from);
        if let Ok(tasks_deleted) = &result {
            info!(
                "event=project_delete_cascade module=project project_id={id} tasks_deleted={tasks_deleted}"
            );
        }
        log_write(
            "project_delete",
            "project",
            &format!("project_id={id}"),
            started_at,
            result.map(|_| ()),
        )
    }

    /// Adds `user_id` to the members. Adding an existing member is a no-op.
    pub fn add_member(&self, project_id: ProjectId, user_id: UserId) -> ServiceResult<Project> {
        let started_at = Instant::now();
        let result = self
            .repo
            .add_member(project_id, user_id)
            .map_err(ServiceError::from)
            .and_then(|changed| {
                self.read_back(project_id, "project missing after member add")
                    .map(|project| (changed, project))
            });
        finish_relation(
            "project_add_member",
            &format!("project_id={project_id} user_id={user_id}"),
            started_at,
            result,
        )
    }

    /// Removes `user_id` from the members. Removing a non-member is a no-op.
    pub fn remove_member(&self, project_id: ProjectId, user_id: UserId) -> ServiceResult<Project> {
        let started_at = Instant::now();
        let result = self
            .repo
            .remove_member(project_id, user_id)
            .map_err(ServiceError::from)
            .and_then(|changed| {
                self.read_back(project_id, "project missing after member removal")
                    .map(|project| (changed, project))
            });
        finish_relation(
            "project_remove_member",
            &format!("project_id={project_id} user_id={user_id}"),
            started_at,
            result,
        )
    }

    /// Moves `task_id` into the project, detaching it from any previous one.
    pub fn add_task(&self, project_id: ProjectId, task_id: TaskId) -> ServiceResult<Project> {
        let started_at = Instant::now();
        let result = self
            .repo
            .attach_task(project_id, task_id)
            .map_err(ServiceError::from)
            .and_then(|previous| {
                if previous != project_id {
                    info!(
                        "event=project_task_moved module=project task_id={task_id} from_project_id={previous} to_project_id={project_id}"
                    );
                }
                self.read_back(project_id, "project missing after task add")
                    .map(|project| (previous != project_id, project))
            });
        finish_relation(
            "project_add_task",
            &format!("project_id={project_id} task_id={task_id}"),
            started_at,
            result,
        )
    }

    /// Detaches `task_id` from the project, deleting it.
    ///
    /// A task belonging to another project is left untouched.
    pub fn remove_task(&self, project_id: ProjectId, task_id: TaskId) -> ServiceResult<Project> {
        let started_at = Instant::now();
        let result = self
            .repo
            .detach_task(project_id, task_id)
            .map_err(ServiceError::from)
            .and_then(|deleted| {
                self.read_back(project_id, "project missing after task removal")
                    .map(|project| (deleted, project))
            });
        finish_relation(
            "project_remove_task",
            &format!("project_id={project_id} task_id={task_id}"),
            started_at,
            result,
        )
    }

    fn read_back(&self, id: ProjectId, details: &'static str) -> ServiceResult<Project> {
        self.repo
            .get_project(id)?
            .ok_or(ServiceError::InconsistentState(details))
    }
}

fn finish_relation(
    event: &'static str,
    subject: &str,
    started_at: Instant,
    result: ServiceResult<(bool, Project)>,
) -> ServiceResult<Project> {
    let subject = match &result {
        Ok((changed, _)) => format!("{subject} changed={changed}"),
        Err(_) => subject.to_string(),
    };
    log_write(event, "project", &subject, started_at, result.map(|(_, project)| project))
}
