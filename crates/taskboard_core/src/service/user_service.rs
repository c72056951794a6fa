//! User store.
//!
//! # Responsibility
//! - Hash the supplied secret before creation and apply role/enabled
//!   defaults.
//! - Merge partial updates onto the stored user inside one repository
//!   transaction.
//!
//! # Invariants
//! - The plaintext secret is dropped once hashed; only the hash is stored.
//! - Username and email stay unique; a create reports every collision.

use crate::model::page::{Page, PageRequest};
use crate::model::user::{User, UserDraft, UserPatch, UserRole};
use crate::model::{EntityKind, ProjectId, UserId};
use crate::repo::user_repo::UserRepository;
use crate::secret::SecretHasher;
use crate::service::{log_write, LookupKey, ServiceError, ServiceResult};
use log::info;
use std::time::Instant;

/// User store facade over a repository and a secret hasher.
pub struct UserService<R: UserRepository, H: SecretHasher> {
    repo: R,
    hasher: H,
}

impl<R: UserRepository, H: SecretHasher> UserService<R, H> {
    pub fn new(repo: R, hasher: H) -> Self {
        Self { repo, hasher }
    }

    /// Creates one user.
    ///
    /// Fails with `Conflict` listing every taken unique field.
    pub fn create(&self, draft: UserDraft) -> ServiceResult<User> {
        let started_at = Instant::now();
        let result = self.create_inner(draft);
        let subject = match &result {
            Ok(user) => format!("user_id={}", user.id),
            Err(err) => format!("conflict_fields={}", field_list(err)),
        };
        log_write("user_create", "user", &subject, started_at, result)
    }

    fn create_inner(&self, draft: UserDraft) -> ServiceResult<User> {
        let password_hash = self.hasher.hash_secret(&draft.password)?;
        let new_user = draft.into_new_user(password_hash);
        let user_id = self.repo.create_user(&new_user)?;
        self.read_back(user_id, "created user not found in read-back")
    }

    pub fn get_by_id(&self, id: UserId) -> ServiceResult<User> {
        self.repo
            .get_user(id)?
            .ok_or_else(|| ServiceError::not_found(EntityKind::User, id))
    }

    pub fn get_by_username(&self, username: &str) -> ServiceResult<User> {
        self.repo
            .find_by_username(username)?
            .ok_or_else(|| ServiceError::NotFound {
                entity: EntityKind::User,
                key: LookupKey::Username(username.to_string()),
            })
    }

    pub fn get_by_email(&self, email: &str) -> ServiceResult<User> {
        self.repo
            .find_by_email(email)?
            .ok_or_else(|| ServiceError::NotFound {
                entity: EntityKind::User,
                key: LookupKey::Email(email.to_string()),
            })
    }

    /// Lists users ordered by id.
    pub fn list_all(&self, page: &PageRequest) -> ServiceResult<Page<User>> {
        Ok(self.repo.list_users(page)?)
    }

    pub fn list_by_role(&self, role: UserRole) -> ServiceResult<Vec<User>> {
        Ok(self.repo.list_by_role(role)?)
    }

    /// Lists the members of a project ordered by id.
    pub fn list_project_members(&self, project_id: ProjectId) -> ServiceResult<Vec<User>> {
        Ok(self.repo.list_project_members(project_id)?)
    }

    /// Applies the present fields of `patch` and keeps the rest.
    ///
    /// A changed email is re-checked against every other user.
    pub fn update(&self, id: UserId, patch: &UserPatch) -> ServiceResult<User> {
        let started_at = Instant::now();
        let mut email_changed = false;
        let result = self
            .repo
            .update_user(id, patch)
            .map_err(ServiceError::from)
            .and_then(|changed| {
                email_changed = changed;
                self.read_back(id, "updated user not found in read-back")
            });
        log_write(
            "user_update",
            "user",
            &format!("user_id={id} email_changed={email_changed}"),
            started_at,
            result,
        )
    }

    /// Deletes the user with its owned projects and their tasks.
    ///
    /// Tasks assigned to the user elsewhere survive unassigned.
    pub fn delete(&self, id: UserId) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = self.repo.delete_user(id).map_err(ServiceError::from);
        if let Ok(outcome) = &result {
            info!(
                "event=user_delete_cascade module=user user_id={} projects_deleted={} tasks_deleted={} tasks_unassigned={}",
                id, outcome.projects_deleted, outcome.tasks_deleted, outcome.tasks_unassigned
            );
        }
        log_write(
            "user_delete",
            "user",
            &format!("user_id={id}"),
            started_at,
            result.map(|_| ()),
        )
    }

    /// Checks `plaintext` against the stored hash of user `id`.
    pub fn verify_secret(&self, id: UserId, plaintext: &str) -> ServiceResult<bool> {
        let user = self.get_by_id(id)?;
        Ok(self.hasher.verify_secret(plaintext, &user.password_hash)?)
    }

    fn read_back(&self, id: UserId, details: &'static str) -> ServiceResult<User> {
        self.repo
            .get_user(id)?
            .ok_or(ServiceError::InconsistentState(details))
    }
}

fn field_list(err: &ServiceError) -> String {
    let fields = err.conflict_fields();
    if fields.is_empty() {
        return "none".to_string();
    }
    fields
        .iter()
        .map(|field| field.as_str())
        .collect::<Vec<_>>()
        .join(",")
}
