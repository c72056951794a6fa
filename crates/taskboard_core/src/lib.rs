//! Core domain logic for the task board.
//! This crate owns the user/project/task consistency rules and their
//! SQLite persistence.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod secret;
pub mod service;

pub use config::{ConfigError, CoreConfig, DatabaseConfig, LoggingConfig, PasswordHashConfig};
pub use db::{open_db, open_db_in_memory, open_db_with_config, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::page::{Page, PageRequest};
pub use model::project::{Project, ProjectChanges, ProjectDraft, ProjectStatus};
pub use model::task::{Task, TaskChanges, TaskDraft, TaskPriority, TaskStatus};
pub use model::user::{ConflictField, User, UserDraft, UserPatch, UserRole};
pub use model::validation::ValidationError;
pub use model::{EntityKind, ProjectId, TaskId, UserId};
pub use repo::project_repo::{ProjectRepository, SqliteProjectRepository};
pub use repo::task_repo::{SqliteTaskRepository, TaskRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use secret::{Argon2SecretHasher, SecretHashError, SecretHasher};
pub use service::project_service::ProjectService;
pub use service::task_service::TaskService;
pub use service::user_service::UserService;
pub use service::{LookupKey, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
