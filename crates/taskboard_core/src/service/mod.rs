//! Store services over the entity repositories.
//!
//! # Responsibility
//! - Apply creation defaults before records reach storage.
//! - Map repository failures to semantic service errors.
//! - Emit one metadata-only log event per write.
//!
//! # Invariants
//! - Every returned entity is read back after its write.
//! - Log lines never carry secrets, usernames or email addresses.

use crate::model::user::ConflictField;
use crate::model::validation::ValidationError;
use crate::model::EntityKind;
use crate::repo::{join_fields, RepoError};
use crate::secret::SecretHashError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub mod project_service;
pub mod task_service;
pub mod user_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Key used to look an entity up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKey {
    Id(i64),
    Username(String),
    Email(String),
}

impl Display for LookupKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id={id}"),
            Self::Username(username) => write!(f, "username={username}"),
            Self::Email(email) => write!(f, "email={email}"),
        }
    }
}

/// Error returned by all store operations.
#[derive(Debug)]
pub enum ServiceError {
    /// Referenced entity does not exist.
    NotFound { entity: EntityKind, key: LookupKey },
    /// Unique fields already held by another user.
    Conflict(Vec<ConflictField>),
    /// Malformed field values.
    Validation(ValidationError),
    /// Secret hashing collaborator failed.
    Secret(SecretHashError),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl ServiceError {
    pub(crate) fn not_found(entity: EntityKind, id: i64) -> Self {
        Self::NotFound {
            entity,
            key: LookupKey::Id(id),
        }
    }

    /// Stable machine-readable code, used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Validation(_) => "validation",
            Self::Secret(_) => "secret_hash_failed",
            Self::Repo(_) => "repo_failed",
            Self::InconsistentState(_) => "inconsistent_state",
        }
    }

    /// Conflicting fields, empty for every other variant.
    pub fn conflict_fields(&self) -> &[ConflictField] {
        match self {
            Self::Conflict(fields) => fields,
            _ => &[],
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Conflict(fields) => write!(f, "already taken: {}", join_fields(fields)),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Secret(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Secret(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::not_found(entity, id),
            RepoError::Conflict(fields) => Self::Conflict(fields),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<SecretHashError> for ServiceError {
    fn from(value: SecretHashError) -> Self {
        Self::Secret(value)
    }
}

/// Logs the outcome of one write and passes the result through.
///
/// `subject` holds pre-formatted `key=value` identifiers.
pub(crate) fn log_write<T>(
    event: &'static str,
    module: &'static str,
    subject: &str,
    started_at: Instant,
    result: ServiceResult<T>,
) -> ServiceResult<T> {
    let duration_ms = started_at.elapsed().as_millis();
    match &result {
        Ok(_) => info!("event={event} module={module} status=ok {subject} duration_ms={duration_ms}"),
        Err(err) => warn!(
            "event={event} module={module} status=error {subject} duration_ms={duration_ms} error_code={}",
            err.code()
        ),
    }
    result
}
