//! Domain model for users, projects and tasks.
//!
//! # Responsibility
//! - Define entity read models, creation drafts and update changesets.
//! - Own the default-on-create rules and the field validation rules.
//!
//! # Invariants
//! - Identifiers are assigned by SQLite and never reused.
//! - Every relation is stored once on its owning side; the `*_ids` sets on
//!   read models are derived from that single relation.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub mod page;
pub mod project;
pub mod task;
pub mod user;
pub mod validation;

pub type UserId = i64;
pub type ProjectId = i64;
pub type TaskId = i64;

/// Entity family, used to qualify not-found errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Project,
    Task,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Project => "project",
            Self::Task => "task",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
