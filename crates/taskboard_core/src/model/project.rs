//! Project domain model.
//!
//! # Invariants
//! - Every project has exactly one owner; the owner is not implicitly a
//!   member.
//! - Status defaults to `Active` when the draft leaves it unset.
//! - `start_date`/`end_date` carry no ordering constraint.

use super::validation::{
    check_required_length, ValidationError, PROJECT_NAME_MAX_CHARS, PROJECT_NAME_MIN_CHARS,
};
use super::{ProjectId, TaskId, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    #[default]
    Active,
    Completed,
    OnHold,
    Cancelled,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::OnHold => "ON_HOLD",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ACTIVE" => Some(Self::Active),
            "COMPLETED" => Some(Self::Completed),
            "ON_HOLD" => Some(Self::OnHold),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Persisted project with its derived membership and task sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: ProjectStatus,
    pub owner_id: UserId,
    pub member_ids: BTreeSet<UserId>,
    pub task_ids: BTreeSet<TaskId>,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl Project {
    pub fn has_member(&self, user_id: UserId) -> bool {
        self.member_ids.contains(&user_id)
    }
}

/// Caller input for project creation. The owner must already be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDraft {
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<ProjectStatus>,
    pub owner_id: UserId,
}

impl ProjectDraft {
    pub fn new(name: impl Into<String>, owner_id: UserId) -> Self {
        Self {
            name: name.into(),
            description: None,
            start_date: None,
            end_date: None,
            status: None,
            owner_id,
        }
    }

    /// Applies the status default.
    pub fn into_new_project(self) -> NewProject {
        NewProject {
            name: self.name,
            description: self.description,
            start_date: self.start_date,
            end_date: self.end_date,
            status: self.status.unwrap_or_default(),
            owner_id: self.owner_id,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_project_name(&self.name)
    }
}

/// Normalized insert row with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: ProjectStatus,
    pub owner_id: UserId,
}

/// Wholesale project update: every field overwrites the stored value,
/// including `None` clearing optional ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectChanges {
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: ProjectStatus,
}

impl ProjectChanges {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_project_name(&self.name)
    }
}

fn check_project_name(name: &str) -> Result<(), ValidationError> {
    check_required_length("name", name, PROJECT_NAME_MIN_CHARS, PROJECT_NAME_MAX_CHARS)
}
