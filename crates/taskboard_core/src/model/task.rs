//! Task domain model.
//!
//! # Invariants
//! - Every task belongs to exactly one project and never outlives it.
//! - At most one assignee.
//! - Status defaults to `Todo`, priority to `Medium`.
//! - Status transitions are unconstrained: any state may follow any other.

use super::validation::{
    check_max_length, check_required_length, ValidationError, TASK_DESCRIPTION_MAX_CHARS,
    TASK_TITLE_MAX_CHARS, TASK_TITLE_MIN_CHARS,
};
use super::{ProjectId, TaskId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::InProgress => "IN_PROGRESS",
            Self::Review => "REVIEW",
            Self::Done => "DONE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "TODO" => Some(Self::Todo),
            "IN_PROGRESS" => Some(Self::InProgress),
            "REVIEW" => Some(Self::Review),
            "DONE" => Some(Self::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Persisted task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    /// Stored with millisecond precision.
    pub due_date: Option<DateTime<Utc>>,
    pub project_id: ProjectId,
    pub assignee_id: Option<UserId>,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl Task {
    /// Past due and not yet done.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != TaskStatus::Done && self.due_date.is_some_and(|due| due < now)
    }
}

/// Caller input for task creation. Assignment happens afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub project_id: ProjectId,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, project_id: ProjectId) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: None,
            priority: None,
            due_date: None,
            project_id,
        }
    }

    /// Applies the status and priority defaults.
    pub fn into_new_task(self) -> NewTask {
        NewTask {
            title: self.title,
            description: self.description,
            status: self.status.unwrap_or_default(),
            priority: self.priority.unwrap_or_default(),
            due_date: self.due_date,
            project_id: self.project_id,
        }
    }

    /// Creation-time rules, including "due date lies after `now`".
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        check_task_text(&self.title, self.description.as_deref())?;
        match self.due_date {
            Some(due) if due <= now => Err(ValidationError::DueDateNotInFuture {
                due_ms: due.timestamp_millis(),
                now_ms: now.timestamp_millis(),
            }),
            _ => Ok(()),
        }
    }
}

/// Normalized insert row with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub project_id: ProjectId,
}

/// Wholesale task update of the descriptive fields. Project and assignee
/// are changed only through their relation operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskChanges {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
}

impl TaskChanges {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_task_text(&self.title, self.description.as_deref())
    }
}

fn check_task_text(title: &str, description: Option<&str>) -> Result<(), ValidationError> {
    check_required_length("title", title, TASK_TITLE_MIN_CHARS, TASK_TITLE_MAX_CHARS)?;
    check_max_length("description", description, TASK_DESCRIPTION_MAX_CHARS)
}
