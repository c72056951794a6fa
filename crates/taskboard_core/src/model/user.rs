//! User domain model.
//!
//! # Invariants
//! - `username` and `email` are unique across all users.
//! - `password_hash` is the output of a one-way hasher and is never
//!   serialized.
//! - Role defaults to `User` and `enabled` defaults to `true` at creation.

use super::validation::{
    check_email, check_password_strength, check_required_length, check_username,
    ValidationError, FULL_NAME_MAX_CHARS,
};
use super::{ProjectId, TaskId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// Access role of a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    #[default]
    User,
    Manager,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::User => "USER",
            Self::Manager => "MANAGER",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ADMIN" => Some(Self::Admin),
            "USER" => Some(Self::User),
            "MANAGER" => Some(Self::Manager),
            _ => None,
        }
    }
}

/// Persisted user with its derived relation sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: UserRole,
    pub enabled: bool,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
    /// Projects whose `owner_id` is this user.
    pub owned_project_ids: BTreeSet<ProjectId>,
    /// Projects listing this user in their membership.
    pub member_project_ids: BTreeSet<ProjectId>,
    /// Tasks whose `assignee_id` is this user.
    pub assigned_task_ids: BTreeSet<TaskId>,
}

/// Caller input for user creation. `password` is plaintext and only ever
/// handed to the secret hasher.
#[derive(Clone, PartialEq, Eq, Default, Deserialize)]
pub struct UserDraft {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub role: Option<UserRole>,
    pub enabled: Option<bool>,
}

impl std::fmt::Debug for UserDraft {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDraft")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl UserDraft {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        full_name: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            full_name: full_name.into(),
            password: password.into(),
            role: None,
            enabled: None,
        }
    }

    /// Applies creation defaults and swaps the plaintext for its hash.
    pub fn into_new_user(self, password_hash: String) -> NewUser {
        NewUser {
            username: self.username,
            email: self.email,
            full_name: self.full_name,
            password_hash,
            role: self.role.unwrap_or_default(),
            enabled: self.enabled.unwrap_or(true),
        }
    }

    /// Field rules for caller-side validation. Stores do not call this.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_username(&self.username)?;
        check_email(&self.email)?;
        check_required_length("full_name", &self.full_name, 1, FULL_NAME_MAX_CHARS)?;
        check_password_strength(&self.password)
    }
}

/// Normalized insert row: defaults applied, secret hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: UserRole,
    pub enabled: bool,
}

/// Field-by-field user update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub enabled: Option<bool>,
    pub role: Option<UserRole>,
}

impl UserPatch {
    /// Returns the new email when the patch changes it.
    pub fn changed_email<'a>(&'a self, current: &User) -> Option<&'a str> {
        self.email
            .as_deref()
            .filter(|email| *email != current.email.as_str())
    }

    pub fn apply_to(&self, user: &mut User) {
        if let Some(full_name) = &self.full_name {
            user.full_name = full_name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(enabled) = self.enabled {
            user.enabled = enabled;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(full_name) = self.full_name.as_deref() {
            check_required_length("full_name", full_name, 1, FULL_NAME_MAX_CHARS)?;
        }
        match self.email.as_deref() {
            Some(email) => check_email(email),
            None => Ok(()),
        }
    }
}

/// Unique user fields that can collide on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictField {
    Username,
    Email,
}

impl ConflictField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::Email => "email",
        }
    }
}

impl Display for ConflictField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
