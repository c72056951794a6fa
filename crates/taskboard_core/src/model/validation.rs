//! Field validation rules for caller-side input checks.
//!
//! # Responsibility
//! - Encode the length, charset and syntax constraints of every entity field.
//! - Give the request-validation collaborator one error type to report.
//!
//! # Invariants
//! - Lengths are measured in Unicode scalar values.
//! - The stores never invoke these rules themselves; they trust their input.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 50;
pub const EMAIL_MAX_CHARS: usize = 100;
pub const FULL_NAME_MAX_CHARS: usize = 100;
pub const PASSWORD_MIN_CHARS: usize = 8;
pub const PASSWORD_MAX_CHARS: usize = 100;
pub const PROJECT_NAME_MIN_CHARS: usize = 3;
pub const PROJECT_NAME_MAX_CHARS: usize = 100;
pub const TASK_TITLE_MIN_CHARS: usize = 3;
pub const TASK_TITLE_MAX_CHARS: usize = 255;
pub const TASK_DESCRIPTION_MAX_CHARS: usize = 2000;

const PASSWORD_SPECIAL_CHARS: &str = "@#$%^&+=!";

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._-]+$").expect("valid username regex"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
    )
    .expect("valid email regex")
});

/// A field value that breaks its declared constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Blank {
        field: &'static str,
    },
    TooShort {
        field: &'static str,
        min: usize,
        actual: usize,
    },
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
    InvalidFormat {
        field: &'static str,
        rule: &'static str,
    },
    DueDateNotInFuture {
        due_ms: i64,
        now_ms: i64,
    },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Blank { field }
            | Self::TooShort { field, .. }
            | Self::TooLong { field, .. }
            | Self::InvalidFormat { field, .. } => field,
            Self::DueDateNotInFuture { .. } => "due_date",
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank { field } => write!(f, "{field} must not be blank"),
            Self::TooShort { field, min, actual } => {
                write!(f, "{field} must be at least {min} characters, got {actual}")
            }
            Self::TooLong { field, max, actual } => {
                write!(f, "{field} must be at most {max} characters, got {actual}")
            }
            Self::InvalidFormat { field, rule } => write!(f, "{field} {rule}"),
            Self::DueDateNotInFuture { due_ms, now_ms } => write!(
                f,
                "due_date ({due_ms}) must be in the future (now {now_ms})"
            ),
        }
    }
}

impl Error for ValidationError {}

/// Required string with inclusive length bounds.
pub fn check_required_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank { field });
    }
    let actual = value.chars().count();
    if actual < min {
        return Err(ValidationError::TooShort { field, min, actual });
    }
    if actual > max {
        return Err(ValidationError::TooLong { field, max, actual });
    }
    Ok(())
}

/// Optional string with an upper length bound.
pub fn check_max_length(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<(), ValidationError> {
    match value.map(|value| value.chars().count()) {
        Some(actual) if actual > max => Err(ValidationError::TooLong { field, max, actual }),
        _ => Ok(()),
    }
}

pub fn check_username(username: &str) -> Result<(), ValidationError> {
    check_required_length("username", username, USERNAME_MIN_CHARS, USERNAME_MAX_CHARS)?;
    if !USERNAME_RE.is_match(username) {
        return Err(ValidationError::InvalidFormat {
            field: "username",
            rule: "may only contain letters, digits, dots, underscores and hyphens",
        });
    }
    Ok(())
}

pub fn check_email(email: &str) -> Result<(), ValidationError> {
    check_required_length("email", email, 1, EMAIL_MAX_CHARS)?;
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::InvalidFormat {
            field: "email",
            rule: "must be a valid email address",
        });
    }
    Ok(())
}

/// Plaintext password policy: 8-100 chars with a digit, a lowercase and an
/// uppercase letter, one of `@#$%^&+=!`, and no whitespace.
pub fn check_password_strength(password: &str) -> Result<(), ValidationError> {
    check_required_length("password", password, PASSWORD_MIN_CHARS, PASSWORD_MAX_CHARS)?;
    let rule = if password.chars().any(char::is_whitespace) {
        Some("must not contain whitespace")
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        Some("must contain a digit")
    } else if !password.chars().any(|c| c.is_ascii_lowercase()) {
        Some("must contain a lowercase letter")
    } else if !password.chars().any(|c| c.is_ascii_uppercase()) {
        Some("must contain an uppercase letter")
    } else if !password.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c)) {
        Some("must contain one of @#$%^&+=!")
    } else {
        None
    };

    match rule {
        Some(rule) => Err(ValidationError::InvalidFormat {
            field: "password",
            rule,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        check_email, check_max_length, check_password_strength, check_required_length,
        check_username, ValidationError,
    };

    #[test]
    fn username_rules() {
        assert!(check_username("alice.w-1_x").is_ok());
        assert_eq!(
            check_username("al").unwrap_err(),
            ValidationError::TooShort {
                field: "username",
                min: 3,
                actual: 2
            }
        );
        assert!(matches!(
            check_username("alice smith").unwrap_err(),
            ValidationError::InvalidFormat { field: "username", .. }
        ));
        assert!(matches!(
            check_username(&"a".repeat(51)).unwrap_err(),
            ValidationError::TooLong { .. }
        ));
    }

    #[test]
    fn email_rules() {
        assert!(check_email("alice@x.com").is_ok());
        assert!(check_email("no-at-sign").is_err());
        assert!(check_email("a@b@c").is_err());
        let long = format!("{}@x.com", "a".repeat(100));
        assert!(matches!(
            check_email(&long).unwrap_err(),
            ValidationError::TooLong { field: "email", .. }
        ));
    }

    #[test]
    fn password_policy() {
        assert!(check_password_strength("Str0ng@pass").is_ok());
        assert!(check_password_strength("short1A@").is_ok());
        assert!(check_password_strength("Sh0rt@").is_err());
        assert!(check_password_strength("nouppercase1@").is_err());
        assert!(check_password_strength("NoDigits@@").is_err());
        assert!(check_password_strength("NoSpecial123").is_err());
        assert!(check_password_strength("Has Space1@").is_err());
    }

    #[test]
    fn length_helpers_count_chars_not_bytes() {
        assert!(check_required_length("name", "äöü", 3, 3).is_ok());
        assert!(check_max_length("description", Some("ééé"), 3).is_ok());
        assert!(check_max_length("description", None, 0).is_ok());
        assert_eq!(
            check_required_length("name", "   ", 1, 10).unwrap_err().field(),
            "name"
        );
    }
}
