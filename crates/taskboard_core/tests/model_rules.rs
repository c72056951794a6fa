use chrono::{Duration, TimeZone, Utc};
use taskboard_core::{
    ProjectChanges, ProjectDraft, ProjectStatus, TaskChanges, TaskDraft, TaskPriority,
    TaskStatus, UserDraft, UserPatch, UserRole, ValidationError,
};

#[test]
fn enums_use_uppercase_wire_names() {
    assert_eq!(serde_json::to_string(&ProjectStatus::OnHold).unwrap(), "\"ON_HOLD\"");
    assert_eq!(serde_json::to_string(&TaskStatus::InProgress).unwrap(), "\"IN_PROGRESS\"");
    assert_eq!(serde_json::to_string(&TaskPriority::Critical).unwrap(), "\"CRITICAL\"");
    assert_eq!(serde_json::to_string(&UserRole::Manager).unwrap(), "\"MANAGER\"");

    let parsed: TaskStatus = serde_json::from_str("\"REVIEW\"").unwrap();
    assert_eq!(parsed, TaskStatus::Review);
    assert_eq!(ProjectStatus::parse("CANCELLED"), Some(ProjectStatus::Cancelled));
    assert_eq!(TaskPriority::parse("urgent"), None);
}

#[test]
fn enum_defaults_match_creation_defaults() {
    assert_eq!(ProjectStatus::default(), ProjectStatus::Active);
    assert_eq!(TaskStatus::default(), TaskStatus::Todo);
    assert_eq!(TaskPriority::default(), TaskPriority::Medium);
    assert_eq!(UserRole::default(), UserRole::User);
}

#[test]
fn user_draft_deserializes_with_missing_optionals() {
    let draft: UserDraft = serde_json::from_str(
        r#"{"username":"alice","email":"alice@x.com","full_name":"Alice","password":"Str0ng@pass"}"#,
    )
    .unwrap();
    assert_eq!(draft.role, None);
    let debug = format!("{draft:?}");
    assert!(!debug.contains("Str0ng@pass"));

    let new_user = draft.into_new_user("hash".to_string());
    assert_eq!(new_user.role, UserRole::User);
    assert!(new_user.enabled);
    assert_eq!(new_user.password_hash, "hash");
}

#[test]
fn user_draft_validation() {
    let valid = UserDraft::new("alice.w", "alice@x.com", "Alice", "Str0ng@pass");
    assert!(valid.validate().is_ok());

    let short = UserDraft::new("al", "alice@x.com", "Alice", "Str0ng@pass");
    assert_eq!(short.validate().unwrap_err().field(), "username");

    let bad_email = UserDraft::new("alice", "alice.x.com", "Alice", "Str0ng@pass");
    assert_eq!(bad_email.validate().unwrap_err().field(), "email");

    let weak = UserDraft::new("alice", "alice@x.com", "Alice", "password");
    assert_eq!(weak.validate().unwrap_err().field(), "password");
}

#[test]
fn user_patch_validates_present_fields_only() {
    assert!(UserPatch::default().validate().is_ok());
    let patch = UserPatch {
        email: Some("not-an-email".to_string()),
        ..UserPatch::default()
    };
    assert_eq!(patch.validate().unwrap_err().field(), "email");
}

#[test]
fn project_name_length_rules() {
    assert!(ProjectDraft::new("Web", 1).validate().is_ok());
    assert!(matches!(
        ProjectDraft::new("ab", 1).validate().unwrap_err(),
        ValidationError::TooShort { min: 3, actual: 2, .. }
    ));
    let changes = ProjectChanges {
        name: "   ".to_string(),
        description: None,
        start_date: None,
        end_date: None,
        status: ProjectStatus::Active,
    };
    assert!(matches!(
        changes.validate().unwrap_err(),
        ValidationError::Blank { field: "name" }
    ));
}

#[test]
fn task_draft_rejects_past_due_date() {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let mut draft = TaskDraft::new("Ship it", 1);

    draft.due_date = Some(now - Duration::hours(1));
    assert!(matches!(
        draft.validate(now).unwrap_err(),
        ValidationError::DueDateNotInFuture { .. }
    ));

    draft.due_date = Some(now);
    assert!(draft.validate(now).is_err());

    draft.due_date = Some(now + Duration::days(3));
    assert!(draft.validate(now).is_ok());

    draft.due_date = None;
    assert!(draft.validate(now).is_ok());
}

#[test]
fn task_text_limits() {
    let mut draft = TaskDraft::new("Fix", 1);
    draft.description = Some("x".repeat(2001));
    assert!(matches!(
        draft.validate(Utc::now()).unwrap_err(),
        ValidationError::TooLong { max: 2000, .. }
    ));

    let changes = TaskChanges {
        title: "t".repeat(256),
        description: None,
        status: TaskStatus::Todo,
        priority: TaskPriority::Low,
        due_date: None,
    };
    assert_eq!(changes.validate().unwrap_err().field(), "title");
}

#[test]
fn task_draft_defaults_on_normalize() {
    let task = TaskDraft::new("Fix", 4).into_new_task();
    assert_eq!(task.status, TaskStatus::Todo);
    assert_eq!(task.priority, TaskPriority::Medium);
    assert_eq!(task.project_id, 4);

    let project = ProjectDraft::new("Web", 2).into_new_project();
    assert_eq!(project.status, ProjectStatus::Active);
}
