mod common;

use common::{create_user, projects, tasks, users};
use rusqlite::Connection;
use taskboard_core::{
    open_db, open_db_in_memory, ConflictField, EntityKind, LookupKey, PageRequest, ProjectDraft,
    SecretHashError, SecretHasher, ServiceError, SqliteUserRepository, TaskDraft, User, UserDraft,
    UserPatch, UserRole, UserService,
};

struct BrokenHasher;

impl SecretHasher for BrokenHasher {
    fn hash_secret(&self, _plaintext: &str) -> Result<String, SecretHashError> {
        Err(SecretHashError::Hash("unavailable".to_string()))
    }

    fn verify_secret(&self, _plaintext: &str, _hash: &str) -> Result<bool, SecretHashError> {
        Err(SecretHashError::Hash("unavailable".to_string()))
    }
}

fn user_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn create_applies_defaults_and_stores_only_the_hash() {
    let conn = open_db_in_memory().unwrap();
    let alice = create_user(&conn, "alice");

    assert!(alice.id > 0);
    assert_eq!(alice.role, UserRole::User);
    assert!(alice.enabled);
    assert_eq!(alice.password_hash, "hashed:Str0ng@pass");
    assert!(alice.owned_project_ids.is_empty());
    assert!(alice.created_at > 0);

    let stored: String = conn
        .query_row(
            "SELECT password_hash FROM users WHERE id = ?1;",
            [alice.id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored, "hashed:Str0ng@pass");

    let json = serde_json::to_value(&alice).unwrap();
    assert!(json.get("password_hash").is_none());
    assert_eq!(json["role"], "USER");
}

#[test]
fn create_keeps_explicit_role_and_enabled() {
    let conn = open_db_in_memory().unwrap();
    let mut draft = UserDraft::new("root", "root@x.com", "Root", "Str0ng@pass");
    draft.role = Some(UserRole::Admin);
    draft.enabled = Some(false);

    let user = users(&conn).create(draft).unwrap();
    assert_eq!(user.role, UserRole::Admin);
    assert!(!user.enabled);
}

#[test]
fn duplicate_email_is_a_conflict() {
    let conn = open_db_in_memory().unwrap();
    create_user(&conn, "alice");

    let err = users(&conn)
        .create(UserDraft::new("alice2", "alice@x.com", "Alice Two", "Str0ng@pass"))
        .unwrap_err();
    match err {
        ServiceError::Conflict(fields) => assert_eq!(fields, vec![ConflictField::Email]),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(user_count(&conn), 1);
}

#[test]
fn conflict_reports_every_taken_field() {
    let conn = open_db_in_memory().unwrap();
    create_user(&conn, "alice");

    let err = users(&conn)
        .create(UserDraft::new("alice", "alice@x.com", "Alice", "Str0ng@pass"))
        .unwrap_err();
    assert_eq!(
        err.conflict_fields(),
        &[ConflictField::Username, ConflictField::Email]
    );
    assert_eq!(user_count(&conn), 1);
}

#[test]
fn email_uniqueness_is_case_sensitive() {
    let conn = open_db_in_memory().unwrap();
    create_user(&conn, "alice");

    let other = users(&conn)
        .create(UserDraft::new("alice2", "ALICE@x.com", "Alice Two", "Str0ng@pass"))
        .unwrap();
    assert_eq!(other.email, "ALICE@x.com");
}

#[test]
fn hasher_failure_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap(), BrokenHasher);

    let err = service
        .create(UserDraft::new("alice", "alice@x.com", "Alice", "Str0ng@pass"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Secret(_)));
    assert_eq!(user_count(&conn), 0);
}

#[test]
fn lookups_by_username_and_email() {
    let conn = open_db_in_memory().unwrap();
    let alice = create_user(&conn, "alice");
    let service = users(&conn);

    assert_eq!(service.get_by_id(alice.id).unwrap(), alice);
    assert_eq!(service.get_by_username("alice").unwrap().id, alice.id);
    assert_eq!(service.get_by_email("alice@x.com").unwrap().id, alice.id);

    match service.get_by_username("nobody").unwrap_err() {
        ServiceError::NotFound { entity, key } => {
            assert_eq!(entity, EntityKind::User);
            assert_eq!(key, LookupKey::Username("nobody".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(
        service.get_by_id(999).unwrap_err(),
        ServiceError::NotFound {
            key: LookupKey::Id(999),
            ..
        }
    ));
}

#[test]
fn list_all_pages_in_id_order() {
    let conn = open_db_in_memory().unwrap();
    let ids: Vec<i64> = ["ann", "bob", "cat"]
        .iter()
        .map(|name| create_user(&conn, name).id)
        .collect();
    let service = users(&conn);

    let first = service.list_all(&PageRequest::new(2, 0)).unwrap();
    assert_eq!(first.total, 3);
    assert_eq!(first.applied_limit, 2);
    assert!(first.has_more());
    assert_eq!(
        first.items.iter().map(|user| user.id).collect::<Vec<_>>(),
        ids[..2].to_vec()
    );

    let second = service.list_all(&PageRequest::new(2, 2)).unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].id, ids[2]);
    assert!(!second.has_more());
}

#[test]
fn list_by_role_filters() {
    let conn = open_db_in_memory().unwrap();
    create_user(&conn, "alice");
    let mut draft = UserDraft::new("boss", "boss@x.com", "Boss", "Str0ng@pass");
    draft.role = Some(UserRole::Manager);
    let boss = users(&conn).create(draft).unwrap();

    let managers = users(&conn).list_by_role(UserRole::Manager).unwrap();
    assert_eq!(managers.len(), 1);
    assert_eq!(managers[0].id, boss.id);
    assert!(users(&conn).list_by_role(UserRole::Admin).unwrap().is_empty());
}

#[test]
fn update_merges_present_fields_only() {
    let conn = open_db_in_memory().unwrap();
    let alice = create_user(&conn, "alice");

    let patch = UserPatch {
        full_name: Some("Alice Liddell".to_string()),
        ..UserPatch::default()
    };
    let updated = users(&conn).update(alice.id, &patch).unwrap();

    assert_eq!(updated.full_name, "Alice Liddell");
    assert_eq!(updated.email, alice.email);
    assert_eq!(updated.role, alice.role);
    assert_eq!(updated.enabled, alice.enabled);
    assert_eq!(updated.username, alice.username);
    assert_eq!(updated.password_hash, alice.password_hash);
}

#[test]
fn update_advances_updated_at_within_the_same_second() {
    let conn = open_db_in_memory().unwrap();
    let alice = create_user(&conn, "alice");
    let service = users(&conn);

    let first = service
        .update(
            alice.id,
            &UserPatch {
                enabled: Some(false),
                ..UserPatch::default()
            },
        )
        .unwrap();
    let second = service
        .update(
            alice.id,
            &UserPatch {
                enabled: Some(true),
                ..UserPatch::default()
            },
        )
        .unwrap();

    assert!(first.updated_at > alice.updated_at);
    assert!(second.updated_at > first.updated_at);
    assert_eq!(second.created_at, alice.created_at);
}

#[test]
fn update_merges_onto_the_row_as_stored_at_write_time() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskboard.db");
    let conn = open_db(&path).unwrap();
    let other = open_db(&path).unwrap();
    let alice = create_user(&conn, "alice");
    let snapshot = users(&conn).get_by_id(alice.id).unwrap();

    other
        .execute(
            "UPDATE users SET role = 'admin', email = 'alice@admin.org' WHERE id = ?1;",
            [alice.id],
        )
        .unwrap();

    let patch = UserPatch {
        full_name: Some("Alice Liddell".to_string()),
        ..UserPatch::default()
    };
    let updated = users(&conn).update(snapshot.id, &patch).unwrap();

    assert_eq!(updated.full_name, "Alice Liddell");
    assert_eq!(updated.role, UserRole::Admin);
    assert_eq!(updated.email, "alice@admin.org");
    assert_eq!(snapshot.role, UserRole::User);
}

#[test]
fn update_rejects_email_of_another_user() {
    let conn = open_db_in_memory().unwrap();
    let alice = create_user(&conn, "alice");
    create_user(&conn, "bob");

    let patch = UserPatch {
        email: Some("bob@x.com".to_string()),
        role: Some(UserRole::Admin),
        ..UserPatch::default()
    };
    let err = users(&conn).update(alice.id, &patch).unwrap_err();
    assert_eq!(err.conflict_fields(), &[ConflictField::Email]);

    let unchanged = users(&conn).get_by_id(alice.id).unwrap();
    assert_eq!(unchanged.email, "alice@x.com");
    assert_eq!(unchanged.role, UserRole::User);
}

#[test]
fn update_accepts_own_email_and_new_email() {
    let conn = open_db_in_memory().unwrap();
    let alice = create_user(&conn, "alice");
    let service = users(&conn);

    let same = UserPatch {
        email: Some("alice@x.com".to_string()),
        enabled: Some(false),
        ..UserPatch::default()
    };
    assert!(!service.update(alice.id, &same).unwrap().enabled);

    let changed = UserPatch {
        email: Some("alice@y.org".to_string()),
        ..UserPatch::default()
    };
    assert_eq!(service.update(alice.id, &changed).unwrap().email, "alice@y.org");
    assert!(service.get_by_email("alice@x.com").is_err());
}

#[test]
fn update_missing_user_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let err = users(&conn).update(42, &UserPatch::default()).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound {
            entity: EntityKind::User,
            ..
        }
    ));
}

#[test]
fn delete_cascades_to_owned_projects_and_clears_assignments() {
    let conn = open_db_in_memory().unwrap();
    let alice = create_user(&conn, "alice");
    let bob = create_user(&conn, "bob");
    let projects = projects(&conn);
    let tasks = tasks(&conn);

    let owned = projects.create(ProjectDraft::new("Alice Board", alice.id)).unwrap();
    let own_task_a = tasks.create(TaskDraft::new("Write intro", owned.id)).unwrap();
    let own_task_b = tasks.create(TaskDraft::new("Write outro", owned.id)).unwrap();

    let foreign = projects.create(ProjectDraft::new("Bob Board", bob.id)).unwrap();
    let foreign_task = tasks.create(TaskDraft::new("Review intro", foreign.id)).unwrap();
    tasks.assign(foreign_task.id, alice.id).unwrap();
    projects.add_member(foreign.id, alice.id).unwrap();
    projects.add_member(owned.id, bob.id).unwrap();

    users(&conn).delete(alice.id).unwrap();

    assert!(users(&conn).get_by_id(alice.id).is_err());
    assert!(projects.get_by_id(owned.id).is_err());
    assert!(tasks.get_by_id(own_task_a.id).is_err());
    assert!(tasks.get_by_id(own_task_b.id).is_err());

    let survivor = tasks.get_by_id(foreign_task.id).unwrap();
    assert_eq!(survivor.assignee_id, None);
    assert!(projects.get_by_id(foreign.id).unwrap().member_ids.is_empty());
    assert!(users(&conn).get_by_id(bob.id).unwrap().member_project_ids.is_empty());
}

#[test]
fn delete_missing_user_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    assert!(matches!(
        users(&conn).delete(7).unwrap_err(),
        ServiceError::NotFound {
            entity: EntityKind::User,
            key: LookupKey::Id(7)
        }
    ));
}

#[test]
fn verify_secret_checks_stored_hash() {
    let conn = open_db_in_memory().unwrap();
    let alice = create_user(&conn, "alice");

    assert!(users(&conn).verify_secret(alice.id, "Str0ng@pass").unwrap());
    assert!(!users(&conn).verify_secret(alice.id, "guess").unwrap());
}
