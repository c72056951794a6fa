//! Store constructors and a deterministic hasher shared by the store tests.

#![allow(dead_code)]

use rusqlite::Connection;
use taskboard_core::{
    Project, ProjectDraft, ProjectService, SecretHashError, SecretHasher,
    SqliteProjectRepository, SqliteTaskRepository, SqliteUserRepository, TaskService, User,
    UserDraft, UserService,
};

/// Hashes by tagging the plaintext so tests can read stored hashes.
pub struct TaggingHasher;

impl SecretHasher for TaggingHasher {
    fn hash_secret(&self, plaintext: &str) -> Result<String, SecretHashError> {
        Ok(format!("hashed:{plaintext}"))
    }

    fn verify_secret(&self, plaintext: &str, hash: &str) -> Result<bool, SecretHashError> {
        Ok(hash == format!("hashed:{plaintext}"))
    }
}

pub fn users(conn: &Connection) -> UserService<SqliteUserRepository<'_>, TaggingHasher> {
    UserService::new(SqliteUserRepository::try_new(conn).unwrap(), TaggingHasher)
}

pub fn projects(conn: &Connection) -> ProjectService<SqliteProjectRepository<'_>> {
    ProjectService::new(SqliteProjectRepository::try_new(conn).unwrap())
}

pub fn tasks(conn: &Connection) -> TaskService<SqliteTaskRepository<'_>> {
    TaskService::new(SqliteTaskRepository::try_new(conn).unwrap())
}

pub fn create_user(conn: &Connection, username: &str) -> User {
    users(conn)
        .create(UserDraft::new(
            username,
            format!("{username}@x.com"),
            format!("{username} Example"),
            "Str0ng@pass",
        ))
        .unwrap()
}

pub fn create_project(conn: &Connection, name: &str, owner: &User) -> Project {
    projects(conn)
        .create(ProjectDraft::new(name, owner.id))
        .unwrap()
}
