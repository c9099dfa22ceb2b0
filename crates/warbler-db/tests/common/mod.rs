//! Per-test fixture: an isolated database file, cleared before use.

#![allow(dead_code)]

use tempfile::TempDir;
use warbler_db::{Database, User};

pub struct Fixture {
    pub db: Database,
    // Dropped after `db` so the connection closes before the file goes away.
    _dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("warbler-test.db")).unwrap();
        db.reset().unwrap();
        Self { db, _dir: dir }
    }

    /// Sign up and commit `username` with id `id` and password "password".
    pub fn seed_user(&self, id: i64, username: &str) -> User {
        let email = format!("{username}@gmail.com");
        let new_user = User::signup(Some(username), Some(&email), "password", None)
            .unwrap()
            .with_id(id);

        let mut session = self.db.session();
        session.add_user(new_user);
        session.commit().unwrap();

        self.db.get_user(id).unwrap().unwrap()
    }
}
