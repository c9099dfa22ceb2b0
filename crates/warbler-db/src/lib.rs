pub mod error;
pub mod migrations;
pub mod models;
pub mod password;
pub mod queries;
pub mod session;
pub mod user;

pub use error::{Result, StoreError};
pub use models::{Follow, Like, Message, NewMessage, NewUser, ProfileUpdate, User};
pub use session::{Committed, Pending, Session};

use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Self::init(conn, &path.display().to_string())
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, ":memory:")
    }

    /// Open the database named by a connection string such as the value of
    /// `DATABASE_URL`. Accepts `sqlite::memory:`, `:memory:`,
    /// `sqlite://path`, `sqlite:path` or a bare file path.
    pub fn connect(url: &str) -> Result<Self> {
        match parse_url(url)? {
            Target::Memory => Self::open_in_memory(),
            Target::File(path) => Self::open(Path::new(path)),
        }
    }

    fn init(conn: Connection, location: &str) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", location);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Start a unit of work. Nothing queued on it is visible until
    /// [`Session::commit`].
    pub fn session(&self) -> Session<'_> {
        Session::new(self)
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&mut conn)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Target<'a> {
    Memory,
    File(&'a str),
}

fn parse_url(url: &str) -> Result<Target<'_>> {
    let url = url.trim();
    // Drop connection options like `?mode=rwc`
    let url = url.split('?').next().unwrap_or(url);

    let path = if let Some(rest) = url.strip_prefix("sqlite://") {
        rest
    } else if let Some(rest) = url.strip_prefix("sqlite:") {
        rest
    } else if url.contains("://") {
        return Err(StoreError::UnsupportedUrl(url.to_string()));
    } else {
        url
    };

    match path {
        "" => Err(StoreError::UnsupportedUrl(url.to_string())),
        ":memory:" => Ok(Target::Memory),
        path => Ok(Target::File(path)),
    }
}
