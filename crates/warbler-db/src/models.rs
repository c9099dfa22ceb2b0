//! Entity types. Persisted entities map directly to SQLite rows; the `New*`
//! types are unsaved values queued on a [`Session`](crate::Session).

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Row;
use tracing::warn;
use warbler_types::models::{MessageView, UserProfile};

pub const DEFAULT_IMAGE_URL: &str = "/static/images/default-pic.png";
pub const DEFAULT_HEADER_IMAGE_URL: &str = "/static/images/warbler-hero.jpg";
pub const MAX_MESSAGE_LEN: usize = 140;

pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    /// Argon2 PHC string for users created through `signup`.
    pub password: String,
}

impl User {
    pub(crate) const COLUMNS: &'static str =
        "id, email, username, image_url, header_image_url, bio, location, password";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            username: row.get(2)?,
            image_url: row.get(3)?,
            header_image_url: row.get(4)?,
            bio: row.get(5)?,
            location: row.get(6)?,
            password: row.get(7)?,
        })
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            image_url: self.image_url.clone(),
            header_image_url: self.header_image_url.clone(),
            bio: self.bio.clone(),
            location: self.location.clone(),
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<User #{}: {}, {}>", self.id, self.username, self.email)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: i64,
}

impl Message {
    pub(crate) const COLUMNS: &'static str = "id, text, timestamp, user_id";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let id: i64 = row.get(0)?;
        let raw: String = row.get(2)?;
        let timestamp = parse_timestamp(&raw).unwrap_or_else(|| {
            warn!("Corrupt timestamp '{}' on message {}", raw, id);
            DateTime::default()
        });

        Ok(Self {
            id,
            text: row.get(1)?,
            timestamp,
            user_id: row.get(3)?,
        })
    }

    pub fn view(&self) -> MessageView {
        MessageView {
            id: self.id,
            user_id: self.user_id,
            text: self.text.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// "`user_following_id` follows `user_being_followed_id`".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Follow {
    pub user_being_followed_id: i64,
    pub user_following_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Like {
    pub id: i64,
    pub user_id: i64,
    pub message_id: i64,
}

/// An unsaved user. Required fields are optional here so that a missing
/// username or email surfaces as an integrity error at commit.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub id: Option<i64>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

impl NewUser {
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewMessage {
    pub id: Option<i64>,
    pub text: String,
    pub user_id: Option<i64>,
    /// Defaults to the commit time.
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewMessage {
    pub fn new(text: impl Into<String>, user_id: Option<i64>) -> Self {
        Self {
            text: text.into(),
            user_id,
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Profile edits. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    // SQLite stores timestamps without timezone; they are always UTC.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .map(|ndt| ndt.and_utc())
        .ok()
        .or_else(|| raw.parse::<DateTime<Utc>>().ok())
}
