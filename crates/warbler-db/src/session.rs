//! Unit of work: changes are queued in memory and applied atomically on
//! commit. Constraint checking is left to the database, so queuing never
//! fails and a violation surfaces from [`Session::commit`] as
//! [`StoreError::Integrity`](crate::StoreError::Integrity).

use chrono::Utc;
use rusqlite::{Connection, params};
use tracing::{debug, warn};

use crate::models::{
    DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL, NewMessage, NewUser, ProfileUpdate,
    format_timestamp,
};
use crate::{Database, Result};

/// Ticket for a queued change, used to look up the row id it produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pending(usize);

/// Outcome of a successful commit.
#[derive(Debug, Default)]
pub struct Committed {
    ids: Vec<Option<i64>>,
}

impl Committed {
    /// Row id produced by an insert. `None` for changes that insert nothing
    /// with an id of its own (follows, deletes, updates).
    pub fn id(&self, pending: Pending) -> Option<i64> {
        self.ids.get(pending.0).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug)]
enum Change {
    InsertUser(NewUser),
    InsertMessage(NewMessage),
    UpdateProfile { user_id: i64, update: ProfileUpdate },
    DeleteUser(i64),
    DeleteMessage(i64),
    Follow { follower_id: i64, followed_id: i64 },
    Unfollow { follower_id: i64, followed_id: i64 },
    Like { user_id: i64, message_id: i64 },
    Unlike { user_id: i64, message_id: i64 },
}

pub struct Session<'db> {
    db: &'db Database,
    pending: Vec<Change>,
}

impl<'db> Session<'db> {
    pub(crate) fn new(db: &'db Database) -> Self {
        Self {
            db,
            pending: Vec::new(),
        }
    }

    fn push(&mut self, change: Change) -> Pending {
        self.pending.push(change);
        Pending(self.pending.len() - 1)
    }

    pub fn add_user(&mut self, user: NewUser) -> Pending {
        self.push(Change::InsertUser(user))
    }

    pub fn add_message(&mut self, message: NewMessage) -> Pending {
        self.push(Change::InsertMessage(message))
    }

    pub fn update_profile(&mut self, user_id: i64, update: ProfileUpdate) -> Pending {
        self.push(Change::UpdateProfile { user_id, update })
    }

    /// Removes the user along with their messages, follows and likes.
    pub fn delete_user(&mut self, user_id: i64) -> Pending {
        self.push(Change::DeleteUser(user_id))
    }

    pub fn delete_message(&mut self, message_id: i64) -> Pending {
        self.push(Change::DeleteMessage(message_id))
    }

    pub fn follow(&mut self, follower_id: i64, followed_id: i64) -> Pending {
        self.push(Change::Follow {
            follower_id,
            followed_id,
        })
    }

    pub fn unfollow(&mut self, follower_id: i64, followed_id: i64) -> Pending {
        self.push(Change::Unfollow {
            follower_id,
            followed_id,
        })
    }

    pub fn like(&mut self, user_id: i64, message_id: i64) -> Pending {
        self.push(Change::Like {
            user_id,
            message_id,
        })
    }

    pub fn unlike(&mut self, user_id: i64, message_id: i64) -> Pending {
        self.push(Change::Unlike {
            user_id,
            message_id,
        })
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Apply every queued change in one transaction, in queue order.
    ///
    /// On failure nothing from the batch is persisted. The queue is emptied
    /// either way.
    pub fn commit(&mut self) -> Result<Committed> {
        let changes = std::mem::take(&mut self.pending);
        if changes.is_empty() {
            return Ok(Committed::default());
        }

        let ids = self
            .db
            .with_conn_mut(|conn| {
                let tx = conn.transaction()?;
                let ids = changes
                    .iter()
                    .map(|change| apply(&tx, change))
                    .collect::<Result<Vec<_>>>()?;
                tx.commit()?;
                Ok(ids)
            })
            .inspect_err(|e| warn!("Commit of {} change(s) failed: {}", changes.len(), e))?;

        debug!("Committed {} change(s)", ids.len());
        Ok(Committed { ids })
    }

    /// Discard every queued change.
    pub fn rollback(&mut self) {
        if !self.pending.is_empty() {
            debug!("Rolled back {} pending change(s)", self.pending.len());
            self.pending.clear();
        }
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.rollback();
    }
}

fn apply(conn: &Connection, change: &Change) -> Result<Option<i64>> {
    match change {
        Change::InsertUser(user) => {
            conn.execute(
                "INSERT INTO users
                    (id, email, username, image_url, header_image_url, bio, location, password)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    user.id,
                    user.email,
                    user.username,
                    user.image_url.as_deref().unwrap_or(DEFAULT_IMAGE_URL),
                    user.header_image_url
                        .as_deref()
                        .unwrap_or(DEFAULT_HEADER_IMAGE_URL),
                    user.bio,
                    user.location,
                    user.password,
                ],
            )?;
            Ok(Some(conn.last_insert_rowid()))
        }
        Change::InsertMessage(message) => {
            let timestamp = message.timestamp.unwrap_or_else(Utc::now);
            conn.execute(
                "INSERT INTO messages (id, text, timestamp, user_id) VALUES (?1, ?2, ?3, ?4)",
                params![
                    message.id,
                    message.text,
                    format_timestamp(&timestamp),
                    message.user_id,
                ],
            )?;
            Ok(Some(conn.last_insert_rowid()))
        }
        Change::UpdateProfile { user_id, update } => {
            conn.execute(
                "UPDATE users SET
                    username = COALESCE(?2, username),
                    email = COALESCE(?3, email),
                    image_url = COALESCE(?4, image_url),
                    header_image_url = COALESCE(?5, header_image_url),
                    bio = COALESCE(?6, bio),
                    location = COALESCE(?7, location)
                 WHERE id = ?1",
                params![
                    user_id,
                    update.username,
                    update.email,
                    update.image_url,
                    update.header_image_url,
                    update.bio,
                    update.location,
                ],
            )?;
            Ok(None)
        }
        Change::DeleteUser(user_id) => {
            conn.execute("DELETE FROM users WHERE id = ?1", [user_id])?;
            Ok(None)
        }
        Change::DeleteMessage(message_id) => {
            conn.execute("DELETE FROM messages WHERE id = ?1", [message_id])?;
            Ok(None)
        }
        Change::Follow {
            follower_id,
            followed_id,
        } => {
            conn.execute(
                "INSERT INTO follows (user_being_followed_id, user_following_id) VALUES (?1, ?2)",
                [followed_id, follower_id],
            )?;
            Ok(None)
        }
        Change::Unfollow {
            follower_id,
            followed_id,
        } => {
            conn.execute(
                "DELETE FROM follows WHERE user_being_followed_id = ?1 AND user_following_id = ?2",
                [followed_id, follower_id],
            )?;
            Ok(None)
        }
        Change::Like {
            user_id,
            message_id,
        } => {
            conn.execute(
                "INSERT INTO likes (user_id, message_id) VALUES (?1, ?2)",
                [user_id, message_id],
            )?;
            Ok(Some(conn.last_insert_rowid()))
        }
        Change::Unlike {
            user_id,
            message_id,
        } => {
            conn.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND message_id = ?2",
                [user_id, message_id],
            )?;
            Ok(None)
        }
    }
}
