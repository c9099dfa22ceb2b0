use rusqlite::{Connection, Params};
use tracing::info;

use crate::models::{Follow, Like, Message, User};
use crate::{Database, Result};

impl Database {
    // -- Users --

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.with_conn(|conn| {
            query_user(
                conn,
                &format!("SELECT {} FROM users WHERE id = ?1", User::COLUMNS),
                [id],
            )
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            query_user(
                conn,
                &format!("SELECT {} FROM users WHERE username = ?1", User::COLUMNS),
                [username],
            )
        })
    }

    /// Users whose username contains `needle`, alphabetically. An empty
    /// needle lists everyone.
    pub fn search_users(&self, needle: &str) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            query_users(
                conn,
                &format!(
                    "SELECT {} FROM users WHERE instr(username, ?1) > 0 ORDER BY username",
                    User::COLUMNS
                ),
                [needle],
            )
        })
    }

    // -- Messages --

    pub fn get_message(&self, id: i64) -> Result<Option<Message>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM messages WHERE id = ?1",
                Message::COLUMNS
            ))?;
            Ok(stmt.query_row([id], Message::from_row).optional()?)
        })
    }

    /// Messages written by `user_id`, newest first.
    pub fn messages_by_user(&self, user_id: i64) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            query_messages(
                conn,
                &format!(
                    "SELECT {} FROM messages WHERE user_id = ?1
                     ORDER BY timestamp DESC, id DESC",
                    Message::COLUMNS
                ),
                [user_id],
            )
        })
    }

    /// Messages by `user_id` and everyone they follow, newest first.
    pub fn timeline(&self, user_id: i64, limit: u32) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            query_messages(
                conn,
                "SELECT m.id, m.text, m.timestamp, m.user_id
                 FROM messages m
                 WHERE m.user_id = ?1
                    OR m.user_id IN (
                        SELECT user_being_followed_id FROM follows WHERE user_following_id = ?1
                    )
                 ORDER BY m.timestamp DESC, m.id DESC
                 LIMIT ?2",
                rusqlite::params![user_id, limit],
            )
        })
    }

    // -- Follows --

    pub fn is_following(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM follows
                    WHERE user_following_id = ?1 AND user_being_followed_id = ?2
                 )",
                [follower_id, followed_id],
                |row| row.get(0),
            )?)
        })
    }

    /// Users following `user_id`.
    pub fn followers_of(&self, user_id: i64) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            query_users(
                conn,
                "SELECT u.id, u.email, u.username, u.image_url, u.header_image_url,
                        u.bio, u.location, u.password
                 FROM users u
                 JOIN follows f ON f.user_following_id = u.id
                 WHERE f.user_being_followed_id = ?1
                 ORDER BY u.username",
                [user_id],
            )
        })
    }

    /// Users that `user_id` follows.
    pub fn following_of(&self, user_id: i64) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            query_users(
                conn,
                "SELECT u.id, u.email, u.username, u.image_url, u.header_image_url,
                        u.bio, u.location, u.password
                 FROM users u
                 JOIN follows f ON f.user_being_followed_id = u.id
                 WHERE f.user_following_id = ?1
                 ORDER BY u.username",
                [user_id],
            )
        })
    }

    pub fn follows_by_follower(&self, follower_id: i64) -> Result<Vec<Follow>> {
        self.with_conn(|conn| {
            query_follows(
                conn,
                "SELECT user_being_followed_id, user_following_id FROM follows
                 WHERE user_following_id = ?1",
                follower_id,
            )
        })
    }

    pub fn follows_by_followed(&self, followed_id: i64) -> Result<Vec<Follow>> {
        self.with_conn(|conn| {
            query_follows(
                conn,
                "SELECT user_being_followed_id, user_following_id FROM follows
                 WHERE user_being_followed_id = ?1",
                followed_id,
            )
        })
    }

    // -- Likes --

    pub fn likes_for_user(&self, user_id: i64) -> Result<Vec<Like>> {
        self.with_conn(|conn| {
            query_likes(
                conn,
                "SELECT id, user_id, message_id FROM likes WHERE user_id = ?1 ORDER BY id",
                user_id,
            )
        })
    }

    pub fn likes_for_message(&self, message_id: i64) -> Result<Vec<Like>> {
        self.with_conn(|conn| {
            query_likes(
                conn,
                "SELECT id, user_id, message_id FROM likes WHERE message_id = ?1 ORDER BY id",
                message_id,
            )
        })
    }

    /// Messages liked by `user_id`, most recently liked first.
    pub fn liked_messages(&self, user_id: i64) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            query_messages(
                conn,
                "SELECT m.id, m.text, m.timestamp, m.user_id
                 FROM messages m
                 JOIN likes l ON l.message_id = m.id
                 WHERE l.user_id = ?1
                 ORDER BY l.id DESC",
                [user_id],
            )
        })
    }

    pub fn likers_of(&self, message_id: i64) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            query_users(
                conn,
                "SELECT u.id, u.email, u.username, u.image_url, u.header_image_url,
                        u.bio, u.location, u.password
                 FROM users u
                 JOIN likes l ON l.user_id = u.id
                 WHERE l.message_id = ?1
                 ORDER BY l.id",
                [message_id],
            )
        })
    }

    // -- Maintenance --

    /// Delete every row from every table, association tables included.
    pub fn reset(&self) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute_batch(
                "DELETE FROM likes;
                 DELETE FROM follows;
                 DELETE FROM messages;
                 DELETE FROM users;",
            )?;
            tx.commit()?;
            Ok(())
        })?;

        info!("Database reset");
        Ok(())
    }
}

fn query_user<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Option<User>> {
    let mut stmt = conn.prepare(sql)?;
    let row = stmt.query_row(params, User::from_row).optional()?;
    Ok(row)
}

fn query_users<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, User::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_messages<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, Message::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_follows(conn: &Connection, sql: &str, id: i64) -> Result<Vec<Follow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([id], |row| {
            Ok(Follow {
                user_being_followed_id: row.get(0)?,
                user_following_id: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_likes(conn: &Connection, sql: &str, id: i64) -> Result<Vec<Like>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([id], |row| {
            Ok(Like {
                id: row.get(0)?,
                user_id: row.get(1)?,
                message_id: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> rusqlite::Result<Option<T>>;
}

impl<T> OptionalExt<T> for rusqlite::Result<T> {
    fn optional(self) -> rusqlite::Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
