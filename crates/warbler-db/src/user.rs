use tracing::debug;

use crate::models::{DEFAULT_IMAGE_URL, Message, NewUser, User};
use crate::password::{hash_password, verify_password};
use crate::{Database, Result};

impl User {
    /// Build an unsaved user with a hashed password. Queue it with
    /// [`Session::add_user`](crate::Session::add_user); a missing or taken
    /// username or email is reported when the session commits.
    pub fn signup(
        username: Option<&str>,
        email: Option<&str>,
        password: &str,
        image_url: Option<&str>,
    ) -> Result<NewUser> {
        Ok(NewUser {
            username: username.map(str::to_owned),
            email: email.map(str::to_owned),
            password: hash_password(password)?,
            image_url: Some(image_url.unwrap_or(DEFAULT_IMAGE_URL).to_owned()),
            ..Default::default()
        })
    }

    /// Returns the user when `password` matches, `None` for an unknown
    /// username or a wrong password.
    pub fn authenticate(db: &Database, username: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = db.get_user_by_username(username)? else {
            debug!("Authentication failed: no user named {}", username);
            return Ok(None);
        };

        if verify_password(password, &user.password) {
            Ok(Some(user))
        } else {
            debug!("Authentication failed: wrong password for {}", username);
            Ok(None)
        }
    }

    pub fn is_following(&self, db: &Database, other: &User) -> Result<bool> {
        db.is_following(self.id, other.id)
    }

    pub fn is_followed_by(&self, db: &Database, other: &User) -> Result<bool> {
        db.is_following(other.id, self.id)
    }

    pub fn messages(&self, db: &Database) -> Result<Vec<Message>> {
        db.messages_by_user(self.id)
    }

    pub fn followers(&self, db: &Database) -> Result<Vec<User>> {
        db.followers_of(self.id)
    }

    pub fn following(&self, db: &Database) -> Result<Vec<User>> {
        db.following_of(self.id)
    }

    pub fn likes(&self, db: &Database) -> Result<Vec<Message>> {
        db.liked_messages(self.id)
    }
}

impl Message {
    pub fn author(&self, db: &Database) -> Result<Option<User>> {
        db.get_user(self.user_id)
    }

    pub fn liked_by(&self, db: &Database) -> Result<Vec<User>> {
        db.likers_of(self.id)
    }
}
