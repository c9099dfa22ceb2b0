//! Warbler admin CLI
//!
//! Opens the database named by `DATABASE_URL` (or `--database-url`) and runs
//! one data-layer operation. Results are printed as JSON on stdout; logs go
//! to stderr.

mod config;

use std::process::ExitCode;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use warbler_db::{Database, NewMessage, User};
use warbler_types::models::{MessageView, TimelineEntry, UserProfile};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "warbler", version, about = "Administer a Warbler database")]
struct Cli {
    /// Connection string; overrides DATABASE_URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the schema if it does not exist yet
    Init,
    /// Delete every row from every table
    Reset,
    /// Create a user with a hashed password
    Signup {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        image_url: Option<String>,
    },
    /// Check a username/password pair; exits 1 when it does not match
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Post a message as a user
    Post {
        #[arg(long)]
        user_id: i64,
        text: String,
    },
    Follow {
        follower_id: i64,
        followed_id: i64,
    },
    Unfollow {
        follower_id: i64,
        followed_id: i64,
    },
    Like {
        user_id: i64,
        message_id: i64,
    },
    Unlike {
        user_id: i64,
        message_id: i64,
    },
    /// List a user's messages, newest first
    Messages { user_id: i64 },
    /// Messages by a user and everyone they follow
    Timeline {
        user_id: i64,
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
    /// List users whose username contains SEARCH
    Users {
        #[arg(default_value = "")]
        search: String,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warbler=info,warbler_db=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }

    let db = Database::connect(&config.database_url)
        .with_context(|| format!("opening {}", config.database_url))?;

    run(&db, cli.command)
}

fn run(db: &Database, command: Command) -> anyhow::Result<ExitCode> {
    match command {
        Command::Init => {
            info!("Schema ready");
            print_json(&json!({ "ok": true }))?;
        }
        Command::Reset => {
            db.reset()?;
            print_json(&json!({ "ok": true }))?;
        }
        Command::Signup {
            username,
            email,
            password,
            image_url,
        } => {
            let new_user = User::signup(
                Some(username.as_str()),
                Some(email.as_str()),
                &password,
                image_url.as_deref(),
            )?;

            let mut session = db.session();
            let pending = session.add_user(new_user);
            let id = session
                .commit()
                .context("signup failed")?
                .id(pending)
                .ok_or_else(|| anyhow!("signup produced no user id"))?;

            print_json(&require_user(db, id)?.profile())?;
        }
        Command::Login { username, password } => {
            let Some(user) = User::authenticate(db, &username, &password)? else {
                warn!("Invalid credentials for {}", username);
                return Ok(ExitCode::FAILURE);
            };
            print_json(&user.profile())?;
        }
        Command::Post { user_id, text } => {
            let mut session = db.session();
            let pending = session.add_message(NewMessage::new(text, Some(user_id)));
            let id = session
                .commit()
                .context("posting message failed")?
                .id(pending)
                .ok_or_else(|| anyhow!("post produced no message id"))?;

            let message = db
                .get_message(id)?
                .ok_or_else(|| anyhow!("message {} vanished after commit", id))?;
            print_json(&message.view())?;
        }
        Command::Follow {
            follower_id,
            followed_id,
        } => {
            let mut session = db.session();
            session.follow(follower_id, followed_id);
            session.commit().context("follow failed")?;
            print_json(&json!({ "ok": true }))?;
        }
        Command::Unfollow {
            follower_id,
            followed_id,
        } => {
            let mut session = db.session();
            session.unfollow(follower_id, followed_id);
            session.commit()?;
            print_json(&json!({ "ok": true }))?;
        }
        Command::Like {
            user_id,
            message_id,
        } => {
            let mut session = db.session();
            session.like(user_id, message_id);
            session.commit().context("like failed")?;
            print_json(&json!({ "ok": true }))?;
        }
        Command::Unlike {
            user_id,
            message_id,
        } => {
            let mut session = db.session();
            session.unlike(user_id, message_id);
            session.commit()?;
            print_json(&json!({ "ok": true }))?;
        }
        Command::Messages { user_id } => {
            let user = require_user(db, user_id)?;
            let views: Vec<MessageView> = user.messages(db)?.iter().map(|m| m.view()).collect();
            print_json(&views)?;
        }
        Command::Timeline { user_id, limit } => {
            require_user(db, user_id)?;

            let mut entries = Vec::new();
            for message in db.timeline(user_id, limit)? {
                let Some(author) = message.author(db)? else {
                    warn!("Message {} has no author", message.id);
                    continue;
                };
                entries.push(TimelineEntry {
                    message: message.view(),
                    author: author.profile(),
                });
            }
            print_json(&entries)?;
        }
        Command::Users { search } => {
            let profiles: Vec<UserProfile> =
                db.search_users(&search)?.iter().map(User::profile).collect();
            print_json(&profiles)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn require_user(db: &Database, id: i64) -> anyhow::Result<User> {
    db.get_user(id)?
        .ok_or_else(|| anyhow!("no user with id {}", id))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "warbler",
            "--database-url",
            "sqlite::memory:",
            "timeline",
            "3",
            "--limit",
            "20",
        ])
        .unwrap();

        assert_eq!(cli.database_url.as_deref(), Some("sqlite::memory:"));
        assert!(matches!(cli.command, Command::Timeline { user_id: 3, limit: 20 }));
    }

    #[test]
    fn signup_then_login_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let signup = Command::Signup {
            username: "user1".into(),
            email: "user1@gmail.com".into(),
            password: "password".into(),
            image_url: None,
        };
        assert_eq!(run(&db, signup).unwrap(), ExitCode::SUCCESS);

        let good = Command::Login {
            username: "user1".into(),
            password: "password".into(),
        };
        assert_eq!(run(&db, good).unwrap(), ExitCode::SUCCESS);

        let bad = Command::Login {
            username: "user1".into(),
            password: "wrongpass".into(),
        };
        assert_eq!(run(&db, bad).unwrap(), ExitCode::FAILURE);
    }

    #[test]
    fn messages_for_unknown_user_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        assert!(run(&db, Command::Messages { user_id: 9 }).is_err());
    }
}
