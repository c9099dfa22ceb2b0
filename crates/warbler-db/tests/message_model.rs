mod common;

use chrono::{Duration, TimeZone, Utc};
use common::Fixture;
use warbler_db::models::MAX_MESSAGE_LEN;
use warbler_db::{NewMessage, StoreError};

#[test]
fn message_shows_up_in_authors_messages() {
    let fx = Fixture::new();
    let user1 = fx.seed_user(1, "user1");

    let mut session = fx.db.session();
    session.add_message(NewMessage::new("testing 1 2...", Some(1)));
    session.commit().unwrap();

    let messages = user1.messages(&fx.db).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, "testing 1 2...");
    assert_eq!(messages[0].author(&fx.db).unwrap(), Some(user1));
}

#[test]
fn liking_a_message_creates_one_like_row() {
    let fx = Fixture::new();
    fx.seed_user(1, "user1");
    let user2 = fx.seed_user(2, "user2");

    let mut session = fx.db.session();
    let message = session.add_message(NewMessage::new("testing, testing", Some(1)));
    let message_id = session.commit().unwrap().id(message).unwrap();

    session.like(user2.id, message_id);
    session.commit().unwrap();

    let likes = fx.db.likes_for_user(2).unwrap();
    assert_eq!(likes.len(), 1);
    assert_eq!(likes[0].message_id, message_id);

    let liked = user2.likes(&fx.db).unwrap();
    assert_eq!(liked.len(), 1);
    assert_eq!(liked[0].text, "testing, testing");
    assert_eq!(liked[0].liked_by(&fx.db).unwrap(), vec![user2]);
}

#[test]
fn liking_twice_is_an_integrity_error() {
    let fx = Fixture::new();
    let user1 = fx.seed_user(1, "user1");

    let mut session = fx.db.session();
    let message = session.add_message(NewMessage::new("like me", Some(user1.id)));
    let message_id = session.commit().unwrap().id(message).unwrap();

    session.like(user1.id, message_id);
    session.like(user1.id, message_id);
    assert!(session.commit().unwrap_err().is_integrity());
    assert!(fx.db.likes_for_message(message_id).unwrap().is_empty());
}

#[test]
fn unlike_removes_the_row() {
    let fx = Fixture::new();
    let user1 = fx.seed_user(1, "user1");

    let mut session = fx.db.session();
    let message = session.add_message(NewMessage::new("meh", Some(user1.id)));
    let message_id = session.commit().unwrap().id(message).unwrap();

    session.like(user1.id, message_id);
    session.commit().unwrap();
    session.unlike(user1.id, message_id);
    session.commit().unwrap();

    assert!(fx.db.likes_for_user(user1.id).unwrap().is_empty());
}

#[test]
fn message_without_author_fails_at_commit() {
    let fx = Fixture::new();

    let mut session = fx.db.session();
    session.add_message(NewMessage::new("orphan", None));

    let err = session.commit().unwrap_err();
    assert!(matches!(err, StoreError::Integrity { .. }), "got {err:?}");
}

#[test]
fn message_for_missing_user_fails_at_commit() {
    let fx = Fixture::new();

    let mut session = fx.db.session();
    session.add_message(NewMessage::new("who am i", Some(42)));
    assert!(session.commit().unwrap_err().is_integrity());
}

#[test]
fn message_over_length_limit_fails_at_commit() {
    let fx = Fixture::new();
    fx.seed_user(1, "user1");

    let mut session = fx.db.session();
    session.add_message(NewMessage::new("x".repeat(MAX_MESSAGE_LEN + 1), Some(1)));
    assert!(session.commit().unwrap_err().is_integrity());

    session.add_message(NewMessage::new("x".repeat(MAX_MESSAGE_LEN), Some(1)));
    session.commit().unwrap();
}

#[test]
fn messages_come_back_newest_first() {
    let fx = Fixture::new();
    let user1 = fx.seed_user(1, "user1");
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

    let mut session = fx.db.session();
    session.add_message(NewMessage::new("first", Some(1)).at(start));
    session.add_message(NewMessage::new("third", Some(1)).at(start + Duration::minutes(2)));
    session.add_message(NewMessage::new("second", Some(1)).at(start + Duration::minutes(1)));
    session.commit().unwrap();

    let texts: Vec<String> = user1
        .messages(&fx.db)
        .unwrap()
        .into_iter()
        .map(|m| m.text)
        .collect();
    assert_eq!(texts, vec!["third", "second", "first"]);

    let newest = &user1.messages(&fx.db).unwrap()[0];
    assert_eq!(newest.timestamp, start + Duration::minutes(2));
}

#[test]
fn timeline_has_own_and_followed_messages_only() {
    let fx = Fixture::new();
    let user1 = fx.seed_user(1, "user1");
    fx.seed_user(2, "user2");
    fx.seed_user(3, "user3");
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

    let mut session = fx.db.session();
    session.follow(user1.id, 2);
    session.add_message(NewMessage::new("mine", Some(1)).at(start));
    session.add_message(NewMessage::new("followed", Some(2)).at(start + Duration::minutes(1)));
    session.add_message(NewMessage::new("stranger", Some(3)).at(start + Duration::minutes(2)));
    session.commit().unwrap();

    let texts: Vec<String> = fx
        .db
        .timeline(user1.id, 100)
        .unwrap()
        .into_iter()
        .map(|m| m.text)
        .collect();
    assert_eq!(texts, vec!["followed", "mine"]);

    assert_eq!(fx.db.timeline(user1.id, 1).unwrap().len(), 1);
}

#[test]
fn deleting_a_message_removes_its_likes() {
    let fx = Fixture::new();
    let user1 = fx.seed_user(1, "user1");

    let mut session = fx.db.session();
    let message = session.add_message(NewMessage::new("regret", Some(1)));
    let message_id = session.commit().unwrap().id(message).unwrap();
    session.like(user1.id, message_id);
    session.commit().unwrap();

    session.delete_message(message_id);
    session.commit().unwrap();

    assert!(user1.messages(&fx.db).unwrap().is_empty());
    assert!(fx.db.likes_for_user(user1.id).unwrap().is_empty());
}

#[test]
fn reset_clears_likes_too() {
    let fx = Fixture::new();
    let user1 = fx.seed_user(1, "user1");

    let mut session = fx.db.session();
    let message = session.add_message(NewMessage::new("ephemeral", Some(1)));
    let message_id = session.commit().unwrap().id(message).unwrap();
    session.like(user1.id, message_id);
    session.commit().unwrap();

    fx.db.reset().unwrap();

    let leftover: i64 = fx
        .db
        .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM likes", [], |r| r.get(0))?))
        .unwrap();
    assert_eq!(leftover, 0);
    assert!(fx.db.search_users("").unwrap().is_empty());
}
