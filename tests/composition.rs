// Composition tests — the write flows chained through the message log, its
// subscription, and the aggregator.
//
// Everything runs against an in-memory database. Image tests write to a temp
// directory; nothing touches the network.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use kindling::auth::{login, UserInfo};
use kindling::chat::compose::{annotate_backlog, send_image, send_text};
use kindling::chat::log::MessageLog;
use kindling::chat::models::{Entity, NewMessage, LOADING_IMAGE_URL, PROFILE_PLACEHOLDER_IMAGE_URL};
use kindling::chat::storage::{LocalObjectStore, ObjectStore};
use kindling::db::Database;
use kindling::output::{render_topic_line, TopicBoard};
use kindling::push::traits::Messaging;
use kindling::push::{register_device, Registration};
use kindling::topics::aggregator::WindowedTopicAggregator;
use kindling::topics::traits::EntityExtractor;

/// Treats every whitespace-separated word as an entity of salience 1.0.
struct WordExtractor;

impl EntityExtractor for WordExtractor {
    fn extract(&self, text: &str) -> Result<Vec<Entity>> {
        Ok(text
            .split_whitespace()
            .map(|w| Entity::new(w.to_lowercase(), 1.0))
            .collect())
    }
}

struct FailingExtractor;

impl EntityExtractor for FailingExtractor {
    fn extract(&self, _text: &str) -> Result<Vec<Entity>> {
        anyhow::bail!("annotator offline")
    }
}

/// Accepts nothing.
struct BrokenStore;

#[async_trait]
impl ObjectStore for BrokenStore {
    async fn put(&self, _object_path: &str, _bytes: Vec<u8>) -> Result<()> {
        anyhow::bail!("bucket unavailable")
    }

    async fn download_url(&self, _object_path: &str) -> Result<String> {
        anyhow::bail!("bucket unavailable")
    }
}

async fn setup(window_size: usize) -> (Arc<dyn Database>, MessageLog, UserInfo) {
    let db = kindling::db::in_memory().unwrap();
    let user = login(db.as_ref(), "Ana", None).await.unwrap();
    let log = MessageLog::open(db.clone(), window_size).await.unwrap();
    (db, log, user)
}

// ============================================================
// Chain: send_text -> window -> aggregator -> topic line
// ============================================================

#[tokio::test]
async fn sent_text_reaches_the_topic_line() {
    let (_db, log, user) = setup(12).await;

    send_text(&log, Some(&user), "cats dogs", &WordExtractor).await.unwrap();
    send_text(&log, Some(&user), "cats", &WordExtractor).await.unwrap();

    let result = WindowedTopicAggregator::default().on_window_changed(log.current().entries());
    assert_eq!(render_topic_line(&result), "cats, dogs");
}

#[tokio::test]
async fn text_message_uses_placeholder_photo() {
    let (_db, log, user) = setup(12).await;
    send_text(&log, Some(&user), "hello", &WordExtractor).await.unwrap();

    let window = log.current();
    let entry = &window.entries()[0];
    assert_eq!(entry.author, "Ana");
    assert_eq!(entry.author_photo_url.as_deref(), Some(PROFILE_PLACEHOLDER_IMAGE_URL));
}

#[tokio::test]
async fn blank_text_is_not_sent() {
    let (db, log, user) = setup(12).await;
    let key = send_text(&log, Some(&user), "   ", &WordExtractor).await.unwrap();
    assert!(key.is_none());
    assert_eq!(db.message_count().await.unwrap(), 0);
}

#[tokio::test]
async fn signed_out_text_is_rejected() {
    let (db, log, _user) = setup(12).await;
    let err = send_text(&log, None, "hello", &WordExtractor).await.unwrap_err();
    assert!(err.to_string().contains("sign-in"));
    assert_eq!(db.message_count().await.unwrap(), 0);
}

#[tokio::test]
async fn failed_annotation_keeps_the_message() {
    let (db, log, user) = setup(12).await;
    let key = send_text(&log, Some(&user), "cats", &FailingExtractor)
        .await
        .unwrap();
    assert!(key.is_some());
    assert_eq!(db.message_count().await.unwrap(), 1);

    let result = WindowedTopicAggregator::default().on_window_changed(log.current().entries());
    assert!(!result.has_entities);

    // The backlog pass picks it up later
    let annotated = annotate_backlog(&log, &WordExtractor, 50).await.unwrap();
    assert_eq!(annotated, 1);
    let result = WindowedTopicAggregator::default().on_window_changed(log.current().entries());
    assert_eq!(result.topic_names(), vec!["cats"]);
}

// ============================================================
// Subscription semantics
// ============================================================

#[tokio::test]
async fn subscribers_see_each_new_window() {
    let (_db, log, user) = setup(12).await;
    let mut rx = log.subscribe();
    assert!(rx.borrow_and_update().is_empty());

    send_text(&log, Some(&user), "volcano", &WordExtractor).await.unwrap();

    assert!(rx.has_changed().unwrap());
    let window = rx.borrow_and_update().clone();
    assert_eq!(window.len(), 1);
    assert_eq!(window.entries()[0].text.as_deref(), Some("volcano"));
}

#[tokio::test]
async fn entities_falling_out_of_the_window_clear_the_board() {
    let (_db, log, user) = setup(2).await;
    let aggregator = WindowedTopicAggregator::new(log.window_size());
    let mut board = TopicBoard::default();

    send_text(&log, Some(&user), "cats", &WordExtractor).await.unwrap();
    board.apply(&aggregator.on_window_changed(log.current().entries()));
    assert_eq!(board.line(), "cats");

    // Two unannotated messages push "cats" out of a two-entry window
    for _ in 0..2 {
        send_text(&log, Some(&user), "meow", &FailingExtractor).await.unwrap();
    }
    board.apply(&aggregator.on_window_changed(log.current().entries()));
    assert_eq!(board.line(), "");
}

#[tokio::test]
async fn writes_from_another_handle_arrive_on_refresh() {
    let (db, log, _user) = setup(12).await;
    let mut rx = log.subscribe();
    rx.borrow_and_update();

    // Bypass the log, as another process would
    let key = db
        .insert_message(&NewMessage {
            author: "Ben".to_string(),
            author_photo_url: PROFILE_PLACEHOLDER_IMAGE_URL.to_string(),
            text: Some("tides".to_string()),
            image_url: None,
        })
        .await
        .unwrap();
    db.set_entities(key, &[Entity::new("tides", 0.8)]).await.unwrap();
    assert!(!rx.has_changed().unwrap());

    assert!(log.refresh().await.unwrap());
    assert!(rx.has_changed().unwrap());
    let result = WindowedTopicAggregator::default().on_window_changed(rx.borrow().entries());
    assert_eq!(result.topic_names(), vec!["tides"]);
}

// ============================================================
// Image flow: placeholder -> upload -> URL patch
// ============================================================

#[tokio::test]
async fn image_replaces_placeholder_with_stored_url() {
    let (_db, log, user) = setup(12).await;
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("cat.png");
    std::fs::write(&file, [0x89, b'P', b'N', b'G']).unwrap();
    let store = LocalObjectStore::new(dir.path().join("uploads"));

    let key = send_image(&log, Some(&user), &store, &file).await.unwrap();

    let window = log.current();
    let url = window.entries()[0].image_url.clone().unwrap();
    assert_ne!(url, LOADING_IMAGE_URL);
    assert!(url.ends_with(&format!("{}/{}/cat.png", user.uid, key)));
    assert!(dir
        .path()
        .join("uploads")
        .join(&user.uid)
        .join(key.to_string())
        .join("cat.png")
        .exists());
}

#[tokio::test]
async fn failed_upload_leaves_placeholder() {
    let (db, log, user) = setup(12).await;
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("cat.jpg");
    std::fs::write(&file, [0xFF, 0xD8]).unwrap();

    let err = send_image(&log, Some(&user), &BrokenStore, &file)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("uploading"));

    assert_eq!(db.message_count().await.unwrap(), 1);
    let window = log.current();
    assert_eq!(window.entries()[0].image_url.as_deref(), Some(LOADING_IMAGE_URL));
}

#[tokio::test]
async fn non_images_are_rejected_before_anything_is_written() {
    let (db, log, user) = setup(12).await;
    let dir = tempfile::tempdir().unwrap();
    let store = LocalObjectStore::new(dir.path());

    let err = send_image(&log, Some(&user), &store, Path::new("notes.txt"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("only share images"));

    // The type check comes before the sign-in check
    let err = send_image(&log, None, &store, Path::new("notes.txt"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("only share images"));

    assert_eq!(db.message_count().await.unwrap(), 0);
}

#[tokio::test]
async fn signed_out_image_is_rejected() {
    let (db, log, _user) = setup(12).await;
    let dir = tempfile::tempdir().unwrap();
    let store = LocalObjectStore::new(dir.path());

    let err = send_image(&log, None, &store, Path::new("cat.png"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("sign-in"));
    assert_eq!(db.message_count().await.unwrap(), 0);
}

// ============================================================
// Push registration: token -> permission -> retry
// ============================================================

/// Hands out a token only after permission has been requested
/// `grant_after` times.
struct FakeMessaging {
    grant_after: usize,
    deny: bool,
    requests: AtomicUsize,
}

impl FakeMessaging {
    fn new(grant_after: usize) -> Self {
        Self {
            grant_after,
            deny: false,
            requests: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Messaging for FakeMessaging {
    async fn get_token(&self) -> Result<Option<String>> {
        if self.requests.load(Ordering::SeqCst) >= self.grant_after {
            Ok(Some("device-token".to_string()))
        } else {
            Ok(None)
        }
    }

    async fn request_permission(&self) -> Result<()> {
        if self.deny {
            anyhow::bail!("denied");
        }
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn existing_token_registers_without_asking() {
    let (db, _log, user) = setup(12).await;
    let messaging = FakeMessaging::new(0);

    let outcome = register_device(&messaging, db.as_ref(), &user).await.unwrap();
    assert_eq!(
        outcome,
        Registration::Registered {
            token: "device-token".to_string()
        }
    );
    assert_eq!(messaging.requests.load(Ordering::SeqCst), 0);
    assert_eq!(db.device_token_count(&user.uid).await.unwrap(), 1);
}

#[tokio::test]
async fn missing_token_asks_permission_then_retries() {
    let (db, _log, user) = setup(12).await;
    let messaging = FakeMessaging::new(1);

    let outcome = register_device(&messaging, db.as_ref(), &user).await.unwrap();
    assert!(matches!(outcome, Registration::Registered { .. }));
    assert_eq!(messaging.requests.load(Ordering::SeqCst), 1);
    assert_eq!(db.device_token_count(&user.uid).await.unwrap(), 1);
}

#[tokio::test]
async fn retry_happens_only_once() {
    let (db, _log, user) = setup(12).await;
    let messaging = FakeMessaging::new(5);

    let outcome = register_device(&messaging, db.as_ref(), &user).await.unwrap();
    assert_eq!(outcome, Registration::PermissionPending);
    assert_eq!(messaging.requests.load(Ordering::SeqCst), 1);
    assert_eq!(db.device_token_count(&user.uid).await.unwrap(), 0);
}

#[tokio::test]
async fn denied_permission_is_an_error() {
    let (db, _log, user) = setup(12).await;
    let messaging = FakeMessaging {
        grant_after: 1,
        deny: true,
        requests: AtomicUsize::new(0),
    };

    let err = register_device(&messaging, db.as_ref(), &user)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("permission to notify"));
    assert_eq!(db.device_token_count(&user.uid).await.unwrap(), 0);
}
