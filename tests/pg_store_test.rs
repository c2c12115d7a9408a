//! Postgres event store tests
//!
//! Run only when `TEST_DATABASE_URL` points at a disposable database.

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use serial_test::serial;
use unihub::database::{create_pool, run_migrations, DatabasePool, DatabaseService, EventStore, PoolConfig};
use unihub::models::*;
use unihub::UniHubError;
use uuid::Uuid;

async fn setup() -> Option<(DatabasePool, DatabaseService)> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set, skipping Postgres store test");
            return None;
        }
    };

    let config = PoolConfig {
        max_connections: 5,
        ..PoolConfig::new(url)
    };
    let pool = create_pool(&config).await.expect("Failed to connect to test database");
    run_migrations(&pool).await.expect("Failed to run migrations");

    Some((pool.clone(), DatabaseService::new(pool)))
}

/// Seed a society with one member, returning (society_id, account_id)
async fn seed(pool: &DatabasePool) -> (i64, i64) {
    let (society_id,): (i64,) = sqlx::query_as("INSERT INTO societies (name) VALUES ($1) RETURNING id")
        .bind(format!("Chess Club {}", Uuid::new_v4()))
        .fetch_one(pool)
        .await
        .unwrap();
    let (account_id,): (i64,) = sqlx::query_as(
        "INSERT INTO accounts (email, display_name) VALUES ($1, 'Ada') RETURNING id"
    )
        .bind(format!("{}@uni.test", Uuid::new_v4()))
        .fetch_one(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO society_memberships (society_id, account_id, is_admin) VALUES ($1, $2, TRUE)")
        .bind(society_id)
        .bind(account_id)
        .execute(pool)
        .await
        .unwrap();

    (society_id, account_id)
}

fn request(society_id: i64, online: bool) -> CreateEventRequest {
    let start = Utc::now() + Duration::days(2);
    CreateEventRequest {
        society_id,
        name: "Blitz Night".to_string(),
        details: String::new(),
        location: "Union Room 2".to_string(),
        start_time: start,
        end_time: start + Duration::hours(2),
        online,
        interests: vec!["chess".to_string(), "games".to_string()],
    }
}

#[tokio::test]
#[serial]
async fn test_event_relations_and_counter() {
    let Some((pool, store)) = setup().await else { return };
    let (society_id, account_id) = seed(&pool).await;

    let event = store.insert_event(request(society_id, false)).await.unwrap();
    assert_eq!(event.interest_count, 0);
    assert_eq!(event.interests, vec!["chess".to_string(), "games".to_string()]);

    assert!(store.find_membership(society_id, account_id).await.unwrap().unwrap().is_admin);

    store.insert_relation(event.id, account_id).await.unwrap();
    assert_matches!(
        store.insert_relation(event.id, account_id).await,
        Err(UniHubError::AlreadyJoined { .. })
    );
    assert_eq!(store.adjust_interest_count(event.id, 1).await.unwrap(), 1);
    assert_eq!(store.adjust_interest_count(event.id, -1).await.unwrap(), 0);
    // Floored at zero
    assert_eq!(store.adjust_interest_count(event.id, -1).await.unwrap(), 0);

    let updated = store.update_event(event.id, UpdateEventRequest {
        name: Some("Rapid Night".to_string()),
        ..Default::default()
    }).await.unwrap();
    assert_eq!(updated.name, "Rapid Night");
    assert_eq!(updated.start_time, event.start_time);

    assert_eq!(store.list_subscribers(event.id).await.unwrap(), vec![account_id]);
    assert_eq!(store.delete_relations_for_event(event.id).await.unwrap(), 1);
    assert!(store.delete_event(event.id).await.unwrap());
    assert!(store.find_event(event.id).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn test_reminder_upsert_and_claim() {
    let Some((pool, store)) = setup().await else { return };
    let (society_id, account_id) = seed(&pool).await;
    let event = store.insert_event(request(society_id, false)).await.unwrap();

    let job = ReminderJob::for_start(account_id, event.id, ReminderLabel::InOneHour, event.start_time);
    let first = ScheduledReminder::from_job(&job, ReminderHandle::new(), Utc::now());
    assert!(store.upsert_reminder(first.clone()).await.unwrap().is_none());

    let second = ScheduledReminder::from_job(&job, ReminderHandle::new(), Utc::now());
    let replaced = store.upsert_reminder(second.clone()).await.unwrap().unwrap();
    assert_eq!(replaced.handle, first.handle);
    assert_eq!(store.list_reminders(event.id, account_id).await.unwrap().len(), 1);

    // A replaced handle can no longer be claimed
    assert!(store.take_reminder_by_handle(first.handle).await.unwrap().is_none());
    let claimed = store.take_reminder_by_handle(second.handle).await.unwrap().unwrap();
    assert_eq!(claimed.label, ReminderLabel::InOneHour);
    assert!(store.list_event_reminders(event.id).await.unwrap().is_empty());

    store.delete_event(event.id).await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_single_final_message() {
    let Some((pool, store)) = setup().await else { return };
    let (society_id, account_id) = seed(&pool).await;
    let event = store.insert_event(request(society_id, true)).await.unwrap();

    let message = |text: &str, is_final: bool| NewChatMessage {
        event_id: event.id,
        sender_id: account_id,
        text: text.to_string(),
        is_final,
    };

    let ordinary = store.insert_message(message("hello", false)).await.unwrap();
    let last = store.insert_message(message("The chat has ended", true)).await.unwrap();

    assert_matches!(store.insert_message(message("late", false)).await, Err(UniHubError::ChatEnded { .. }));
    assert_matches!(store.insert_message(message("again", true)).await, Err(UniHubError::ChatEnded { .. }));
    assert_matches!(store.delete_message(last.id).await, Err(UniHubError::ProtectedMessage { .. }));

    assert_eq!(store.find_final_message(event.id).await.unwrap().unwrap().id, last.id);
    assert_eq!(store.list_messages(event.id, false).await.unwrap(), vec![ordinary]);
    assert_eq!(store.delete_messages_for_event(event.id).await.unwrap(), 2);

    store.delete_event(event.id).await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_notifications() {
    let Some((pool, store)) = setup().await else { return };
    let (_, account_id) = seed(&pool).await;

    let first = store.insert_notification(account_id, "first").await.unwrap();
    let second = store.insert_notification(account_id, "second").await.unwrap();

    let inbox = store.list_notifications(account_id).await.unwrap();
    assert_eq!(inbox.iter().map(|n| n.id).collect::<Vec<_>>(), vec![second.id, first.id]);
    assert_eq!(store.count_unread_notifications(account_id).await.unwrap(), 2);

    assert!(store.mark_notification_read(first.id).await.unwrap().is_read);
    assert_eq!(store.count_unread_notifications(account_id).await.unwrap(), 1);
    assert_matches!(
        store.mark_notification_read(-1).await,
        Err(UniHubError::NotificationNotFound { .. })
    );
}
