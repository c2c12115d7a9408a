//! Engagement coordinator integration tests

mod helpers;

use std::collections::HashSet;
use assert_matches::assert_matches;
use chrono::Duration;
use futures::future::join_all;
use proptest::prelude::*;
use unihub::database::EventStore;
use unihub::models::{EventStatus, UpdateEventRequest};
use unihub::services::ReminderScheduler;
use unihub::{ErrorKind, UniHubError};
use helpers::*;

#[tokio::test]
async fn test_join_leave_counts() {
    let ctx = TestContext::new();
    let event = ctx.create_event(false).await;
    let (a, b) = (ctx.members[0].id, ctx.members[1].id);

    assert_eq!(ctx.coordinator().join(event.id, a).await.unwrap(), 1);
    assert_eq!(ctx.coordinator().join(event.id, b).await.unwrap(), 2);
    assert_eq!(ctx.coordinator().leave(event.id, a).await.unwrap(), 1);
    assert_matches!(
        ctx.coordinator().leave(event.id, a).await,
        Err(UniHubError::NotJoined { .. })
    );

    let event = ctx.coordinator().get_event(event.id).await.unwrap();
    assert_eq!(event.interest_count, 1);
    assert_eq!(ctx.coordinator().subscribers(event.id).await.unwrap(), vec![b]);
}

#[tokio::test]
async fn test_join_twice_is_rejected() {
    let ctx = TestContext::new();
    let event = ctx.create_event(false).await;
    let account = ctx.members[0].id;

    ctx.coordinator().join(event.id, account).await.unwrap();
    let err = ctx.coordinator().join(event.id, account).await.unwrap_err();
    assert_matches!(err, UniHubError::AlreadyJoined { .. });
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(ctx.coordinator().get_event(event.id).await.unwrap().interest_count, 1);
}

#[tokio::test]
async fn test_join_finished_event() {
    let ctx = TestContext::new();
    let event = ctx.create_event(false).await;

    ctx.clock.set(event_end() + Duration::minutes(1));
    let err = ctx.coordinator().join(event.id, ctx.members[0].id).await.unwrap_err();
    assert_matches!(err, UniHubError::EventFinished { .. });
    assert_eq!(err.kind(), ErrorKind::State);
}

#[tokio::test]
async fn test_join_ongoing_event_is_allowed() {
    let ctx = TestContext::new();
    let event = ctx.create_event(false).await;

    ctx.clock.set(event_end());
    assert_eq!(ctx.coordinator().join(event.id, ctx.members[0].id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_membership_is_checked_first() {
    let ctx = TestContext::new();
    let event = ctx.create_event(false).await;

    // Finished as well, but membership is reported first
    ctx.clock.set(event_end() + Duration::days(1));
    let err = ctx.coordinator().join(event.id, ctx.outsider.id).await.unwrap_err();
    assert_matches!(err, UniHubError::NotMemberOfSociety { .. });
    assert_eq!(err.kind(), ErrorKind::Authorization);
}

#[tokio::test]
async fn test_unknown_event() {
    let ctx = TestContext::new();
    assert_matches!(
        ctx.coordinator().join(424242, ctx.members[0].id).await,
        Err(UniHubError::EventNotFound { event_id: 424242 })
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_and_leaves_keep_count_consistent() {
    let ctx = TestContext::new_with_config(TestConfig { member_count: 24, ..Default::default() });
    let event = ctx.create_event(false).await;

    let joins = ctx.members.iter().map(|member| {
        let coordinator = ctx.services.coordinator.clone();
        let (event_id, account_id) = (event.id, member.id);
        tokio::spawn(async move { coordinator.join(event_id, account_id).await })
    });
    let results = join_all(joins).await;
    let mut counts: Vec<i32> = results.into_iter().map(|r| r.unwrap().unwrap()).collect();
    counts.sort();
    assert_eq!(counts, (1..=24).collect::<Vec<_>>());

    let leaves = ctx.members.iter().step_by(2).map(|member| {
        let coordinator = ctx.services.coordinator.clone();
        let (event_id, account_id) = (event.id, member.id);
        tokio::spawn(async move { coordinator.leave(event_id, account_id).await })
    });
    for result in join_all(leaves).await {
        result.unwrap().unwrap();
    }

    let event = ctx.coordinator().get_event(event.id).await.unwrap();
    assert_eq!(event.interest_count, 12);
    assert_eq!(ctx.store.count_relations(event.id).await.unwrap(), 12);
}

#[tokio::test]
async fn test_counter_contention_is_retried() {
    let ctx = TestContext::new();
    let event = ctx.create_event(false).await;

    ctx.store.fail_next_adjustments(2);
    assert_eq!(ctx.coordinator().join(event.id, ctx.members[0].id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_counter_contention_surfaces_transient_error() {
    let ctx = TestContext::new();
    let event = ctx.create_event(false).await;
    let account = ctx.members[0].id;

    ctx.store.fail_next_adjustments(3);
    let err = ctx.coordinator().join(event.id, account).await.unwrap_err();
    assert_matches!(err, UniHubError::Transient(_));
    assert_eq!(err.kind(), ErrorKind::Transient);

    // The relation is rolled back and nothing was armed
    assert!(ctx.store.find_relation(event.id, account).await.unwrap().is_none());
    assert_eq!(ctx.coordinator().get_event(event.id).await.unwrap().interest_count, 0);
    assert_eq!(ctx.store.reminder_count(), 0);

    // A later attempt goes through
    assert_eq!(ctx.coordinator().join(event.id, account).await.unwrap(), 1);
}

#[tokio::test]
async fn test_failed_leave_restores_relation() {
    let ctx = TestContext::new();
    let event = ctx.create_event(false).await;
    let account = ctx.members[0].id;
    ctx.coordinator().join(event.id, account).await.unwrap();

    ctx.store.fail_next_adjustments(3);
    assert_matches!(ctx.coordinator().leave(event.id, account).await, Err(UniHubError::Transient(_)));
    assert!(ctx.store.find_relation(event.id, account).await.unwrap().is_some());
    assert_eq!(ctx.coordinator().get_event(event.id).await.unwrap().interest_count, 1);
    assert_eq!(ctx.store.reminder_count(), 3);
}

#[tokio::test]
async fn test_create_event_checks() {
    let ctx = TestContext::new();

    let member_ctx = ctx.member_ctx(0).await;
    let err = ctx.coordinator().create_event(&member_ctx, ctx.event_request(false)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let mut request = ctx.event_request(false);
    request.end_time = request.start_time;
    let err = ctx.coordinator().create_event(&ctx.admin_ctx().await, request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_create_event_announces_to_members() {
    let ctx = TestContext::new();
    let event = ctx.create_event(false).await;

    assert_eq!(event.interest_count, 0);
    for member in &ctx.members {
        assert_eq!(ctx.notifications_containing(member.id, "New event 'Blitz Night'").await.len(), 1);
    }
    assert!(ctx.notifications_containing(ctx.outsider.id, "Blitz Night").await.is_empty());
}

#[tokio::test]
async fn test_update_event_checks() {
    let ctx = TestContext::new();
    let event = ctx.create_event(false).await;
    let admin = ctx.admin_ctx().await;

    // Another society's id hides the event
    let err = ctx.coordinator()
        .update_event(&admin, ctx.society.id + 1000, event.id, UpdateEventRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let other = ctx.store.add_society("Go Club");
    ctx.store.add_member(other.id, ctx.admin.id, true);
    let other_admin = ctx.services.auth_service.context(ctx.admin.id, other.id).await.unwrap();
    assert_matches!(
        ctx.coordinator().update_event(&other_admin, other.id, event.id, UpdateEventRequest::default()).await,
        Err(UniHubError::EventNotFound { .. })
    );

    // New start past the unchanged end
    let request = UpdateEventRequest {
        start_time: Some(event_end() + Duration::hours(1)),
        ..Default::default()
    };
    let err = ctx.coordinator().update_event(&admin, ctx.society.id, event.id, request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // Both bounds move together
    let request = UpdateEventRequest {
        start_time: Some(event_end() + Duration::hours(1)),
        end_time: Some(event_end() + Duration::hours(3)),
        name: Some("Rapid Night".to_string()),
        ..Default::default()
    };
    let updated = ctx.coordinator().update_event(&admin, ctx.society.id, event.id, request).await.unwrap();
    assert_eq!(updated.name, "Rapid Night");
    assert_eq!(updated.start_time, event_end() + Duration::hours(1));
    assert_eq!(
        ctx.notifications_containing(ctx.members[0].id, "'Rapid Night' has been updated").await.len(),
        1
    );
}

#[tokio::test]
async fn test_status_follows_clock() {
    let ctx = TestContext::new();
    let event = ctx.create_event(false).await;
    let coordinator = ctx.coordinator();

    assert_eq!(coordinator.get_status(event.id, event_start() - Duration::hours(1)).await.unwrap(), EventStatus::Upcoming);
    assert_eq!(coordinator.get_status(event.id, event_start()).await.unwrap(), EventStatus::Ongoing);
    assert_eq!(coordinator.get_status(event.id, event_end()).await.unwrap(), EventStatus::Ongoing);
    assert_eq!(coordinator.get_status(event.id, event_end() + Duration::minutes(1)).await.unwrap(), EventStatus::Finished);
}

#[tokio::test]
async fn test_delete_event_cascades() {
    let ctx = TestContext::new();
    let event = ctx.create_event(true).await;
    let admin = ctx.admin_ctx().await;

    for member in &ctx.members {
        ctx.coordinator().join(event.id, member.id).await.unwrap();
    }
    ctx.coordinator().join(event.id, ctx.admin.id).await.unwrap();
    ctx.clock.set(event_start() + Duration::minutes(5));
    ctx.live_chat().post_message(event.id, ctx.members[0].id, "hello").await.unwrap();
    ctx.live_chat().post_final_message(&admin, event.id).await.unwrap();

    let summary = ctx.coordinator().delete_event(&admin, ctx.society.id, event.id).await.unwrap();
    assert_eq!(summary.relations_removed, 4);
    assert_eq!(summary.reminders_cancelled, 12);
    assert_eq!(summary.messages_removed, 2);

    assert_eq!(ctx.store.reminder_count(), 0);
    assert_eq!(ctx.services.scheduler.pending_count().await, 0);
    assert_matches!(ctx.coordinator().get_event(event.id).await, Err(UniHubError::EventNotFound { .. }));
    assert_matches!(ctx.coordinator().leave(event.id, ctx.members[0].id).await, Err(UniHubError::EventNotFound { .. }));
    assert_eq!(ctx.notifications_containing(ctx.members[1].id, "has been cancelled").await.len(), 1);
}

#[tokio::test]
async fn test_delete_event_without_relations() {
    let ctx = TestContext::new();
    let event = ctx.create_event(false).await;

    let summary = ctx.coordinator().delete_event(&ctx.admin_ctx().await, ctx.society.id, event.id).await.unwrap();
    assert_eq!(summary.relations_removed, 0);
    assert_eq!(summary.reminders_cancelled, 0);
}

#[derive(Debug, Clone)]
enum Op {
    Join(usize),
    Leave(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..4).prop_map(Op::Join),
        (0usize..4).prop_map(Op::Leave),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn interest_count_matches_relations(ops in proptest::collection::vec(op_strategy(), 1..30)) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let ctx = TestContext::new_with_config(TestConfig { member_count: 4, ..Default::default() });
            let event = ctx.create_event(false).await;
            let mut joined = HashSet::new();

            for op in ops {
                match op {
                    Op::Join(i) => {
                        let result = ctx.coordinator().join(event.id, ctx.members[i].id).await;
                        if joined.insert(i) {
                            assert_eq!(result.unwrap(), joined.len() as i32);
                        } else {
                            assert_matches!(result, Err(UniHubError::AlreadyJoined { .. }));
                        }
                    }
                    Op::Leave(i) => {
                        let result = ctx.coordinator().leave(event.id, ctx.members[i].id).await;
                        if joined.remove(&i) {
                            assert_eq!(result.unwrap(), joined.len() as i32);
                        } else {
                            assert_matches!(result, Err(UniHubError::NotJoined { .. }));
                        }
                    }
                }

                let current = ctx.coordinator().get_event(event.id).await.unwrap();
                assert!(current.interest_count >= 0);
                assert_eq!(current.interest_count as i64, ctx.store.count_relations(event.id).await.unwrap());
            }
        });
    }
}
