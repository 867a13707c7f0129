// ABOUTME: End-to-end lifecycle tests driven through the booking service
// ABOUTME: Confirmation, check-in, completion, no-show, cancellation windows, reviews
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

// Test files: allow missing_docs (rustc lint) and unwrap (valid in tests)
#![allow(missing_docs, clippy::unwrap_used)]

mod common;

use common::{at, base_time, create_test_service, insert_slot, member_scope, one_on_one};
use pierre_booking::database::sessions;
use pierre_booking::errors::ErrorCode;
use pierre_booking::models::SessionStatus;
use uuid::Uuid;

/// Move a session `confirmed -> charged` the way the sweeper would
async fn charge(db: &pierre_booking::database::Database, session_id: Uuid) {
    let mut conn = db.pool().acquire().await.unwrap();
    assert!(sessions::mark_charged(&mut conn, session_id, base_time())
        .await
        .unwrap());
}

#[tokio::test]
async fn test_full_one_on_one_happy_path() {
    let (service, db) = create_test_service().await;
    let member = Uuid::new_v4();
    let scope = member_scope(member);

    // Session at 10:00-11:00.
    let session = service
        .create_one_on_one(
            one_on_one(Uuid::new_v4(), member, 120, 180),
            &scope,
            base_time(),
        )
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Pending);

    let session = service.confirm(session.id, &scope, base_time()).await.unwrap();
    assert_eq!(session.status, SessionStatus::Confirmed);

    charge(&db, session.id).await;

    // Check in 10 minutes before start.
    let session = service.check_in(session.id, &scope, at(110)).await.unwrap();
    assert_eq!(session.status, SessionStatus::CheckedIn);
    assert!(session.checked_in_at.is_some());

    let session = service.complete(session.id, &scope, at(185)).await.unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert!(session.completed_at.is_some());

    let session = service
        .add_review(session.id, 5, Some("great session".into()), &scope, at(200))
        .await
        .unwrap();
    assert_eq!(session.rating, Some(5));
    assert_eq!(session.review.as_deref(), Some("great session"));
    assert!(session.reviewed_at.is_some());
}

#[tokio::test]
async fn test_confirm_is_not_repeatable() {
    let (service, _db) = create_test_service().await;
    let member = Uuid::new_v4();
    let scope = member_scope(member);

    let session = service
        .create_one_on_one(
            one_on_one(Uuid::new_v4(), member, 120, 180),
            &scope,
            base_time(),
        )
        .await
        .unwrap();

    service.confirm(session.id, &scope, base_time()).await.unwrap();
    let err = service
        .confirm(session.id, &scope, base_time())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidStateTransition);
}

#[tokio::test]
async fn test_one_on_one_cancellation_window() {
    let (service, _db) = create_test_service().await;
    let member = Uuid::new_v4();
    let scope = member_scope(member);

    // Session at 10:00; 90 minutes of notice is inside the 2h window.
    let session = service
        .create_one_on_one(
            one_on_one(Uuid::new_v4(), member, 120, 180),
            &scope,
            base_time(),
        )
        .await
        .unwrap();

    let err = service
        .cancel(session.id, None, &scope, at(30))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::CancellationWindowClosed);

    // Three hours of notice is fine.
    let session = service
        .cancel(session.id, Some("conflict".into()), &scope, at(-60))
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Cancelled);
    assert_eq!(session.cancellation_reason.as_deref(), Some("conflict"));
    assert!(session.cancelled_at.is_some());
}

#[tokio::test]
async fn test_group_cancellation_needs_three_hours() {
    let (service, db) = create_test_service().await;
    // Class at 12:00-13:00.
    let slot = insert_slot(&db, None, 240, 300, 10).await;
    let member = Uuid::new_v4();
    let scope = member_scope(member);

    let session = service
        .create_group_booking(slot.id, member, &scope, base_time())
        .await
        .unwrap();

    // 2.5 hours of notice would pass the one-on-one window but not group's.
    let err = service
        .cancel(session.id, None, &scope, at(90))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::CancellationWindowClosed);

    service.cancel(session.id, None, &scope, at(30)).await.unwrap();
}

#[tokio::test]
async fn test_check_in_outside_grace_window() {
    let (service, db) = create_test_service().await;
    let member = Uuid::new_v4();
    let scope = member_scope(member);

    let session = service
        .create_one_on_one(
            one_on_one(Uuid::new_v4(), member, 120, 180),
            &scope,
            base_time(),
        )
        .await
        .unwrap();
    service.confirm(session.id, &scope, base_time()).await.unwrap();
    charge(&db, session.id).await;

    // An hour before start is too early; 31 minutes after end is too late.
    let err = service.check_in(session.id, &scope, at(60)).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::OutsideCheckInWindow);
    let err = service.check_in(session.id, &scope, at(211)).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::OutsideCheckInWindow);

    // The boundary itself is open.
    service.check_in(session.id, &scope, at(90)).await.unwrap();
}

#[tokio::test]
async fn test_no_show_requires_session_over() {
    let (service, db) = create_test_service().await;
    let member = Uuid::new_v4();
    let scope = member_scope(member);

    let session = service
        .create_one_on_one(
            one_on_one(Uuid::new_v4(), member, 120, 180),
            &scope,
            base_time(),
        )
        .await
        .unwrap();
    service.confirm(session.id, &scope, base_time()).await.unwrap();
    charge(&db, session.id).await;

    // Mid-session: the member might still arrive.
    let err = service
        .mark_no_show(session.id, &scope, at(150))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);

    let session = service.mark_no_show(session.id, &scope, at(181)).await.unwrap();
    assert_eq!(session.status, SessionStatus::NoShow);
}

#[tokio::test]
async fn test_no_show_blocked_by_check_in() {
    let (service, db) = create_test_service().await;
    let member = Uuid::new_v4();
    let scope = member_scope(member);

    let session = service
        .create_one_on_one(
            one_on_one(Uuid::new_v4(), member, 120, 180),
            &scope,
            base_time(),
        )
        .await
        .unwrap();
    service.confirm(session.id, &scope, base_time()).await.unwrap();
    charge(&db, session.id).await;
    service.check_in(session.id, &scope, at(125)).await.unwrap();

    let err = service
        .mark_no_show(session.id, &scope, at(200))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidStateTransition);
}

#[tokio::test]
async fn test_group_session_completes_after_end_without_check_in() {
    let (service, db) = create_test_service().await;
    let slot = insert_slot(&db, None, 240, 300, 10).await;
    let member = Uuid::new_v4();
    let scope = member_scope(member);

    let session = service
        .create_group_booking(slot.id, member, &scope, base_time())
        .await
        .unwrap();

    // Before end time the class is still running.
    let err = service.complete(session.id, &scope, at(270)).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);

    let session = service.complete(session.id, &scope, at(301)).await.unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
}

#[tokio::test]
async fn test_review_validation_and_single_shot() {
    let (service, db) = create_test_service().await;
    let member = Uuid::new_v4();
    let scope = member_scope(member);

    let session = service
        .create_one_on_one(
            one_on_one(Uuid::new_v4(), member, 120, 180),
            &scope,
            base_time(),
        )
        .await
        .unwrap();

    // Reviews only apply to completed sessions.
    let err = service
        .add_review(session.id, 4, None, &scope, base_time())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidStateTransition);

    service.confirm(session.id, &scope, base_time()).await.unwrap();
    charge(&db, session.id).await;
    service.check_in(session.id, &scope, at(125)).await.unwrap();
    service.complete(session.id, &scope, at(185)).await.unwrap();

    for rating in [0, 6] {
        let err = service
            .add_review(session.id, rating, None, &scope, at(200))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValueOutOfRange);
    }

    service
        .add_review(session.id, 4, None, &scope, at(200))
        .await
        .unwrap();
    let err = service
        .add_review(session.id, 5, None, &scope, at(210))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AlreadyReviewed);
}
