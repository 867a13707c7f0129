// ABOUTME: Integration tests for the auto-charge sweeper
// ABOUTME: Horizon selection, exactly-once claiming, and failure isolation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

// Test files: allow missing_docs (rustc lint) and unwrap (valid in tests)
#![allow(missing_docs, clippy::unwrap_used)]

mod common;

use async_trait::async_trait;
use common::{base_time, create_test_service, insert_slot, member_scope, one_on_one};
use pierre_booking::database::Database;
use pierre_booking::errors::AppResult;
use pierre_booking::models::{Session, SessionStatus};
use pierre_booking::payments::{ChargeReceipt, PaymentGateway, SyntheticGateway};
use pierre_booking::permissions::CallerScope;
use pierre_booking::services::bookings::BookingService;
use pierre_booking::services::sweeper::AutoChargeSweeper;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn sweeper(db: &Database, gateway: Arc<dyn PaymentGateway>) -> AutoChargeSweeper {
    AutoChargeSweeper::new(db.clone(), gateway, Duration::from_secs(5))
}

/// Create a confirmed one-on-one session covering `[start_min, end_min)`
async fn confirmed_session(
    service: &BookingService,
    start_min: i64,
    end_min: i64,
) -> (Session, CallerScope) {
    let member = Uuid::new_v4();
    let scope = member_scope(member);
    let session = service
        .create_one_on_one(
            one_on_one(Uuid::new_v4(), member, start_min, end_min),
            &scope,
            base_time(),
        )
        .await
        .unwrap();
    let session = service.confirm(session.id, &scope, base_time()).await.unwrap();
    (session, scope)
}

#[tokio::test]
async fn test_sweep_charges_sessions_inside_horizon() {
    let (service, db) = create_test_service().await;
    // Starts at 10:00, two hours out: inside the 3h horizon.
    let (session, scope) = confirmed_session(&service, 120, 180).await;

    let sweeper = sweeper(&db, Arc::new(SyntheticGateway::always_approve()));
    let outcome = sweeper.run_once(base_time()).await.unwrap();
    assert_eq!(outcome.processed, 1);
    assert_eq!(outcome.failed, 0);

    let session = service.get(session.id, &scope).await.unwrap();
    assert_eq!(session.status, SessionStatus::Charged);
    assert!(session.charged_at.is_some());
}

#[tokio::test]
async fn test_sweep_skips_sessions_beyond_horizon() {
    let (service, db) = create_test_service().await;
    // Starts at 12:00, four hours out: beyond the 3h horizon.
    let (session, scope) = confirmed_session(&service, 240, 300).await;

    let sweeper = sweeper(&db, Arc::new(SyntheticGateway::always_approve()));
    let outcome = sweeper.run_once(base_time()).await.unwrap();
    assert_eq!(outcome.processed, 0);

    let session = service.get(session.id, &scope).await.unwrap();
    assert_eq!(session.status, SessionStatus::Confirmed);
}

#[tokio::test]
async fn test_sweep_ignores_pending_sessions() {
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

    let sweeper = sweeper(&db, Arc::new(SyntheticGateway::always_approve()));
    let outcome = sweeper.run_once(base_time()).await.unwrap();
    assert_eq!(outcome.processed, 0);

    let session = service.get(session.id, &scope).await.unwrap();
    assert_eq!(session.status, SessionStatus::Pending);
}

#[tokio::test]
async fn test_sweep_never_charges_group_sessions() {
    let (service, db) = create_test_service().await;
    // Class at 9:00, well inside the horizon, confirmed at creation.
    let slot = insert_slot(&db, None, 60, 120, 10).await;
    let member = Uuid::new_v4();
    let scope = member_scope(member);
    let session = service
        .create_group_booking(slot.id, member, &scope, base_time())
        .await
        .unwrap();

    let sweeper = sweeper(&db, Arc::new(SyntheticGateway::always_approve()));
    let outcome = sweeper.run_once(base_time()).await.unwrap();
    assert_eq!(outcome.processed, 0);

    let session = service.get(session.id, &scope).await.unwrap();
    assert_eq!(session.status, SessionStatus::Confirmed);
    assert!(session.charged_at.is_none());
}

#[tokio::test]
async fn test_second_sweep_charges_nothing() {
    let (service, db) = create_test_service().await;
    confirmed_session(&service, 120, 180).await;

    let sweeper = sweeper(&db, Arc::new(SyntheticGateway::always_approve()));
    let first = sweeper.run_once(base_time()).await.unwrap();
    assert_eq!(first.processed, 1);

    let second = sweeper.run_once(base_time()).await.unwrap();
    assert_eq!(second.processed, 0);
    assert_eq!(second.failed, 0);
}

#[tokio::test]
async fn test_failed_charge_leaves_session_confirmed() {
    let (service, db) = create_test_service().await;
    let (session, scope) = confirmed_session(&service, 120, 180).await;

    let declining = sweeper(&db, Arc::new(SyntheticGateway::new(1.0)));
    let outcome = declining.run_once(base_time()).await.unwrap();
    assert_eq!(outcome.processed, 0);
    assert_eq!(outcome.failed, 1);

    // The claim was reverted; a later sweep with a working gateway succeeds.
    let session_after = service.get(session.id, &scope).await.unwrap();
    assert_eq!(session_after.status, SessionStatus::Confirmed);
    assert!(session_after.charged_at.is_none());

    let approving = sweeper(&db, Arc::new(SyntheticGateway::always_approve()));
    let outcome = approving.run_once(base_time()).await.unwrap();
    assert_eq!(outcome.processed, 1);
}

#[tokio::test]
async fn test_one_failure_does_not_abort_the_batch() {
    let (service, db) = create_test_service().await;
    confirmed_session(&service, 120, 180).await;
    confirmed_session(&service, 120, 180).await;

    // Declines the first charge it sees, approves the rest.
    struct FlakyGateway(std::sync::atomic::AtomicBool);

    #[async_trait]
    impl PaymentGateway for FlakyGateway {
        async fn charge(
            &self,
            session_id: Uuid,
            amount_cents: i64,
            _method: Option<&str>,
        ) -> AppResult<ChargeReceipt> {
            if !self.0.swap(true, std::sync::atomic::Ordering::SeqCst) {
                return Err(pierre_booking::errors::AppError::new(
                    pierre_booking::errors::ErrorCode::PaymentFailed,
                    format!("declined session {session_id}"),
                ));
            }
            Ok(ChargeReceipt {
                external_ref: "flaky_1".into(),
                amount_cents,
            })
        }
    }

    let sweeper = sweeper(
        &db,
        Arc::new(FlakyGateway(std::sync::atomic::AtomicBool::new(false))),
    );
    let outcome = sweeper.run_once(base_time()).await.unwrap();
    assert_eq!(outcome.processed, 1);
    assert_eq!(outcome.failed, 1);
}

#[tokio::test]
async fn test_charge_timeout_reverts_the_claim() {
    let (service, db) = create_test_service().await;
    let (session, scope) = confirmed_session(&service, 120, 180).await;

    struct StalledGateway;

    #[async_trait]
    impl PaymentGateway for StalledGateway {
        async fn charge(
            &self,
            _session_id: Uuid,
            _amount_cents: i64,
            _method: Option<&str>,
        ) -> AppResult<ChargeReceipt> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            unreachable!("the sweeper times out first")
        }
    }

    let sweeper = AutoChargeSweeper::new(
        db.clone(),
        Arc::new(StalledGateway),
        Duration::from_millis(50),
    );
    let outcome = sweeper.run_once(base_time()).await.unwrap();
    assert_eq!(outcome.processed, 0);
    assert_eq!(outcome.failed, 1);

    let session = service.get(session.id, &scope).await.unwrap();
    assert_eq!(session.status, SessionStatus::Confirmed);
    assert!(session.charged_at.is_none());
}

#[tokio::test]
async fn test_gateway_call_does_not_hold_the_connection() {
    let (service, db) = create_test_service().await;
    let (session, scope) = confirmed_session(&service, 120, 180).await;

    // Touches storage while the charge is in flight. The test pool has a
    // single connection, so this deadlocks if the sweeper still holds it
    // across the gateway call.
    struct StorageTouchingGateway(Database);

    #[async_trait]
    impl PaymentGateway for StorageTouchingGateway {
        async fn charge(
            &self,
            session_id: Uuid,
            amount_cents: i64,
            _method: Option<&str>,
        ) -> AppResult<ChargeReceipt> {
            let mut conn = self.0.pool().acquire().await?;
            let _ = pierre_booking::database::sessions::fetch(&mut conn, session_id).await?;
            Ok(ChargeReceipt {
                external_ref: "touch_1".into(),
                amount_cents,
            })
        }
    }

    let sweeper = sweeper(&db, Arc::new(StorageTouchingGateway(db.clone())));
    let outcome = tokio::time::timeout(Duration::from_secs(5), sweeper.run_once(base_time()))
        .await
        .expect("sweep stalled on its own storage handle")
        .unwrap();
    assert_eq!(outcome.processed, 1);

    let session = service.get(session.id, &scope).await.unwrap();
    assert_eq!(session.status, SessionStatus::Charged);
}
