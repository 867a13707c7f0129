// ABOUTME: Tests for the calendar projection over caller-visible sessions
// ABOUTME: Ordering, status colors, and scope filtering through the service
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

// Test files: allow missing_docs (rustc lint) and unwrap (valid in tests)
#![allow(missing_docs, clippy::unwrap_used)]

mod common;

use common::{at, base_time, create_test_service, member_scope, one_on_one};
use pierre_booking::calendar::status_color;
use pierre_booking::database::sessions::SessionFilter;
use pierre_booking::models::SessionStatus;
use pierre_booking::pagination::ListParams;
use uuid::Uuid;

#[tokio::test]
async fn test_calendar_entries_sorted_and_colored() {
    let (service, _db) = create_test_service().await;
    let member = Uuid::new_v4();
    let scope = member_scope(member);

    // Inserted out of order; the projection sorts by start time.
    let later = service
        .create_one_on_one(
            one_on_one(Uuid::new_v4(), member, 300, 360),
            &scope,
            base_time(),
        )
        .await
        .unwrap();
    let earlier = service
        .create_one_on_one(
            one_on_one(Uuid::new_v4(), member, 120, 180),
            &scope,
            base_time(),
        )
        .await
        .unwrap();
    service.confirm(later.id, &scope, base_time()).await.unwrap();

    let entries = service
        .calendar(SessionFilter::default(), ListParams::default(), &scope)
        .await
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].session_id, earlier.id);
    assert_eq!(entries[1].session_id, later.id);
    assert_eq!(entries[0].start_time, at(120));

    assert_eq!(entries[0].status, SessionStatus::Pending);
    assert_eq!(entries[0].color, status_color(SessionStatus::Pending));
    assert_eq!(entries[1].status, SessionStatus::Confirmed);
    assert_eq!(entries[1].color, status_color(SessionStatus::Confirmed));

    // Titles carry the booking number for display.
    assert!(entries[0].title.contains(&earlier.booking_number));
}

#[tokio::test]
async fn test_calendar_scoped_to_caller() {
    let (service, _db) = create_test_service().await;
    let member = Uuid::new_v4();
    let other = Uuid::new_v4();

    service
        .create_one_on_one(
            one_on_one(Uuid::new_v4(), member, 120, 180),
            &member_scope(member),
            base_time(),
        )
        .await
        .unwrap();
    service
        .create_one_on_one(
            one_on_one(Uuid::new_v4(), other, 120, 180),
            &member_scope(other),
            base_time(),
        )
        .await
        .unwrap();

    let entries = service
        .calendar(
            SessionFilter::default(),
            ListParams::default(),
            &member_scope(member),
        )
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_statuses_have_distinct_colors() {
    let statuses = [
        SessionStatus::Pending,
        SessionStatus::Confirmed,
        SessionStatus::Charged,
        SessionStatus::CheckedIn,
        SessionStatus::Completed,
        SessionStatus::Cancelled,
        SessionStatus::NoShow,
    ];
    let mut seen = std::collections::HashSet::new();
    for status in statuses {
        assert!(seen.insert(status_color(status)), "{status} color reused");
    }
}
