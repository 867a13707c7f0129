// ABOUTME: Shared test utilities and fixtures for integration tests
// ABOUTME: In-memory database setup, caller scopes, and session/slot builders
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(dead_code, clippy::missing_panics_doc, clippy::must_use_candidate)]

//! Shared test utilities for `pierre_booking`
//!
//! Integration tests run against an in-memory SQLite database with the real
//! schema; every fixture passes explicit timestamps so tests stay
//! deterministic regardless of wall-clock time.

use chrono::{DateTime, TimeZone, Utc};
use pierre_booking::database::{slots, Database};
use pierre_booking::models::{GroupSlot, SlotStatus};
use pierre_booking::permissions::{CallerRole, CallerScope};
use pierre_booking::services::bookings::{BookingService, NewOneOnOneBooking};
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

/// Create an in-memory test database with the full schema
///
/// Pinned to one connection: pooled `sqlite::memory:` connections each open a
/// separate database.
pub async fn create_test_database() -> Database {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let db = Database::from_pool(pool);
    db.migrate().await.unwrap();
    db
}

/// Booking service over a fresh in-memory database
pub async fn create_test_service() -> (BookingService, Database) {
    let db = create_test_database().await;
    (BookingService::new(db.clone()), db)
}

/// Fixed reference instant all fixtures hang off: 2025-06-01 08:00 UTC
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
}

/// Offset from [`base_time`] in minutes
pub fn at(minutes: i64) -> DateTime<Utc> {
    base_time() + chrono::Duration::minutes(minutes)
}

pub fn member_scope(member_id: Uuid) -> CallerScope {
    CallerScope {
        actor_id: member_id,
        role: CallerRole::Member,
    }
}

pub fn staff_scope(staff_id: Uuid) -> CallerScope {
    CallerScope {
        actor_id: staff_id,
        role: CallerRole::Staff,
    }
}

pub fn manager_scope() -> CallerScope {
    CallerScope {
        actor_id: Uuid::new_v4(),
        role: CallerRole::StoreManager,
    }
}

/// One-on-one booking request covering `[start_min, end_min)` from base time
pub fn one_on_one(
    staff_id: Uuid,
    member_id: Uuid,
    start_min: i64,
    end_min: i64,
) -> NewOneOnOneBooking {
    NewOneOnOneBooking {
        staff_id: Some(staff_id),
        member_id,
        start_time: at(start_min),
        end_time: at(end_min),
        cost_cents: 5000,
        payment_method: Some("card".to_string()),
    }
}

/// Insert an open group slot covering `[start_min, end_min)` from base time
pub async fn insert_slot(
    db: &Database,
    staff_id: Option<Uuid>,
    start_min: i64,
    end_min: i64,
    max_participants: i64,
) -> GroupSlot {
    let slot = GroupSlot {
        id: Uuid::new_v4(),
        title: "Morning HIIT".to_string(),
        staff_id,
        start_time: at(start_min),
        end_time: at(end_min),
        max_participants,
        current_participants: 0,
        status: SlotStatus::Open,
        created_at: base_time(),
        updated_at: base_time(),
    };
    let mut conn = db.pool().acquire().await.unwrap();
    slots::insert(&mut conn, &slot).await.unwrap();
    slot
}

/// Insert a cancelled group slot
pub async fn insert_cancelled_slot(db: &Database, start_min: i64, end_min: i64) -> GroupSlot {
    let slot = GroupSlot {
        id: Uuid::new_v4(),
        title: "Cancelled class".to_string(),
        staff_id: None,
        start_time: at(start_min),
        end_time: at(end_min),
        max_participants: 10,
        current_participants: 0,
        status: SlotStatus::Cancelled,
        created_at: base_time(),
        updated_at: base_time(),
    };
    let mut conn = db.pool().acquire().await.unwrap();
    slots::insert(&mut conn, &slot).await.unwrap();
    slot
}

/// Current occupancy of a slot straight from storage
pub async fn slot_occupancy(db: &Database, slot_id: Uuid) -> i64 {
    let mut conn = db.pool().acquire().await.unwrap();
    slots::fetch(&mut conn, slot_id)
        .await
        .unwrap()
        .unwrap()
        .current_participants
}

/// Live session count referencing a slot; must always equal occupancy
pub async fn live_session_count(db: &Database, slot_id: Uuid) -> i64 {
    let mut conn = db.pool().acquire().await.unwrap();
    slots::count_live_sessions(&mut conn, slot_id).await.unwrap()
}
