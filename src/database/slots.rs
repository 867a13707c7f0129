// ABOUTME: Group slot persistence and the capacity ledger's atomic operations
// ABOUTME: Reserve is a guarded conditional increment; release floors at zero
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Capacity ledger for group slots.
//!
//! `current_participants` is a derived cache of the non-cancelled session
//! count for the slot. Both [`try_reserve`] and [`release`] expect to run in
//! the same transaction as the session write they accompany, so the counter
//! and the session set can never drift apart. The reserve itself is a
//! conditional `UPDATE ... WHERE current_participants < max_participants`;
//! two concurrent reservations for the last seat cannot both pass the guard.

use super::{parse_datetime, parse_uuid};
use crate::errors::AppResult;
use crate::models::{GroupSlot, SlotStatus};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::error;
use uuid::Uuid;

/// Outcome of a seat reservation attempt
#[derive(Debug, Clone)]
pub enum ReserveOutcome {
    /// Seat taken; the returned slot reflects the new occupancy
    Reserved(GroupSlot),
    /// Slot does not exist
    NotFound,
    /// Slot exists but is not open for booking
    NotAvailable(&'static str),
    /// Slot is at capacity
    Full,
}

const SLOT_COLUMNS: &str = "id, title, staff_id, start_time, end_time, \
     max_participants, current_participants, status, created_at, updated_at";

/// Insert a group slot (fixtures and operational tooling; slot CRUD is not
/// part of the booking API surface)
///
/// # Errors
///
/// Returns an error if the database operation fails
pub async fn insert(conn: &mut SqliteConnection, slot: &GroupSlot) -> AppResult<()> {
    sqlx::query(
        r"
        INSERT INTO group_slots (
            id, title, staff_id, start_time, end_time,
            max_participants, current_participants, status, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
        ",
    )
    .bind(slot.id.to_string())
    .bind(&slot.title)
    .bind(slot.staff_id.map(|id| id.to_string()))
    .bind(slot.start_time.to_rfc3339())
    .bind(slot.end_time.to_rfc3339())
    .bind(slot.max_participants)
    .bind(slot.current_participants)
    .bind(slot.status.as_str())
    .bind(slot.created_at.to_rfc3339())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Fetch a group slot by id
///
/// # Errors
///
/// Returns an error if the database operation fails
pub async fn fetch(conn: &mut SqliteConnection, id: Uuid) -> AppResult<Option<GroupSlot>> {
    let row = sqlx::query(&format!("SELECT {SLOT_COLUMNS} FROM group_slots WHERE id = $1"))
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.map(|r| row_to_slot(&r)).transpose()
}

/// Atomically take one seat in the slot
///
/// Must run in the same transaction as the session insert it accompanies.
/// The occupancy guard is re-evaluated by the UPDATE itself, so a concurrent
/// reservation that got the last seat turns this call into [`ReserveOutcome::Full`]
/// rather than an over-booking.
///
/// # Errors
///
/// Returns an error if the database operation fails
pub async fn try_reserve(
    conn: &mut SqliteConnection,
    slot_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<ReserveOutcome> {
    let Some(slot) = fetch(conn, slot_id).await? else {
        return Ok(ReserveOutcome::NotFound);
    };

    if slot.status != SlotStatus::Open {
        return Ok(ReserveOutcome::NotAvailable("class is cancelled"));
    }
    if slot.start_time <= now {
        return Ok(ReserveOutcome::NotAvailable("class has already started"));
    }

    let result = sqlx::query(
        r"
        UPDATE group_slots
        SET current_participants = current_participants + 1, updated_at = $1
        WHERE id = $2
          AND status = 'open'
          AND current_participants < max_participants
        ",
    )
    .bind(now.to_rfc3339())
    .bind(slot_id.to_string())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(ReserveOutcome::Full);
    }

    Ok(ReserveOutcome::Reserved(GroupSlot {
        current_participants: slot.current_participants + 1,
        updated_at: now,
        ..slot
    }))
}

/// Give a seat back on cancellation
///
/// The decrement floors at zero: a would-be negative count means the ledger
/// and the session set have drifted, which is logged as an invariant
/// violation and not applied.
///
/// # Errors
///
/// Returns an error if the database operation fails
pub async fn release(
    conn: &mut SqliteConnection,
    slot_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let result = sqlx::query(
        r"
        UPDATE group_slots
        SET current_participants = current_participants - 1, updated_at = $1
        WHERE id = $2 AND current_participants > 0
        ",
    )
    .bind(now.to_rfc3339())
    .bind(slot_id.to_string())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        error!(
            slot_id = %slot_id,
            "capacity ledger invariant violation: release on a slot with zero occupancy"
        );
    }

    Ok(())
}

/// Count of live (non-cancelled, non-deleted) sessions referencing the slot
///
/// The ledger's `current_participants` must always equal this count.
///
/// # Errors
///
/// Returns an error if the database operation fails
pub async fn count_live_sessions(conn: &mut SqliteConnection, slot_id: Uuid) -> AppResult<i64> {
    let row = sqlx::query(
        r"
        SELECT COUNT(*) AS n FROM sessions
        WHERE slot_id = $1 AND status != 'cancelled' AND deleted_at IS NULL
        ",
    )
    .bind(slot_id.to_string())
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.get::<i64, _>("n"))
}

fn row_to_slot(row: &SqliteRow) -> AppResult<GroupSlot> {
    let status_str: String = row.get("status");

    Ok(GroupSlot {
        id: parse_uuid(&row.get::<String, _>("id"), "id")?,
        title: row.get("title"),
        staff_id: row
            .get::<Option<String>, _>("staff_id")
            .as_deref()
            .map(|v| parse_uuid(v, "staff_id"))
            .transpose()?,
        start_time: parse_datetime(&row.get::<String, _>("start_time"), "start_time")?,
        end_time: parse_datetime(&row.get::<String, _>("end_time"), "end_time")?,
        max_participants: row.get("max_participants"),
        current_participants: row.get("current_participants"),
        status: SlotStatus::parse(&status_str).ok_or_else(|| {
            crate::errors::AppError::database(format!("Unknown slot status '{status_str}'"))
        })?,
        created_at: parse_datetime(&row.get::<String, _>("created_at"), "created_at")?,
        updated_at: parse_datetime(&row.get::<String, _>("updated_at"), "updated_at")?,
    })
}
