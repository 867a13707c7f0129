// ABOUTME: Session record persistence and conflict queries
// ABOUTME: Guarded conditional updates make every lifecycle write race-safe
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Session persistence layer.
//!
//! Write functions take a `&mut SqliteConnection` so the orchestrator can
//! compose them with the capacity ledger inside one transaction. Every
//! lifecycle write is a conditional `UPDATE ... WHERE status = <expected>`;
//! the boolean return is `false` when the guard did not match, which the
//! caller turns into a state-transition error instead of double-applying.

use super::{parse_datetime, parse_optional_datetime, parse_uuid};
use crate::conflicts::{ConflictReport, TimeWindow};
use crate::errors::AppResult;
use crate::models::{Session, SessionKind, SessionStatus};
use crate::pagination::{ListParams, Page};
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Outcome of a session insert attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Row written
    Inserted,
    /// The generated booking number already exists; caller should retry
    /// with a fresh number
    BookingNumberCollision,
    /// The member already holds a live booking for this slot
    DuplicateSlotMember,
}

const SESSION_COLUMNS: &str = "id, booking_number, kind, staff_id, member_id, slot_id, \
     start_time, end_time, status, cost_cents, payment_method, charged_at, \
     checked_in_at, completed_at, cancelled_at, cancellation_reason, \
     rating, review, reviewed_at, created_at, updated_at, deleted_at";

/// Insert a session record
///
/// Unique violations are mapped to [`InsertOutcome`] variants instead of
/// errors so the orchestrator can retry booking-number collisions and report
/// duplicate group bookings precisely.
///
/// # Errors
///
/// Returns an error if the database operation fails
pub async fn insert(conn: &mut SqliteConnection, session: &Session) -> AppResult<InsertOutcome> {
    let result = sqlx::query(
        r"
        INSERT INTO sessions (
            id, booking_number, kind, staff_id, member_id, slot_id,
            start_time, end_time, status, cost_cents, payment_method,
            created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
        ",
    )
    .bind(session.id.to_string())
    .bind(&session.booking_number)
    .bind(session.kind.as_str())
    .bind(session.staff_id.map(|id| id.to_string()))
    .bind(session.member_id.to_string())
    .bind(session.slot_id.map(|id| id.to_string()))
    .bind(session.start_time.to_rfc3339())
    .bind(session.end_time.to_rfc3339())
    .bind(session.status.as_str())
    .bind(session.cost_cents)
    .bind(session.payment_method.as_deref())
    .bind(session.created_at.to_rfc3339())
    .execute(&mut *conn)
    .await;

    match result {
        Ok(_) => Ok(InsertOutcome::Inserted),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            if db_err.message().contains("booking_number") {
                Ok(InsertOutcome::BookingNumberCollision)
            } else {
                Ok(InsertOutcome::DuplicateSlotMember)
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// Fetch a live (non-soft-deleted) session by id
///
/// # Errors
///
/// Returns an error if the database operation fails
pub async fn fetch(conn: &mut SqliteConnection, id: Uuid) -> AppResult<Option<Session>> {
    let row = sqlx::query(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|r| row_to_session(&r)).transpose()
}

/// Find live sessions overlapping the window for the given resources
///
/// Staff-side and member-side conflicts are reported independently. Only
/// `pending`/`confirmed` sessions participate; `exclude_session_id` lets an
/// update check against every session except itself. Pure read, suitable for
/// execution inside the caller's transaction.
///
/// # Errors
///
/// Returns an error if the database operation fails
pub async fn find_conflicts(
    conn: &mut SqliteConnection,
    window: &TimeWindow,
    staff_id: Option<Uuid>,
    member_id: Option<Uuid>,
    exclude_session_id: Option<Uuid>,
) -> AppResult<ConflictReport> {
    let mut report = ConflictReport::default();

    if let Some(staff_id) = staff_id {
        report.staff_conflicts =
            conflicts_for_resource(conn, "staff_id", staff_id, window, exclude_session_id).await?;
    }
    if let Some(member_id) = member_id {
        report.member_conflicts =
            conflicts_for_resource(conn, "member_id", member_id, window, exclude_session_id)
                .await?;
    }

    Ok(report)
}

async fn conflicts_for_resource(
    conn: &mut SqliteConnection,
    column: &str,
    resource_id: Uuid,
    window: &TimeWindow,
    exclude_session_id: Option<Uuid>,
) -> AppResult<Vec<Uuid>> {
    // Half-open overlap: existing.start < proposed.end AND existing.end > proposed.start
    let rows = sqlx::query(&format!(
        r"
        SELECT id FROM sessions
        WHERE {column} = $1
          AND status IN ('pending', 'confirmed')
          AND deleted_at IS NULL
          AND start_time < $2
          AND end_time > $3
          AND id != COALESCE($4, '')
        ORDER BY start_time
        ",
    ))
    .bind(resource_id.to_string())
    .bind(window.end.to_rfc3339())
    .bind(window.start.to_rfc3339())
    .bind(exclude_session_id.map(|id| id.to_string()))
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|r| parse_uuid(&r.get::<String, _>("id"), "id"))
        .collect()
}

/// Whether the member already holds a live booking for the slot
///
/// # Errors
///
/// Returns an error if the database operation fails
pub async fn has_live_slot_booking(
    conn: &mut SqliteConnection,
    slot_id: Uuid,
    member_id: Uuid,
) -> AppResult<bool> {
    let row = sqlx::query(
        r"
        SELECT COUNT(*) AS n FROM sessions
        WHERE slot_id = $1 AND member_id = $2
          AND status != 'cancelled'
          AND deleted_at IS NULL
        ",
    )
    .bind(slot_id.to_string())
    .bind(member_id.to_string())
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.get::<i64, _>("n") > 0)
}

/// Move the session time window; rejected once the session is terminal
///
/// # Errors
///
/// Returns an error if the database operation fails
pub async fn update_window(
    conn: &mut SqliteConnection,
    id: Uuid,
    window: &TimeWindow,
    now: DateTime<Utc>,
) -> AppResult<bool> {
    let result = sqlx::query(
        r"
        UPDATE sessions SET start_time = $1, end_time = $2, updated_at = $3
        WHERE id = $4 AND deleted_at IS NULL
          AND status NOT IN ('completed', 'cancelled', 'no_show')
        ",
    )
    .bind(window.start.to_rfc3339())
    .bind(window.end.to_rfc3339())
    .bind(now.to_rfc3339())
    .bind(id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// `pending -> confirmed`
///
/// # Errors
///
/// Returns an error if the database operation fails
pub async fn mark_confirmed(
    conn: &mut SqliteConnection,
    id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<bool> {
    let result = sqlx::query(
        r"
        UPDATE sessions SET status = 'confirmed', updated_at = $1
        WHERE id = $2 AND status = 'pending' AND deleted_at IS NULL
        ",
    )
    .bind(now.to_rfc3339())
    .bind(id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// `confirmed -> charged`; the atomic claim the sweeper relies on
///
/// Zero affected rows means another run (or a manual action) already moved
/// the session on, so the caller must not charge it.
///
/// # Errors
///
/// Returns an error if the database operation fails
pub async fn mark_charged(
    conn: &mut SqliteConnection,
    id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<bool> {
    let result = sqlx::query(
        r"
        UPDATE sessions SET status = 'charged', charged_at = $1, updated_at = $1
        WHERE id = $2 AND status = 'confirmed' AND deleted_at IS NULL
        ",
    )
    .bind(now.to_rfc3339())
    .bind(id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// `charged -> confirmed`; compensation for a charge attempt that failed
/// after the claim was committed
///
/// Guarded on `checked_in_at IS NULL` so a check-in that landed between the
/// claim and the compensation is never clobbered; that case returns `false`
/// and the caller decides how to report it.
///
/// # Errors
///
/// Returns an error if the database operation fails
pub async fn revert_charge(
    conn: &mut SqliteConnection,
    id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<bool> {
    let result = sqlx::query(
        r"
        UPDATE sessions SET status = 'confirmed', charged_at = NULL, updated_at = $1
        WHERE id = $2 AND status = 'charged' AND checked_in_at IS NULL AND deleted_at IS NULL
        ",
    )
    .bind(now.to_rfc3339())
    .bind(id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// `charged -> checked_in`
///
/// # Errors
///
/// Returns an error if the database operation fails
pub async fn mark_checked_in(
    conn: &mut SqliteConnection,
    id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<bool> {
    let result = sqlx::query(
        r"
        UPDATE sessions SET status = 'checked_in', checked_in_at = $1, updated_at = $1
        WHERE id = $2 AND status = 'charged' AND checked_in_at IS NULL
          AND deleted_at IS NULL
        ",
    )
    .bind(now.to_rfc3339())
    .bind(id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Move to `completed` from the validator-approved current status
///
/// # Errors
///
/// Returns an error if the database operation fails
pub async fn mark_completed(
    conn: &mut SqliteConnection,
    id: Uuid,
    expected: SessionStatus,
    now: DateTime<Utc>,
) -> AppResult<bool> {
    let result = sqlx::query(
        r"
        UPDATE sessions SET status = 'completed', completed_at = $1, updated_at = $1
        WHERE id = $2 AND status = $3 AND deleted_at IS NULL
        ",
    )
    .bind(now.to_rfc3339())
    .bind(id.to_string())
    .bind(expected.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// `charged -> no_show`, only when no check-in was recorded
///
/// # Errors
///
/// Returns an error if the database operation fails
pub async fn mark_no_show(
    conn: &mut SqliteConnection,
    id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<bool> {
    let result = sqlx::query(
        r"
        UPDATE sessions SET status = 'no_show', updated_at = $1
        WHERE id = $2 AND status = 'charged' AND checked_in_at IS NULL
          AND deleted_at IS NULL
        ",
    )
    .bind(now.to_rfc3339())
    .bind(id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Move to `cancelled` from the validator-approved current status
///
/// # Errors
///
/// Returns an error if the database operation fails
pub async fn mark_cancelled(
    conn: &mut SqliteConnection,
    id: Uuid,
    expected: SessionStatus,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> AppResult<bool> {
    let result = sqlx::query(
        r"
        UPDATE sessions
        SET status = 'cancelled', cancelled_at = $1, cancellation_reason = $2, updated_at = $1
        WHERE id = $3 AND status = $4 AND deleted_at IS NULL
        ",
    )
    .bind(now.to_rfc3339())
    .bind(reason)
    .bind(id.to_string())
    .bind(expected.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Record a review on a completed, not-yet-reviewed session
///
/// # Errors
///
/// Returns an error if the database operation fails
pub async fn record_review(
    conn: &mut SqliteConnection,
    id: Uuid,
    rating: i32,
    review: Option<&str>,
    now: DateTime<Utc>,
) -> AppResult<bool> {
    let result = sqlx::query(
        r"
        UPDATE sessions
        SET rating = $1, review = $2, reviewed_at = $3, updated_at = $3
        WHERE id = $4 AND status = 'completed' AND reviewed_at IS NULL
          AND deleted_at IS NULL
        ",
    )
    .bind(rating)
    .bind(review)
    .bind(now.to_rfc3339())
    .bind(id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Soft-delete a session
///
/// # Errors
///
/// Returns an error if the database operation fails
pub async fn soft_delete(
    conn: &mut SqliteConnection,
    id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<bool> {
    let result = sqlx::query(
        "UPDATE sessions SET deleted_at = $1, updated_at = $1 WHERE id = $2 AND deleted_at IS NULL",
    )
    .bind(now.to_rfc3339())
    .bind(id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Filter for session listings
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    /// Restrict to a member's bookings
    pub member_id: Option<Uuid>,
    /// Restrict to a staff member's schedule
    pub staff_id: Option<Uuid>,
    /// Restrict to one status
    pub status: Option<SessionStatus>,
    /// Restrict to one kind
    pub kind: Option<SessionKind>,
    /// Only sessions ending after this time
    pub from: Option<DateTime<Utc>>,
    /// Only sessions starting before this time
    pub until: Option<DateTime<Utc>>,
}

/// List sessions matching the filter, ordered by start time
///
/// # Errors
///
/// Returns an error if the database operation fails
pub async fn list(
    pool: &SqlitePool,
    filter: &SessionFilter,
    params: &ListParams,
) -> AppResult<Page<Session>> {
    const FILTER_SQL: &str = r"
        deleted_at IS NULL
        AND ($1 IS NULL OR member_id = $1)
        AND ($2 IS NULL OR staff_id = $2)
        AND ($3 IS NULL OR status = $3)
        AND ($4 IS NULL OR kind = $4)
        AND ($5 IS NULL OR end_time > $5)
        AND ($6 IS NULL OR start_time < $6)
    ";

    let member = filter.member_id.map(|id| id.to_string());
    let staff = filter.staff_id.map(|id| id.to_string());
    let status = filter.status.map(|s| s.as_str());
    let kind = filter.kind.map(|k| k.as_str());
    let from = filter.from.map(|t| t.to_rfc3339());
    let until = filter.until.map(|t| t.to_rfc3339());

    let total_row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM sessions WHERE {FILTER_SQL}"))
        .bind(member.as_deref())
        .bind(staff.as_deref())
        .bind(status)
        .bind(kind)
        .bind(from.as_deref())
        .bind(until.as_deref())
        .fetch_one(pool)
        .await?;
    let total = total_row.get::<i64, _>("n");

    let rows = sqlx::query(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions WHERE {FILTER_SQL} \
         ORDER BY start_time ASC LIMIT $7 OFFSET $8"
    ))
    .bind(member.as_deref())
    .bind(staff.as_deref())
    .bind(status)
    .bind(kind)
    .bind(from.as_deref())
    .bind(until.as_deref())
    .bind(i64::from(params.limit))
    .bind(i64::from(params.offset))
    .fetch_all(pool)
    .await?;

    let items = rows
        .iter()
        .map(row_to_session)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Page {
        items,
        total,
        limit: params.limit,
        offset: params.offset,
    })
}

/// Confirmed one-on-one sessions starting within the charge horizon
///
/// # Errors
///
/// Returns an error if the database operation fails
pub async fn find_chargeable(
    pool: &SqlitePool,
    now: DateTime<Utc>,
    horizon: Duration,
) -> AppResult<Vec<Session>> {
    let rows = sqlx::query(&format!(
        r"
        SELECT {SESSION_COLUMNS} FROM sessions
        WHERE status = 'confirmed'
          AND kind = 'one_on_one'
          AND deleted_at IS NULL
          AND start_time <= $1
        ORDER BY start_time ASC
        "
    ))
    .bind((now + horizon).to_rfc3339())
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_session).collect()
}

pub(crate) fn row_to_session(row: &SqliteRow) -> AppResult<Session> {
    let status_str: String = row.get("status");
    let kind_str: String = row.get("kind");

    Ok(Session {
        id: parse_uuid(&row.get::<String, _>("id"), "id")?,
        booking_number: row.get("booking_number"),
        kind: SessionKind::parse(&kind_str)
            .ok_or_else(|| crate::errors::AppError::database(format!("Unknown kind '{kind_str}'")))?,
        staff_id: row
            .get::<Option<String>, _>("staff_id")
            .as_deref()
            .map(|v| parse_uuid(v, "staff_id"))
            .transpose()?,
        member_id: parse_uuid(&row.get::<String, _>("member_id"), "member_id")?,
        slot_id: row
            .get::<Option<String>, _>("slot_id")
            .as_deref()
            .map(|v| parse_uuid(v, "slot_id"))
            .transpose()?,
        start_time: parse_datetime(&row.get::<String, _>("start_time"), "start_time")?,
        end_time: parse_datetime(&row.get::<String, _>("end_time"), "end_time")?,
        status: SessionStatus::parse(&status_str).ok_or_else(|| {
            crate::errors::AppError::database(format!("Unknown status '{status_str}'"))
        })?,
        cost_cents: row.get("cost_cents"),
        payment_method: row.get("payment_method"),
        charged_at: parse_optional_datetime(row.get("charged_at"), "charged_at")?,
        checked_in_at: parse_optional_datetime(row.get("checked_in_at"), "checked_in_at")?,
        completed_at: parse_optional_datetime(row.get("completed_at"), "completed_at")?,
        cancelled_at: parse_optional_datetime(row.get("cancelled_at"), "cancelled_at")?,
        cancellation_reason: row.get("cancellation_reason"),
        rating: row.get("rating"),
        review: row.get("review"),
        reviewed_at: parse_optional_datetime(row.get("reviewed_at"), "reviewed_at")?,
        created_at: parse_datetime(&row.get::<String, _>("created_at"), "created_at")?,
        updated_at: parse_datetime(&row.get::<String, _>("updated_at"), "updated_at")?,
        deleted_at: parse_optional_datetime(row.get("deleted_at"), "deleted_at")?,
    })
}
