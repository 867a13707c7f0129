// ABOUTME: Booking orchestrator: the use-case layer over sessions and slots
// ABOUTME: Each operation is one transaction composing conflict, capacity, and lifecycle rules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Booking Orchestrator
//!
//! Creates, reschedules, and cancels sessions, and applies lifecycle moves.
//! Every write operation runs inside a single transaction: the conflict check
//! or capacity reservation and the session write commit together or not at
//! all. Transitions are applied with status-guarded updates, so retrying an
//! already-applied transition reports the state error instead of silently
//! double-applying (a second cancel does not re-release capacity).

use crate::calendar::{self, CalendarEntry};
use crate::conflicts::TimeWindow;
use crate::constants::limits;
use crate::database::sessions::{self, InsertOutcome, SessionFilter};
use crate::database::slots::{self, ReserveOutcome};
use crate::database::Database;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::lifecycle::{validate_transition, SessionAction};
use crate::models::{
    generate_booking_number, Session, SessionKind, SessionStatus,
};
use crate::pagination::{ListParams, Page};
use crate::permissions::CallerScope;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};
use tracing::info;
use uuid::Uuid;

/// Request to create a one-on-one coaching session
#[derive(Debug, Clone)]
pub struct NewOneOnOneBooking {
    /// Coaching staff member; absent for pure self-service sessions
    pub staff_id: Option<Uuid>,
    /// Booking member
    pub member_id: Uuid,
    /// Session start
    pub start_time: DateTime<Utc>,
    /// Session end
    pub end_time: DateTime<Utc>,
    /// Price in cents
    pub cost_cents: i64,
    /// Payment method to use for the pre-session charge
    pub payment_method: Option<String>,
}

/// The booking use-case layer
#[derive(Clone)]
pub struct BookingService {
    db: Database,
}

impl BookingService {
    /// Create a new booking service over the given database
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a one-on-one session in `pending` status
    ///
    /// Runs the conflict detector for both the staff member and the member
    /// inside the insert transaction; only a clean result commits.
    ///
    /// # Errors
    ///
    /// - `InvalidTimeWindow` when `start >= end`
    /// - `BookingConflict` when either party has an overlapping live session
    /// - `PermissionDenied` when the caller may not book for this member
    pub async fn create_one_on_one(
        &self,
        request: NewOneOnOneBooking,
        scope: &CallerScope,
        now: DateTime<Utc>,
    ) -> AppResult<Session> {
        scope.ensure_member_target(request.member_id)?;
        let window = TimeWindow::new(request.start_time, request.end_time)?;

        let mut tx = self.db.begin().await?;

        let report = sessions::find_conflicts(
            &mut tx,
            &window,
            request.staff_id,
            Some(request.member_id),
            None,
        )
        .await?;
        if !report.is_clean() {
            return Err(report.into_error());
        }

        let session = Session {
            id: Uuid::new_v4(),
            booking_number: generate_booking_number(now),
            kind: SessionKind::OneOnOne,
            staff_id: request.staff_id,
            member_id: request.member_id,
            slot_id: None,
            start_time: window.start,
            end_time: window.end,
            status: SessionStatus::Pending,
            cost_cents: request.cost_cents,
            payment_method: request.payment_method,
            charged_at: None,
            checked_in_at: None,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            rating: None,
            review: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let session = Self::insert_with_fresh_number(&mut tx, session, now).await?;
        tx.commit().await?;

        info!(
            session_id = %session.id,
            booking_number = %session.booking_number,
            member_id = %session.member_id,
            "created one-on-one booking"
        );
        Ok(session)
    }

    /// Book a seat in a group slot; the session is created directly `confirmed`
    ///
    /// The duplicate guard, the capacity reservation, and the session insert
    /// all run in one transaction, so two concurrent joins cannot both take
    /// the last seat.
    ///
    /// # Errors
    ///
    /// - `ResourceNotFound` when the slot does not exist
    /// - `SlotNotAvailable` when the slot is cancelled or already started
    /// - `SlotFull` when the slot is at capacity
    /// - `DuplicateBooking` when the member already holds a live seat
    pub async fn create_group_booking(
        &self,
        slot_id: Uuid,
        member_id: Uuid,
        scope: &CallerScope,
        now: DateTime<Utc>,
    ) -> AppResult<Session> {
        scope.ensure_member_target(member_id)?;

        let mut tx = self.db.begin().await?;

        if sessions::has_live_slot_booking(&mut tx, slot_id, member_id).await? {
            return Err(AppError::duplicate_booking(slot_id, member_id));
        }

        let slot = match slots::try_reserve(&mut tx, slot_id, now).await? {
            ReserveOutcome::Reserved(slot) => slot,
            ReserveOutcome::NotFound => return Err(AppError::not_found("Group session")),
            ReserveOutcome::NotAvailable(reason) => {
                return Err(AppError::slot_not_available(slot_id, reason))
            }
            ReserveOutcome::Full => return Err(AppError::slot_full(slot_id)),
        };

        let session = Session {
            id: Uuid::new_v4(),
            booking_number: generate_booking_number(now),
            kind: SessionKind::Group,
            staff_id: slot.staff_id,
            member_id,
            slot_id: Some(slot.id),
            start_time: slot.start_time,
            end_time: slot.end_time,
            // Group joining is immediate commitment; there is no pending step.
            status: SessionStatus::Confirmed,
            cost_cents: 0,
            payment_method: None,
            charged_at: None,
            checked_in_at: None,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            rating: None,
            review: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let session = Self::insert_with_fresh_number(&mut tx, session, now).await?;
        tx.commit().await?;

        info!(
            session_id = %session.id,
            slot_id = %slot_id,
            member_id = %member_id,
            occupancy = slot.current_participants,
            "created group booking"
        );
        Ok(session)
    }

    /// Reschedule a one-on-one session to a new time window
    ///
    /// Re-runs the conflict detector excluding the session itself; disallowed
    /// once the session is terminal. Group bookings take their window from
    /// the class slot and cannot be rescheduled individually.
    ///
    /// # Errors
    ///
    /// - `ResourceNotFound` when the session does not exist
    /// - `InvalidInput` when the session is a group booking
    /// - `BookingConflict` when the new window overlaps another live session
    /// - `InvalidStateTransition` when the session is terminal
    pub async fn update_time(
        &self,
        session_id: Uuid,
        new_window: TimeWindow,
        scope: &CallerScope,
        now: DateTime<Utc>,
    ) -> AppResult<Session> {
        let mut tx = self.db.begin().await?;

        let session = Self::load(&mut tx, session_id).await?;
        scope.ensure_session_access(&session)?;

        if session.kind == SessionKind::Group {
            return Err(AppError::invalid_input(
                "Group bookings follow the class schedule and cannot be rescheduled individually",
            ));
        }

        if session.status.is_terminal() {
            return Err(AppError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot reschedule a session in status '{}'",
                    session.status
                ),
            ));
        }

        let report = sessions::find_conflicts(
            &mut tx,
            &new_window,
            session.staff_id,
            Some(session.member_id),
            Some(session.id),
        )
        .await?;
        if !report.is_clean() {
            return Err(report.into_error());
        }

        if !sessions::update_window(&mut tx, session_id, &new_window, now).await? {
            // The guarded update lost a race with a terminal transition.
            let current = Self::load(&mut tx, session_id).await?;
            return Err(AppError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot reschedule a session in status '{}'", current.status),
            ));
        }

        let session = Self::load(&mut tx, session_id).await?;
        tx.commit().await?;
        Ok(session)
    }

    /// Confirm a pending one-on-one session
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` unless the session is `pending`
    pub async fn confirm(
        &self,
        session_id: Uuid,
        scope: &CallerScope,
        now: DateTime<Utc>,
    ) -> AppResult<Session> {
        let mut tx = self.db.begin().await?;
        let session = Self::load(&mut tx, session_id).await?;
        scope.ensure_session_access(&session)?;

        validate_transition(&session, SessionAction::Confirm, now)?;
        if !sessions::mark_confirmed(&mut tx, session_id, now).await? {
            return Err(Self::stale_transition(&mut tx, session_id, SessionAction::Confirm).await);
        }

        let session = Self::load(&mut tx, session_id).await?;
        tx.commit().await?;
        Ok(session)
    }

    /// Cancel a session, releasing group capacity in the same transaction
    ///
    /// Cancelling an already-cancelled session fails with the state error and
    /// does not release capacity again.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` unless the session is `pending`/`confirmed`
    /// - `CancellationWindowClosed` inside the lead window (2h one-on-one, 3h group)
    pub async fn cancel(
        &self,
        session_id: Uuid,
        reason: Option<String>,
        scope: &CallerScope,
        now: DateTime<Utc>,
    ) -> AppResult<Session> {
        let mut tx = self.db.begin().await?;
        let session = Self::load(&mut tx, session_id).await?;
        scope.ensure_session_access(&session)?;

        validate_transition(&session, SessionAction::Cancel, now)?;
        if !sessions::mark_cancelled(&mut tx, session_id, session.status, reason.as_deref(), now)
            .await?
        {
            return Err(Self::stale_transition(&mut tx, session_id, SessionAction::Cancel).await);
        }

        if let Some(slot_id) = session.slot_id {
            slots::release(&mut tx, slot_id, now).await?;
        }

        let session = Self::load(&mut tx, session_id).await?;
        tx.commit().await?;

        info!(session_id = %session_id, "cancelled booking");
        Ok(session)
    }

    /// Check a member in, within the check-in grace window
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` unless the session is `charged`
    /// - `OutsideCheckInWindow` outside `[start - 30min, end + 30min]`
    pub async fn check_in(
        &self,
        session_id: Uuid,
        scope: &CallerScope,
        now: DateTime<Utc>,
    ) -> AppResult<Session> {
        let mut tx = self.db.begin().await?;
        let session = Self::load(&mut tx, session_id).await?;
        scope.ensure_session_access(&session)?;

        validate_transition(&session, SessionAction::CheckIn, now)?;
        if !sessions::mark_checked_in(&mut tx, session_id, now).await? {
            return Err(Self::stale_transition(&mut tx, session_id, SessionAction::CheckIn).await);
        }

        let session = Self::load(&mut tx, session_id).await?;
        tx.commit().await?;
        Ok(session)
    }

    /// Mark a session completed
    ///
    /// Legal from `checked_in`, or from `confirmed` once the end time has
    /// passed (group classes have no check-in step).
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` for any other status
    pub async fn complete(
        &self,
        session_id: Uuid,
        scope: &CallerScope,
        now: DateTime<Utc>,
    ) -> AppResult<Session> {
        let mut tx = self.db.begin().await?;
        let session = Self::load(&mut tx, session_id).await?;
        scope.ensure_session_access(&session)?;

        validate_transition(&session, SessionAction::Complete, now)?;
        if !sessions::mark_completed(&mut tx, session_id, session.status, now).await? {
            return Err(Self::stale_transition(&mut tx, session_id, SessionAction::Complete).await);
        }

        let session = Self::load(&mut tx, session_id).await?;
        tx.commit().await?;
        Ok(session)
    }

    /// Mark a charged, never-checked-in session as a no-show after end time
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition`/`InvalidInput` when the preconditions fail
    pub async fn mark_no_show(
        &self,
        session_id: Uuid,
        scope: &CallerScope,
        now: DateTime<Utc>,
    ) -> AppResult<Session> {
        let mut tx = self.db.begin().await?;
        let session = Self::load(&mut tx, session_id).await?;
        scope.ensure_session_access(&session)?;

        validate_transition(&session, SessionAction::MarkNoShow, now)?;
        if !sessions::mark_no_show(&mut tx, session_id, now).await? {
            return Err(
                Self::stale_transition(&mut tx, session_id, SessionAction::MarkNoShow).await,
            );
        }

        let session = Self::load(&mut tx, session_id).await?;
        tx.commit().await?;
        Ok(session)
    }

    /// Record a rating and review on a completed session, at most once
    ///
    /// # Errors
    ///
    /// - `ValueOutOfRange` when the rating is outside 1-5
    /// - `AlreadyReviewed` on a second attempt
    /// - `InvalidStateTransition` unless the session is `completed`
    pub async fn add_review(
        &self,
        session_id: Uuid,
        rating: i32,
        review: Option<String>,
        scope: &CallerScope,
        now: DateTime<Utc>,
    ) -> AppResult<Session> {
        if !(1..=5).contains(&rating) {
            return Err(AppError::new(
                ErrorCode::ValueOutOfRange,
                "Rating must be between 1 and 5",
            ));
        }

        let mut tx = self.db.begin().await?;
        let session = Self::load(&mut tx, session_id).await?;
        scope.ensure_session_access(&session)?;

        validate_transition(&session, SessionAction::AddReview, now)?;
        if !sessions::record_review(&mut tx, session_id, rating, review.as_deref(), now).await? {
            return Err(
                Self::stale_transition(&mut tx, session_id, SessionAction::AddReview).await,
            );
        }

        let session = Self::load(&mut tx, session_id).await?;
        tx.commit().await?;
        Ok(session)
    }

    /// Soft-delete a session; gated by "no terminal billing state yet"
    ///
    /// A live group booking releases its seat as part of the delete, keeping
    /// the ledger consistent with the visible session set.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` once billing has occurred
    pub async fn delete(
        &self,
        session_id: Uuid,
        scope: &CallerScope,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        let session = Self::load(&mut tx, session_id).await?;
        scope.ensure_session_access(&session)?;

        if session.billing_is_terminal() {
            return Err(AppError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot delete a session in status '{}' with billing history",
                    session.status
                ),
            ));
        }

        if !sessions::soft_delete(&mut tx, session_id, now).await? {
            return Err(AppError::not_found("Session"));
        }

        if session.slot_id.is_some() && session.status.participates_in_conflicts() {
            if let Some(slot_id) = session.slot_id {
                slots::release(&mut tx, slot_id, now).await?;
            }
        }

        tx.commit().await?;
        info!(session_id = %session_id, "soft-deleted booking");
        Ok(())
    }

    /// Fetch one session
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` for missing or soft-deleted sessions
    pub async fn get(&self, session_id: Uuid, scope: &CallerScope) -> AppResult<Session> {
        let mut conn = self.db.pool().acquire().await.map_err(AppError::from)?;
        let session = sessions::fetch(&mut conn, session_id)
            .await?
            .ok_or_else(|| AppError::not_found("Session"))?;
        scope.ensure_session_access(&session)?;
        Ok(session)
    }

    /// List sessions, scoped to what the caller may see
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn list(
        &self,
        mut filter: SessionFilter,
        params: ListParams,
        scope: &CallerScope,
    ) -> AppResult<Page<Session>> {
        Self::scope_filter(&mut filter, scope);
        sessions::list(self.db.pool(), &filter, &params.clamped()).await
    }

    /// Calendar projection of the caller-visible sessions
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn calendar(
        &self,
        mut filter: SessionFilter,
        params: ListParams,
        scope: &CallerScope,
    ) -> AppResult<Vec<CalendarEntry>> {
        Self::scope_filter(&mut filter, scope);
        let page = sessions::list(self.db.pool(), &filter, &params.clamped()).await?;
        Ok(calendar::project(&page.items))
    }

    fn scope_filter(filter: &mut SessionFilter, scope: &CallerScope) {
        match scope.role {
            crate::permissions::CallerRole::Member => filter.member_id = Some(scope.actor_id),
            crate::permissions::CallerRole::Staff => filter.staff_id = Some(scope.actor_id),
            _ => {}
        }
    }

    async fn load(tx: &mut Transaction<'static, Sqlite>, session_id: Uuid) -> AppResult<Session> {
        sessions::fetch(tx, session_id)
            .await?
            .ok_or_else(|| AppError::not_found("Session"))
    }

    /// Report a guarded update that matched zero rows: the session moved on
    /// between the load and the write, so re-read and name the real status.
    async fn stale_transition(
        tx: &mut Transaction<'static, Sqlite>,
        session_id: Uuid,
        action: SessionAction,
    ) -> AppError {
        match Self::load(tx, session_id).await {
            Ok(current) => AppError::invalid_state_transition(current.status, action.target_label()),
            Err(e) => e,
        }
    }

    /// Insert, regenerating the booking number on a unique collision
    async fn insert_with_fresh_number(
        tx: &mut Transaction<'static, Sqlite>,
        mut session: Session,
        now: DateTime<Utc>,
    ) -> AppResult<Session> {
        for _ in 0..limits::BOOKING_NUMBER_MAX_ATTEMPTS {
            match sessions::insert(tx, &session).await? {
                InsertOutcome::Inserted => return Ok(session),
                InsertOutcome::BookingNumberCollision => {
                    session.booking_number = generate_booking_number(now);
                }
                InsertOutcome::DuplicateSlotMember => {
                    let slot_id = session.slot_id.unwrap_or_default();
                    return Err(AppError::duplicate_booking(slot_id, session.member_id));
                }
            }
        }
        Err(AppError::internal(
            "Exhausted booking number generation attempts",
        ))
    }
}
