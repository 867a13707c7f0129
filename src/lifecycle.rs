// ABOUTME: Status transition validator for the session lifecycle state machine
// ABOUTME: Centralizes every legality and timing rule for lifecycle moves
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Session Lifecycle
//!
//! The session state machine:
//!
//! ```text
//! pending    -> confirmed | cancelled
//! confirmed  -> charged | cancelled        (group: -> completed after end time)
//! charged    -> checked_in | no_show
//! checked_in -> completed
//! completed, cancelled, no_show            (terminal)
//! ```
//!
//! Group sessions are created directly `confirmed` and skip the charge step;
//! they complete from `confirmed` once their end time has passed.
//!
//! This module never mutates storage. [`validate_transition`] returns the
//! target status for a legal move, and the orchestrator applies it inside a
//! transaction with a status-guarded update. Keeping every legality check
//! here means illegal transitions are impossible to express anywhere else.

use crate::constants::windows;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::{Session, SessionKind, SessionStatus};
use chrono::{DateTime, Duration, Utc};

/// A requested lifecycle move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    /// `pending -> confirmed`
    Confirm,
    /// `confirmed -> charged` (one-on-one only, applied by the sweeper or manually)
    Charge,
    /// `pending|confirmed -> cancelled`, subject to the cancellation lead window
    Cancel,
    /// `charged -> checked_in`, within the check-in window
    CheckIn,
    /// `checked_in -> completed`, or `confirmed -> completed` after end time
    Complete,
    /// `charged -> no_show`, after end time with no check-in
    MarkNoShow,
    /// Record a review on a completed session; status is unchanged
    AddReview,
}

impl SessionAction {
    /// Status the action moves toward, used in error messages
    #[must_use]
    pub const fn target_label(&self) -> &'static str {
        match self {
            Self::Confirm => "confirmed",
            Self::Charge => "charged",
            Self::Cancel => "cancelled",
            Self::CheckIn => "checked_in",
            Self::Complete => "completed",
            Self::MarkNoShow => "no_show",
            Self::AddReview => "reviewed",
        }
    }
}

/// Minimum lead before start time for a cancellation, by session kind
#[must_use]
pub fn cancellation_lead(kind: SessionKind) -> Duration {
    match kind {
        SessionKind::OneOnOne => Duration::minutes(windows::CANCEL_LEAD_ONE_ON_ONE_MINS),
        SessionKind::Group => Duration::minutes(windows::CANCEL_LEAD_GROUP_MINS),
    }
}

/// Validate a lifecycle move and return the status it results in
///
/// Timing rules are part of the transition itself: cancellation lead windows,
/// the check-in grace window, and the no-show/completion end-time guards are
/// all enforced here so the orchestrator can apply the decision blindly.
///
/// # Errors
///
/// - `InvalidStateTransition` when the move is not legal from the current status
/// - `CancellationWindowClosed` when a cancel arrives inside the lead window
/// - `OutsideCheckInWindow` when a check-in arrives outside the grace window
/// - `AlreadyReviewed` when a second review is attempted
/// - `InvalidInput` when a no-show or completion is requested before end time
pub fn validate_transition(
    session: &Session,
    action: SessionAction,
    now: DateTime<Utc>,
) -> AppResult<SessionStatus> {
    match action {
        SessionAction::Confirm => match session.status {
            SessionStatus::Pending => Ok(SessionStatus::Confirmed),
            current => Err(illegal(current, action)),
        },

        SessionAction::Charge => {
            if session.kind == SessionKind::Group {
                // Group commitment is immediate at booking time; there is no
                // pre-session charge step.
                return Err(illegal(session.status, action));
            }
            match session.status {
                SessionStatus::Confirmed => Ok(SessionStatus::Charged),
                current => Err(illegal(current, action)),
            }
        }

        SessionAction::Cancel => {
            if !matches!(
                session.status,
                SessionStatus::Pending | SessionStatus::Confirmed
            ) {
                return Err(illegal(session.status, action));
            }
            let lead = cancellation_lead(session.kind);
            if now + lead >= session.start_time {
                return Err(AppError::new(
                    ErrorCode::CancellationWindowClosed,
                    format!(
                        "Cancellations require at least {} minutes notice",
                        lead.num_minutes()
                    ),
                ));
            }
            Ok(SessionStatus::Cancelled)
        }

        SessionAction::CheckIn => {
            if session.status != SessionStatus::Charged {
                return Err(illegal(session.status, action));
            }
            if session.is_checked_in() {
                return Err(illegal(session.status, action));
            }
            let grace = Duration::minutes(windows::CHECK_IN_GRACE_MINS);
            if now < session.start_time - grace || now > session.end_time + grace {
                return Err(AppError::new(
                    ErrorCode::OutsideCheckInWindow,
                    format!(
                        "Check-in is open from {} minutes before start until {} minutes after end",
                        grace.num_minutes(),
                        grace.num_minutes()
                    ),
                ));
            }
            Ok(SessionStatus::CheckedIn)
        }

        SessionAction::Complete => match session.status {
            SessionStatus::CheckedIn => Ok(SessionStatus::Completed),
            // Flows without an explicit check-in (group classes) complete
            // directly once the session is over.
            SessionStatus::Confirmed => {
                if now <= session.end_time {
                    return Err(AppError::invalid_input(
                        "Cannot mark a session completed before its end time",
                    ));
                }
                Ok(SessionStatus::Completed)
            }
            current => Err(illegal(current, action)),
        },

        SessionAction::MarkNoShow => {
            if session.status != SessionStatus::Charged {
                return Err(illegal(session.status, action));
            }
            if session.is_checked_in() {
                return Err(illegal(session.status, action));
            }
            if now <= session.end_time {
                return Err(AppError::invalid_input(
                    "Cannot mark a no-show before the session has ended",
                ));
            }
            Ok(SessionStatus::NoShow)
        }

        SessionAction::AddReview => {
            if session.status != SessionStatus::Completed {
                return Err(illegal(session.status, action));
            }
            if session.is_reviewed() {
                return Err(AppError::new(
                    ErrorCode::AlreadyReviewed,
                    "A review has already been recorded for this session",
                ));
            }
            Ok(SessionStatus::Completed)
        }
    }
}

fn illegal(current: SessionStatus, action: SessionAction) -> AppError {
    AppError::invalid_state_transition(current, action.target_label())
}
