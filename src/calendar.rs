// ABOUTME: Read-only projection of session records into display calendar entries
// ABOUTME: Color-coded by status; carries no invariants of its own
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Calendar Projection
//!
//! Transforms session records into a display-friendly list for calendar
//! views. This is not part of the invariant-bearing core; it only consumes
//! the same state.

use crate::models::{Session, SessionStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One display entry on the calendar
#[derive(Debug, Clone, Serialize)]
pub struct CalendarEntry {
    /// Underlying session id
    pub session_id: Uuid,
    /// Display title: booking number plus kind
    pub title: String,
    /// Entry start
    pub start_time: DateTime<Utc>,
    /// Entry end
    pub end_time: DateTime<Utc>,
    /// Session status the color encodes
    pub status: SessionStatus,
    /// Display color for the status
    pub color: &'static str,
}

/// Display color per status
#[must_use]
pub const fn status_color(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Pending => "#f0ad4e",
        SessionStatus::Confirmed => "#5bc0de",
        SessionStatus::Charged => "#0275d8",
        SessionStatus::CheckedIn => "#5cb85c",
        SessionStatus::Completed => "#292b2c",
        SessionStatus::Cancelled => "#d9534f",
        SessionStatus::NoShow => "#9b59b6",
    }
}

/// Project sessions into calendar entries, sorted by start time
#[must_use]
pub fn project(sessions: &[Session]) -> Vec<CalendarEntry> {
    let mut entries: Vec<CalendarEntry> = sessions
        .iter()
        .map(|session| CalendarEntry {
            session_id: session.id,
            title: format!("{} ({})", session.booking_number, session.kind),
            start_time: session.start_time,
            end_time: session.end_time,
            status: session.status,
            color: status_color(session.status),
        })
        .collect();
    entries.sort_by_key(|entry| entry.start_time);
    entries
}
