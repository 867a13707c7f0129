// ABOUTME: Time-window overlap detection types for double-booking prevention
// ABOUTME: Half-open interval semantics; back-to-back sessions do not conflict
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Conflict Detection
//!
//! A conflict is a temporal overlap between two non-terminal sessions that
//! share a staff or member resource. Windows are half-open `[start, end)`, so
//! a session ending at 11:00 and one starting at 11:00 do not conflict.
//!
//! The storage-side query lives in [`crate::database::sessions`] so it can
//! run inside the orchestrator's transaction; this module holds the pure
//! types and the overlap predicate.

use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A half-open time window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start (inclusive)
    pub start: DateTime<Utc>,
    /// End (exclusive)
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Build a window, rejecting empty or inverted ranges
    ///
    /// # Errors
    ///
    /// Returns `InvalidTimeWindow` when `start >= end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<Self> {
        if start >= end {
            return Err(AppError::invalid_time_window(format!(
                "start time {start} must be before end time {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Half-open overlap: `s1 < e2 && e1 > s2`
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// The sessions a proposed window collides with, per resource
///
/// Staff-side and member-side conflicts are reported independently; the
/// caller decides how to react.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConflictReport {
    /// Live sessions overlapping on the staff member's calendar
    pub staff_conflicts: Vec<Uuid>,
    /// Live sessions overlapping on the member's calendar
    pub member_conflicts: Vec<Uuid>,
}

impl ConflictReport {
    /// No overlap on either side
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.staff_conflicts.is_empty() && self.member_conflicts.is_empty()
    }

    /// Convert a non-clean report into the conflict error the API returns
    #[must_use]
    pub fn into_error(self) -> AppError {
        AppError::booking_conflict(&self.staff_conflicts, &self.member_conflicts)
    }
}
