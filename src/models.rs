// ABOUTME: Core data models for bookable sessions and group slots
// ABOUTME: Session record, status enum, group slot, and booking number generation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Data Models
//!
//! Core data structures for the booking service: the session record (one
//! bookable unit of service time), its status lifecycle, and the shared
//! group slot that fixed-capacity classes are booked into.
//!
//! ## Design Principles
//!
//! - **Status as data**: the full lifecycle is a single enum; legality of
//!   moves between statuses lives in [`crate::lifecycle`], not in call sites
//! - **Serializable**: all models support JSON serialization for the REST API
//! - **Type Safe**: strong typing for statuses, kinds, and payment methods

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a session record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, awaiting confirmation (one-on-one only)
    Pending,
    /// Committed; group bookings are created directly in this status
    Confirmed,
    /// Billed ahead of the session start
    Charged,
    /// Member arrived within the check-in window
    CheckedIn,
    /// Session took place (terminal)
    Completed,
    /// Cancelled before start (terminal)
    Cancelled,
    /// Charged but member never checked in (terminal)
    NoShow,
}

impl SessionStatus {
    /// Database/API string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Charged => "charged",
            Self::CheckedIn => "checked_in",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
        }
    }

    /// Parse from the database/API string representation
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "charged" => Some(Self::Charged),
            "checked_in" => Some(Self::CheckedIn),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "no_show" => Some(Self::NoShow),
            _ => None,
        }
    }

    /// Terminal statuses admit no further transitions
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::NoShow)
    }

    /// Only live bookings can conflict with a proposed time window
    #[must_use]
    pub const fn participates_in_conflicts(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a session is an individual coaching slot or part of a group class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Individual coaching slot between a member and a staff member
    OneOnOne,
    /// Seat in a fixed-capacity group class, referencing a [`GroupSlot`]
    Group,
}

impl SessionKind {
    /// Database/API string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OneOnOne => "one_on_one",
            Self::Group => "group",
        }
    }

    /// Parse from the database/API string representation
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "one_on_one" => Some(Self::OneOnOne),
            "group" => Some(Self::Group),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single bookable unit of service time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque unique id
    pub id: Uuid,
    /// Human-readable booking number for display and search
    pub booking_number: String,
    /// One-on-one or group
    pub kind: SessionKind,
    /// Coaching staff member; optional for pure self-service sessions
    pub staff_id: Option<Uuid>,
    /// Booking member
    pub member_id: Uuid,
    /// Shared group slot, present only for group sessions
    pub slot_id: Option<Uuid>,
    /// Session start (inclusive)
    pub start_time: DateTime<Utc>,
    /// Session end (exclusive)
    pub end_time: DateTime<Utc>,
    /// Current lifecycle status
    pub status: SessionStatus,
    /// Price in cents
    pub cost_cents: i64,
    /// Payment method used for the charge, if any
    pub payment_method: Option<String>,
    /// When the pre-session charge succeeded
    pub charged_at: Option<DateTime<Utc>>,
    /// When the member checked in
    pub checked_in_at: Option<DateTime<Utc>>,
    /// When the session was marked completed
    pub completed_at: Option<DateTime<Utc>>,
    /// When the session was cancelled
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Reason supplied with the cancellation
    pub cancellation_reason: Option<String>,
    /// Post-completion rating, 1-5
    pub rating: Option<i32>,
    /// Post-completion review text
    pub review: Option<String>,
    /// When the review was recorded
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Record creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker; deleted sessions are hidden from all reads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Whether the member has checked in
    #[must_use]
    pub const fn is_checked_in(&self) -> bool {
        self.checked_in_at.is_some()
    }

    /// Whether a review has already been recorded
    #[must_use]
    pub const fn is_reviewed(&self) -> bool {
        self.reviewed_at.is_some()
    }

    /// Billing has reached a state where the record must be kept
    #[must_use]
    pub const fn billing_is_terminal(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::Charged | SessionStatus::CheckedIn | SessionStatus::Completed
        )
    }
}

/// Availability of a group slot for new bookings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    /// Accepting bookings until start time or capacity
    Open,
    /// Class cancelled; no bookings accepted
    Cancelled,
}

impl SlotStatus {
    /// Database/API string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse from the database/API string representation
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Shared time/capacity container for a group class
///
/// Multiple [`Session`] records reference one slot via `slot_id`. The
/// `current_participants` counter is a derived cache of the non-cancelled
/// session count and is only ever mutated in the same transaction as the
/// session row it is derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSlot {
    /// Opaque unique id
    pub id: Uuid,
    /// Display title of the class
    pub title: String,
    /// Coaching staff member leading the class
    pub staff_id: Option<Uuid>,
    /// Class start (inclusive)
    pub start_time: DateTime<Utc>,
    /// Class end (exclusive)
    pub end_time: DateTime<Utc>,
    /// Seat count
    pub max_participants: i64,
    /// Cached occupancy; invariant `0 <= current <= max`
    pub current_participants: i64,
    /// Whether the slot accepts bookings
    pub status: SlotStatus,
    /// Record creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl GroupSlot {
    /// Seats still available
    #[must_use]
    pub const fn remaining_seats(&self) -> i64 {
        self.max_participants - self.current_participants
    }
}

/// Generate a human-readable booking number: `BK-YYYYMMDD-XXXXXX`
///
/// The suffix is random, so callers must treat collisions as possible and
/// retry the insert with a fresh number rather than overwrite.
#[must_use]
pub fn generate_booking_number(now: DateTime<Utc>) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| {
            let idx = rng.gen_range(0..ALPHABET.len());
            char::from(ALPHABET[idx])
        })
        .collect();
    format!("BK-{}-{}", now.format("%Y%m%d"), suffix)
}
