// ABOUTME: System-wide constants for the booking service
// ABOUTME: Business time windows, operational defaults, and environment-based ports
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Constants Module
//!
//! Fixed business rules and operational defaults. The scheduling windows are
//! business behavior, not tuning knobs, so they live here rather than in
//! [`crate::config`].

/// Scheduling and billing time windows
pub mod windows {
    /// Minimum lead before start time for cancelling a one-on-one session (minutes)
    pub const CANCEL_LEAD_ONE_ON_ONE_MINS: i64 = 120;

    /// Minimum lead before start time for cancelling a group booking (minutes)
    // One-on-one and group leads differ in observed production behavior;
    // do not unify without confirming the business rule.
    pub const CANCEL_LEAD_GROUP_MINS: i64 = 180;

    /// Check-in is accepted this many minutes before start and after end
    pub const CHECK_IN_GRACE_MINS: i64 = 30;

    /// Sessions starting within this horizon are eligible for auto-charge (minutes)
    pub const CHARGE_HORIZON_MINS: i64 = 180;
}

/// Operational limits and defaults
pub mod limits {
    /// Default interval between auto-charge sweeps (seconds)
    pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

    /// Default per-session timeout for a charge attempt (seconds)
    pub const DEFAULT_CHARGE_TIMEOUT_SECS: u64 = 30;

    /// Maximum attempts to generate a unique booking number before giving up
    pub const BOOKING_NUMBER_MAX_ATTEMPTS: u32 = 5;

    /// Default page size for list endpoints
    pub const DEFAULT_PAGE_SIZE: u32 = 50;

    /// Hard cap on page size for list endpoints
    pub const MAX_PAGE_SIZE: u32 = 200;
}

/// Service identity
pub mod service {
    /// Service name for structured logging
    pub const SERVICE_NAME: &str = "pierre-booking-server";

    /// Server version from Cargo.toml
    pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Network defaults
pub mod ports {
    /// Default HTTP API port
    pub const DEFAULT_HTTP_PORT: u16 = 8081;
}
