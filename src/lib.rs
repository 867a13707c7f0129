// ABOUTME: Main library entry point for the Pierre booking service
// ABOUTME: Session scheduling, capacity management, lifecycle, and pre-session billing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Pierre Booking Service
//!
//! Schedules bounded-capacity service sessions: one-on-one coaching slots
//! and fixed-capacity group classes. The core prevents double-booking of
//! staff and member time, keeps group occupancy within capacity, and drives
//! every booking through a lifecycle ending in billing and attendance
//! outcomes.
//!
//! ## Architecture
//!
//! - **Models**: session records and group slots
//! - **Conflicts**: half-open time-window overlap detection
//! - **Lifecycle**: the status state machine, centralized in one validator
//! - **Database**: SQLite storage; guarded conditional updates make every
//!   state change race-safe
//! - **Services**: the booking orchestrator and the auto-charge sweeper
//! - **Routes**: the REST surface over axum
//!
//! Correctness comes from the storage layer: conflict checks, capacity
//! reservation, and lifecycle writes each run inside one transaction, and
//! every mutation carries a `WHERE` guard re-validating its precondition.

/// Read-only calendar projection of session records
pub mod calendar;

/// Time-window overlap types and predicate
pub mod conflicts;

/// Application constants: business windows and operational limits
pub mod constants;

/// Configuration management
pub mod config;

/// Database handle, schema, and persistence modules
pub mod database;

/// Unified error handling
pub mod errors;

/// Session lifecycle state machine
pub mod lifecycle;

/// Logging configuration and setup
pub mod logging;

/// Core data models
pub mod models;

/// Pagination parameters and result pages
pub mod pagination;

/// Payment gateway boundary
pub mod payments;

/// Caller scope and capability checks
pub mod permissions;

/// HTTP routes and shared server state
pub mod routes;

/// Domain service layer
pub mod services;
