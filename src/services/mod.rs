// ABOUTME: Domain service layer for the booking core
// ABOUTME: Orchestrates storage, conflict detection, capacity, and lifecycle rules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Domain service layer
//!
//! Business logic lives here, protocol-agnostic and reusable from any entry
//! point. Route handlers stay thin and delegate to these services.

/// Booking orchestration: create/update/cancel sessions and lifecycle moves
pub mod bookings;

/// Auto-charge sweeper: periodic pre-session billing of confirmed sessions
pub mod sweeper;
