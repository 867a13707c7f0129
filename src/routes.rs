// ABOUTME: Router assembly and shared server state for the REST surface
// ABOUTME: Mounts booking, group session, and health routes with tracing middleware
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! HTTP route organization
//!
//! Each functional area implements its own `Router`; this module owns the
//! shared [`ServerResources`] state and assembles the full application
//! router with tracing and CORS middleware.

/// One-on-one booking and lifecycle endpoints
pub mod bookings;

/// Group session join/cancel endpoints
pub mod group_sessions;

/// Health and readiness endpoints
pub mod health;

use crate::services::bookings::BookingService;
use crate::services::sweeper::AutoChargeSweeper;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state handed to every route handler
pub struct ServerResources {
    /// Booking orchestrator
    pub booking: BookingService,
    /// Auto-charge sweeper, shared with the background task
    pub sweeper: Arc<AutoChargeSweeper>,
}

/// Build the full application router
#[must_use]
pub fn router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .merge(health::HealthRoutes::routes())
        .merge(bookings::BookingRoutes::routes(resources.clone()))
        .merge(group_sessions::GroupSessionRoutes::routes(resources))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
