// ABOUTME: Group session route handlers for joining fixed-capacity classes
// ABOUTME: Delegates atomically to the capacity ledger via the orchestrator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Group session routes

use crate::errors::AppError;
use crate::permissions::CallerScope;
use crate::routes::ServerResources;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Request body for joining a group session
#[derive(Debug, Deserialize)]
pub struct JoinGroupSessionRequest {
    /// Member taking the seat
    pub member_id: Uuid,
}

/// Group session routes
pub struct GroupSessionRoutes;

impl GroupSessionRoutes {
    /// Create all group session routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/group-sessions/:slot_id/bookings",
                post(Self::handle_join),
            )
            .with_state(resources)
    }

    async fn handle_join(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(slot_id): Path<Uuid>,
        Json(request): Json<JoinGroupSessionRequest>,
    ) -> Result<Response, AppError> {
        let scope = CallerScope::from_headers(&headers)?;
        let session = resources
            .booking
            .create_group_booking(slot_id, request.member_id, &scope, Utc::now())
            .await?;
        Ok((StatusCode::CREATED, Json(session)).into_response())
    }
}
