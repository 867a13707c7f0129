// ABOUTME: Booking route handlers: create, list, reschedule, and lifecycle moves
// ABOUTME: Thin wrappers over the orchestrator; caller scope from gateway headers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Booking management routes
//!
//! All handlers resolve the caller scope from the gateway-injected identity
//! headers and delegate to [`BookingService`]; no business rule lives here.

use crate::conflicts::TimeWindow;
use crate::database::sessions::SessionFilter;
use crate::errors::{AppError, AppResult};
use crate::models::{SessionKind, SessionStatus};
use crate::pagination::ListParams;
use crate::permissions::CallerScope;
use crate::routes::ServerResources;
use crate::services::bookings::{BookingService, NewOneOnOneBooking};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Request body for creating a one-on-one booking
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    /// Coaching staff member id; omit for self-service sessions
    pub staff_id: Option<Uuid>,
    /// Booking member id
    pub member_id: Uuid,
    /// Session start, RFC 3339
    pub start_time: DateTime<Utc>,
    /// Session end, RFC 3339
    pub end_time: DateTime<Utc>,
    /// Price in cents
    #[serde(default)]
    pub cost_cents: i64,
    /// Payment method for the pre-session charge
    pub payment_method: Option<String>,
}

/// Request body for rescheduling a booking
#[derive(Debug, Deserialize)]
pub struct UpdateBookingRequest {
    /// New start time, RFC 3339
    pub start_time: DateTime<Utc>,
    /// New end time, RFC 3339
    pub end_time: DateTime<Utc>,
}

/// Request body for cancelling a booking
#[derive(Debug, Default, Deserialize)]
pub struct CancelBookingRequest {
    /// Optional cancellation reason
    pub reason: Option<String>,
}

/// Request body for reviewing a completed session
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    /// Rating, 1-5
    pub rating: i32,
    /// Optional review text
    pub review: Option<String>,
}

/// Query parameters for booking listings
#[derive(Debug, Default, Deserialize)]
pub struct ListBookingsQuery {
    /// Restrict to a member's bookings
    pub member_id: Option<Uuid>,
    /// Restrict to a staff member's schedule
    pub staff_id: Option<Uuid>,
    /// Restrict to one status
    pub status: Option<String>,
    /// Restrict to one kind
    pub kind: Option<String>,
    /// Only sessions ending after this time
    pub from: Option<DateTime<Utc>>,
    /// Only sessions starting before this time
    pub until: Option<DateTime<Utc>>,
    /// Page size
    pub limit: Option<u32>,
    /// Rows to skip
    pub offset: Option<u32>,
}

impl ListBookingsQuery {
    fn into_parts(self) -> AppResult<(SessionFilter, ListParams)> {
        let status = self
            .status
            .as_deref()
            .map(|s| {
                SessionStatus::parse(s)
                    .ok_or_else(|| AppError::invalid_input(format!("Unknown status '{s}'")))
            })
            .transpose()?;
        let kind = self
            .kind
            .as_deref()
            .map(|k| {
                SessionKind::parse(k)
                    .ok_or_else(|| AppError::invalid_input(format!("Unknown kind '{k}'")))
            })
            .transpose()?;

        let filter = SessionFilter {
            member_id: self.member_id,
            staff_id: self.staff_id,
            status,
            kind,
            from: self.from,
            until: self.until,
        };
        let mut params = ListParams::default();
        if let Some(limit) = self.limit {
            params.limit = limit;
        }
        if let Some(offset) = self.offset {
            params.offset = offset;
        }
        Ok((filter, params))
    }
}

/// Booking management routes
pub struct BookingRoutes;

impl BookingRoutes {
    /// Create all booking routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/bookings", post(Self::handle_create))
            .route("/bookings", get(Self::handle_list))
            .route("/bookings/calendar", get(Self::handle_calendar))
            .route("/bookings/auto-charge", post(Self::handle_auto_charge))
            .route("/bookings/:id", get(Self::handle_get))
            .route("/bookings/:id", patch(Self::handle_update_time))
            .route("/bookings/:id", delete(Self::handle_delete))
            .route("/bookings/:id/confirm", patch(Self::handle_confirm))
            .route("/bookings/:id/cancel", patch(Self::handle_cancel))
            .route("/bookings/:id/cancel-group", patch(Self::handle_cancel_group))
            .route("/bookings/:id/check-in", patch(Self::handle_check_in))
            .route("/bookings/:id/mark-completed", patch(Self::handle_complete))
            .route("/bookings/:id/mark-no-show", patch(Self::handle_no_show))
            .route("/bookings/:id/review", patch(Self::handle_review))
            .with_state(resources)
    }

    fn service(resources: &Arc<ServerResources>) -> &BookingService {
        &resources.booking
    }

    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<CreateBookingRequest>,
    ) -> Result<Response, AppError> {
        let scope = CallerScope::from_headers(&headers)?;
        let session = Self::service(&resources)
            .create_one_on_one(
                NewOneOnOneBooking {
                    staff_id: request.staff_id,
                    member_id: request.member_id,
                    start_time: request.start_time,
                    end_time: request.end_time,
                    cost_cents: request.cost_cents,
                    payment_method: request.payment_method,
                },
                &scope,
                Utc::now(),
            )
            .await?;
        Ok((StatusCode::CREATED, Json(session)).into_response())
    }

    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<ListBookingsQuery>,
    ) -> Result<Response, AppError> {
        let scope = CallerScope::from_headers(&headers)?;
        let (filter, params) = query.into_parts()?;
        let page = Self::service(&resources).list(filter, params, &scope).await?;
        Ok(Json(page).into_response())
    }

    async fn handle_calendar(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<ListBookingsQuery>,
    ) -> Result<Response, AppError> {
        let scope = CallerScope::from_headers(&headers)?;
        let (filter, params) = query.into_parts()?;
        let entries = Self::service(&resources)
            .calendar(filter, params, &scope)
            .await?;
        Ok(Json(entries).into_response())
    }

    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let scope = CallerScope::from_headers(&headers)?;
        let session = Self::service(&resources).get(id, &scope).await?;
        Ok(Json(session).into_response())
    }

    async fn handle_update_time(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<Uuid>,
        Json(request): Json<UpdateBookingRequest>,
    ) -> Result<Response, AppError> {
        let scope = CallerScope::from_headers(&headers)?;
        let window = TimeWindow::new(request.start_time, request.end_time)?;
        let session = Self::service(&resources)
            .update_time(id, window, &scope, Utc::now())
            .await?;
        Ok(Json(session).into_response())
    }

    async fn handle_delete(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let scope = CallerScope::from_headers(&headers)?;
        Self::service(&resources).delete(id, &scope, Utc::now()).await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    async fn handle_confirm(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let scope = CallerScope::from_headers(&headers)?;
        let session = Self::service(&resources)
            .confirm(id, &scope, Utc::now())
            .await?;
        Ok(Json(session).into_response())
    }

    async fn handle_cancel(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<Uuid>,
        body: Option<Json<CancelBookingRequest>>,
    ) -> Result<Response, AppError> {
        let scope = CallerScope::from_headers(&headers)?;
        let reason = body.and_then(|Json(b)| b.reason);
        let session = Self::service(&resources)
            .cancel(id, reason, &scope, Utc::now())
            .await?;
        Ok(Json(session).into_response())
    }

    /// Group-booking cancellation path kept for API compatibility; verifies
    /// the target actually is a group booking before cancelling.
    async fn handle_cancel_group(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<Uuid>,
        body: Option<Json<CancelBookingRequest>>,
    ) -> Result<Response, AppError> {
        let scope = CallerScope::from_headers(&headers)?;
        let session = Self::service(&resources).get(id, &scope).await?;
        if session.kind != SessionKind::Group {
            return Err(AppError::invalid_input(
                "Session is not a group booking; use the cancel endpoint",
            ));
        }
        let reason = body.and_then(|Json(b)| b.reason);
        let session = Self::service(&resources)
            .cancel(id, reason, &scope, Utc::now())
            .await?;
        Ok(Json(session).into_response())
    }

    async fn handle_check_in(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let scope = CallerScope::from_headers(&headers)?;
        let session = Self::service(&resources)
            .check_in(id, &scope, Utc::now())
            .await?;
        Ok(Json(session).into_response())
    }

    async fn handle_complete(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let scope = CallerScope::from_headers(&headers)?;
        let session = Self::service(&resources)
            .complete(id, &scope, Utc::now())
            .await?;
        Ok(Json(session).into_response())
    }

    async fn handle_no_show(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let scope = CallerScope::from_headers(&headers)?;
        let session = Self::service(&resources)
            .mark_no_show(id, &scope, Utc::now())
            .await?;
        Ok(Json(session).into_response())
    }

    async fn handle_review(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<Uuid>,
        Json(request): Json<ReviewRequest>,
    ) -> Result<Response, AppError> {
        let scope = CallerScope::from_headers(&headers)?;
        let session = Self::service(&resources)
            .add_review(id, request.rating, request.review, &scope, Utc::now())
            .await?;
        Ok(Json(session).into_response())
    }

    async fn handle_auto_charge(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let scope = CallerScope::from_headers(&headers)?;
        if !scope.is_privileged() {
            return Err(AppError::permission_denied(
                "Only managers may trigger an auto-charge sweep",
            ));
        }
        let outcome = resources.sweeper.run_once(Utc::now()).await?;
        Ok(Json(outcome).into_response())
    }
}
