// ABOUTME: Unified error handling for the booking service
// ABOUTME: Defines error codes, the AppError type, and HTTP response formatting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling System
//!
//! Centralized error handling for the booking service. Defines standard error
//! types, error codes, and HTTP response formatting so every route and
//! service reports failures the same way.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Authorization (1000-1999)
    #[serde(rename = "PERMISSION_DENIED")]
    PermissionDenied = 1004,

    // Validation (3000-3999)
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 3000,
    #[serde(rename = "INVALID_TIME_WINDOW")]
    InvalidTimeWindow = 3001,
    #[serde(rename = "VALUE_OUT_OF_RANGE")]
    ValueOutOfRange = 3002,

    // Resource Management (4000-4999)
    #[serde(rename = "RESOURCE_NOT_FOUND")]
    ResourceNotFound = 4000,
    #[serde(rename = "DUPLICATE_BOOKING")]
    DuplicateBooking = 4001,

    // External Services (5000-5999)
    #[serde(rename = "PAYMENT_FAILED")]
    PaymentFailed = 5000,

    // Scheduling (7000-7999)
    #[serde(rename = "BOOKING_CONFLICT")]
    BookingConflict = 7000,
    #[serde(rename = "SLOT_FULL")]
    SlotFull = 7001,
    #[serde(rename = "SLOT_NOT_AVAILABLE")]
    SlotNotAvailable = 7002,
    #[serde(rename = "INVALID_STATE_TRANSITION")]
    InvalidStateTransition = 7003,
    #[serde(rename = "CANCELLATION_WINDOW_CLOSED")]
    CancellationWindowClosed = 7004,
    #[serde(rename = "OUTSIDE_CHECK_IN_WINDOW")]
    OutsideCheckInWindow = 7005,
    #[serde(rename = "ALREADY_REVIEWED")]
    AlreadyReviewed = 7006,

    // Internal Errors (9000-9999)
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError = 9001,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            // 400 Bad Request
            Self::InvalidInput
            | Self::InvalidTimeWindow
            | Self::ValueOutOfRange
            | Self::SlotFull
            | Self::SlotNotAvailable
            | Self::InvalidStateTransition
            | Self::CancellationWindowClosed
            | Self::OutsideCheckInWindow
            | Self::AlreadyReviewed => 400,

            // 403 Forbidden
            Self::PermissionDenied => 403,

            // 404 Not Found
            Self::ResourceNotFound => 404,

            // 409 Conflict
            Self::BookingConflict | Self::DuplicateBooking => 409,

            // 502 Bad Gateway
            Self::PaymentFailed => 502,

            // 500 Internal Server Error
            Self::InternalError | Self::DatabaseError => 500,
        }
    }

    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "You do not have permission to perform this action",
            Self::InvalidInput => "The provided input is invalid",
            Self::InvalidTimeWindow => "The session time window is invalid",
            Self::ValueOutOfRange => "The provided value is outside the acceptable range",
            Self::ResourceNotFound => "The requested resource was not found",
            Self::DuplicateBooking => "The member already has a booking for this slot",
            Self::PaymentFailed => "The payment could not be processed",
            Self::BookingConflict => "The time window overlaps an existing booking",
            Self::SlotFull => "The group session is at capacity",
            Self::SlotNotAvailable => "The group session is not open for booking",
            Self::InvalidStateTransition => "The requested status change is not allowed",
            Self::CancellationWindowClosed => "The session is too close to its start to cancel",
            Self::OutsideCheckInWindow => "Check-in is only possible around the session window",
            Self::AlreadyReviewed => "The session has already been reviewed",
            Self::InternalError => "An internal server error occurred",
            Self::DatabaseError => "A database operation failed",
        }
    }
}

/// Additional context for an error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Request ID for tracing
    pub request_id: Option<String>,
    /// Caller ID if available
    pub caller_id: Option<Uuid>,
    /// Resource (session/slot) the error relates to
    pub resource_id: Option<String>,
    /// Additional structured details
    pub details: serde_json::Value,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            request_id: None,
            caller_id: None,
            resource_id: None,
            details: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional context
    pub context: ErrorContext,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add a resource ID to the error context
    #[must_use]
    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.context.resource_id = Some(resource_id.into());
        self
    }

    /// Add details to the error context
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.context.details = details;
        self
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorResponseDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        Self {
            error: ErrorResponseDetails {
                code: error.code,
                message: error.message,
                request_id: error.context.request_id,
                details: error.context.details,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = http::StatusCode::from_u16(self.http_status())
            .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = self.into();
        (status, Json(body)).into_response()
    }
}

/// Convenience functions for creating common errors
impl AppError {
    /// Caller lacks scope for the target resource
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    /// Invalid input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Malformed session time window
    pub fn invalid_time_window(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidTimeWindow, message)
    }

    /// Resource not found
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Member already booked into the slot
    pub fn duplicate_booking(slot_id: Uuid, member_id: Uuid) -> Self {
        Self::new(
            ErrorCode::DuplicateBooking,
            format!("Member {member_id} already has a booking for slot {slot_id}"),
        )
        .with_resource_id(slot_id.to_string())
    }

    /// Group slot at capacity
    pub fn slot_full(slot_id: Uuid) -> Self {
        Self::new(
            ErrorCode::SlotFull,
            format!("Group session {slot_id} is at capacity"),
        )
        .with_resource_id(slot_id.to_string())
    }

    /// Group slot cancelled or already started
    pub fn slot_not_available(slot_id: Uuid, reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::SlotNotAvailable,
            format!("Group session {slot_id} is not open for booking: {}", reason.into()),
        )
        .with_resource_id(slot_id.to_string())
    }

    /// Overlapping booking for staff and/or member
    pub fn booking_conflict(staff_conflicts: &[Uuid], member_conflicts: &[Uuid]) -> Self {
        Self::new(
            ErrorCode::BookingConflict,
            "The requested time window overlaps an existing booking",
        )
        .with_details(serde_json::json!({
            "staff_conflicts": staff_conflicts,
            "member_conflicts": member_conflicts,
        }))
    }

    /// Illegal lifecycle move, naming both ends of the attempted transition
    pub fn invalid_state_transition(current: impl fmt::Display, requested: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InvalidStateTransition,
            format!("Cannot move session from '{current}' to '{requested}'"),
        )
        .with_details(serde_json::json!({
            "current_status": current.to_string(),
            "requested_status": requested.to_string(),
        }))
    }

    /// Internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }
}

/// Conversion from sqlx errors, preserving the driver message for diagnosis
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        Self::new(ErrorCode::DatabaseError, error.to_string()).with_source(error)
    }
}

/// Conversion from anyhow::Error to AppError
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        match error.source() {
            Some(source) => Self::new(ErrorCode::InternalError, error.to_string()).with_details(
                serde_json::json!({
                    "source": source.to_string()
                }),
            ),
            None => Self::new(ErrorCode::InternalError, error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::BookingConflict.http_status(), 409);
        assert_eq!(ErrorCode::DuplicateBooking.http_status(), 409);
        assert_eq!(ErrorCode::SlotFull.http_status(), 400);
        assert_eq!(ErrorCode::ResourceNotFound.http_status(), 404);
        assert_eq!(ErrorCode::PermissionDenied.http_status(), 403);
        assert_eq!(ErrorCode::PaymentFailed.http_status(), 502);
        assert_eq!(ErrorCode::InternalError.http_status(), 500);
    }

    #[test]
    fn test_conflict_error_carries_session_ids() {
        let staff = vec![Uuid::new_v4()];
        let member = vec![Uuid::new_v4(), Uuid::new_v4()];
        let error = AppError::booking_conflict(&staff, &member);

        assert_eq!(error.code, ErrorCode::BookingConflict);
        let details = &error.context.details;
        assert_eq!(details["staff_conflicts"].as_array().unwrap().len(), 1);
        assert_eq!(details["member_conflicts"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_state_transition_error_names_both_statuses() {
        let error = AppError::invalid_state_transition("completed", "cancelled");
        assert_eq!(error.code, ErrorCode::InvalidStateTransition);
        assert_eq!(error.context.details["current_status"], "completed");
        assert_eq!(error.context.details["requested_status"], "cancelled");
    }

    #[test]
    fn test_error_response_serialization() {
        let error = AppError::not_found("Session").with_resource_id("abc");
        let response: ErrorResponse = error.into();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"]["code"], "RESOURCE_NOT_FOUND");
    }
}
