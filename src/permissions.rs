// ABOUTME: Caller scope and capability checks applied at orchestrator entry
// ABOUTME: Identity is established upstream; this module only enforces resource scope
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Permissions
//!
//! Authentication happens upstream of this service: the API gateway injects
//! the verified caller id and role as `x-caller-id` / `x-caller-role`
//! headers. This module turns those into a [`CallerScope`] and enforces the
//! one rule the booking core owns: callers may only touch sessions within
//! their own scope. Role semantics beyond that (store/brand hierarchies) are
//! deliberately kept out of the scheduling core.

use crate::errors::{AppError, AppResult};
use crate::models::Session;
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of the calling principal, as asserted by the identity layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerRole {
    /// A member acting on their own bookings
    Member,
    /// A staff member acting on their own schedule
    Staff,
    /// A store manager; unrestricted within the store
    StoreManager,
    /// Platform admin; unrestricted
    Admin,
}

impl CallerRole {
    /// Parse from the gateway header value
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "member" => Some(Self::Member),
            "staff" => Some(Self::Staff),
            "store_manager" => Some(Self::StoreManager),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// The verified caller identity plus role, passed into every orchestrator call
#[derive(Debug, Clone, Copy)]
pub struct CallerScope {
    /// Caller's principal id (member id or staff id depending on role)
    pub actor_id: Uuid,
    /// Caller's role
    pub role: CallerRole,
}

impl CallerScope {
    /// Build a scope from the gateway-injected identity headers
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` when the headers are missing or malformed
    pub fn from_headers(headers: &HeaderMap) -> AppResult<Self> {
        let actor_id = headers
            .get("x-caller-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or_else(|| AppError::permission_denied("Missing or invalid x-caller-id header"))?;

        let role = headers
            .get("x-caller-role")
            .and_then(|v| v.to_str().ok())
            .and_then(CallerRole::parse)
            .ok_or_else(|| AppError::permission_denied("Missing or invalid x-caller-role header"))?;

        Ok(Self { actor_id, role })
    }

    /// Managers and admins are unrestricted
    #[must_use]
    pub const fn is_privileged(&self) -> bool {
        matches!(self.role, CallerRole::StoreManager | CallerRole::Admin)
    }

    /// Whether the caller may act on the given session
    #[must_use]
    pub fn can_access_session(&self, session: &Session) -> bool {
        match self.role {
            CallerRole::Member => session.member_id == self.actor_id,
            CallerRole::Staff => session.staff_id == Some(self.actor_id),
            CallerRole::StoreManager | CallerRole::Admin => true,
        }
    }

    /// Reject callers outside the session's scope
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` when the session belongs to someone else
    pub fn ensure_session_access(&self, session: &Session) -> AppResult<()> {
        if self.can_access_session(session) {
            return Ok(());
        }
        Err(AppError::permission_denied(
            "Caller is not a party to this session",
        ))
    }

    /// Reject members booking on behalf of someone else
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` when a member targets another member's id
    pub fn ensure_member_target(&self, member_id: Uuid) -> AppResult<()> {
        if self.role == CallerRole::Member && member_id != self.actor_id {
            return Err(AppError::permission_denied(
                "Members can only create bookings for themselves",
            ));
        }
        Ok(())
    }
}
