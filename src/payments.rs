// ABOUTME: Payment gateway boundary for pre-session charges
// ABOUTME: Opaque charge attempt with a synthetic gateway for dev and test
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Payment Boundary
//!
//! The booking core treats payment execution as an opaque, possibly-failing
//! external call: `charge` either yields a receipt or an error, and the core
//! assumes no side effects beyond that outcome. The real processor
//! integration lives outside this crate; [`SyntheticGateway`] stands in for
//! it in development and tests, with configurable failure injection.

use crate::errors::{AppError, AppResult, ErrorCode};
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Successful charge result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeReceipt {
    /// Processor-side reference for the charge
    pub external_ref: String,
    /// Amount charged, in cents
    pub amount_cents: i64,
}

/// External payment processor boundary
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Attempt to charge the member for a session
    ///
    /// # Errors
    ///
    /// Returns `PaymentFailed` when the processor declines or is unreachable
    async fn charge(
        &self,
        session_id: Uuid,
        amount_cents: i64,
        method: Option<&str>,
    ) -> AppResult<ChargeReceipt>;
}

/// In-process gateway that approves charges, with optional failure injection
///
/// `failure_rate` is the probability in `[0.0, 1.0]` that a charge is
/// declined, letting the sweeper's failure isolation be exercised without a
/// real processor.
pub struct SyntheticGateway {
    failure_rate: f64,
}

impl SyntheticGateway {
    /// Create a gateway with the given decline probability
    #[must_use]
    pub fn new(failure_rate: f64) -> Self {
        Self {
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }

    /// Gateway that approves every charge
    #[must_use]
    pub fn always_approve() -> Self {
        Self::new(0.0)
    }
}

#[async_trait]
impl PaymentGateway for SyntheticGateway {
    async fn charge(
        &self,
        session_id: Uuid,
        amount_cents: i64,
        method: Option<&str>,
    ) -> AppResult<ChargeReceipt> {
        if self.failure_rate > 0.0 && rand::thread_rng().gen_bool(self.failure_rate) {
            return Err(AppError::new(
                ErrorCode::PaymentFailed,
                format!("Synthetic decline for session {session_id}"),
            ));
        }

        let external_ref = format!("syn_{}", Utc::now().timestamp_millis());
        debug!(
            session_id = %session_id,
            amount_cents,
            method = method.unwrap_or("default"),
            external_ref = %external_ref,
            "synthetic gateway approved charge"
        );

        Ok(ChargeReceipt {
            external_ref,
            amount_cents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_always_approve() {
        let gateway = SyntheticGateway::always_approve();
        let receipt = gateway
            .charge(Uuid::new_v4(), 5000, Some("card"))
            .await
            .unwrap();
        assert_eq!(receipt.amount_cents, 5000);
    }

    #[tokio::test]
    async fn test_always_decline() {
        let gateway = SyntheticGateway::new(1.0);
        let err = gateway.charge(Uuid::new_v4(), 5000, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentFailed);
    }
}
