// ABOUTME: Auto-charge sweeper: periodic pre-session billing of confirmed sessions
// ABOUTME: Claims each session with a transactional conditional update, exactly once
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Auto-Charge Sweeper
//!
//! Finds confirmed one-on-one sessions approaching their start time and
//! charges each exactly once. The "needs charging" check-and-set is the
//! status-guarded `confirmed -> charged` update: a concurrent run that
//! already claimed the session makes the guard match zero rows, and this
//! run skips it. The claim commits before the gateway call so SQLite's
//! single writer is never held across an external await; a failed or
//! timed-out charge reverts the claim with a compensating update, leaving
//! the session for the next sweep.
//!
//! One session's failure never aborts the batch; it is counted in `failed`
//! and logged.

use crate::constants::windows;
use crate::database::{sessions, Database};
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::Session;
use crate::payments::PaymentGateway;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Result of one sweep
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SweepOutcome {
    /// Sessions successfully charged and transitioned
    pub processed: u32,
    /// Sessions whose charge attempt failed; left for the next run
    pub failed: u32,
}

/// Periodic batch process converting confirmed sessions to charged ones
pub struct AutoChargeSweeper {
    db: Database,
    gateway: Arc<dyn PaymentGateway>,
    horizon: Duration,
    charge_timeout: std::time::Duration,
}

impl AutoChargeSweeper {
    /// Create a sweeper with the default charge horizon
    #[must_use]
    pub fn new(
        db: Database,
        gateway: Arc<dyn PaymentGateway>,
        charge_timeout: std::time::Duration,
    ) -> Self {
        Self {
            db,
            gateway,
            horizon: Duration::minutes(windows::CHARGE_HORIZON_MINS),
            charge_timeout,
        }
    }

    /// Run one sweep at the given instant
    ///
    /// Safe to run concurrently with itself: overlapping invocations race on
    /// the per-session claim, and exactly one wins each session.
    ///
    /// # Errors
    ///
    /// Returns an error only when the candidate query itself fails (storage
    /// connectivity); per-session failures are absorbed into the outcome.
    pub async fn run_once(&self, now: DateTime<Utc>) -> AppResult<SweepOutcome> {
        let candidates = sessions::find_chargeable(self.db.pool(), now, self.horizon).await?;
        let mut outcome = SweepOutcome::default();

        for session in candidates {
            match self.charge_one(&session, now).await {
                Ok(true) => outcome.processed += 1,
                // Claimed by a concurrent run or manually transitioned; not a failure.
                Ok(false) => {}
                Err(e) => {
                    outcome.failed += 1;
                    warn!(
                        session_id = %session.id,
                        booking_number = %session.booking_number,
                        error = %e,
                        "charge attempt failed; session left for next sweep"
                    );
                }
            }
        }

        info!(
            processed = outcome.processed,
            failed = outcome.failed,
            "auto-charge sweep finished"
        );
        Ok(outcome)
    }

    /// Charge one session: claim, attempt, compensate on failure
    ///
    /// Returns `Ok(false)` when the session no longer needs charging. The
    /// claim is committed before calling out so the connection is returned
    /// to the pool for the duration of the gateway call.
    async fn charge_one(&self, session: &Session, now: DateTime<Utc>) -> AppResult<bool> {
        {
            let mut conn = self.db.pool().acquire().await?;
            if !sessions::mark_charged(&mut conn, session.id, now).await? {
                return Ok(false);
            }
        }

        let attempt = tokio::time::timeout(
            self.charge_timeout,
            self.gateway.charge(
                session.id,
                session.cost_cents,
                session.payment_method.as_deref(),
            ),
        )
        .await;

        match attempt {
            Ok(Ok(receipt)) => {
                info!(
                    session_id = %session.id,
                    external_ref = %receipt.external_ref,
                    amount_cents = receipt.amount_cents,
                    "charged session ahead of start"
                );
                Ok(true)
            }
            Ok(Err(e)) => {
                self.revert_claim(session.id, now).await?;
                Err(e)
            }
            Err(_elapsed) => {
                self.revert_claim(session.id, now).await?;
                Err(charge_timeout_error(session.id, self.charge_timeout))
            }
        }
    }

    /// Undo a committed claim after a failed charge attempt
    async fn revert_claim(&self, session_id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let mut conn = self.db.pool().acquire().await?;
        if !sessions::revert_charge(&mut conn, session_id, now).await? {
            // A check-in or delete landed during the charge attempt; leave
            // the record as is and let the operator reconcile the payment.
            warn!(
                session_id = %session_id,
                "claim revert matched no rows; session moved on during the charge attempt"
            );
        }
        Ok(())
    }

    /// Run sweeps forever on a fixed interval; spawned by the server binary
    pub async fn run_forever(&self, interval: std::time::Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once(Utc::now()).await {
                warn!(error = %e, "auto-charge sweep aborted; will retry on next tick");
            }
        }
    }
}

fn charge_timeout_error(session_id: Uuid, timeout: std::time::Duration) -> AppError {
    AppError::new(
        ErrorCode::PaymentFailed,
        format!(
            "Charge for session {session_id} timed out after {}s",
            timeout.as_secs()
        ),
    )
}
