// ABOUTME: Environment-based server configuration with defaults
// ABOUTME: Database, HTTP, sweeper, and payment settings from environment variables
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration
//!
//! All settings come from environment variables (a `.env` file is honored in
//! development). Business scheduling windows are fixed constants in
//! [`crate::constants::windows`], not configuration.

use crate::constants::{limits, ports};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{info, warn};

/// Top-level server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP API port
    pub http_port: u16,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Auto-charge sweeper configuration
    pub sweeper: SweeperConfig,
    /// Payment gateway configuration
    pub payment: PaymentConfig,
}

/// Database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database URL
    pub url: String,
    /// Run migrations on startup
    pub auto_migrate: bool,
}

/// Auto-charge sweeper settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Whether the background sweeper task is spawned
    pub enabled: bool,
    /// Interval between sweeps, in seconds
    pub interval_seconds: u64,
    /// Per-session charge attempt timeout, in seconds
    pub charge_timeout_seconds: u64,
}

/// Payment gateway settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Synthetic gateway decline probability, `0.0..=1.0`
    pub synthetic_failure_rate: f64,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error when a variable is present but unparseable
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        // Load .env file if it exists
        if let Err(e) = dotenvy::dotenv() {
            warn!("No .env file found or failed to load: {}", e);
        }

        Ok(Self {
            http_port: env_var_or("HTTP_PORT", &ports::DEFAULT_HTTP_PORT.to_string())?
                .parse()
                .context("Invalid HTTP_PORT value")?,
            database: DatabaseConfig {
                url: env_var_or("DATABASE_URL", "sqlite:./data/bookings.db")?,
                auto_migrate: env_var_or("AUTO_MIGRATE", "true")?
                    .parse()
                    .context("Invalid AUTO_MIGRATE value")?,
            },
            sweeper: SweeperConfig {
                enabled: env_var_or("SWEEPER_ENABLED", "true")?
                    .parse()
                    .context("Invalid SWEEPER_ENABLED value")?,
                interval_seconds: env_var_or(
                    "SWEEP_INTERVAL",
                    &limits::DEFAULT_SWEEP_INTERVAL_SECS.to_string(),
                )?
                .parse()
                .context("Invalid SWEEP_INTERVAL value")?,
                charge_timeout_seconds: env_var_or(
                    "CHARGE_TIMEOUT",
                    &limits::DEFAULT_CHARGE_TIMEOUT_SECS.to_string(),
                )?
                .parse()
                .context("Invalid CHARGE_TIMEOUT value")?,
            },
            payment: PaymentConfig {
                synthetic_failure_rate: env_var_or("PAYMENT_SYNTHETIC_FAILURE_RATE", "0.0")?
                    .parse()
                    .context("Invalid PAYMENT_SYNTHETIC_FAILURE_RATE value")?,
            },
        })
    }

    /// One-line summary for startup logging
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "http_port={} database={} sweeper_enabled={} sweep_interval={}s",
            self.http_port, self.database.url, self.sweeper.enabled, self.sweeper.interval_seconds
        )
    }
}

fn env_var_or(name: &str, default: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) => Ok(value),
        Err(env::VarError::NotPresent) => Ok(default.to_string()),
        Err(e) => Err(e).with_context(|| format!("Failed to read {name}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_environment() {
        // Only checks defaults for variables unlikely to be set in CI.
        let config = ServerConfig::from_env().unwrap();
        assert!(config.sweeper.interval_seconds > 0);
        assert!((0.0..=1.0).contains(&config.payment.synthetic_failure_rate));
    }
}
