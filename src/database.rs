// ABOUTME: Database handle, connection pooling, and schema migration
// ABOUTME: SQLite-backed storage for session records and group slots
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Database Management
//!
//! SQLite-backed storage for the booking service. All dates are stored as
//! RFC 3339 TEXT and all ids as TEXT. The schema is created on startup by
//! [`Database::migrate`].
//!
//! Correctness of the scheduling core comes from the storage layer, not from
//! in-memory locks: conflict checks, capacity reservation, and lifecycle
//! updates run inside transactions obtained from [`Database::begin`], and
//! every state-changing statement carries its own `WHERE` guard so a lost
//! race surfaces as zero affected rows instead of a double-applied write.

/// Session record persistence: inserts, conflict query, guarded transitions
pub mod sessions;

/// Group slot persistence: the capacity ledger's atomic reserve and release
pub mod slots;

use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::{Sqlite, Transaction};

/// Parse an RFC 3339 TEXT column back into a UTC timestamp
pub(crate) fn parse_datetime(value: &str, column: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::database(format!("Invalid timestamp in column {column}: {e}")))
}

/// Parse an optional RFC 3339 TEXT column
pub(crate) fn parse_optional_datetime(
    value: Option<String>,
    column: &str,
) -> AppResult<Option<DateTime<Utc>>> {
    value.as_deref().map(|v| parse_datetime(v, column)).transpose()
}

/// Parse a TEXT uuid column
pub(crate) fn parse_uuid(value: &str, column: &str) -> AppResult<uuid::Uuid> {
    uuid::Uuid::parse_str(value)
        .map_err(|e| AppError::database(format!("Invalid uuid in column {column}: {e}")))
}

/// Database manager for session and slot storage
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection and run migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or migration fails
    pub async fn new(database_url: &str) -> AppResult<Self> {
        // Ensure SQLite creates the database file if it doesn't exist
        let connection_options = if database_url.starts_with("sqlite:") && !database_url.contains('?')
        {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_string()
        };

        let pool = SqlitePool::connect(&connection_options).await?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Wrap an existing pool; used by tests that build their own fixtures
    #[must_use]
    pub const fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Access the underlying pool for read-only queries
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Begin a transaction for a composed write operation
    ///
    /// # Errors
    ///
    /// Returns an error if a connection cannot be acquired
    pub async fn begin(&self) -> AppResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// Run database migrations
    ///
    /// # Errors
    ///
    /// Returns an error if any DDL statement fails
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                booking_number TEXT UNIQUE NOT NULL,
                kind TEXT NOT NULL,
                staff_id TEXT,
                member_id TEXT NOT NULL,
                slot_id TEXT,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                status TEXT NOT NULL,
                cost_cents INTEGER NOT NULL DEFAULT 0,
                payment_method TEXT,
                charged_at TEXT,
                checked_in_at TEXT,
                completed_at TEXT,
                cancelled_at TEXT,
                cancellation_reason TEXT,
                rating INTEGER,
                review TEXT,
                reviewed_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT,
                FOREIGN KEY (slot_id) REFERENCES group_slots(id)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS group_slots (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                staff_id TEXT,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                max_participants INTEGER NOT NULL,
                current_participants INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'open',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                CHECK (current_participants >= 0),
                CHECK (current_participants <= max_participants)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // Conflict queries scan by resource and time window
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_sessions_staff_time ON sessions(staff_id, start_time)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_sessions_member_time ON sessions(member_id, start_time)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_status ON sessions(status)")
            .execute(&self.pool)
            .await?;

        // Backstop for the duplicate-booking guard: one live booking per
        // member per slot, enforced by the storage layer itself. The
        // predicate matches the live-session definition used by the
        // duplicate check: cancelled and soft-deleted rows do not count.
        // Recreated on startup so a predicate change reaches existing files.
        sqlx::query("DROP INDEX IF EXISTS idx_sessions_slot_member")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            r"
            CREATE UNIQUE INDEX idx_sessions_slot_member
            ON sessions(slot_id, member_id)
            WHERE slot_id IS NOT NULL AND status != 'cancelled' AND deleted_at IS NULL
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
