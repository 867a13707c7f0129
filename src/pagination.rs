// ABOUTME: List query parameters and result page types
// ABOUTME: Limit/offset pagination with clamped page sizes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::limits;
use serde::{Deserialize, Serialize};

/// Pagination parameters for list endpoints
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ListParams {
    /// Page size; clamped to [`limits::MAX_PAGE_SIZE`]
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Rows to skip
    #[serde(default)]
    pub offset: u32,
}

const fn default_limit() -> u32 {
    limits::DEFAULT_PAGE_SIZE
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            limit: limits::DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl ListParams {
    /// Clamp the page size to the allowed maximum
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            limit: self.limit.clamp(1, limits::MAX_PAGE_SIZE),
            offset: self.offset,
        }
    }
}

/// One page of results plus the total match count
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Rows in this page
    pub items: Vec<T>,
    /// Total rows matching the filter
    pub total: i64,
    /// Applied page size
    pub limit: u32,
    /// Applied offset
    pub offset: u32,
}
