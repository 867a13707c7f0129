// ABOUTME: Configuration management for the booking service
// ABOUTME: Environment-only configuration, loaded once at startup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration management
//!
//! Environment-only configuration: every knob is an environment variable
//! with a sensible default, loaded once at startup into [`environment::ServerConfig`].

/// Environment-driven server configuration
pub mod environment;
