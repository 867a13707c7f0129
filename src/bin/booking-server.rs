// ABOUTME: Server binary for the Pierre booking service
// ABOUTME: Wires configuration, storage, the sweeper task, and the HTTP router
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Pierre Booking Server Binary
//!
//! Starts the session booking API: SQLite storage, the auto-charge sweeper
//! background task, and the axum REST surface.

use anyhow::{Context, Result};
use clap::Parser;
use pierre_booking::{
    config::environment::ServerConfig,
    database::Database,
    logging,
    payments::SyntheticGateway,
    routes::{self, ServerResources},
    services::{bookings::BookingService, sweeper::AutoChargeSweeper},
};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "pierre-booking-server")]
#[command(about = "Pierre Booking Service - session scheduling and pre-session billing")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    logging::init_from_env()?;

    info!("Starting Pierre Booking Service");
    info!("{}", config.summary());

    let database = Database::new(&config.database.url).await?;
    if config.database.auto_migrate {
        database.migrate().await?;
        info!("Database migrations applied");
    }

    let gateway = Arc::new(SyntheticGateway::new(config.payment.synthetic_failure_rate));
    let sweeper = Arc::new(AutoChargeSweeper::new(
        database.clone(),
        gateway,
        std::time::Duration::from_secs(config.sweeper.charge_timeout_seconds),
    ));

    if config.sweeper.enabled {
        let sweep_interval = std::time::Duration::from_secs(config.sweeper.interval_seconds);
        let background = sweeper.clone();
        tokio::spawn(async move {
            background.run_forever(sweep_interval).await;
        });
        info!(
            interval_seconds = config.sweeper.interval_seconds,
            "Auto-charge sweeper task started"
        );
    } else {
        warn!("Auto-charge sweeper disabled; confirmed sessions will not be billed automatically");
    }

    let resources = Arc::new(ServerResources {
        booking: BookingService::new(database),
        sweeper,
    });
    let app = routes::router(resources);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Booking API listening on {addr}");

    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;

    Ok(())
}
