//! capture-session-daemon: keeps a camera session consistent for UI clients
//!
//! This daemon owns the capture session and provides:
//! - Session lifecycle (authorization, startup, running, failure)
//! - Persisted camera preferences that survive restarts
//! - Forwarding of capture activity, capabilities and thumbnails
//! - IPC server exposing observable properties and user actions

mod capture;
mod config;
mod controller;
mod error;
mod events;
mod ipc;
mod lifecycle;
mod model;
mod preferences;
mod state;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::capture::{DirectoryLibrary, SimulatedCamera};
use crate::config::Config;
use crate::controller::CameraController;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::preferences::{FilePreferences, PreferenceStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "capture-session-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, app_id = %config.app_id, "configuration loaded");

    // Create shutdown signal handler
    let mut shutdown = ShutdownSignal::new()?;

    // Preference writes go through a single writer task
    let backend = Arc::new(FilePreferences::new(config.preferences_path()));
    info!(path = ?backend.path(), "preference store");
    let store = PreferenceStore::spawn(backend);

    let camera = Arc::new(SimulatedCamera::new(
        config.camera_authorized,
        config.pending_dir(),
    ));
    let library = Arc::new(DirectoryLibrary::new(config.media_dir.clone()));
    let controller = CameraController::new(camera, library, store, config.controller_settings());

    // Subscribe before starting so the startup transitions are logged
    let mut property_rx = controller.subscribe();

    let status = controller.start().await;
    if status.is_terminal() {
        warn!(%status, "capture session unavailable, serving properties only");
    }

    let server = Server::new(&config.socket_path, controller.clone())?;

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Log property changes
        _ = async {
            loop {
                match property_rx.recv().await {
                    Ok(event) => {
                        info!(%event, "property changed");
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "property event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        } => {
            info!("property event handler exited");
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    controller.stop().await;
    server.shutdown().await;

    info!("capture-session-daemon stopped");

    Ok(())
}
