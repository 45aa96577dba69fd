//! Preference store with a single writer task
//!
//! Every command goes through one queue, so writes land in the order they
//! were issued (last write wins) and a load never races a pending write.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::model::CameraPreferences;

use super::PreferenceBackend;

enum StoreCommand {
    Load(oneshot::Sender<CameraPreferences>),
    Persist(CameraPreferences),
    Flush(oneshot::Sender<()>),
}

/// Handle to the preference writer. Cheap to clone.
#[derive(Clone)]
pub struct PreferenceStore {
    commands: mpsc::UnboundedSender<StoreCommand>,
}

impl PreferenceStore {
    /// Spawn the writer task on the current runtime
    pub fn spawn(backend: Arc<dyn PreferenceBackend>) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(backend, rx));
        Self { commands }
    }

    /// Read the stored record, falling back to defaults on any failure
    pub async fn load(&self) -> CameraPreferences {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(StoreCommand::Load(tx)).is_err() {
            warn!("preference writer stopped, using default preferences");
            return CameraPreferences::default();
        }
        rx.await.unwrap_or_default()
    }

    /// Queue a full-record overwrite. Best effort: failures are logged by
    /// the writer and never reach the caller.
    pub fn persist(&self, preferences: CameraPreferences) {
        if self.commands.send(StoreCommand::Persist(preferences)).is_err() {
            warn!("preference writer stopped, dropping update");
        }
    }

    /// Wait until every previously queued write has been attempted
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(StoreCommand::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

async fn run_writer(
    backend: Arc<dyn PreferenceBackend>,
    mut commands: mpsc::UnboundedReceiver<StoreCommand>,
) {
    debug!("preference writer started");

    while let Some(command) = commands.recv().await {
        match command {
            StoreCommand::Load(reply) => {
                let preferences = match backend.read().await {
                    Ok(Some(preferences)) => preferences,
                    Ok(None) => {
                        info!("no stored preferences, using defaults");
                        CameraPreferences::default()
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to read preferences, using defaults");
                        CameraPreferences::default()
                    }
                };
                let _ = reply.send(preferences);
            }
            StoreCommand::Persist(preferences) => {
                if let Err(e) = backend.write(&preferences).await {
                    warn!(error = %e, "failed to persist preferences");
                } else {
                    debug!(?preferences, "preferences persisted");
                }
            }
            StoreCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    debug!("preference writer stopped");
}
