//! In-memory mirror of the persisted preference record

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::model::CameraPreferences;

use super::PreferenceStore;

/// The controller's copy of the preferences.
///
/// `update` persists the complete record while the lock is held, so the
/// store receives records in the same order the mirror changed.
#[derive(Clone)]
pub struct PreferenceMirror {
    current: Arc<Mutex<Versioned>>,
    store: PreferenceStore,
}

struct Versioned {
    preferences: CameraPreferences,
    /// Bumped by every `update`
    generation: u64,
}

impl PreferenceMirror {
    pub fn new(store: PreferenceStore) -> Self {
        Self {
            current: Arc::new(Mutex::new(Versioned {
                preferences: CameraPreferences::default(),
                generation: 0,
            })),
            store,
        }
    }

    pub fn snapshot(&self) -> CameraPreferences {
        self.current.lock().preferences.clone()
    }

    /// Mutate one or more fields and persist the whole record
    pub fn update(&self, mutate: impl FnOnce(&mut CameraPreferences)) {
        let mut current = self.current.lock();
        mutate(&mut current.preferences);
        current.generation += 1;
        self.store.persist(current.preferences.clone());
    }

    /// Re-read the stored record into the mirror without writing it back.
    ///
    /// A load overtaken by an `update` is discarded and the newer in-memory
    /// record is returned instead.
    pub async fn reload(&self) -> CameraPreferences {
        let generation = self.current.lock().generation;
        let loaded = self.store.load().await;

        let mut current = self.current.lock();
        if current.generation != generation {
            debug!("preferences changed during reload, keeping in-memory record");
            return current.preferences.clone();
        }
        current.preferences = loaded.clone();
        loaded
    }

    pub async fn flush(&self) {
        self.store.flush().await;
    }
}
