//! Durable capture preferences
//!
//! - `PreferenceBackend`: where the record lives (a JSON file by default)
//! - `PreferenceStore`: single writer task; load, persist, flush
//! - `PreferenceMirror`: the controller's in-memory copy, persisted whole on
//!   every change

mod backend;
mod mirror;
mod store;

pub use backend::{FilePreferences, PreferenceBackend, StoreError};
pub use mirror::PreferenceMirror;
pub use store::PreferenceStore;
