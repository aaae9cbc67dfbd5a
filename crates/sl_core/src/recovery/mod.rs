// Crash-recovery checkpoint layer.
// Best-effort JSON key-value checkpoints, namespaced per concern.

pub mod error;
pub mod store;

pub use error::RecoveryError;
pub use store::{FileRecoveryStore, MemoryRecoveryStore, RecoveryStore};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Shared handle the session components hold onto.
pub type StoreHandle = Arc<dyn RecoveryStore>;

/// Checkpoint namespaces. One key per concern per session, so an unrelated
/// session can never resurrect this one's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concern {
    Clock,
    Evaluations,
    Substitutions,
}

impl Concern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Concern::Clock => "clock",
            Concern::Evaluations => "evaluations",
            Concern::Substitutions => "substitutions",
        }
    }

    pub const ALL: [Concern; 3] = [Concern::Clock, Concern::Evaluations, Concern::Substitutions];
}

pub fn checkpoint_key(session_id: &str, concern: Concern) -> String {
    format!("{}:{}", session_id, concern.as_str())
}

/// Best-effort checkpoint write. Failures are logged and swallowed: a broken
/// recovery store degrades crash recovery, it never blocks live usage.
pub fn checkpoint<T: Serialize>(store: &StoreHandle, session_id: &str, concern: Concern, state: &T) {
    let key = checkpoint_key(session_id, concern);
    let payload = match serde_json::to_string(state) {
        Ok(json) => json,
        Err(err) => {
            log::warn!("Skipping {} checkpoint, serialization failed: {}", concern.as_str(), err);
            return;
        }
    };

    if let Err(err) = store.put(&key, &payload) {
        log::warn!("Failed to write {} checkpoint: {}", concern.as_str(), err);
    }
}

/// Best-effort checkpoint read. Missing, unreadable, or unparsable
/// checkpoints all come back as `None`.
pub fn restore<T: DeserializeOwned>(
    store: &StoreHandle,
    session_id: &str,
    concern: Concern,
) -> Option<T> {
    let key = checkpoint_key(session_id, concern);
    let payload = match store.get(&key) {
        Ok(Some(json)) => json,
        Ok(None) => return None,
        Err(err) => {
            log::warn!("Failed to read {} checkpoint: {}", concern.as_str(), err);
            return None;
        }
    };

    match serde_json::from_str(&payload) {
        Ok(state) => {
            log::info!("Restored {} checkpoint for session {}", concern.as_str(), session_id);
            Some(state)
        }
        Err(err) => {
            log::warn!("Discarding corrupt {} checkpoint: {}", concern.as_str(), err);
            None
        }
    }
}

/// Remove every checkpoint namespace for a session (save-and-exit, abandon).
pub fn clear_all(store: &StoreHandle, session_id: &str) {
    for concern in Concern::ALL {
        let key = checkpoint_key(session_id, concern);
        if let Err(err) = store.remove(&key) {
            log::warn!("Failed to clear {} checkpoint: {}", concern.as_str(), err);
        }
    }
}
