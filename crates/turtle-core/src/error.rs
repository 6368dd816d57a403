use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error on `{name}`: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Live fuel is neither the snapshot nor one below it. Something outside the
    /// tracker moved the agent, refuelled it, or the records are corrupt.
    #[error("fuel mismatch around `{op}`: expected {expected}, live {live}")]
    FuelMismatch {
        op: &'static str,
        expected: u32,
        live: u32,
    },

    #[error("inventory accounting mismatch after `{action}`: {detail}")]
    InventoryMismatch { action: &'static str, detail: String },

    #[error("invalid record `{name}`: {detail}")]
    InvalidRecord { name: String, detail: String },

    #[error("invalid slot {0} (expected 1..=16)")]
    InvalidSlot(u8),
}

impl TrackerError {
    /// Fatal conditions mean the persisted model has diverged from the world.
    /// They must stop the program rather than be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TrackerError::FuelMismatch { .. } | TrackerError::InventoryMismatch { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} `{value}`")]
pub struct ParseNameError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseNameError {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
