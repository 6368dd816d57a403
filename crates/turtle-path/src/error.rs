use thiserror::Error;
use turtle_core::{OutcomeKind, ParseNameError, StorageError, TrackerError};

/// A node was configured in a way that can never work. Raised when the node is
/// built (or decoded), never while ticking.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} needs at least one child")]
    NoChildren(&'static str),
    #[error("invalid slot {0} (expected 1..=16)")]
    InvalidSlot(u8),
    #[error("{0} count must be at least 1")]
    ZeroCount(&'static str),
    #[error("{tag} count {count} is too large")]
    CountTooLarge { tag: &'static str, count: u32 },
    #[error("invalid count check mode `{0}`")]
    InvalidMode(String),
    #[error("result interpreter for {kind:?} needs a non-empty set of {kind:?} outcomes")]
    BadAcceptSet { kind: OutcomeKind },
    #[error("{tag} index {index} out of range for {len} children")]
    IndexOutOfRange {
        tag: &'static str,
        index: usize,
        len: usize,
    },
    #[error(transparent)]
    Name(#[from] ParseNameError),
}

#[derive(Debug, Error)]
pub enum PathError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error("`{tag}` failed under die-on-failure")]
    Died { tag: String },

    #[error("unknown node type `{0}`; register it before loading")]
    UnknownTag(String),

    #[error("malformed `{tag}` record: {source}")]
    Malformed {
        tag: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid `{tag}` configuration: {source}")]
    Config {
        tag: String,
        #[source]
        source: ConfigError,
    },

    #[error("path state entry `{key}` has an unexpected shape: {source}")]
    State {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PathError {
    /// Conditions that must halt the program for an operator to look at.
    pub fn is_fatal(&self) -> bool {
        match self {
            PathError::Died { .. } => true,
            PathError::Tracker(e) => e.is_fatal(),
            _ => false,
        }
    }

    pub(crate) fn malformed(tag: &str) -> impl FnOnce(serde_json::Error) -> PathError + '_ {
        move |source| PathError::Malformed {
            tag: tag.to_string(),
            source,
        }
    }

    pub(crate) fn config(tag: &str) -> impl FnOnce(ConfigError) -> PathError + '_ {
        move |source| PathError::Config {
            tag: tag.to_string(),
            source,
        }
    }
}
