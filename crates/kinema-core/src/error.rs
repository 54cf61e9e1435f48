/// Core error types for the Kinema engine.
use std::path::PathBuf;

use crate::types::TrackKind;

/// A specialized Result type for Kinema operations.
pub type KinemaResult<T> = Result<T, KinemaError>;

/// Top-level error type encompassing scene validation, scheduling and frame production.
#[derive(Debug, thiserror::Error)]
pub enum KinemaError {
    #[error("fragment '{entity}' splits from unknown parent '{parent}'")]
    UnknownParent { entity: String, parent: String },

    #[error("cyclic split dependency: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("ambiguous split order under '{parent}': '{first}' and '{second}' both select index {index}")]
    AmbiguousSplitOrder {
        parent: String,
        first: String,
        second: String,
        index: usize,
    },

    #[error("cannot split '{entity}': parent '{parent}' is not active")]
    ParentNotReady { entity: String, parent: String },

    #[error("zero-length segment in {track} track of '{entity}' at frame {frame}")]
    ZeroLengthSegment {
        entity: String,
        track: TrackKind,
        frame: u64,
    },

    #[error("frame {frame} queried after frame {last}")]
    OutOfOrderQuery { frame: u64, last: u64 },

    #[error("failed to load '{entity}' from {path:?}: {message}")]
    SourceLoad {
        entity: String,
        path: PathBuf,
        message: String,
    },

    #[error("cannot join '{absorbed}' into '{absorber}': {reason}")]
    InvalidJoin {
        absorber: String,
        absorbed: String,
        reason: String,
    },

    #[error("selector index {index} out of range for '{parent}' ({len} elements)")]
    SelectorOutOfRange {
        parent: String,
        index: usize,
        len: usize,
    },

    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    #[error("scene validation error: {0}")]
    Validation(String),

    #[error("scene failed validation with {} error(s): {}", .0.len(), join_messages(.0))]
    InvalidScene(Vec<KinemaError>),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl KinemaError {
    /// Create a source load error for an entity.
    pub fn source_load(
        entity: impl Into<String>,
        path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        KinemaError::SourceLoad {
            entity: entity.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a join precondition error.
    pub fn invalid_join(
        absorber: impl Into<String>,
        absorbed: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        KinemaError::InvalidJoin {
            absorber: absorber.into(),
            absorbed: absorbed.into(),
            reason: reason.into(),
        }
    }

    /// Create a zero-length segment error.
    pub fn zero_length(entity: impl Into<String>, track: TrackKind, frame: u64) -> Self {
        KinemaError::ZeroLengthSegment {
            entity: entity.into(),
            track,
            frame,
        }
    }
}

fn join_messages(errors: &[KinemaError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
