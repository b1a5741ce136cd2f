use thiserror::Error;

use crate::engine::behaviors::StateKey;
use crate::engine::ids::{ActorId, PathId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("no behavior registered for key {0:?}")]
    MissingState(StateKey),

    #[error("waypoint index {index} out of bounds for path '{path}' ({len} waypoints)")]
    InvalidPathIndex { path: PathId, index: usize, len: usize },

    #[error("mid-path restore rejected for path '{path}' at index {index}")]
    RestoreFailed { path: PathId, index: usize },

    #[error("required collaborator missing: {0}")]
    MissingCollaborator(&'static str),

    #[error("completion event with empty interruption stack for actor {0}")]
    StackUnderflow(ActorId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CoreError {
    /// Whether the failing actor can keep running on a fallback behavior.
    ///
    /// Non-recoverable errors degrade the single actor toward despawn; they
    /// never abort the shared tick loop.
    pub fn is_recoverable(&self) -> bool {
        match self {
            CoreError::MissingState(_) => false,
            CoreError::InvalidPathIndex { .. } => true,
            CoreError::RestoreFailed { .. } => true,
            CoreError::MissingCollaborator(_) => false,
            CoreError::StackUnderflow(_) => true,
            CoreError::InvalidConfig(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
