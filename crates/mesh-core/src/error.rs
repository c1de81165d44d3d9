//! Error types shared across the mesh.

use mesh_events::MessageError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::output::SnapshotError;

/// Errors raised by belief and belief-network operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BeliefError {
    /// The proposition is already present in the network
    #[error("belief already exists: {proposition}")]
    Duplicate { proposition: String },
    /// A declared dependency names a proposition the network does not hold
    #[error("belief '{proposition}' depends on unknown belief '{missing}'")]
    MissingDependency { proposition: String, missing: String },
    /// The proposition is not present in the network
    #[error("belief not found: {proposition}")]
    NotFound { proposition: String },
    /// Confidence is NaN or outside [0, 1]
    #[error("confidence {value} is outside [0, 1]")]
    InvalidConfidence { value: f64 },
}

/// Top-level error for mesh operations.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error(transparent)]
    Belief(#[from] BeliefError),
    #[error(transparent)]
    Message(#[from] MessageError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_belief_error_messages() {
        let err = BeliefError::MissingDependency {
            proposition: "B".to_string(),
            missing: "A".to_string(),
        };
        assert_eq!(err.to_string(), "belief 'B' depends on unknown belief 'A'");

        let err = BeliefError::InvalidConfidence { value: 1.5 };
        assert_eq!(err.to_string(), "confidence 1.5 is outside [0, 1]");
    }

    #[test]
    fn test_mesh_error_is_transparent_for_beliefs() {
        let err: MeshError = BeliefError::NotFound {
            proposition: "X".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "belief not found: X");
        assert!(matches!(err, MeshError::Belief(BeliefError::NotFound { .. })));
    }

    #[test]
    fn test_mesh_error_wraps_messages() {
        let err: MeshError = MessageError::Unsupported {
            kind: "gossip".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "unsupported message type: gossip");
    }
}
