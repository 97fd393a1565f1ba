use super::config::ConfigError;
use crate::core::models::conformation::ConformationError;
use crate::core::models::ids::{Position, RotamerClass};
use crate::core::models::space::SpaceId;
use crate::core::objective::{MinimizerError, ObjectiveError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Structural mismatch: {source}")]
    StructuralMismatch {
        #[from]
        source: ConformationError,
    },

    #[error("DOF vector has length {found}, objective expects {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Minimization failed: {source}")]
    Minimization {
        #[from]
        source: MinimizerError,
    },

    #[error("Objective evaluation failed: {source}")]
    Objective {
        #[from]
        source: ObjectiveError,
    },

    #[error("Fallback minimization failed after '{cause}': {source}")]
    FallbackFailed {
        cause: String,
        source: MinimizerError,
    },

    #[error("A different conformation space is already registered as {id}")]
    SpaceConflict { id: SpaceId },

    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Whether a full uncached minimization can stand in for the failed call.
    ///
    /// Objective and minimizer failures are runtime failures of the collaborators; anything
    /// else is a contract violation by the caller and must propagate.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::Minimization { .. } | EngineError::Objective { .. }
        )
    }

    /// The position named by a structural mismatch, if any.
    pub fn mismatched_position(&self) -> Option<(Position, Option<RotamerClass>)> {
        match self {
            EngineError::StructuralMismatch { source } => match source {
                ConformationError::MissingPosition { position, .. }
                | ConformationError::Unassigned { position } => Some((*position, None)),
                ConformationError::RotamerOutOfRange { position, rc, .. } => {
                    Some((*position, Some(*rc)))
                }
                ConformationError::SlotCount { .. } => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborator_failures_are_recoverable() {
        let objective: EngineError = ObjectiveError::Evaluation("nan".into()).into();
        let minimizer: EngineError = MinimizerError::Failed("diverged".into()).into();
        assert!(objective.is_recoverable());
        assert!(minimizer.is_recoverable());
    }

    #[test]
    fn structural_mismatch_is_not_recoverable() {
        let err: EngineError = ConformationError::MissingPosition {
            position: 4,
            slots: 3,
        }
        .into();
        assert!(!err.is_recoverable());
        assert_eq!(err.mismatched_position(), Some((4, None)));
        assert!(err.to_string().starts_with("Structural mismatch"));
    }

    #[test]
    fn rotamer_out_of_range_reports_rotamer() {
        let err: EngineError = ConformationError::RotamerOutOfRange {
            position: 1,
            rc: 9,
            candidates: 3,
        }
        .into();
        assert_eq!(err.mismatched_position(), Some((1, Some(9))));
    }
}
