use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A single rejected entry of a bulk operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    /// Position of the entry in the submitted batch
    pub index: usize,
    pub message: String,
}

impl BatchFailure {
    pub fn new(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid dependency: {0}")]
    InvalidDependency(String),

    #[error("Dependency would create a cycle: {}", format_path(.path))]
    CycleDetected { path: Vec<Uuid> },

    #[error("Dependency graph is inconsistent: {} task(s) are part of a cycle", .remaining.len())]
    GraphInconsistent { remaining: Vec<Uuid> },

    #[error("Validation failed for {} entr(y/ies)", .failures.len())]
    ValidationFailed { failures: Vec<BatchFailure> },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlannerError {
    pub fn not_found(what: &str, id: Uuid) -> Self {
        Self::NotFound(format!("{} {}", what, id))
    }

    /// Cycle path carried by this error, if it is a cycle rejection
    pub fn cycle_path(&self) -> Option<&[Uuid]> {
        match self {
            Self::CycleDetected { path } => Some(path),
            _ => None,
        }
    }
}

fn format_path(path: &[Uuid]) -> String {
    if path.is_empty() {
        return "<unknown path>".to_string();
    }
    path.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_path() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let err = PlannerError::CycleDetected {
            path: vec![a, b, a],
        };

        let message = err.to_string();
        assert!(message.contains(&format!("{} -> {} -> {}", a, b, a)));
        assert_eq!(err.cycle_path(), Some(&[a, b, a][..]));
    }

    #[test]
    fn test_validation_failed_counts_entries() {
        let err = PlannerError::ValidationFailed {
            failures: vec![BatchFailure::new(0, "bad"), BatchFailure::new(3, "worse")],
        };
        assert_eq!(err.to_string(), "Validation failed for 2 entr(y/ies)");
        assert!(err.cycle_path().is_none());
    }
}
