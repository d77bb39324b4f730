//! Error types for plan generation

use thiserror::Error;

/// Errors that abort plan generation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// No workflow's rules matched the project
    #[error("no suitable workflow found")]
    NoSuitableWorkflowFound,

    /// Two steps share an id
    #[error("duplicate step id '{id}'")]
    DuplicateStep {
        /// The duplicated id.
        id: String,
    },

    /// A step depends on a step that does not exist
    #[error("step '{step}' depends on unknown step '{dependency}'")]
    UnknownDependency {
        /// Dependent step id.
        step: String,
        /// Missing predecessor id.
        dependency: String,
    },

    /// Step dependencies form a cycle
    #[error("dependency cycle detected involving step '{step}'")]
    CyclicDependency {
        /// A step on the cycle.
        step: String,
    },
}
