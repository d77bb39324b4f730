//! Error types for catalog construction and loading

use thiserror::Error;

/// Errors raised while building or loading a catalog
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Name cannot be empty
    #[error("{kind} name cannot be empty")]
    EmptyName {
        /// What kind of entry had the empty name.
        kind: &'static str,
    },

    /// Action id is empty or contains invalid characters
    #[error("invalid action id '{id}'")]
    InvalidId {
        /// The rejected id.
        id: String,
    },

    /// Two actions share an id
    #[error("duplicate action id '{id}'")]
    DuplicateAction {
        /// The duplicated id.
        id: String,
    },

    /// Two workflows share a name
    #[error("duplicate workflow name '{name}'")]
    DuplicateWorkflow {
        /// The duplicated name.
        name: String,
    },

    /// Two stages of one workflow share a name
    #[error("duplicate stage '{stage}' in workflow '{workflow}'")]
    DuplicateStage {
        /// Owning workflow.
        workflow: String,
        /// The duplicated stage name.
        stage: String,
    },

    /// Workflow references an action that is not in the catalog
    #[error("workflow '{workflow}' stage '{stage}' references unknown action '{action}'")]
    UnknownAction {
        /// Owning workflow.
        workflow: String,
        /// Owning stage.
        stage: String,
        /// The missing action id.
        action: String,
    },

    /// Runner configuration is incomplete
    #[error("action '{id}' has an invalid runner: {reason}")]
    InvalidRunner {
        /// Action id.
        id: String,
        /// Reason for validation failure.
        reason: String,
    },

    /// Reading a catalog or module file failed
    #[error("failed to read '{path}': {reason}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error message.
        reason: String,
    },

    /// A catalog or module file is malformed
    #[error("failed to parse '{path}': {reason}")]
    Parse {
        /// File path or `<inline>`.
        path: String,
        /// Underlying error message.
        reason: String,
    },

    /// File extension is not a known catalog format
    #[error("unsupported catalog format for '{path}' (expected .yaml, .yml or .json)")]
    UnsupportedFormat {
        /// File path.
        path: String,
    },

    /// A module in a module list has an empty id
    #[error("module #{index} in '{path}' has an empty id")]
    EmptyModuleId {
        /// Module list path.
        path: String,
        /// Zero-based position of the module.
        index: usize,
    },
}
