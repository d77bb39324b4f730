//! Error types for rule compilation and evaluation

use thiserror::Error;

/// Errors raised while compiling or running a rule expression.
///
/// These never escape [`crate::rules::evaluate`]: a failing rule is logged
/// and treated as "does not match".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// Expression could not be parsed
    #[error("invalid rule expression '{expression}': {reason}")]
    Syntax {
        /// The offending expression.
        expression: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// Expression references a variable the context does not define
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    /// Expression calls a function that is not a built-in
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// Function called with the wrong number of arguments
    #[error("function '{function}' expects {expected} argument(s), got {found}")]
    Arity {
        /// Function name.
        function: String,
        /// Expected argument count.
        expected: usize,
        /// Actual argument count.
        found: usize,
    },

    /// Operand types do not fit the operation
    #[error("type mismatch in {operation}: got {found}")]
    TypeMismatch {
        /// Operation being evaluated.
        operation: String,
        /// Kinds of the offending operands.
        found: String,
    },

    /// List index outside the list bounds
    #[error("index {index} out of range for list of length {len}")]
    IndexOutOfRange {
        /// Requested index.
        index: i64,
        /// List length.
        len: usize,
    },

    /// Rule produced a value that is not a boolean
    #[error("rule must evaluate to a boolean, got {found}")]
    NonBoolean {
        /// Kind of the produced value.
        found: String,
    },
}

impl RuleError {
    pub(crate) fn mismatch(operation: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            operation: operation.into(),
            found: found.into(),
        }
    }
}
