//! Errors raised by reference models on malformed input.

/// Invalid input to a golden model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GoldenError {
    /// An input did not have the length the model requires.
    #[error("{what} must have {expected} elements, got {actual}")]
    Length {
        /// Which input was wrong.
        what: &'static str,
        /// Required length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },

    /// A model parameter was outside its valid range.
    #[error("invalid parameter {name}: {reason}")]
    Parameter {
        /// Parameter name.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}
