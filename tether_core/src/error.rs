//! Value-level error types for Tether.
//!
//! These errors describe misuse of a `Value` (wrong type, exhausted handle
//! space). The VM lifts them into language-level exceptions.

use thiserror::Error;

/// Result alias for value-level operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by core value operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A value of one type was used where another was required.
    #[error("TypeError: expected {expected}, found '{found}' object")]
    TypeMismatch {
        /// The required type name.
        expected: &'static str,
        /// The type name of the value that was supplied.
        found: &'static str,
    },

    /// No more object handles can be allocated.
    #[error("MemoryError: object handle space exhausted")]
    HandlesExhausted,
}

impl CoreError {
    /// Create a type mismatch error.
    #[must_use]
    pub fn type_mismatch(expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch { expected, found }
    }

    /// Returns the Python exception type name for this error.
    #[must_use]
    pub const fn exception_name(&self) -> &'static str {
        match self {
            Self::TypeMismatch { .. } => "TypeError",
            Self::HandlesExhausted => "MemoryError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_display() {
        let err = CoreError::type_mismatch("generator", "int");
        assert_eq!(
            err.to_string(),
            "TypeError: expected generator, found 'int' object"
        );
        assert_eq!(err.exception_name(), "TypeError");
    }

    #[test]
    fn test_handles_exhausted_display() {
        let err = CoreError::HandlesExhausted;
        assert!(err.to_string().starts_with("MemoryError"));
        assert_eq!(err.exception_name(), "MemoryError");
    }
}
