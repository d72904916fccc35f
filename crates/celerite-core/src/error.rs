//! Error types for the celerite workspace.

use thiserror::Error;

/// Errors raised by the factorization and its downstream consumers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CeleriteError {
    /// A pivot of the factorization was not strictly positive.
    ///
    /// `index` is the first observation at which the implicit matrix stopped
    /// being positive definite. Retrying with the same inputs reproduces the
    /// same failure; callers usually add jitter to the diagonal.
    #[error("matrix is not positive definite: pivot {pivot} at index {index}")]
    NotPositiveDefinite { index: usize, pivot: f64 },

    /// An argument does not have the shape implied by the other arguments
    #[error("shape mismatch for `{argument}` along axis {axis}: expected {expected}, found {found}")]
    ShapeMismatch {
        argument: &'static str,
        axis: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result alias used throughout the celerite crates
pub type CeleriteResult<T> = std::result::Result<T, CeleriteError>;

/// Check one axis of an argument against its expected length
pub fn check_len(
    argument: &'static str,
    axis: usize,
    expected: usize,
    found: usize,
) -> CeleriteResult<()> {
    if expected != found {
        return Err(CeleriteError::ShapeMismatch {
            argument,
            axis,
            expected,
            found,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_len() {
        assert!(check_len("a", 0, 3, 3).is_ok());

        let err = check_len("P", 1, 2, 4).unwrap_err();
        assert_eq!(
            err,
            CeleriteError::ShapeMismatch {
                argument: "P",
                axis: 1,
                expected: 2,
                found: 4
            }
        );
    }

    #[test]
    fn test_display_names_index() {
        let err = CeleriteError::NotPositiveDefinite {
            index: 7,
            pivot: -0.5,
        };
        let msg = err.to_string();
        assert!(msg.contains("index 7"));
        assert!(msg.contains("-0.5"));
    }
}
