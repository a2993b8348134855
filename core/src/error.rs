/// Errors raised by the registration workspace.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Numerical degeneracy: {0}")]
    NumericalDegeneracy(String),

    #[error("Linear algebra error: {0}")]
    LinearAlgebra(String),
}

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::invalid_argument("Unknown transform_type similarity");
        assert_eq!(
            err.to_string(),
            "Invalid argument: Unknown transform_type similarity"
        );

        let err = Error::dimension_mismatch(3, 2);
        assert_eq!(err.to_string(), "Dimension mismatch: expected 3, got 2");
    }
}
