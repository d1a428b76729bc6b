use thiserror::Error;

pub type Result<T, E = TargetError> = std::result::Result<T, E>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TargetError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("degenerate box in {what} at row {index}: {reason}")]
    DegenerateBox {
        what: &'static str,
        index: usize,
        reason: &'static str,
    },

    #[error("ground truth label {label} at row {index} must be a foreground class (>= 1)")]
    InvalidLabel { index: usize, label: i64 },
}

impl TargetError {
    pub fn configuration(message: impl Into<String>) -> Self {
        TargetError::Configuration(message.into())
    }

    pub fn shape(what: &'static str, expected: usize, actual: usize) -> Self {
        TargetError::ShapeMismatch { what, expected, actual }
    }

    pub fn degenerate(what: &'static str, index: usize, reason: &'static str) -> Self {
        TargetError::DegenerateBox { what, index, reason }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::errors::TargetError;

    #[test]
    fn test_messages() {
        let err = TargetError::shape("gt labels", 3, 2);
        assert_eq!(err.to_string(), "shape mismatch for gt labels: expected 3, got 2");

        let err = TargetError::degenerate("anchors", 4, "y1 > y2");
        assert_eq!(err.to_string(), "degenerate box in anchors at row 4: y1 > y2");
    }
}
