//! Error types for the identity crate.

use std::fmt;

/// Errors from building an identity policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The email allow-pattern is not a valid regular expression.
    InvalidPattern { pattern: String, reason: String },
    /// A forwarded field name does not name a profile field.
    UnknownField { field: String },
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPattern { pattern, reason } => {
                write!(f, "invalid email pattern '{pattern}': {reason}")
            }
            Self::UnknownField { field } => {
                write!(f, "unknown profile field: {field}")
            }
        }
    }
}

impl std::error::Error for PolicyError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_pattern_display() {
        let err = PolicyError::InvalidPattern {
            pattern: "(".to_string(),
            reason: "unclosed group".to_string(),
        };
        assert!(err.to_string().contains("'('"));
        assert!(err.to_string().contains("unclosed group"));
    }

    #[test]
    fn unknown_field_display() {
        let err = PolicyError::UnknownField {
            field: "shoe_size".to_string(),
        };
        assert!(err.to_string().contains("shoe_size"));
    }
}
