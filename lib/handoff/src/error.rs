//! Error types for the hand-off crate.

use std::fmt;

/// Errors from a backend hand-off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandoffError {
    /// Could not connect to the backend.
    ConnectionFailed { addr: String, details: String },
    /// The connection broke while writing or reading.
    Io { addr: String, details: String },
    /// The backend closed the connection without sending a token.
    EmptyResponse { addr: String },
    /// The record could not be serialized.
    Encode { details: String },
}

impl fmt::Display for HandoffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed { addr, details } => {
                write!(f, "failed to connect to backend {addr}: {details}")
            }
            Self::Io { addr, details } => {
                write!(f, "backend {addr} connection error: {details}")
            }
            Self::EmptyResponse { addr } => {
                write!(f, "backend {addr} returned an empty response")
            }
            Self::Encode { details } => {
                write!(f, "failed to encode backend record: {details}")
            }
        }
    }
}

impl std::error::Error for HandoffError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_response_display() {
        let err = HandoffError::EmptyResponse {
            addr: "127.0.0.1:9000".to_string(),
        };
        assert!(err.to_string().contains("empty response"));
        assert!(err.to_string().contains("127.0.0.1:9000"));
    }

    #[test]
    fn connection_failed_display() {
        let err = HandoffError::ConnectionFailed {
            addr: "backend:9000".to_string(),
            details: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("backend:9000"));
        assert!(err.to_string().contains("connection refused"));
    }
}
