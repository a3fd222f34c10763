//! Login pipeline errors.
//!
//! Every failure is turned into exactly one response and one log line at
//! the point where the handler returns. Client errors echo their message;
//! server errors carry the upstream text so operators can correlate the
//! response with the log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;
use std::net::SocketAddr;

use crate::canonical::CanonicalizeError;

/// Authentication errors.
#[derive(Debug)]
pub enum AuthError {
    /// The caller is not a trusted peer (or the peer address is unknown).
    UntrustedPeer { peer: Option<SocketAddr> },
    /// The request URL could not be reconstructed.
    MalformedRequest(CanonicalizeError),
    /// The query string could not be decoded.
    InvalidQuery { details: String },
    /// The round-tripped destination is not a URL we will redirect to.
    InvalidDestination { destination: String },
    /// The provider rejected the exchange or could not be reached.
    Provider(String),
    /// The email address is not allowed to log in.
    AccessDenied { email: String },
    /// The backend could not be reached or returned no token.
    BackendUnavailable(String),
    /// The session token cannot be placed in a cookie.
    InvalidToken,
    /// The provider did not return the `state` parameter.
    MissingState,
}

impl AuthError {
    /// Returns the HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UntrustedPeer { .. } | Self::AccessDenied { .. } => StatusCode::FORBIDDEN,
            Self::MalformedRequest(_)
            | Self::InvalidQuery { .. }
            | Self::InvalidDestination { .. } => StatusCode::BAD_REQUEST,
            Self::Provider(_)
            | Self::BackendUnavailable(_)
            | Self::InvalidToken
            | Self::MissingState => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UntrustedPeer { .. } => write!(f, "Forbidden"),
            Self::MalformedRequest(err) => write!(f, "Bad request: {}", err),
            Self::InvalidQuery { details } => write!(f, "Bad request: {}", details),
            Self::InvalidDestination { destination } => {
                write!(f, "Bad request: invalid destination '{}'", destination)
            }
            Self::Provider(msg) => write!(f, "Authentication failed: {}", msg),
            Self::AccessDenied { .. } => write!(
                f,
                "Access denied - you are not authorized to use this service"
            ),
            Self::BackendUnavailable(_) => write!(f, "Login service unavailable"),
            Self::InvalidToken => write!(f, "Login service returned an unusable session"),
            Self::MissingState => write!(f, "Missing state parameter"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<CanonicalizeError> for AuthError {
    fn from(err: CanonicalizeError) -> Self {
        Self::MalformedRequest(err)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            Self::UntrustedPeer { peer } => {
                tracing::warn!(peer = ?peer, "rejected request from untrusted peer");
            }
            Self::MalformedRequest(err) => {
                tracing::warn!(error = %err, "rejected malformed request");
            }
            Self::InvalidQuery { details } => {
                tracing::warn!(details = %details, "rejected malformed query string");
            }
            Self::InvalidDestination { destination } => {
                tracing::warn!(destination = %destination, "rejected redirect destination");
            }
            Self::Provider(msg) => {
                tracing::error!("Identity provider exchange failed: {}", msg);
            }
            Self::AccessDenied { email } => {
                tracing::warn!(email = %email, "login rejected by email policy");
            }
            Self::BackendUnavailable(msg) => {
                tracing::error!("Backend hand-off failed: {}", msg);
            }
            Self::InvalidToken => {
                tracing::error!("session token contains characters not allowed in a cookie");
            }
            Self::MissingState => {
                tracing::error!(
                    "provider callback carried no state parameter; check the provider configuration"
                );
            }
        }

        (self.status(), self.to_string()).into_response()
    }
}
