//! One-shot TCP client for the backend identity service.

use id_redirector_core::Result;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, instrument};

use crate::error::HandoffError;
use crate::record::BackendRecord;

/// Address of the backend identity service.
///
/// Each call to [`send`](Self::send) opens its own connection, which is
/// dropped before the call returns on every path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendHandoff {
    host: String,
    port: u16,
}

impl BackendHandoff {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns `host:port` for logging.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Sends a record and returns the token the backend answers with.
    ///
    /// Trailing line terminators are stripped from the answer; nothing else
    /// is interpreted. An answer that is empty after stripping is an error.
    #[instrument(skip(self, record), fields(backend = %self.addr()))]
    pub async fn send(&self, record: &BackendRecord) -> Result<String, HandoffError> {
        let line = record.to_line()?;

        let mut stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| HandoffError::ConnectionFailed {
                addr: self.addr(),
                details: e.to_string(),
            })?;

        let io_error = |e: std::io::Error| HandoffError::Io {
            addr: self.addr(),
            details: e.to_string(),
        };

        stream.write_all(line.as_bytes()).await.map_err(io_error)?;
        // Half-close so the backend sees end-of-request.
        stream.shutdown().await.map_err(io_error)?;

        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.map_err(io_error)?;
        drop(stream);

        let token = String::from_utf8_lossy(&response)
            .trim_end_matches(['\r', '\n'])
            .to_string();

        if token.is_empty() {
            return Err(HandoffError::EmptyResponse { addr: self.addr() }.into());
        }

        debug!(bytes = response.len(), "backend returned token");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use id_redirector_core::DerivedId;
    use id_redirector_identity::{IdentityProfile, ProfileField};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn record() -> BackendRecord {
        BackendRecord::from_profile(
            &IdentityProfile::new("42", "u@ok.org"),
            &DerivedId::new("42"),
            &[ProfileField::Id],
        )
    }

    /// Accepts one connection, reads the request until the client's
    /// half-close, answers with `reply` and returns what it received.
    async fn one_shot_backend(reply: &'static [u8]) -> (BackendHandoff, JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut request = Vec::new();
            socket.read_to_end(&mut request).await.expect("read request");
            socket.write_all(reply).await.expect("write reply");
            socket.shutdown().await.expect("shutdown");
            request
        });

        (BackendHandoff::new("127.0.0.1", port), handle)
    }

    #[tokio::test]
    async fn returns_backend_token() {
        let (backend, server) = one_shot_backend(b"session-token-123").await;

        let token = backend.send(&record()).await.expect("send");

        assert_eq!(token, "session-token-123");
        let request = server.await.expect("server task");
        assert_eq!(request, b"{\"id\":\"42\"}\n");
    }

    #[tokio::test]
    async fn strips_trailing_newline_from_token() {
        let (backend, server) = one_shot_backend(b"abc\r\n").await;

        let token = backend.send(&record()).await.expect("send");

        assert_eq!(token, "abc");
        server.await.expect("server task");
    }

    #[tokio::test]
    async fn empty_response_is_an_error() {
        let (backend, server) = one_shot_backend(b"").await;

        let result = backend.send(&record()).await;

        assert!(result.is_err());
        server.await.expect("server task");
    }

    #[tokio::test]
    async fn refused_connection_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);

        let result = BackendHandoff::new("127.0.0.1", port).send(&record()).await;

        assert!(result.is_err());
    }

    #[test]
    fn addr_formats_host_and_port() {
        assert_eq!(BackendHandoff::new("backend", 9000).addr(), "backend:9000");
    }
}
