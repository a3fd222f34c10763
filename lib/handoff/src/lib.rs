//! Backend hand-off for id-redirector.
//!
//! After a login is accepted, the selected profile fields are sent to a
//! backend identity service over a fresh TCP connection. The backend answers
//! with an opaque token that becomes the session cookie value.
//!
//! # Wire protocol
//!
//! 1. The client connects and writes one line of JSON terminated by `\n`.
//! 2. The client shuts down its write half.
//! 3. The server writes any number of bytes and closes the connection.
//! 4. Everything received is the token.
//!
//! There is exactly one request per connection, no pooling and no retry.

pub mod client;
pub mod error;
pub mod record;

pub use client::BackendHandoff;
pub use error::HandoffError;
pub use record::BackendRecord;
