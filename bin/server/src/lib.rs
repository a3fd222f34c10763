//! id-redirector web server.
//!
//! An authentication redirector that sits behind a reverse proxy. It logs
//! users in with an OAuth2 identity provider, hands a pseudonymous id to a
//! backend identity service, and redirects back with a session cookie.

pub mod app;
pub mod auth;
pub mod canonical;
pub mod config;
pub mod error;
pub mod pages;
