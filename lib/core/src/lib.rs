//! Core identifier types and shared utilities for id-redirector.
//!
//! This crate provides the identifier newtypes and the `Result` alias used
//! by the identity, hand-off and server crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{DerivedId, SubjectId};
