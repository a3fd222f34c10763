//! Identity handling for id-redirector.
//!
//! This crate provides:
//! - The identity profile returned by the provider (`IdentityProfile`)
//! - The email allow-pattern and id derivation policy (`IdentityPolicy`)
//! - The names of profile fields that may be forwarded (`ProfileField`)
//!
//! # Example
//!
//! ```
//! use id_redirector_identity::{EmailPolicy, IdentityPolicy, IdentityProfile, SaltConfig};
//!
//! let policy = IdentityPolicy::new(
//!     EmailPolicy::new(r".*@example\.org").expect("valid pattern"),
//!     SaltConfig::Disabled,
//! );
//!
//! let profile = IdentityProfile::new("42", "alice@example.org");
//! let decision = policy.decide(&profile);
//!
//! assert!(decision.allowed());
//! assert_eq!(decision.derived_id().as_str(), "42");
//! ```

pub mod error;
pub mod policy;
pub mod profile;

pub use error::PolicyError;
pub use policy::{EmailPolicy, IdentityPolicy, PolicyDecision, SaltConfig};
pub use profile::{IdentityProfile, ProfileField};
