//! Email allow-pattern and pseudonymous id derivation.
//!
//! A login is allowed when the profile email fully matches the configured
//! pattern. Independently of that, the provider's subject id is turned into
//! the id that leaves this process, optionally salted and hashed with
//! SHA-512.

use id_redirector_core::{DerivedId, Result, SubjectId};
use regex::Regex;
use sha2::{Digest, Sha512};

use crate::error::PolicyError;
use crate::profile::IdentityProfile;

/// Pattern that allows every address.
pub const ALLOW_ALL_PATTERN: &str = ".*";

/// How subject ids are turned into derived ids.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaltConfig {
    /// Forward the subject id unchanged.
    #[default]
    Disabled,
    /// Hash the subject id without a salt.
    Unsalted,
    /// Hash the salt followed by the subject id.
    Salted(String),
}

impl SaltConfig {
    /// Maps the configured salt value onto the three derivation modes.
    ///
    /// `None` disables hashing, an empty string hashes without a salt.
    #[must_use]
    pub fn from_setting(salt: Option<&str>) -> Self {
        match salt {
            None => Self::Disabled,
            Some("") => Self::Unsalted,
            Some(salt) => Self::Salted(salt.to_string()),
        }
    }

    /// Derives the forwarded id for a subject.
    #[must_use]
    pub fn derive(&self, subject: &SubjectId) -> DerivedId {
        match self {
            Self::Disabled => DerivedId::unhashed(subject),
            Self::Unsalted => DerivedId::new(hex::encode(Sha512::digest(subject.as_str()))),
            Self::Salted(salt) => {
                let mut hasher = Sha512::new();
                hasher.update(salt.as_bytes());
                hasher.update(subject.as_str().as_bytes());
                DerivedId::new(hex::encode(hasher.finalize()))
            }
        }
    }
}

/// Full-match regular expression over email addresses.
#[derive(Debug, Clone)]
pub struct EmailPolicy {
    source: String,
    anchored: Regex,
}

impl EmailPolicy {
    /// Compiles an allow-pattern. The pattern must match the whole address.
    pub fn new(pattern: &str) -> Result<Self, PolicyError> {
        let anchored =
            Regex::new(&format!("^(?:{pattern})$")).map_err(|e| PolicyError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            source: pattern.to_string(),
            anchored,
        })
    }

    /// Returns true if `email` matches the pattern in its entirety.
    #[must_use]
    pub fn matches(&self, email: &str) -> bool {
        self.anchored.is_match(email)
    }

    /// Returns the pattern as configured.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.source
    }
}

impl Default for EmailPolicy {
    fn default() -> Self {
        Self {
            source: ALLOW_ALL_PATTERN.to_string(),
            anchored: Regex::new("^(?:.*)$").expect("static pattern compiles"),
        }
    }
}

/// Outcome of applying the policy to a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDecision {
    allowed: bool,
    derived_id: DerivedId,
}

impl PolicyDecision {
    /// Returns true if the login may proceed.
    #[must_use]
    pub fn allowed(&self) -> bool {
        self.allowed
    }

    /// Returns the id to forward for this user.
    #[must_use]
    pub fn derived_id(&self) -> &DerivedId {
        &self.derived_id
    }

    /// Consumes the decision, returning the derived id.
    #[must_use]
    pub fn into_derived_id(self) -> DerivedId {
        self.derived_id
    }
}

/// Email allow-pattern together with the id derivation mode.
#[derive(Debug, Clone, Default)]
pub struct IdentityPolicy {
    email: EmailPolicy,
    salt: SaltConfig,
}

impl IdentityPolicy {
    #[must_use]
    pub fn new(email: EmailPolicy, salt: SaltConfig) -> Self {
        Self { email, salt }
    }

    /// Applies the policy to a profile.
    ///
    /// This is a pure function of the profile and the policy.
    #[must_use]
    pub fn decide(&self, profile: &IdentityProfile) -> PolicyDecision {
        PolicyDecision {
            allowed: self.email.matches(&profile.email),
            derived_id: self.salt.derive(&profile.subject_id),
        }
    }

    #[must_use]
    pub fn email_policy(&self) -> &EmailPolicy {
        &self.email
    }

    #[must_use]
    pub fn salt(&self) -> &SaltConfig {
        &self.salt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // SHA-512("abc") from FIPS 180-2.
    const SHA512_ABC: &str = "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f";

    fn sha512_hex(input: &str) -> String {
        hex::encode(Sha512::digest(input.as_bytes()))
    }

    #[test]
    fn salt_setting_maps_to_modes() {
        assert_eq!(SaltConfig::from_setting(None), SaltConfig::Disabled);
        assert_eq!(SaltConfig::from_setting(Some("")), SaltConfig::Unsalted);
        assert_eq!(
            SaltConfig::from_setting(Some("pepper")),
            SaltConfig::Salted("pepper".to_string())
        );
    }

    #[test]
    fn disabled_salt_forwards_subject() {
        let derived = SaltConfig::Disabled.derive(&SubjectId::from("123"));
        assert_eq!(derived.as_str(), "123");
    }

    #[test]
    fn empty_salt_hashes_subject() {
        let derived = SaltConfig::Unsalted.derive(&SubjectId::from("abc"));
        assert_eq!(derived.as_str(), SHA512_ABC);
    }

    #[test]
    fn salt_is_prepended_to_subject() {
        let derived = SaltConfig::Salted("a".to_string()).derive(&SubjectId::from("bc"));
        assert_eq!(derived.as_str(), SHA512_ABC);

        let derived = SaltConfig::Salted("s".to_string()).derive(&SubjectId::from("123"));
        assert_eq!(derived.as_str(), sha512_hex("s123"));
        assert_ne!(derived.as_str(), sha512_hex("123"));
    }

    #[test]
    fn derivation_is_deterministic() {
        let salt = SaltConfig::Salted("s".to_string());
        let subject = SubjectId::from("123");
        assert_eq!(salt.derive(&subject), salt.derive(&subject));
        assert_eq!(salt.derive(&subject).as_str().len(), 128);
    }

    #[test]
    fn pattern_must_match_whole_address() {
        let policy = EmailPolicy::new(r".*@ok\.org").expect("valid pattern");

        assert!(policy.matches("u@ok.org"));
        assert!(!policy.matches("u@ok.org.evil.com"));
        assert!(!policy.matches("u@bad.org"));
    }

    #[test]
    fn alternation_is_anchored_as_a_whole() {
        let policy = EmailPolicy::new(r"a@x\.org|b@y\.org").expect("valid pattern");

        assert!(policy.matches("a@x.org"));
        assert!(policy.matches("b@y.org"));
        assert!(!policy.matches("a@x.org.attacker"));
        assert!(!policy.matches("evil-b@y.org"));
    }

    #[test]
    fn default_pattern_allows_everything() {
        let policy = EmailPolicy::default();
        assert_eq!(policy.pattern(), ALLOW_ALL_PATTERN);
        assert!(policy.matches("anyone@anywhere.example"));
        assert!(policy.matches(""));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let result = EmailPolicy::new("(unclosed");
        assert!(result.is_err());
    }

    #[test]
    fn decide_allows_matching_email() {
        let policy = IdentityPolicy::new(
            EmailPolicy::new(r".*@ok\.org").expect("valid pattern"),
            SaltConfig::Disabled,
        );

        let decision = policy.decide(&IdentityProfile::new("42", "u@ok.org"));

        assert!(decision.allowed());
        assert_eq!(decision.derived_id().as_str(), "42");
    }

    #[test]
    fn decide_still_derives_for_denied_email() {
        let policy = IdentityPolicy::new(
            EmailPolicy::new(r".*@bad\.org").expect("valid pattern"),
            SaltConfig::Unsalted,
        );

        let decision = policy.decide(&IdentityProfile::new("123", "u@ok.org"));

        assert!(!decision.allowed());
        assert_eq!(decision.derived_id().as_str(), sha512_hex("123"));
    }
}
