//! Identity profile returned by the provider after a successful exchange.

use id_redirector_core::SubjectId;
use rootcause::Report;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::error::PolicyError;

/// Profile of the user who just authenticated.
///
/// Deserializes from an OpenID Connect userinfo document. The legacy
/// `id` / `verified_email` spellings are accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdentityProfile {
    /// Provider-assigned subject identifier.
    #[serde(rename = "sub", alias = "id")]
    pub subject_id: SubjectId,
    /// Primary email address.
    pub email: String,
    /// Whether the provider has verified the email address.
    #[serde(default, alias = "verified_email")]
    pub email_verified: bool,
    /// Full display name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    /// Avatar URL.
    #[serde(default, rename = "picture")]
    pub picture_url: Option<String>,
    /// Hosted (organisation) domain of the account.
    #[serde(default, rename = "hd")]
    pub hosted_domain: Option<String>,
}

impl IdentityProfile {
    /// Creates a profile with only the mandatory fields set.
    #[must_use]
    pub fn new(subject_id: impl Into<SubjectId>, email: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            email: email.into(),
            email_verified: false,
            name: None,
            given_name: None,
            family_name: None,
            picture_url: None,
            hosted_domain: None,
        }
    }

    /// Sets the email verification flag.
    #[must_use]
    pub fn with_email_verified(mut self, verified: bool) -> Self {
        self.email_verified = verified;
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Sets the hosted domain.
    #[must_use]
    pub fn with_hosted_domain(mut self, domain: Option<String>) -> Self {
        self.hosted_domain = domain;
        self
    }
}

/// A profile field that may be forwarded to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    /// The derived id, never the raw subject id.
    Id,
    Email,
    EmailVerified,
    Name,
    GivenName,
    FamilyName,
    Picture,
    HostedDomain,
}

impl ProfileField {
    /// Returns the wire name of the field.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Email => "email",
            Self::EmailVerified => "email_verified",
            Self::Name => "name",
            Self::GivenName => "given_name",
            Self::FamilyName => "family_name",
            Self::Picture => "picture",
            Self::HostedDomain => "hd",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileField {
    type Err = Report<PolicyError>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "id" => Ok(Self::Id),
            "email" => Ok(Self::Email),
            "email_verified" | "verified_email" => Ok(Self::EmailVerified),
            "name" => Ok(Self::Name),
            "given_name" => Ok(Self::GivenName),
            "family_name" => Ok(Self::FamilyName),
            "picture" => Ok(Self::Picture),
            "hd" | "hosted_domain" => Ok(Self::HostedDomain),
            other => Err(PolicyError::UnknownField {
                field: other.to_string(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_userinfo_document() {
        let json = r#"{
            "sub": "110248495921238986420",
            "email": "alice@example.org",
            "email_verified": true,
            "name": "Alice Example",
            "given_name": "Alice",
            "family_name": "Example",
            "picture": "https://example.org/alice.png",
            "hd": "example.org"
        }"#;

        let profile: IdentityProfile = serde_json::from_str(json).expect("deserialize");

        assert_eq!(profile.subject_id.as_str(), "110248495921238986420");
        assert_eq!(profile.email, "alice@example.org");
        assert!(profile.email_verified);
        assert_eq!(profile.given_name.as_deref(), Some("Alice"));
        assert_eq!(profile.hosted_domain.as_deref(), Some("example.org"));
    }

    #[test]
    fn deserializes_legacy_field_names() {
        let json = r#"{"id": "42", "email": "bob@example.org", "verified_email": true}"#;

        let profile: IdentityProfile = serde_json::from_str(json).expect("deserialize");

        assert_eq!(profile.subject_id.as_str(), "42");
        assert!(profile.email_verified);
        assert!(profile.name.is_none());
    }

    #[test]
    fn missing_subject_is_rejected() {
        let json = r#"{"email": "bob@example.org"}"#;
        assert!(serde_json::from_str::<IdentityProfile>(json).is_err());
    }

    #[test]
    fn field_names_parse() {
        assert_eq!("id".parse::<ProfileField>().ok(), Some(ProfileField::Id));
        assert_eq!(
            " email ".parse::<ProfileField>().ok(),
            Some(ProfileField::Email)
        );
        assert_eq!(
            "hd".parse::<ProfileField>().ok(),
            Some(ProfileField::HostedDomain)
        );
        assert!("password".parse::<ProfileField>().is_err());
    }

    #[test]
    fn builder_sets_optional_fields() {
        let profile = IdentityProfile::new("7", "carol@example.org")
            .with_email_verified(true)
            .with_name(Some("Carol".to_string()))
            .with_hosted_domain(Some("example.org".to_string()));

        assert!(profile.email_verified);
        assert_eq!(profile.name.as_deref(), Some("Carol"));
        assert_eq!(profile.hosted_domain.as_deref(), Some("example.org"));
    }
}
