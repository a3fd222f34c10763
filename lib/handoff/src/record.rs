//! The single line sent to the backend.

use id_redirector_core::{DerivedId, Result};
use id_redirector_identity::{IdentityProfile, ProfileField};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::HandoffError;

/// Profile fields selected for the backend, keyed by wire name.
///
/// Optional fields the provider did not return are left out rather than
/// sent as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BackendRecord(Map<String, Value>);

impl BackendRecord {
    /// Selects `fields` from the profile. `id` is always the derived id.
    #[must_use]
    pub fn from_profile(
        profile: &IdentityProfile,
        derived_id: &DerivedId,
        fields: &[ProfileField],
    ) -> Self {
        let mut map = Map::new();

        for field in fields {
            let value = match field {
                ProfileField::Id => Some(Value::from(derived_id.as_str())),
                ProfileField::Email => Some(Value::from(profile.email.as_str())),
                ProfileField::EmailVerified => Some(Value::from(profile.email_verified)),
                ProfileField::Name => profile.name.as_deref().map(Value::from),
                ProfileField::GivenName => profile.given_name.as_deref().map(Value::from),
                ProfileField::FamilyName => profile.family_name.as_deref().map(Value::from),
                ProfileField::Picture => profile.picture_url.as_deref().map(Value::from),
                ProfileField::HostedDomain => profile.hosted_domain.as_deref().map(Value::from),
            };

            if let Some(value) = value {
                map.insert(field.as_str().to_string(), value);
            }
        }

        Self(map)
    }

    /// Serializes the record as one newline-terminated line.
    pub fn to_line(&self) -> Result<String, HandoffError> {
        let mut line = serde_json::to_string(&self.0).map_err(|e| HandoffError::Encode {
            details: e.to_string(),
        })?;
        line.push('\n');
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl BackendRecord {
        fn get(&self, field: ProfileField) -> Option<&Value> {
            self.0.get(field.as_str())
        }

        fn is_empty(&self) -> bool {
            self.0.is_empty()
        }
    }

    fn profile() -> IdentityProfile {
        IdentityProfile::new("raw-subject", "alice@example.org")
            .with_email_verified(true)
            .with_name(Some("Alice".to_string()))
    }

    #[test]
    fn default_record_carries_only_derived_id() {
        let record =
            BackendRecord::from_profile(&profile(), &DerivedId::new("hashed"), &[ProfileField::Id]);

        assert_eq!(record.get(ProfileField::Id), Some(&Value::from("hashed")));
        assert!(record.get(ProfileField::Email).is_none());
        assert_eq!(record.to_line().expect("encode"), "{\"id\":\"hashed\"}\n");
    }

    #[test]
    fn id_field_never_leaks_raw_subject() {
        let record =
            BackendRecord::from_profile(&profile(), &DerivedId::new("hashed"), &[ProfileField::Id]);

        let line = record.to_line().expect("encode");
        assert!(!line.contains("raw-subject"));
    }

    #[test]
    fn selected_fields_keep_their_types() {
        let record = BackendRecord::from_profile(
            &profile(),
            &DerivedId::new("d"),
            &[ProfileField::Email, ProfileField::EmailVerified, ProfileField::Name],
        );

        assert_eq!(
            record.get(ProfileField::Email),
            Some(&Value::from("alice@example.org"))
        );
        assert_eq!(record.get(ProfileField::EmailVerified), Some(&Value::Bool(true)));
        assert_eq!(record.get(ProfileField::Name), Some(&Value::from("Alice")));
        assert!(record.get(ProfileField::Id).is_none());
    }

    #[test]
    fn missing_optional_fields_are_omitted() {
        let record = BackendRecord::from_profile(
            &profile(),
            &DerivedId::new("d"),
            &[ProfileField::HostedDomain, ProfileField::Picture],
        );

        assert!(record.is_empty());
        assert_eq!(record.to_line().expect("encode"), "{}\n");
    }

    #[test]
    fn line_is_single_line() {
        let profile = IdentityProfile::new("1", "x@example.org")
            .with_name(Some("Line\nBreak".to_string()));
        let record =
            BackendRecord::from_profile(&profile, &DerivedId::new("1"), &[ProfileField::Name]);

        let line = record.to_line().expect("encode");
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.ends_with('\n'));
    }
}
