//! Account records as they are persisted.
//!
//! Field names follow the on-disk document: `password`, `salt`,
//! `superuser`, plus the opaque profile fields `lastLocation`,
//! `inventory` and `appearance` (older documents call it `skinUrl`).

use serde::{Deserialize, Serialize};

use crate::password;

/// Opaque per-account state captured from the host on logout and
/// restored on login.
///
/// The store never interprets these strings; the host adapter decides
/// their encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<String>,

    /// Appearance reference, e.g. a skin texture URL.
    #[serde(default, alias = "skinUrl", skip_serializing_if = "Option::is_none")]
    pub appearance: Option<String>,
}

impl Profile {
    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        self.last_location.is_none() && self.inventory.is_none() && self.appearance.is_none()
    }
}

/// One account in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Hex SHA-256 of `salt ‖ password`.
    #[serde(rename = "password", default)]
    pub password_hash: String,

    #[serde(default)]
    pub salt: String,

    #[serde(default)]
    pub superuser: bool,

    #[serde(flatten)]
    pub profile: Profile,
}

impl AccountRecord {
    /// Creates a record for `password` with a freshly generated salt.
    pub fn with_password(password: &str) -> Self {
        let salt = password::generate_salt();
        Self {
            password_hash: password::hash_password(password, &salt),
            salt,
            superuser: false,
            profile: Profile::default(),
        }
    }

    /// Returns `true` if both hash and salt are populated. Records missing
    /// either never verify.
    pub fn has_credentials(&self) -> bool {
        !self.password_hash.is_empty() && !self.salt.is_empty()
    }

    /// Checks `password` against the stored hash.
    pub fn verify(&self, password: &str) -> bool {
        self.has_credentials()
            && password::verify_password(password, &self.salt, &self.password_hash)
    }
}

/// Seed credentials for the well-known superuser account.
///
/// Used once, when the registry has no superuser entry yet. The values
/// are opaque seed data: the hash is stored as given, never re-derived.
///
/// The default seed is salt `warden-bootstrap-7f3c2a91` with the password
/// `changeme`. Operators should override it in configuration or log in
/// once and rotate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapSeed {
    pub salt: String,
    pub password_hash: String,
}

impl Default for BootstrapSeed {
    fn default() -> Self {
        Self {
            salt: "warden-bootstrap-7f3c2a91".to_string(),
            password_hash: "dbb43a6822bd0f4d57d129fd12b362299ccadba08e930d57817a05af8bebe629"
                .to_string(),
        }
    }
}

impl BootstrapSeed {
    pub(crate) fn into_record(self) -> AccountRecord {
        AccountRecord {
            password_hash: self.password_hash,
            salt: self.salt,
            superuser: true,
            profile: Profile::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_json_uses_document_field_names() {
        let record = AccountRecord {
            password_hash: "abc".into(),
            salt: "s".into(),
            superuser: true,
            profile: Profile {
                last_location: Some("world;1;2;3".into()),
                inventory: None,
                appearance: Some("http://skins/x.png".into()),
            },
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["password"], "abc");
        assert_eq!(value["salt"], "s");
        assert_eq!(value["superuser"], true);
        assert_eq!(value["lastLocation"], "world;1;2;3");
        assert_eq!(value["appearance"], "http://skins/x.png");
        assert!(value.get("inventory").is_none());
    }

    #[test]
    fn test_record_reads_legacy_skin_url() {
        let json = r#"{"password":"h","salt":"s","skinUrl":"http://old"}"#;
        let record: AccountRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.profile.appearance.as_deref(), Some("http://old"));
        assert!(!record.superuser);
    }

    #[test]
    fn test_record_missing_salt_never_verifies() {
        let json = r#"{"password":"e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"}"#;
        let record: AccountRecord = serde_json::from_str(json).unwrap();
        assert!(!record.has_credentials());
        assert!(!record.verify(""));
    }

    #[test]
    fn test_default_bootstrap_seed_verifies_documented_password() {
        let record = BootstrapSeed::default().into_record();
        assert!(record.superuser);
        assert!(record.verify("changeme"));
        assert!(!record.verify("admin"));
    }
}
