//! Document keys.
//!
//! A [`Key`] is only ever constructed from a string that passed validation,
//! so any path built from one stays inside the storage root.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::BackendError;

/// Longest key accepted, in bytes.
pub const MAX_KEY_LEN: usize = 128;

/// A validated document key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Key(String);

impl Key {
    /// Generate a fresh random key (UUID v4, hyphenated lowercase).
    ///
    /// The randomness comes from the OS CSPRNG. No existing key is consulted.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().hyphenated().to_string())
    }

    /// Validate `raw` and wrap it as a key.
    ///
    /// Rejects empty keys, keys longer than [`MAX_KEY_LEN`], keys starting
    /// with `.`, and any character outside `[A-Za-z0-9._-]`. Path separators
    /// and `..` sequences therefore never reach path construction.
    pub fn parse(raw: &str) -> Result<Self, BackendError> {
        let invalid = |reason: &'static str| BackendError::InvalidKey {
            key: raw.chars().take(MAX_KEY_LEN).collect(),
            reason,
        };

        if raw.is_empty() {
            return Err(invalid("key is empty"));
        }
        if raw.len() > MAX_KEY_LEN {
            return Err(invalid("key is too long"));
        }
        if raw.starts_with('.') {
            return Err(invalid("key must not start with '.'"));
        }
        if raw.contains("..") {
            return Err(invalid("key must not contain '..'"));
        }
        if !raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
        {
            return Err(invalid("key contains characters outside [A-Za-z0-9._-]"));
        }

        Ok(Self(raw.to_string()))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Key {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Key {
    type Error = BackendError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_keys_are_valid_uuids() -> anyhow::Result<()> {
        let key = Key::generate();
        assert_eq!(key.as_str().len(), 36);
        let parsed = Uuid::parse_str(key.as_str())?;
        assert_eq!(parsed.get_version_num(), 4);
        assert_eq!(Key::parse(key.as_str())?, key);
        Ok(())
    }

    #[test]
    fn test_generated_keys_are_distinct() {
        let keys: HashSet<Key> = (0..1000).map(|_| Key::generate()).collect();
        assert_eq!(keys.len(), 1000);
    }

    #[test]
    fn test_accepts_plain_identifiers() {
        for raw in ["abc", "doc-1", "snake_case", "v1.2", "A1b2C3"] {
            assert!(Key::parse(raw).is_ok(), "expected '{}' to be accepted", raw);
        }
    }

    #[test]
    fn test_rejects_traversal_and_separators() {
        let rejected = [
            "",
            ".",
            "..",
            "../etc/passwd",
            "a/../b",
            "a/b",
            "a\\b",
            ".hidden",
            "trailing..",
            "nul\0byte",
            "space here",
            "ünïcode",
        ];
        for raw in rejected {
            assert!(
                matches!(Key::parse(raw), Err(BackendError::InvalidKey { .. })),
                "expected {:?} to be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_rejects_overlong_key() {
        let raw = "a".repeat(MAX_KEY_LEN + 1);
        assert!(Key::parse(&raw).is_err());
        assert!(Key::parse(&"a".repeat(MAX_KEY_LEN)).is_ok());
    }

    #[test]
    fn test_serde_validates_on_deserialize() {
        let ok: Result<Key, _> = serde_json::from_str("\"doc-1\"");
        assert!(ok.is_ok());
        let bad: Result<Key, _> = serde_json::from_str("\"../doc\"");
        assert!(bad.is_err());
    }
}
