//! Strongly-typed script tag wrapper.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

/// Stable identifier embedded in a migration script.
///
/// The tag is the sole key for "has this script already executed" tracking,
/// independent of the script's path. It must be non-empty and must not
/// contain whitespace or control characters so that it survives round trips
/// through the directive comment syntax and the ledger table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ScriptTag(String);

impl ScriptTag {
    /// Try to create a new `ScriptTag`, returning `None` if the value is
    /// empty or contains whitespace or control characters.
    pub fn try_new(tag: impl Into<String>) -> Option<Self> {
        let s = tag.into();
        if s.is_empty() || s.chars().any(|c| c.is_whitespace() || c.is_control()) {
            None
        } else {
            Some(Self(s))
        }
    }

    /// Create a new `ScriptTag`, panicking if the value is invalid.
    ///
    /// Prefer [`try_new`](Self::try_new) when handling untrusted input.
    pub fn new(tag: impl Into<String>) -> Self {
        Self::try_new(tag).expect("ScriptTag must be non-empty and free of whitespace")
    }

    /// Return the underlying tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for ScriptTag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ScriptTag::try_new(s).ok_or_else(|| {
            serde::de::Error::custom("ScriptTag must be non-empty and free of whitespace")
        })
    }
}

impl fmt::Display for ScriptTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ScriptTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ScriptTag {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ScriptTag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ScriptTag {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ScriptTag {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_creation() {
        let tag = ScriptTag::new("0001-init");
        assert_eq!(tag.as_str(), "0001-init");
    }

    #[test]
    fn test_tag_rejects_empty() {
        assert!(ScriptTag::try_new("").is_none());
    }

    #[test]
    fn test_tag_rejects_whitespace() {
        assert!(ScriptTag::try_new("my tag").is_none());
        assert!(ScriptTag::try_new("tag\t").is_none());
        assert!(ScriptTag::try_new("tag\n").is_none());
    }

    #[test]
    fn test_tag_equality_with_str() {
        let tag = ScriptTag::new("0001-init");
        assert_eq!(tag, "0001-init");
    }

    #[test]
    fn test_tag_borrow_lookup() {
        use std::collections::HashMap;
        let mut map: HashMap<ScriptTag, i32> = HashMap::new();
        map.insert(ScriptTag::new("a"), 1);
        assert_eq!(map.get("a"), Some(&1));
    }

    #[test]
    fn test_tag_serde_roundtrip() {
        let tag = ScriptTag::new("0001-init");
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, r#""0001-init""#);
        let back: ScriptTag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tag);
    }

    #[test]
    fn test_tag_deserialize_rejects_invalid() {
        let result: Result<ScriptTag, _> = serde_json::from_str(r#""has space""#);
        assert!(result.is_err());
    }
}
