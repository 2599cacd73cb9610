//! Strongly-typed package name wrapper.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

/// Strongly-typed wrapper for package names.
///
/// Package names come from directory names or `package.yml` manifests and are
/// used as nodes in the dependency graph. They must be non-empty and must not
/// contain path separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    /// Create a new `PackageName`, panicking in debug builds if invalid.
    ///
    /// Prefer [`try_new`](Self::try_new) when handling untrusted input.
    pub fn new(name: impl Into<String>) -> Self {
        let s = name.into();
        debug_assert!(
            !s.is_empty() && !s.contains('/') && !s.contains('\\'),
            "PackageName must be non-empty and free of path separators"
        );
        Self(s)
    }

    /// Try to create a new `PackageName`, returning `None` if the name is
    /// empty or contains a path separator.
    pub fn try_new(name: impl Into<String>) -> Option<Self> {
        let s = name.into();
        if s.is_empty() || s.contains('/') || s.contains('\\') {
            None
        } else {
            Some(Self(s))
        }
    }

    /// Return the underlying name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for PackageName {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PackageName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for PackageName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for PackageName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_name_creation() {
        let name = PackageName::new("crm");
        assert_eq!(name.as_str(), "crm");
    }

    #[test]
    fn test_package_name_rejects_separators() {
        assert!(PackageName::try_new("a/b").is_none());
        assert!(PackageName::try_new("a\\b").is_none());
        assert!(PackageName::try_new("").is_none());
    }

    #[test]
    fn test_package_name_ord() {
        let a = PackageName::new("alpha");
        let b = PackageName::new("beta");
        assert!(a < b);
    }

    #[test]
    fn test_package_name_borrow_lookup() {
        use std::collections::HashMap;
        let mut map: HashMap<PackageName, i32> = HashMap::new();
        map.insert(PackageName::new("core"), 7);
        assert_eq!(map.get("core"), Some(&7));
    }
}
