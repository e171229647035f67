//! Canonical cache key composition.
//!
//! Keys are built from a prefix plus sorted `k=v` pairs, so two logically
//! identical requests always hash to the same key regardless of the order
//! in which filter fields were set or whether a numeric value arrived as a
//! number or a string.

use std::collections::BTreeMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A cache key uniquely identifying a logical request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Create a key from a bare string (for fixed, well-known entries such
    /// as `trending` or `categories`).
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Start building a parameterized key.
    pub fn builder(prefix: impl Into<String>) -> CacheKeyBuilder {
        CacheKeyBuilder {
            prefix: prefix.into(),
            params: BTreeMap::new(),
        }
    }

    /// Get the key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether this key falls under the given prefix.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0 == prefix
            || self
                .0
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('?') || rest.starts_with(':'))
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Builder composing a canonical key from named parameters.
///
/// Parameters are kept in a `BTreeMap`, so insertion order never leaks into
/// the final key. Values are rendered via `Display`; empty values are
/// skipped entirely rather than encoded as `k=`.
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    prefix: String,
    params: BTreeMap<String, String>,
}

impl CacheKeyBuilder {
    /// Add a parameter. Empty values are dropped.
    pub fn param(mut self, name: &str, value: impl Display) -> Self {
        let rendered = value.to_string();
        if !rendered.is_empty() {
            self.params.insert(name.to_string(), rendered);
        }
        self
    }

    /// Add a parameter only when the value is present.
    pub fn opt_param<T: Display>(self, name: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.param(name, v),
            None => self,
        }
    }

    /// Add a boolean flag only when it is set.
    pub fn flag(self, name: &str, value: bool) -> Self {
        if value {
            self.param(name, "true")
        } else {
            self
        }
    }

    /// Finish the key.
    pub fn build(self) -> CacheKey {
        if self.params.is_empty() {
            return CacheKey(self.prefix);
        }
        let query: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        CacheKey(format!("{}?{}", self.prefix, query.join("&")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_order_does_not_matter() {
        let a = CacheKey::builder("listings")
            .param("search", "shoes")
            .param("category", 3)
            .build();
        let b = CacheKey::builder("listings")
            .param("category", 3)
            .param("search", "shoes")
            .build();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "listings?category=3&search=shoes");
    }

    #[test]
    fn test_numeric_and_string_values_agree() {
        let a = CacheKey::builder("listings").param("category", 3).build();
        let b = CacheKey::builder("listings").param("category", "3").build();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let key = CacheKey::builder("listings")
            .param("search", "")
            .opt_param::<i64>("category", None)
            .flag("promoted", false)
            .build();
        assert_eq!(key.as_str(), "listings");
    }

    #[test]
    fn test_prefix_matching() {
        let key = CacheKey::builder("trending").param("limit", 12).build();
        assert!(key.has_prefix("trending"));
        assert!(!key.has_prefix("trend"));
        assert!(CacheKey::new("states:4").has_prefix("states"));
        assert!(CacheKey::new("categories").has_prefix("categories"));
    }
}
