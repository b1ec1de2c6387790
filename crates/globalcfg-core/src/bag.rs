//! String-keyed option bags.
//!
//! Every record the node touches stores its free-form settings in a
//! [`ConfigBag`]. Lookups follow the same default-value rules the stores'
//! other consumers use, so a key that is absent and a key holding garbage
//! both resolve to the caller's default.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

/// An ordered string-to-string mapping with default-value lookups.
///
/// Equality is structural over all entries. Ordering of iteration is by key,
/// which keeps serialized snapshots and log output deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigBag {
    entries: BTreeMap<String, String>,
}

impl ConfigBag {
    /// Creates an empty bag.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Returns the value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns the value for `key`, or `default` when absent.
    #[must_use]
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Reads a boolean flag.
    ///
    /// With a `false` default the flag is set only by a case-insensitive
    /// `"true"`. With a `true` default it is cleared only by a
    /// case-insensitive `"false"`. Anything else yields the default.
    #[must_use]
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            None => default,
            Some(value) if default => !value.eq_ignore_ascii_case("false"),
            Some(value) => value.eq_ignore_ascii_case("true"),
        }
    }

    /// Reads an unsigned decimal integer, falling back to `default` when the
    /// key is absent or does not parse.
    #[must_use]
    pub fn get_u32(&self, key: &str, default: u32) -> u32 {
        self.get(key)
            .and_then(|value| value.parse().ok())
            .unwrap_or(default)
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Sets `key` to `value`, replacing any previous value.
    ///
    /// Returns the previous value, if any.
    pub fn replace(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the bag holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for ConfigBag
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K, V> Extend<(K, V)> for ConfigBag
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.entries.insert(k.into(), v.into());
        }
    }
}

impl IntoIterator for ConfigBag {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag(pairs: &[(&str, &str)]) -> ConfigBag {
        pairs.iter().copied().collect()
    }

    #[test]
    fn get_or_falls_back_when_absent() {
        let b = bag(&[("a", "1")]);
        assert_eq!(b.get_or("a", "x"), "1");
        assert_eq!(b.get_or("b", "x"), "x");
    }

    #[test]
    fn get_bool_default_false_requires_true() {
        let b = bag(&[("yes", "TRUE"), ("no", "false"), ("junk", "1")]);
        assert!(b.get_bool("yes", false));
        assert!(!b.get_bool("no", false));
        assert!(!b.get_bool("junk", false));
        assert!(!b.get_bool("missing", false));
    }

    #[test]
    fn get_bool_default_true_requires_false() {
        let b = bag(&[("no", "False"), ("junk", "0")]);
        assert!(!b.get_bool("no", true));
        assert!(b.get_bool("junk", true));
        assert!(b.get_bool("missing", true));
    }

    #[test]
    fn get_u32_rejects_garbage() {
        let b = bag(&[("n", "42"), ("neg", "-1"), ("word", "ten")]);
        assert_eq!(b.get_u32("n", 0), 42);
        assert_eq!(b.get_u32("neg", 7), 7);
        assert_eq!(b.get_u32("word", 7), 7);
        assert_eq!(b.get_u32("missing", 3), 3);
    }

    #[test]
    fn replace_and_remove() {
        let mut b = ConfigBag::new();
        assert_eq!(b.replace("k", "v1"), None);
        assert_eq!(b.replace("k", "v2"), Some("v1".to_string()));
        assert_eq!(b.get("k"), Some("v2"));
        assert_eq!(b.remove("k"), Some("v2".to_string()));
        assert!(b.is_empty());
        assert_eq!(b.remove("k"), None);
    }

    #[test]
    fn equality_is_structural() {
        let a = bag(&[("x", "1"), ("y", "2")]);
        let b = bag(&[("y", "2"), ("x", "1")]);
        assert_eq!(a, b);
        let mut c = b.clone();
        c.replace("y", "3");
        assert_ne!(a, c);
    }

    #[test]
    fn serializes_as_plain_map() {
        let b = bag(&[("mac_prefix", "0a:00:00")]);
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, r#"{"mac_prefix":"0a:00:00"}"#);
        let back: ConfigBag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
    }
}
