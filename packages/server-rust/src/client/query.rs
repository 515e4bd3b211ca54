//! Query-string parameter set with deterministic encoding.

use std::collections::BTreeMap;
use std::fmt;

/// Multi-valued query parameters.
///
/// Keys are encoded in sorted order so the same set always produces the same
/// query string. Multi-valued parameters follow the backend's `name[]`
/// convention via [`QueryParams::add_list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    values: BTreeMap<String, Vec<String>>,
}

impl QueryParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to a single value, replacing any existing values.
    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        self.values.insert(key.into(), vec![value.to_string()]);
        self
    }

    /// Appends a value to `key`.
    pub fn add(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        self.values
            .entry(key.into())
            .or_default()
            .push(value.to_string());
        self
    }

    /// Appends every value under `name[]`.
    pub fn add_list<I>(&mut self, name: &str, values: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: ToString,
    {
        let key = format!("{name}[]");
        for value in values {
            self.add(key.as_str(), value);
        }
        self
    }

    /// First value bound to `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Percent-encodes the set as `k=v&k=v`, keys sorted.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (key, values) in &self.values {
            let key = urlencoding::encode(key);
            for value in values {
                if !out.is_empty() {
                    out.push('&');
                }
                out.push_str(&key);
                out.push('=');
                out.push_str(&urlencoding::encode(value));
            }
        }
        out
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn encodes_sorted_keys() {
        let mut params = QueryParams::new();
        params.set("uid", "abc").set("id", 42).set("org_id", 1);
        assert_eq!(params.encode(), "id=42&org_id=1&uid=abc");
    }

    #[test]
    fn set_replaces_existing_values() {
        let mut params = QueryParams::new();
        params.add("limit", 1).add("limit", 2).set("limit", 3);
        assert_eq!(params.encode(), "limit=3");
    }

    #[test]
    fn list_parameters_use_bracket_suffix() {
        let mut params = QueryParams::new();
        params.add_list("dashboard_ids", [1, 2]);
        params.set("org_id", 5);
        assert_eq!(
            params.encode(),
            "dashboard_ids%5B%5D=1&dashboard_ids%5B%5D=2&org_id=5"
        );
        assert_eq!(params.get("dashboard_ids[]"), Some("1"));
    }

    #[test]
    fn escapes_reserved_characters() {
        let mut params = QueryParams::new();
        params.set("name", "a b&c=d");
        assert_eq!(params.encode(), "name=a%20b%26c%3Dd");
    }

    #[test]
    fn empty_set_encodes_to_empty_string() {
        assert_eq!(QueryParams::new().encode(), "");
        assert!(QueryParams::new().is_empty());
    }

    proptest! {
        #[test]
        fn encoded_pairs_round_trip(key in "[a-z_]{1,8}", value in ".{0,16}") {
            let mut params = QueryParams::new();
            params.set(key.as_str(), value.as_str());
            let encoded = params.encode();
            let (k, v) = encoded.split_once('=').unwrap();
            prop_assert_eq!(urlencoding::decode(k).unwrap(), key);
            prop_assert_eq!(urlencoding::decode(v).unwrap(), value);
            prop_assert!(!v.contains('&'));
        }
    }
}
