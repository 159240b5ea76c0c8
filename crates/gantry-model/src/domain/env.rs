use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{constants::REDACTED, opaque::Opaque};

/// Key-value map injected into the container template.
///
/// Values are [`Opaque`]: the map may carry secrets, and nothing in the
/// pipeline inspects or prints them. Serialized as a plain JSON object,
/// which is the shape the control plane expects for template variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Env(pub BTreeMap<String, Opaque>);

impl Env {
    /// Create an empty map.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Create a map containing a single entry.
    pub fn single<K, V>(key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<Opaque>,
    {
        let mut env = Self::new();
        env.insert(key, value);
        env
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Insert or overwrite an entry.
    pub fn insert<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<Opaque>,
    {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Get the value for a key.
    pub fn get(&self, key: &str) -> Option<&Opaque> {
        self.0.get(key)
    }

    /// Iterate over the keys only. Values are not exposed through iteration.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    /// Merge two maps; entries from `other` override entries from `self`.
    pub fn merged(&self, other: &Env) -> Env {
        let mut out = self.0.clone();
        out.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Env(out)
    }

    /// Replace every injected value occurring in `text` with `***`.
    ///
    /// Remote error bodies can echo request payloads; this is applied to any
    /// message before it leaves the pipeline.
    pub fn redact(&self, text: &str) -> String {
        let mut values: Vec<&str> = self
            .0
            .values()
            .map(Opaque::expose)
            .filter(|v| !v.is_empty())
            .collect();
        // Longest first so a value containing another is replaced whole.
        values.sort_by_key(|v| std::cmp::Reverse(v.len()));

        values
            .into_iter()
            .fold(text.to_string(), |acc, v| acc.replace(v, REDACTED))
    }
}

#[cfg(test)]
mod tests {
    use super::Env;

    #[test]
    fn new_is_empty() {
        let env = Env::new();
        assert!(env.is_empty());
        assert!(env.get("FOO").is_none());
    }

    #[test]
    fn insert_overrides_existing_key() {
        let mut env = Env::new();
        env.insert("FOO", "one").insert("FOO", "two");
        assert_eq!(env.len(), 1);
        assert_eq!(env.get("FOO").unwrap().expose(), "two");
    }

    #[test]
    fn merged_other_overrides_base() {
        let mut base = Env::new();
        base.insert("FOO", "base").insert("BAR", "bar");
        let mut other = Env::new();
        other.insert("FOO", "override").insert("BAZ", "baz");

        let merged = base.merged(&other);
        assert_eq!(merged.get("FOO").unwrap().expose(), "override");
        assert_eq!(merged.get("BAR").unwrap().expose(), "bar");
        assert_eq!(merged.get("BAZ").unwrap().expose(), "baz");
    }

    #[test]
    fn debug_never_prints_values() {
        let env = Env::single("HF_TOKEN", "hf_canary_value");
        let dbg = format!("{env:?}");
        assert!(dbg.contains("HF_TOKEN"));
        assert!(!dbg.contains("hf_canary_value"));
    }

    #[test]
    fn redact_scrubs_values_from_text() {
        let mut env = Env::new();
        env.insert("A", "secret").insert("B", "secret-long").insert("EMPTY", "");

        let out = env.redact("body: {\"A\":\"secret\",\"B\":\"secret-long\"}");
        assert_eq!(out, "body: {\"A\":\"***\",\"B\":\"***\"}");
        assert_eq!(env.redact("nothing here"), "nothing here");
    }

    #[test]
    fn serializes_as_json_object() {
        let mut env = Env::new();
        env.insert("MODE", "gpu");
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json, serde_json::json!({"MODE": "gpu"}));

        let back: Env = serde_json::from_value(json).unwrap();
        assert_eq!(back, env);
    }
}
