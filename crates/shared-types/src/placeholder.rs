//! Placeholder key/value mapping built per generation request

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Mapping from placeholder key (the text inside `{...}`) to its fill value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceholderMap(BTreeMap<String, String>);

impl PlaceholderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a parsed JSON object, coercing values to strings
    pub fn from_json_object(object: &serde_json::Map<String, Value>) -> Self {
        object
            .iter()
            .map(|(key, value)| (key.clone(), coerce_value(value)))
            .collect()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PlaceholderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// `null` becomes the empty string, strings pass through, everything else
/// uses its JSON text
pub fn coerce_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerces_non_string_values() {
        let value = json!({
            "甲方": "张三",
            "份数": 2,
            "是否公证": true,
            "备注": null
        });
        let map = PlaceholderMap::from_json_object(value.as_object().unwrap());
        assert_eq!(map.get("甲方"), Some("张三"));
        assert_eq!(map.get("份数"), Some("2"));
        assert_eq!(map.get("是否公证"), Some("true"));
        assert_eq!(map.get("备注"), Some(""));
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_collects_from_pairs() {
        let map: PlaceholderMap = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
