use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Ordered attribute bindings for one record.
///
/// Insertion order is significant: compiled column lists and parameter
/// positions follow it. Overwriting a key keeps its original position.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeMap {
    entries: Vec<(String, Value)>,
}

impl AttributeMap {
    /// Create an empty attribute map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named value, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key.into(), value.into());
        self
    }

    /// Set a value, keeping the key's position if it already exists.
    pub fn insert(&mut self, key: String, value: Value) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl IntoIterator for AttributeMap {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K, V> FromIterator<(K, V)> for AttributeMap
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key.into(), value.into());
        }
        map
    }
}

impl<K, V> Extend<(K, V)> for AttributeMap
where
    K: Into<String>,
    V: Into<Value>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key.into(), value.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let map = AttributeMap::new()
            .with("name", "a")
            .with("email", "b")
            .with("age", 3);
        let keys: Vec<&str> = map.keys().collect();
        assert_eq!(keys, vec!["name", "email", "age"]);
    }

    #[test]
    fn overwrite_keeps_position() {
        let mut map = AttributeMap::new().with("name", "a").with("email", "b");
        map.insert("name".into(), Value::from("c"));
        let keys: Vec<&str> = map.keys().collect();
        assert_eq!(keys, vec!["name", "email"]);
        assert_eq!(map.get("name"), Some(&Value::Text("c".into())));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn get_absent_key() {
        let map = AttributeMap::new().with("name", "a");
        assert!(map.get("missing").is_none());
        assert!(!map.contains_key("missing"));
    }
}
