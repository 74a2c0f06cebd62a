//! Provenance metadata attached to a [`crate::chunk::Chunk`].
//!
//! Keys are kept sorted (`BTreeMap`) so serialized records and rendered prompts are stable
//! between runs.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    inner: BTreeMap<String, serde_json::Value>,
}

impl Metadata {
    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.inner.iter()
    }

    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        self.inner.insert(key.into(), value.into());
    }

    pub fn get(&self, key: impl AsRef<str>) -> Option<&serde_json::Value> {
        self.inner.get(key.as_ref())
    }

    pub fn remove(&mut self, key: impl AsRef<str>) -> Option<serde_json::Value> {
        self.inner.remove(key.as_ref())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the value as a string, rendering non-string scalars with their json form
    pub fn get_str(&self, key: impl AsRef<str>) -> Option<String> {
        self.get(key).map(|value| {
            value
                .as_str()
                .map_or_else(|| value.to_string(), ToString::to_string)
        })
    }
}

impl<K, V> Extend<(K, V)> for Metadata
where
    K: Into<String>,
    V: Into<serde_json::Value>,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        self.inner
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

impl<K, V> FromIterator<(K, V)> for Metadata
where
    K: Into<String>,
    V: Into<serde_json::Value>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut metadata = Metadata::default();
        metadata.extend(iter);
        metadata
    }
}

impl<K, V> From<Vec<(K, V)>> for Metadata
where
    K: Into<String>,
    V: Into<serde_json::Value>,
{
    fn from(items: Vec<(K, V)>) -> Self {
        items.into_iter().collect()
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Metadata
where
    K: Into<String>,
    V: Into<serde_json::Value>,
{
    fn from(items: [(K, V); N]) -> Self {
        items.into_iter().collect()
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Metadata {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        map.into_iter().collect()
    }
}

impl From<Metadata> for serde_json::Map<String, serde_json::Value> {
    fn from(metadata: Metadata) -> Self {
        metadata.inner.into_iter().collect()
    }
}

impl IntoIterator for Metadata {
    type Item = (String, serde_json::Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, serde_json::Value>;
    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl<'iter> IntoIterator for &'iter Metadata {
    type Item = (&'iter String, &'iter serde_json::Value);
    type IntoIter = std::collections::btree_map::Iter<'iter, String, serde_json::Value>;
    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_are_sorted() {
        let metadata = Metadata::from([("source", json!("a.pdf")), ("page_number", json!(3))]);
        let keys = metadata.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["page_number", "source"]);
    }

    #[test]
    fn test_get_str_renders_scalars() {
        let metadata = Metadata::from([("page_number", json!(3)), ("source", json!("a.pdf"))]);
        assert_eq!(metadata.get_str("page_number").as_deref(), Some("3"));
        assert_eq!(metadata.get_str("source").as_deref(), Some("a.pdf"));
        assert_eq!(metadata.get_str("missing"), None);
    }

    #[test]
    fn test_serializes_as_flat_map() {
        let metadata = Metadata::from([("row", 1)]);
        assert_eq!(serde_json::to_value(&metadata).unwrap(), json!({"row": 1}));

        let back: Metadata = serde_json::from_value(json!({"row": 1})).unwrap();
        assert_eq!(back, metadata);
    }
}
