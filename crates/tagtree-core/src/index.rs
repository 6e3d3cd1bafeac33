//! The raw resource index as loaded from JSON.
//!
//! A [`RawIndex`] maps resource keys to [`Record`]s in document order. It
//! carries no logic beyond lookup; everything derived from it lives in
//! [`Registry`](crate::Registry).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Attribute value of a resource record.
///
/// A key reference is a [`AttrValue::Text`] naming another record; it is only
/// interpreted as such through [`AttrValue::as_key_ref`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<AttrValue>),
    Map(IndexMap<String, AttrValue>),
}

impl AttrValue {
    /// The string content, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Resolve this value as a reference to a record in `index`.
    pub fn as_key_ref<'a>(&'a self, index: &RawIndex) -> Option<&'a str> {
        self.as_str().filter(|key| index.contains_key(key))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Look up a member of a nested object (e.g. `links.github.url`).
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        match self {
            Self::Map(map) => map.get(name),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

/// One resource in the index: its parent tags plus arbitrary attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Keys of the parents of this record. Empty for roots.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Every other member of the JSON object, in document order.
    #[serde(flatten)]
    pub attributes: IndexMap<String, AttrValue>,
}

impl Record {
    /// Create a record with the given parent tags and no attributes.
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            attributes: IndexMap::new(),
        }
    }

    /// Add an attribute.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Display name, if the record carries a textual `name` attribute.
    pub fn name(&self) -> Option<&str> {
        self.attributes.get("name").and_then(AttrValue::as_str)
    }
}

/// The unprocessed mapping of resource key to record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawIndex {
    records: IndexMap<String, Record>,
}

impl RawIndex {
    /// Parse an index from a JSON object of records.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Parse an index from raw JSON bytes.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.records.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Keys in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Records in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.records.iter().map(|(k, r)| (k.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Record)> for RawIndex {
    fn from_iter<T: IntoIterator<Item = (K, Record)>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().map(|(k, r)| (k.into(), r)).collect(),
        }
    }
}
