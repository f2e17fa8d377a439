//! Request data model.
//!
//! Attribute values are an explicit tagged enum rather than duck-typed
//! shapes: attachments are declared as [`Attachment`] variants at the
//! point the data is built, never inferred from field names.

use bytes::Bytes;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A file-like value carried in a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Attachment {
    /// In-memory binary content.
    Bytes {
        /// File name reported to the server.
        file_name: String,
        /// MIME type of the content.
        content_type: String,
        /// The content itself.
        bytes: Bytes,
    },
    /// A `{uri, name, type}` descriptor referencing external content.
    /// Its uri is transmitted as the part content in multipart bodies.
    Descriptor {
        /// Location of the content.
        uri: String,
        /// File name reported to the server.
        file_name: String,
        /// MIME type of the content.
        content_type: String,
    },
}

impl Attachment {
    /// Create an in-memory attachment.
    pub fn bytes(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self::Bytes {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Create a descriptor attachment from `uri`, `name`, `type` parts.
    pub fn descriptor(
        uri: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self::Descriptor {
            uri: uri.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
        }
    }

    /// File name reported to the server.
    pub fn file_name(&self) -> &str {
        match self {
            Self::Bytes { file_name, .. } | Self::Descriptor { file_name, .. } => file_name,
        }
    }

    /// MIME type of the content.
    pub fn content_type(&self) -> &str {
        match self {
            Self::Bytes { content_type, .. } | Self::Descriptor { content_type, .. } => {
                content_type
            }
        }
    }

    /// Length in bytes of the content as transmitted in a multipart part.
    pub fn content_len(&self) -> u64 {
        match self {
            Self::Bytes { bytes, .. } => bytes.len() as u64,
            Self::Descriptor { uri, .. } => uri.len() as u64,
        }
    }
}

impl Serialize for Attachment {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Bytes {
                file_name,
                content_type,
                ..
            } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("name", file_name)?;
                map.serialize_entry("type", content_type)?;
                map.end()
            }
            Self::Descriptor {
                uri,
                file_name,
                content_type,
            } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("uri", uri)?;
                map.serialize_entry("name", file_name)?;
                map.serialize_entry("type", content_type)?;
                map.end()
            }
        }
    }
}

/// One attribute value in [`RequestData`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Absent value; contributes no encoded field.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Floating-point scalar.
    Float(f64),
    /// String scalar.
    String(String),
    /// File-like value; forces multipart encoding for the whole call.
    Attachment(Attachment),
    /// Ordered sequence of values.
    Array(Vec<FieldValue>),
    /// Plain object, insertion-ordered.
    Object(Vec<(String, FieldValue)>),
}

impl FieldValue {
    /// Render this value as field text: scalars via `Display`, structured
    /// values as their compact JSON.
    pub(crate) fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => s.clone(),
            Self::Attachment(a) => a.file_name().to_string(),
            Self::Array(_) | Self::Object(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
            Self::Attachment(a) => a.serialize(serializer),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Attachment> for FieldValue {
    fn from(v: Attachment) -> Self {
        Self::Attachment(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(v: Vec<T>) -> Self {
        Self::Array(v.into_iter().map(Into::into).collect())
    }
}

/// Insertion-ordered request data.
///
/// Order is significant and preserved end-to-end: JSON body keys,
/// multipart fields, and query pairs all follow insertion order.
/// Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestData {
    entries: Vec<(String, FieldValue)>,
}

impl RequestData {
    /// Create empty request data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, preserving the position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Get an attribute value.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate attributes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Serialize for RequestData {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for RequestData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut data = Self::new();
        for (key, value) in iter {
            data.insert(key, value);
        }
        data
    }
}
