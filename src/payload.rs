//! Payload encoder.
//!
//! Flattens [`RequestData`] into an ordered field list and detects
//! attachments. Field order matches input iteration order exactly; the
//! downstream wire format depends on it.

use crate::data::{Attachment, FieldValue, RequestData};

/// One flattened field.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedField {
    /// Field key, in bracket notation for array-derived fields.
    pub key: String,
    /// Field content.
    pub value: EncodedValue,
}

/// Content of a flattened field.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedValue {
    /// Plain text content.
    Text(String),
    /// File-like content.
    Attachment(Attachment),
}

impl EncodedValue {
    /// Degrade to text: attachments collapse to their uri (descriptor)
    /// or file name (bytes). Used when fields land in a query string.
    pub fn into_text_lossy(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Attachment(Attachment::Descriptor { uri, .. }) => uri,
            Self::Attachment(Attachment::Bytes { file_name, .. }) => file_name,
        }
    }
}

/// Result of flattening one [`RequestData`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedPayload {
    /// True when any attachment appears anywhere in the input; forces
    /// multipart encoding for the whole call.
    pub has_attachment: bool,
    /// Flattened fields in input order.
    pub fields: Vec<EncodedField>,
}

/// Total content length of all attachment fields, in bytes.
pub(crate) fn attachment_total(fields: &[EncodedField]) -> u64 {
    fields
        .iter()
        .map(|field| match &field.value {
            EncodedValue::Attachment(att) => att.content_len(),
            EncodedValue::Text(_) => 0,
        })
        .sum()
}

/// Flatten request data into an ordered field list.
///
/// Returns `None` for absent data. Iterates attributes in insertion
/// order:
///
/// - scalar: one `(attr, text)` field
/// - array: per element, a plain object flattens one level to
///   `(attr[i][subkey], value)`; anything else becomes `(attr[], value)`
/// - null: no field (distinct from an empty string)
/// - attachment: one `(attr, attachment)` field, flags the payload
///
/// Top-level objects are not expanded; they pass through as one field
/// carrying their compact JSON. Object flattening does not recurse:
/// structure nested deeper than one level inside an array renders as
/// JSON text.
pub fn encode(data: Option<&RequestData>) -> Option<EncodedPayload> {
    let data = data?;
    let mut payload = EncodedPayload::default();

    for (attr, value) in data.iter() {
        match value {
            FieldValue::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    if let FieldValue::Object(entries) = item {
                        for (prop, sub) in entries {
                            emit(&mut payload, format!("{attr}[{index}][{prop}]"), sub);
                        }
                    } else {
                        emit(&mut payload, format!("{attr}[]"), item);
                    }
                }
            }
            other => emit(&mut payload, attr.to_string(), other),
        }
    }

    Some(payload)
}

fn emit(payload: &mut EncodedPayload, key: String, value: &FieldValue) {
    let value = match value {
        FieldValue::Null => return,
        FieldValue::Attachment(att) => {
            payload.has_attachment = true;
            EncodedValue::Attachment(att.clone())
        }
        other => EncodedValue::Text(other.to_text()),
    };
    payload.fields.push(EncodedField { key, value });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_fields(payload: &EncodedPayload) -> Vec<(&str, &str)> {
        payload
            .fields
            .iter()
            .map(|f| match &f.value {
                EncodedValue::Text(t) => (f.key.as_str(), t.as_str()),
                EncodedValue::Attachment(a) => (f.key.as_str(), a.file_name()),
            })
            .collect()
    }

    #[test]
    fn test_absent_data_is_none() {
        assert!(encode(None).is_none());
    }

    #[test]
    fn test_empty_data_yields_no_fields() {
        let payload = encode(Some(&RequestData::new())).unwrap();
        assert!(!payload.has_attachment);
        assert!(payload.fields.is_empty());
    }

    #[test]
    fn test_scalars_in_input_order() {
        let data = RequestData::new()
            .with("name", "paco")
            .with("age", 30)
            .with("admin", false);

        let payload = encode(Some(&data)).unwrap();
        assert_eq!(
            text_fields(&payload),
            vec![("name", "paco"), ("age", "30"), ("admin", "false")]
        );
    }

    #[test]
    fn test_array_of_scalars_uses_empty_brackets() {
        let data = RequestData::new().with("a", vec![1, 2]);

        let payload = encode(Some(&data)).unwrap();
        assert_eq!(text_fields(&payload), vec![("a[]", "1"), ("a[]", "2")]);
    }

    #[test]
    fn test_array_of_objects_flattens_one_level() {
        let data = RequestData::new().with(
            "a",
            FieldValue::Array(vec![
                FieldValue::Object(vec![("x".to_string(), 1.into())]),
                FieldValue::Object(vec![("x".to_string(), 2.into())]),
            ]),
        );

        let payload = encode(Some(&data)).unwrap();
        assert_eq!(
            text_fields(&payload),
            vec![("a[0][x]", "1"), ("a[1][x]", "2")]
        );
    }

    #[test]
    fn test_null_attribute_contributes_no_field() {
        let data = RequestData::new()
            .with("a", FieldValue::Null)
            .with("b", "")
            .with("c", 1);

        let payload = encode(Some(&data)).unwrap();
        // Empty string is a real field; null is not.
        assert_eq!(text_fields(&payload), vec![("b", ""), ("c", "1")]);
    }

    #[test]
    fn test_null_inside_arrays_and_objects_is_skipped() {
        let data = RequestData::new().with(
            "a",
            FieldValue::Array(vec![
                FieldValue::Null,
                FieldValue::Int(1),
                FieldValue::Object(vec![
                    ("x".to_string(), FieldValue::Null),
                    ("y".to_string(), 2.into()),
                ]),
            ]),
        );

        let payload = encode(Some(&data)).unwrap();
        assert_eq!(text_fields(&payload), vec![("a[]", "1"), ("a[2][y]", "2")]);
    }

    #[test]
    fn test_attachment_sets_flag() {
        let data = RequestData::new()
            .with("name", "paco")
            .with("avatar", Attachment::bytes("lol.png", "image/png", vec![1u8, 2]));

        let payload = encode(Some(&data)).unwrap();
        assert!(payload.has_attachment);
        assert_eq!(payload.fields.len(), 2);
        assert_eq!(payload.fields[1].key, "avatar");
        assert!(matches!(
            payload.fields[1].value,
            EncodedValue::Attachment(_)
        ));
    }

    #[test]
    fn test_attachment_inside_array_sets_flag() {
        let data = RequestData::new().with(
            "files",
            vec![FieldValue::Attachment(Attachment::bytes(
                "filename",
                "application/octet-stream",
                Vec::new(),
            ))],
        );

        let payload = encode(Some(&data)).unwrap();
        assert!(payload.has_attachment);
        assert_eq!(payload.fields[0].key, "files[]");
    }

    #[test]
    fn test_mixed_objects_and_files_keep_input_order() {
        let data = RequestData::new()
            .with(
                "objectArray",
                FieldValue::Array(vec![
                    FieldValue::Object(vec![("foo".to_string(), "bar".into())]),
                    FieldValue::Object(vec![("foo".to_string(), "baz".into())]),
                ]),
            )
            .with(
                "files",
                vec![FieldValue::Attachment(Attachment::bytes(
                    "filename",
                    "application/octet-stream",
                    Vec::new(),
                ))],
            );

        let payload = encode(Some(&data)).unwrap();
        assert!(payload.has_attachment);
        let keys: Vec<&str> = payload.fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["objectArray[0][foo]", "objectArray[1][foo]", "files[]"]
        );
    }

    #[test]
    fn test_top_level_object_passes_through_as_json_text() {
        let data = RequestData::new().with(
            "meta",
            FieldValue::Object(vec![("k".to_string(), "v".into())]),
        );

        let payload = encode(Some(&data)).unwrap();
        assert_eq!(text_fields(&payload), vec![("meta", r#"{"k":"v"}"#)]);
    }

    #[test]
    fn test_deep_nesting_renders_as_json_text() {
        let data = RequestData::new().with(
            "a",
            FieldValue::Array(vec![FieldValue::Object(vec![(
                "inner".to_string(),
                FieldValue::Array(vec![1.into(), 2.into()]),
            )])]),
        );

        let payload = encode(Some(&data)).unwrap();
        assert_eq!(text_fields(&payload), vec![("a[0][inner]", "[1,2]")]);
    }

    #[test]
    fn test_attachment_total() {
        let data = RequestData::new()
            .with("note", "hi")
            .with("a", Attachment::bytes("a.bin", "application/octet-stream", vec![0u8; 10]))
            .with("b", Attachment::descriptor("abc", "b.bin", "application/octet-stream"));

        let payload = encode(Some(&data)).unwrap();
        assert_eq!(attachment_total(&payload.fields), 13);
    }

    #[test]
    fn test_deterministic_for_same_input() {
        let data = RequestData::new()
            .with("a", vec![1, 2])
            .with("b", "x");

        assert_eq!(encode(Some(&data)), encode(Some(&data)));
    }
}
