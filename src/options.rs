//! Request descriptor construction.
//!
//! Maps method + data into a wire-level request shape: query string for
//! GET, JSON body for attachment-free mutating calls, multipart field
//! list otherwise.

use http::{HeaderMap, HeaderValue, Method};
use url::Url;

use crate::payload::{self, EncodedField, EncodedPayload};
use crate::progress::ProgressCallback;
use crate::data::RequestData;

/// Wire-level request shape consumed by the dispatcher. Created fresh
/// per call.
#[derive(Debug)]
pub struct RequestDescriptor {
    /// HTTP method.
    pub method: Method,
    /// Fully resolved URL, query not yet applied.
    pub url: Url,
    /// Merged headers (defaults + per-call overrides).
    pub headers: HeaderMap,
    /// Credentials mode carried for transports that distinguish it.
    pub with_credentials: bool,
    /// Query pairs in bracket notation; only populated for GET.
    pub query: Vec<(String, String)>,
    /// Request body.
    pub body: RequestBody,
    /// Per-call timeout override.
    pub timeout: Option<std::time::Duration>,
    /// Upload progress callback; present only for multipart bodies.
    pub on_progress: Option<ProgressCallback>,
}

/// Body selected by the encoding policy.
#[derive(Debug)]
pub enum RequestBody {
    /// No body.
    None,
    /// JSON-serialized request data.
    Json(Vec<u8>),
    /// Multipart field list; the transport sets the boundary.
    Multipart(Vec<EncodedField>),
}

/// Build a request descriptor from a method, merged options, and data.
///
/// GET never carries a body: data is flattened into bracket-notation
/// query pairs. Mutating verbs carry a JSON body unless an attachment
/// forces multipart; absent data falls back to an empty body marked
/// `application/x-www-form-urlencoded` for servers that expect a body
/// content type on mutating verbs. An explicit Content-Type override
/// survives, except that multipart always clears it so the transport
/// can set the boundary.
pub fn build_descriptor(
    method: Method,
    url: Url,
    mut headers: HeaderMap,
    with_credentials: bool,
    data: Option<&RequestData>,
    timeout: Option<std::time::Duration>,
    on_progress: Option<ProgressCallback>,
) -> RequestDescriptor {
    if method == Method::GET {
        let query = payload::encode(data).map(query_pairs).unwrap_or_default();
        return RequestDescriptor {
            method,
            url,
            headers,
            with_credentials,
            query,
            body: RequestBody::None,
            timeout,
            on_progress: None,
        };
    }

    let Some(data) = data else {
        headers
            .entry(http::header::CONTENT_TYPE)
            .or_insert(HeaderValue::from_static(
                "application/x-www-form-urlencoded",
            ));
        return RequestDescriptor {
            method,
            url,
            headers,
            with_credentials,
            query: Vec::new(),
            body: RequestBody::None,
            timeout,
            on_progress: None,
        };
    };

    let payload = payload::encode(Some(data)).unwrap_or_default();
    let body = if payload.has_attachment {
        // reqwest fills in the multipart boundary.
        headers.remove(http::header::CONTENT_TYPE);
        RequestBody::Multipart(payload.fields)
    } else {
        headers
            .entry(http::header::CONTENT_TYPE)
            .or_insert(HeaderValue::from_static("application/json"));
        let bytes = match serde_json::to_vec(data) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize JSON body");
                Vec::new()
            }
        };
        RequestBody::Json(bytes)
    };

    let on_progress = match body {
        RequestBody::Multipart(_) => on_progress,
        _ => None,
    };

    RequestDescriptor {
        method,
        url,
        headers,
        with_credentials,
        query: Vec::new(),
        body,
        timeout,
        on_progress,
    }
}

fn query_pairs(payload: EncodedPayload) -> Vec<(String, String)> {
    payload
        .fields
        .into_iter()
        .map(|field| (field.key, field.value.into_text_lossy()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Attachment;

    fn url() -> Url {
        Url::parse("https://api.example.com/users").unwrap()
    }

    fn content_type(descriptor: &RequestDescriptor) -> Option<&str> {
        descriptor
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_get_puts_data_in_query() {
        let data = RequestData::new().with("manager_id", vec![2]);
        let descriptor = build_descriptor(
            Method::GET,
            url(),
            HeaderMap::new(),
            false,
            Some(&data),
            None,
            None,
        );

        assert!(matches!(descriptor.body, RequestBody::None));
        assert_eq!(
            descriptor.query,
            vec![("manager_id[]".to_string(), "2".to_string())]
        );
        assert_eq!(content_type(&descriptor), None);
    }

    #[test]
    fn test_get_without_data_has_no_query() {
        let descriptor =
            build_descriptor(Method::GET, url(), HeaderMap::new(), false, None, None, None);
        assert!(descriptor.query.is_empty());
        assert!(matches!(descriptor.body, RequestBody::None));
    }

    #[test]
    fn test_post_serializes_json_body() {
        let data = RequestData::new().with("name", "paco");
        let descriptor = build_descriptor(
            Method::POST,
            url(),
            HeaderMap::new(),
            false,
            Some(&data),
            None,
            None,
        );

        assert_eq!(content_type(&descriptor), Some("application/json"));
        match descriptor.body {
            RequestBody::Json(bytes) => {
                assert_eq!(bytes, br#"{"name":"paco"}"#);
            }
            other => panic!("expected JSON body, got {other:?}"),
        }
    }

    #[test]
    fn test_post_without_data_marks_form_default() {
        let descriptor =
            build_descriptor(Method::POST, url(), HeaderMap::new(), false, None, None, None);

        assert!(matches!(descriptor.body, RequestBody::None));
        assert_eq!(
            content_type(&descriptor),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn test_attachment_routes_to_multipart() {
        let data = RequestData::new()
            .with("name", "paco")
            .with("avatar", Attachment::bytes("lol.png", "image/png", vec![1u8]));
        let descriptor = build_descriptor(
            Method::POST,
            url(),
            HeaderMap::new(),
            false,
            Some(&data),
            None,
            None,
        );

        match &descriptor.body {
            RequestBody::Multipart(fields) => assert_eq!(fields.len(), 2),
            other => panic!("expected multipart body, got {other:?}"),
        }
        // Boundary comes from the transport.
        assert_eq!(content_type(&descriptor), None);
    }

    #[test]
    fn test_content_type_override_survives_for_json() {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/vnd.api+json"),
        );
        let data = RequestData::new().with("name", "paco");
        let descriptor = build_descriptor(
            Method::POST,
            url(),
            headers,
            false,
            Some(&data),
            None,
            None,
        );

        assert_eq!(content_type(&descriptor), Some("application/vnd.api+json"));
    }

    #[test]
    fn test_content_type_override_cleared_for_multipart() {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        let data =
            RequestData::new().with("avatar", Attachment::bytes("a.png", "image/png", vec![1u8]));
        let descriptor = build_descriptor(
            Method::POST,
            url(),
            headers,
            false,
            Some(&data),
            None,
            None,
        );

        assert_eq!(content_type(&descriptor), None);
    }

    #[test]
    fn test_progress_only_for_multipart() {
        let data = RequestData::new().with("name", "paco");
        let descriptor = build_descriptor(
            Method::POST,
            url(),
            HeaderMap::new(),
            false,
            Some(&data),
            None,
            Some(ProgressCallback::new(|_| {})),
        );
        assert!(descriptor.on_progress.is_none());

        let data =
            RequestData::new().with("avatar", Attachment::bytes("a.png", "image/png", vec![1u8]));
        let descriptor = build_descriptor(
            Method::POST,
            url(),
            HeaderMap::new(),
            false,
            Some(&data),
            None,
            Some(ProgressCallback::new(|_| {})),
        );
        assert!(descriptor.on_progress.is_some());
    }

    #[test]
    fn test_get_never_reports_progress() {
        let data = RequestData::new().with("q", "x");
        let descriptor = build_descriptor(
            Method::GET,
            url(),
            HeaderMap::new(),
            false,
            Some(&data),
            None,
            Some(ProgressCallback::new(|_| {})),
        );
        assert!(descriptor.on_progress.is_none());
    }

    #[test]
    fn test_delete_carries_json_body() {
        let data = RequestData::new().with("name", "paco");
        let descriptor = build_descriptor(
            Method::DELETE,
            url(),
            HeaderMap::new(),
            false,
            Some(&data),
            None,
            None,
        );

        assert_eq!(content_type(&descriptor), Some("application/json"));
        assert!(matches!(descriptor.body, RequestBody::Json(_)));
    }

    #[test]
    fn test_nested_objects_in_get_query() {
        let data = RequestData::new().with(
            "filters",
            crate::data::FieldValue::Array(vec![crate::data::FieldValue::Object(vec![(
                "name".to_string(),
                "paco".into(),
            )])]),
        );
        let descriptor = build_descriptor(
            Method::GET,
            url(),
            HeaderMap::new(),
            false,
            Some(&data),
            None,
            None,
        );

        assert_eq!(
            descriptor.query,
            vec![("filters[0][name]".to_string(), "paco".to_string())]
        );
    }
}
