//! Public adapter: one operation per HTTP verb.
//!
//! Merges configured defaults with per-call overrides, resolves the full
//! URL from the base path, and delegates to the options builder and the
//! dispatcher.

use std::sync::Arc;

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use tracing::warn;
use url::Url;

use crate::config::AdapterConfig;
use crate::data::RequestData;
use crate::dispatch::{Dispatcher, RequestHandle};
use crate::error::AdapterError;
use crate::options;
use crate::progress::ProgressCallback;

/// Per-call overrides merged over the adapter defaults. Shallow merge,
/// key by key; the per-call value wins.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    headers: Vec<(String, String)>,
    with_credentials: Option<bool>,
    timeout: Option<std::time::Duration>,
    on_progress: Option<ProgressCallback>,
}

impl CallOptions {
    /// Create empty call options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override or add a header for this call.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Override the credentials mode for this call.
    pub fn with_credentials(mut self, enable: bool) -> Self {
        self.with_credentials = Some(enable);
        self
    }

    /// Override the timeout for this call.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Receive upload progress as an integer percentage. Only invoked
    /// when the call carries a multipart body.
    pub fn on_progress(mut self, f: impl Fn(u8) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(ProgressCallback::new(f));
        self
    }
}

/// REST adapter over a fixed configuration.
///
/// Every operation issues exactly one request and returns a
/// [`RequestHandle`]; awaiting the handle yields the decoded response
/// body.
#[derive(Debug, Clone)]
pub struct Adapter {
    config: Arc<AdapterConfig>,
    dispatcher: Dispatcher,
}

impl Adapter {
    /// Create an adapter from its configuration.
    pub fn new(config: AdapterConfig) -> Self {
        let dispatcher = Dispatcher::new(&config);
        Self {
            config: Arc::new(config),
            dispatcher,
        }
    }

    /// Get the adapter configuration.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Retrieve a resource. Data is serialized into the query string.
    pub fn get(&self, path: &str, data: impl Into<Option<RequestData>>) -> RequestHandle {
        self.request(Method::GET, path, data, CallOptions::default())
    }

    /// [`get`](Self::get) with per-call options.
    pub fn get_with(
        &self,
        path: &str,
        data: impl Into<Option<RequestData>>,
        options: CallOptions,
    ) -> RequestHandle {
        self.request(Method::GET, path, data, options)
    }

    /// Create a resource.
    pub fn post(&self, path: &str, data: impl Into<Option<RequestData>>) -> RequestHandle {
        self.request(Method::POST, path, data, CallOptions::default())
    }

    /// [`post`](Self::post) with per-call options.
    pub fn post_with(
        &self,
        path: &str,
        data: impl Into<Option<RequestData>>,
        options: CallOptions,
    ) -> RequestHandle {
        self.request(Method::POST, path, data, options)
    }

    /// Replace a resource.
    pub fn put(&self, path: &str, data: impl Into<Option<RequestData>>) -> RequestHandle {
        self.request(Method::PUT, path, data, CallOptions::default())
    }

    /// [`put`](Self::put) with per-call options.
    pub fn put_with(
        &self,
        path: &str,
        data: impl Into<Option<RequestData>>,
        options: CallOptions,
    ) -> RequestHandle {
        self.request(Method::PUT, path, data, options)
    }

    /// Partially update a resource.
    pub fn patch(&self, path: &str, data: impl Into<Option<RequestData>>) -> RequestHandle {
        self.request(Method::PATCH, path, data, CallOptions::default())
    }

    /// [`patch`](Self::patch) with per-call options.
    pub fn patch_with(
        &self,
        path: &str,
        data: impl Into<Option<RequestData>>,
        options: CallOptions,
    ) -> RequestHandle {
        self.request(Method::PATCH, path, data, options)
    }

    /// Remove a resource.
    pub fn delete(&self, path: &str, data: impl Into<Option<RequestData>>) -> RequestHandle {
        self.request(Method::DELETE, path, data, CallOptions::default())
    }

    /// [`delete`](Self::delete) with per-call options.
    pub fn delete_with(
        &self,
        path: &str,
        data: impl Into<Option<RequestData>>,
        options: CallOptions,
    ) -> RequestHandle {
        self.request(Method::DELETE, path, data, options)
    }

    /// Issue a request with an explicit method.
    pub fn request(
        &self,
        method: Method,
        path: &str,
        data: impl Into<Option<RequestData>>,
        options: CallOptions,
    ) -> RequestHandle {
        let raw = format!("{}{}", self.config.base_path, path);
        let url = match Url::parse(&raw) {
            Ok(url) => url,
            Err(e) => {
                return Dispatcher::rejected(AdapterError::InvalidUrl(format!("{raw}: {e}")));
            }
        };

        let data = data.into();
        let headers = self.merged_headers(&options);
        let with_credentials = options
            .with_credentials
            .unwrap_or(self.config.with_credentials);

        let descriptor = options::build_descriptor(
            method,
            url,
            headers,
            with_credentials,
            data.as_ref(),
            options.timeout,
            options.on_progress,
        );
        self.dispatcher.dispatch(descriptor)
    }

    fn merged_headers(&self, options: &CallOptions) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.config.default_headers {
            insert_header(&mut headers, name, value);
        }
        for (name, value) in &options.headers {
            insert_header(&mut headers, name, value);
        }
        headers
    }
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) {
    if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
        headers.insert(name, value);
    } else {
        warn!(header = name, "skipping invalid header");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> Adapter {
        Adapter::new(
            AdapterConfig::builder()
                .base_path("https://api.example.com/api")
                .default_header("SomeHeader", "test")
                .with_credentials(true)
                .build(),
        )
    }

    #[test]
    fn test_merged_headers_defaults_apply() {
        let headers = adapter().merged_headers(&CallOptions::default());
        assert_eq!(headers.get("SomeHeader").unwrap(), "test");
    }

    #[test]
    fn test_merged_headers_per_call_wins() {
        let options = CallOptions::new()
            .header("SomeHeader", "override")
            .header("Extra", "1");
        let headers = adapter().merged_headers(&options);
        assert_eq!(headers.get("SomeHeader").unwrap(), "override");
        assert_eq!(headers.get("Extra").unwrap(), "1");
    }

    #[test]
    fn test_invalid_headers_are_skipped() {
        let options = CallOptions::new().header("bad\nname", "x");
        let headers = adapter().merged_headers(&options);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("SomeHeader").unwrap(), "test");
    }

    #[tokio::test]
    async fn test_invalid_url_rejects_through_the_future() {
        let adapter = Adapter::new(AdapterConfig::default());
        let handle = adapter.get("not a url", None);
        let err = handle.await.unwrap_err();
        assert!(matches!(err, AdapterError::InvalidUrl(_)));
    }
}
