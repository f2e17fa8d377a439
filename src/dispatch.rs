//! Transport dispatcher.
//!
//! Issues exactly one request per descriptor and returns a cancellable
//! handle synchronously, before the network call settles. Transport and
//! server errors are normalized into [`AdapterError`].

use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::{AbortHandle, BoxFuture};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::AdapterConfig;
use crate::error::{AdapterError, Result};
use crate::options::{RequestBody, RequestDescriptor};
use crate::payload::{self, EncodedField, EncodedValue};
use crate::progress::{self, ProgressCallback, ProgressTracker};
use crate::data::Attachment;

/// Dispatches request descriptors over a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
}

impl Dispatcher {
    /// Build a dispatcher from the adapter configuration.
    pub fn new(config: &AdapterConfig) -> Self {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .cookie_store(config.with_credentials);

        if config.gzip {
            builder = builder.gzip(true);
        }
        if config.brotli {
            builder = builder.brotli(true);
        }
        if config.follow_redirects {
            builder = builder.redirect(reqwest::redirect::Policy::limited(config.max_redirects));
        } else {
            builder = builder.redirect(reqwest::redirect::Policy::none());
        }

        let client = builder.build().expect("Failed to build HTTP client");

        Self { client }
    }

    /// Issue one request immediately and return its handle.
    ///
    /// Must be called within a Tokio runtime: the in-flight request is
    /// spawned so it makes progress whether or not the handle is
    /// awaited.
    pub fn dispatch(&self, descriptor: RequestDescriptor) -> RequestHandle {
        debug!(method = %descriptor.method, url = %descriptor.url, "dispatching request");
        RequestHandle::spawn(execute(self.client.clone(), descriptor))
    }

    /// A handle whose result is already settled with an error.
    pub(crate) fn rejected(error: AdapterError) -> RequestHandle {
        RequestHandle::spawn(async move { Err(error) })
    }
}

/// A single in-flight request: cancellation plus the normalized result.
///
/// Awaiting the handle (it implements [`IntoFuture`]) yields the decoded
/// response body. Call sites that never cancel can treat it as a plain
/// future; the handle form and the future form are the same contract.
#[derive(Debug)]
pub struct RequestHandle {
    abort: AbortHandle,
    cancelled: AtomicBool,
    task: tokio::task::JoinHandle<Result<Value>>,
}

impl RequestHandle {
    fn spawn(fut: impl Future<Output = Result<Value>> + Send + 'static) -> Self {
        let (abortable, abort) = futures::future::abortable(fut);
        let task = tokio::spawn(async move {
            match abortable.await {
                Ok(result) => result,
                Err(_aborted) => {
                    debug!("request cancelled before settlement");
                    // Documented policy: a cancelled request settles
                    // successfully with the empty value.
                    Ok(Value::Null)
                }
            }
        });
        Self {
            abort,
            cancelled: AtomicBool::new(false),
            task,
        }
    }

    /// Request cancellation. Idempotent; a no-op once the result has
    /// settled. After cancellation the result can never resolve with
    /// response data received later.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            debug!("cancellation requested");
        }
        self.abort.abort();
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Await the normalized result.
    pub async fn result(self) -> Result<Value> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(AdapterError::Dispatch(e.to_string())),
        }
    }
}

impl IntoFuture for RequestHandle {
    type Output = Result<Value>;
    type IntoFuture = BoxFuture<'static, Result<Value>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.result())
    }
}

async fn execute(client: reqwest::Client, descriptor: RequestDescriptor) -> Result<Value> {
    let RequestDescriptor {
        method,
        mut url,
        headers,
        with_credentials,
        query,
        body,
        timeout,
        on_progress,
    } = descriptor;

    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &query {
            pairs.append_pair(key, value);
        }
    }
    trace!(with_credentials, "credentials mode");

    let mut request = client.request(method, url).headers(headers);
    match body {
        RequestBody::None => {}
        RequestBody::Json(bytes) => request = request.body(bytes),
        RequestBody::Multipart(fields) => {
            request = request.multipart(multipart_form(fields, on_progress)?);
        }
    }
    if let Some(timeout) = timeout {
        request = request.timeout(timeout);
    }

    let response = request.send().await?;
    decode_response(response).await
}

/// Normalize the response per the success/error contract.
async fn decode_response(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let bytes = response.bytes().await.unwrap_or_default();
    debug!(status = %status, "received response");

    if status.is_success() {
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        // Non-JSON success bodies surface as plain text.
        return Ok(serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned())));
    }

    if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(&bytes)
        && let Some(errors) = map.get("errors")
    {
        warn!(status = %status, "server rejected request");
        return Err(AdapterError::Api {
            status: status.as_u16(),
            errors: errors.clone(),
        });
    }

    warn!(status = %status, "server error with no errors field");
    Err(AdapterError::Status {
        status: status.as_u16(),
        body: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

/// Realize the encoded field list as a multipart form, wiring attachment
/// content through the progress tracker when a callback is present.
fn multipart_form(
    fields: Vec<EncodedField>,
    on_progress: Option<ProgressCallback>,
) -> Result<Form> {
    let total = payload::attachment_total(&fields);
    let tracker = on_progress.map(|callback| Arc::new(ProgressTracker::new(total, callback)));

    let mut form = Form::new();
    for field in fields {
        match field.value {
            EncodedValue::Text(text) => form = form.text(field.key, text),
            EncodedValue::Attachment(att) => {
                let file_name = att.file_name().to_string();
                let content_type = att.content_type().to_string();
                let content = match att {
                    Attachment::Bytes { bytes, .. } => bytes,
                    Attachment::Descriptor { uri, .. } => bytes::Bytes::from(uri.into_bytes()),
                };

                let part = match &tracker {
                    Some(tracker) => Part::stream_with_length(
                        progress::tracked_body(content.clone(), tracker.clone()),
                        content.len() as u64,
                    ),
                    None => Part::bytes(content.to_vec()),
                };
                let part = part
                    .file_name(file_name)
                    .mime_str(&content_type)
                    .map_err(|e| AdapterError::RequestBuild(e.to_string()))?;
                form = form.part(field.key, part);
            }
        }
    }
    Ok(form)
}
