//! Upload progress reporting.
//!
//! Multipart attachment content is streamed in fixed-size chunks; each
//! chunk advances a shared counter and the callback receives an integer
//! percentage. Only multipart bodies report progress.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use bytes::Bytes;

/// Chunk size for streamed attachment content.
pub(crate) const CHUNK_SIZE: usize = 64 * 1024;

/// Callback invoked with an integer percentage in `0..=100`.
#[derive(Clone)]
pub struct ProgressCallback(Arc<dyn Fn(u8) + Send + Sync>);

impl ProgressCallback {
    /// Wrap a closure.
    pub fn new(f: impl Fn(u8) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub(crate) fn call(&self, percent: u8) {
        (self.0)(percent);
    }
}

impl fmt::Debug for ProgressCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProgressCallback")
    }
}

impl<F: Fn(u8) + Send + Sync + 'static> From<F> for ProgressCallback {
    fn from(f: F) -> Self {
        Self::new(f)
    }
}

/// Shared upload counter; invokes the callback when the percentage moves.
pub(crate) struct ProgressTracker {
    total: u64,
    loaded: AtomicU64,
    last: AtomicU8,
    callback: ProgressCallback,
}

impl ProgressTracker {
    pub(crate) fn new(total: u64, callback: ProgressCallback) -> Self {
        Self {
            total,
            loaded: AtomicU64::new(0),
            // Sentinel above any percentage so the first report fires.
            last: AtomicU8::new(u8::MAX),
            callback,
        }
    }

    pub(crate) fn record(&self, n: usize) {
        let loaded = self.loaded.fetch_add(n as u64, Ordering::Relaxed) + n as u64;
        let percent = percent(loaded, self.total);
        if self.last.swap(percent, Ordering::Relaxed) != percent {
            self.callback.call(percent);
        }
    }
}

/// `ceil(loaded / total * 100)`, clamped to 100; an unknown/zero total
/// reports 100.
pub(crate) fn percent(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    loaded.saturating_mul(100).div_ceil(total).min(100) as u8
}

/// Wrap attachment content in a body that reports progress as chunks are
/// pulled by the transport.
pub(crate) fn tracked_body(bytes: Bytes, tracker: Arc<ProgressTracker>) -> reqwest::Body {
    let mut chunks: Vec<Bytes> = Vec::with_capacity(bytes.len().div_ceil(CHUNK_SIZE).max(1));
    let mut offset = 0;
    while offset < bytes.len() {
        let end = (offset + CHUNK_SIZE).min(bytes.len());
        chunks.push(bytes.slice(offset..end));
        offset = end;
    }
    if chunks.is_empty() {
        // Zero-length content still reports once.
        chunks.push(Bytes::new());
    }

    let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
        tracker.record(chunk.len());
        Ok::<Bytes, std::convert::Infallible>(chunk)
    }));
    reqwest::Body::wrap_stream(stream)
}
