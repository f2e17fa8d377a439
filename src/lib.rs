//! # restwire
//!
//! Payload encoding and cancellable request dispatch for JSON/multipart
//! REST APIs.
//!
//! ## Features
//!
//! - **Ordered payload encoding**: nested data flattens to a
//!   deterministic, insertion-ordered field list with bracket notation
//!   (`a[]`, `a[0][x]`)
//! - **Body selection**: query string for GET, JSON for plain data,
//!   multipart as soon as any attachment appears anywhere in the payload
//! - **Cancellable dispatch**: every call returns a handle that can be
//!   cancelled or awaited directly
//! - **Normalized errors**: server `errors` payloads, raw status
//!   failures, and transport failures each map to a distinct variant
//! - **Upload progress**: integer percentage callbacks for multipart
//!   bodies
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use restwire::{Adapter, AdapterConfig, RequestData};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = Adapter::new(
//!         AdapterConfig::builder()
//!             .base_path("https://api.example.com/v1")
//!             .default_header("X-Client", "restwire")
//!             .build(),
//!     );
//!
//!     let data = RequestData::new().with("name", "paco");
//!     let user = adapter.post("/users", data).await?;
//!
//!     println!("created: {user}");
//!     Ok(())
//! }
//! ```
//!
//! ## Cancellation
//!
//! ```rust,no_run
//! use restwire::{Adapter, AdapterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = Adapter::new(AdapterConfig::default());
//!
//!     let handle = adapter.get("https://api.example.com/slow", None);
//!     handle.cancel();
//!
//!     // A cancelled request settles with the empty value.
//!     assert!(handle.await?.is_null());
//!     Ok(())
//! }
//! ```

mod adapter;
mod config;
mod data;
mod dispatch;
mod error;
mod options;
mod payload;
mod progress;

pub use adapter::{Adapter, CallOptions};
pub use config::{AdapterConfig, AdapterConfigBuilder};
pub use data::{Attachment, FieldValue, RequestData};
pub use dispatch::{Dispatcher, RequestHandle};
pub use error::{AdapterError, Result};
pub use options::{RequestBody, RequestDescriptor, build_descriptor};
pub use payload::{EncodedField, EncodedPayload, EncodedValue, encode};
pub use progress::ProgressCallback;

// Re-export common types
pub use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
pub use serde_json::Value;
pub use url::Url;

/// Prelude for common imports.
///
/// ```
/// use restwire::prelude::*;
/// ```
pub mod prelude {
    pub use crate::adapter::{Adapter, CallOptions};
    pub use crate::config::{AdapterConfig, AdapterConfigBuilder};
    pub use crate::data::{Attachment, FieldValue, RequestData};
    pub use crate::dispatch::{Dispatcher, RequestHandle};
    pub use crate::error::{AdapterError, Result};
    pub use crate::progress::ProgressCallback;
    pub use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
}
