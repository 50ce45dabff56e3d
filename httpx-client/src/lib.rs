//! # httpx client
//!
//! A fluent builder for outbound HTTP requests, with replayable bodies,
//! multipart encoding and bounded retry.
//!
//! ## Features
//!
//! - **Sticky errors**: configuration calls chain without intermediate
//!   checks; the first failure is reported by the terminal call
//! - **Replayable bodies**: in-memory bodies are snapshotted so every retry
//!   sends the same bytes
//! - **Multipart**: mixed text and file fields encoded into one body
//! - **Retry**: a fixed number of immediate attempts, no backoff
//! - **Pluggable transport**: reqwest by default, any [`Transport`] on demand
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use httpx_client::RequestBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let response = RequestBuilder::new("https://api.example.com/users")
//!         .add_query("page", "2")
//!         .retry(3)
//!         .send()?;
//!
//!     println!("Status: {}", response.status());
//!     Ok(())
//! }
//! ```
//!
//! ## Building without sending
//!
//! ```rust
//! use httpx_client::{Context, MultipartForm, RequestBuilder};
//!
//! let form = MultipartForm::new().text("title", "report");
//! let ctx = Context::background().with_value("request-id", "abc123");
//!
//! let request = RequestBuilder::new("http://localhost/upload")
//!     .post()
//!     .multipart_form(&form)
//!     .build_with_context(ctx)
//!     .unwrap();
//!
//! assert!(request.header("content-type").unwrap().starts_with("multipart/form-data"));
//! assert_eq!(request.context().value::<&str>("request-id"), Some(&"abc123"));
//! ```

mod body;
mod builder;
mod client;
mod config;
mod context;
mod error;
mod form;
pub mod multipart;
mod request;
mod response;
mod retry;
mod transport;

pub use body::{Body, BodySource, Replay, materialize};
pub use builder::RequestBuilder;
pub use client::ReqwestTransport;
pub use config::{DEFAULT_TIMEOUT, TransportConfig, TransportConfigBuilder};
pub use context::{CancelHandle, Context};
pub use error::{ConfigError, HttpxError, Result, TransportError};
pub use form::FormValues;
pub use multipart::{FilePart, FileSource, MultipartForm};
pub use request::Request;
pub use response::Response;
pub use retry::RetryPolicy;
pub use transport::Transport;

// Re-export common types
pub use bytes::{Bytes, BytesMut};
pub use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
pub use url::Url;

/// Prelude for common imports.
///
/// ```
/// use httpx_client::prelude::*;
/// ```
pub mod prelude {
    pub use crate::body::{Body, BodySource};
    pub use crate::builder::RequestBuilder;
    pub use crate::context::Context;
    pub use crate::error::{ConfigError, HttpxError, Result, TransportError};
    pub use crate::form::FormValues;
    pub use crate::multipart::{FilePart, MultipartForm};
    pub use crate::request::Request;
    pub use crate::response::Response;
    pub use crate::transport::Transport;
    pub use http::{HeaderMap, Method, StatusCode, header};
}
