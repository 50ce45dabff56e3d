//! Default transport backed by `reqwest`'s blocking client.

use http::{HeaderMap, HeaderName};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::{Request, Response, Transport, TransportConfig, TransportError};

static DEFAULT_TRANSPORT: OnceCell<ReqwestTransport> = OnceCell::new();

/// [`Transport`] that sends requests with a blocking reqwest client.
///
/// The request context is checked before sending: a cancelled context
/// fails with [`TransportError::Cancelled`], an expired one with
/// [`TransportError::DeadlineExceeded`], and a pending deadline caps the
/// request timeout. A request already in flight is not interrupted by
/// cancellation.
#[derive(Clone)]
pub struct ReqwestTransport {
    inner: reqwest::blocking::Client,
    config: Arc<TransportConfig>,
}

impl ReqwestTransport {
    /// Create a transport with the given configuration.
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let inner = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            inner,
            config: Arc::new(config),
        })
    }

    /// The process-wide transport used when a builder has none, created on
    /// first use with the default configuration.
    pub fn shared() -> Result<&'static ReqwestTransport, TransportError> {
        DEFAULT_TRANSPORT.get_or_try_init(|| {
            debug!("Creating default HTTP transport");
            Self::new(TransportConfig::default())
        })
    }

    /// Get the underlying reqwest client.
    pub fn inner(&self) -> &reqwest::blocking::Client {
        &self.inner
    }

    /// Get the transport configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: &mut Request) -> Result<Response, TransportError> {
        let context = request.context();
        if context.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        let mut timeout = self.config.timeout();
        let mut deadline_bound = false;
        if let Some(remaining) = context.remaining() {
            if remaining.is_zero() {
                return Err(TransportError::DeadlineExceeded);
            }
            if remaining < timeout {
                timeout = remaining;
                deadline_bound = true;
            }
        }

        let mut builder = self
            .inner
            .request(request.method().clone(), request.url().clone())
            .timeout(timeout);

        let headers = merged_headers(self.config.default_headers(), request.headers());
        trace!(headers = ?header_names(&headers), "Request headers");
        builder = builder.headers(headers);

        if let Some(body) = request.body_mut()
            && !body.is_empty()
        {
            let length = body.content_length();
            let stream = body.stream_for_attempt();
            builder = builder.body(match length {
                Some(length) => reqwest::blocking::Body::sized(stream, length),
                None => reqwest::blocking::Body::new(stream),
            });
        }

        let response = builder.send().map_err(|e| {
            if deadline_bound && e.is_timeout() {
                TransportError::DeadlineExceeded
            } else {
                TransportError::from(e)
            }
        })?;

        debug!(status = %response.status(), url = %response.url(), "Received HTTP response");
        Ok(Response::from_reqwest(response)?)
    }
}

/// Request headers plus every default the request does not set itself.
fn merged_headers(defaults: &HeaderMap, request: &HeaderMap) -> HeaderMap {
    let mut headers = request.clone();
    for (name, value) in defaults {
        if !headers.contains_key(name) {
            headers.insert(name.clone(), value.clone());
        }
    }
    headers
}

// Names only; values may carry credentials.
fn header_names(headers: &HeaderMap) -> Vec<&str> {
    headers.keys().map(HeaderName::as_str).collect()
}
