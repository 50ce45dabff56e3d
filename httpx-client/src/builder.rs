//! Fluent request builder.

use crate::body::{BodySource, materialize};
use crate::error::{ConfigError, Result};
use crate::request::PendingRequest;
use crate::{
    Body, Context, FormValues, MultipartForm, Request, ReqwestTransport, Response, RetryPolicy,
    Transport, multipart,
};
use http::{HeaderName, HeaderValue, Method};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Builds a request through chained configuration calls.
///
/// Configuration calls never fail in place. The first error is latched
/// and every later configuration call is ignored; [`build`] and [`send`]
/// return the latched error. Use [`err`] to inspect it mid-chain.
///
/// ```rust,no_run
/// use httpx_client::RequestBuilder;
///
/// let response = RequestBuilder::new("https://api.example.com/orders")
///     .post()
///     .set_header("Authorization", "Bearer token")
///     .json(&serde_json::json!({"item": "widget", "quantity": 5}))
///     .retry(3)
///     .send()?;
/// # Ok::<(), httpx_client::HttpxError>(())
/// ```
///
/// [`build`]: RequestBuilder::build
/// [`send`]: RequestBuilder::send
/// [`err`]: RequestBuilder::err
pub struct RequestBuilder {
    state: std::result::Result<PendingRequest, ConfigError>,
    retry: RetryPolicy,
    transport: Option<Arc<dyn Transport>>,
}

impl RequestBuilder {
    /// Start a GET request to `url`. A URL that fails to parse is latched.
    pub fn new(url: impl AsRef<str>) -> Self {
        let state = Url::parse(url.as_ref())
            .map(PendingRequest::new)
            .map_err(ConfigError::from);
        if let Err(e) = &state {
            warn!(url = url.as_ref(), error = %e, "Invalid request URL");
        }

        Self {
            state,
            retry: RetryPolicy::default(),
            transport: None,
        }
    }

    /// Start a GET request to an already parsed URL.
    pub fn from_url(url: Url) -> Self {
        Self {
            state: Ok(PendingRequest::new(url)),
            retry: RetryPolicy::default(),
            transport: None,
        }
    }

    fn update<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut PendingRequest) -> std::result::Result<(), ConfigError>,
    {
        if let Ok(pending) = &mut self.state
            && let Err(e) = f(pending)
        {
            warn!(error = %e, "Request configuration failed, ignoring further configuration");
            self.state = Err(e);
        }
        self
    }

    /// The latched configuration error, if any.
    pub fn err(&self) -> Option<&ConfigError> {
        self.state.as_ref().err()
    }

    /// Set the HTTP method. Any valid HTTP token is accepted.
    pub fn method(self, method: impl AsRef<str>) -> Self {
        let method = method.as_ref();
        self.update(|pending| {
            let method = Method::from_bytes(method.as_bytes())
                .map_err(|_| ConfigError::InvalidMethod(method.to_owned()))?;
            pending.set_method(method);
            Ok(())
        })
    }

    /// Set the method to GET.
    pub fn get(self) -> Self {
        self.method(Method::GET)
    }

    /// Set the method to POST.
    pub fn post(self) -> Self {
        self.method(Method::POST)
    }

    /// Set the method to PUT.
    pub fn put(self) -> Self {
        self.method(Method::PUT)
    }

    /// Set the method to PATCH.
    pub fn patch(self) -> Self {
        self.method(Method::PATCH)
    }

    /// Set the method to DELETE.
    pub fn delete(self) -> Self {
        self.method(Method::DELETE)
    }

    /// Set the method to HEAD.
    pub fn head(self) -> Self {
        self.method(Method::HEAD)
    }

    /// Set the method to CONNECT.
    pub fn connect(self) -> Self {
        self.method(Method::CONNECT)
    }

    /// Set the method to OPTIONS.
    pub fn options(self) -> Self {
        self.method(Method::OPTIONS)
    }

    /// Set the method to TRACE.
    pub fn trace(self) -> Self {
        self.method(Method::TRACE)
    }

    /// Set a header, replacing any previous values for the same name.
    pub fn set_header(self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let (name, value) = (name.as_ref(), value.as_ref());
        self.update(|pending| {
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ConfigError::InvalidHeaderName(name.to_owned()))?;
            let value = HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeaderValue {
                name: name.to_owned(),
            })?;
            pending.set_header(header, value);
            Ok(())
        })
    }

    /// Attach form values to the request for inspection. They are not sent;
    /// use [`post_form`](Self::post_form) to send a form body.
    pub fn form(self, values: impl Into<FormValues>) -> Self {
        let values = values.into();
        self.update(|pending| {
            pending.set_form(values);
            Ok(())
        })
    }

    /// Append query parameters to the URL.
    ///
    /// Duplicate keys within one call keep the last value. The order of
    /// keys within one call is not part of the contract.
    pub fn query<I, K, V>(self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let params: BTreeMap<String, String> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.update(|pending| {
            pending.append_query(&serde_urlencoded::to_string(&params)?);
            Ok(())
        })
    }

    /// Append a single query parameter.
    pub fn add_query(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query([(key.into(), value.into())])
    }

    /// Set a raw body. In-memory sources become replayable with a known
    /// length; see [`BodySource`].
    pub fn body(self, source: impl Into<BodySource>) -> Self {
        let source = source.into();
        self.update(|pending| {
            pending.set_body(materialize(source), None);
            Ok(())
        })
    }

    /// Set a JSON body and `Content-Type: application/json`.
    ///
    /// If serialization fails the error is latched and the previous body
    /// and headers are left as they were.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Self {
        self.update(|pending| {
            let bytes = serde_json::to_vec(value)?;
            pending.set_body(
                Body::from_bytes(bytes),
                Some(HeaderValue::from_static("application/json")),
            );
            Ok(())
        })
    }

    /// Set a URL-encoded form body and
    /// `Content-Type: application/x-www-form-urlencoded`.
    pub fn post_form(self, values: impl Into<FormValues>) -> Self {
        let values = values.into();
        self.update(|pending| {
            let encoded = values.encode()?;
            pending.set_body(
                Body::from_bytes(encoded),
                Some(HeaderValue::from_static("application/x-www-form-urlencoded")),
            );
            Ok(())
        })
    }

    /// Set a `multipart/form-data` body built from `form`.
    ///
    /// File attachments are read into memory. A file that cannot be
    /// opened or read latches the error.
    pub fn multipart_form(self, form: &MultipartForm) -> Self {
        self.update(|pending| {
            let (bytes, content_type) = multipart::encode(form)?;
            let content_type = HeaderValue::from_str(&content_type).map_err(|_| {
                ConfigError::InvalidHeaderValue {
                    name: http::header::CONTENT_TYPE.as_str().to_owned(),
                }
            })?;
            pending.set_body(Body::from_bytes(bytes), Some(content_type));
            Ok(())
        })
    }

    /// Set the number of attempts [`send`](Self::send) makes. Zero and one
    /// both mean a single attempt.
    pub fn retry(mut self, attempts: u32) -> Self {
        if self.state.is_ok() {
            self.retry = RetryPolicy::new(attempts);
        }
        self
    }

    /// Use `transport` for [`send`](Self::send) instead of the shared
    /// default [`ReqwestTransport`].
    pub fn transport<T: Transport + 'static>(self, transport: T) -> Self {
        self.shared_transport(Arc::new(transport))
    }

    /// Use a transport shared with other builders.
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        if self.state.is_ok() {
            self.transport = Some(transport);
        }
        self
    }

    /// Finalize the request and bind it to `context`.
    pub fn build_with_context(self, context: Context) -> Result<Request> {
        finalize(self.state, context)
    }

    /// Finalize the request with the background context.
    pub fn build(self) -> Result<Request> {
        self.build_with_context(Context::background())
    }

    /// Build the request and execute it with retry.
    ///
    /// Returns the first response obtained, whatever its status, or the
    /// last transport error once all attempts have failed.
    pub fn send(self) -> Result<Response> {
        self.send_with_context(Context::background())
    }

    /// Like [`send`](Self::send), with the request bound to `context`.
    pub fn send_with_context(self, context: Context) -> Result<Response> {
        let Self {
            state,
            retry,
            transport,
        } = self;
        let mut request = finalize(state, context)?;

        let response = match transport {
            Some(transport) => retry.execute(&*transport, &mut request)?,
            None => retry.execute(ReqwestTransport::shared()?, &mut request)?,
        };
        Ok(response)
    }
}

fn finalize(
    state: std::result::Result<PendingRequest, ConfigError>,
    context: Context,
) -> Result<Request> {
    let request = state?.into_request();
    let request = if context.is_background() {
        request
    } else {
        request.with_context(context)
    };

    debug!(
        method = %request.method(),
        url = %request.url(),
        content_length = ?request.content_length(),
        "Request built"
    );
    Ok(request)
}

impl std::fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("state", &self.state)
            .field("retry", &self.retry)
            .field("transport", &self.transport.is_some())
            .finish()
    }
}
