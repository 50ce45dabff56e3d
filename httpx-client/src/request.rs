//! Draft and finalized requests.

use crate::{Body, Context, FormValues};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

/// Mutable draft of an outbound request, owned by a
/// [`RequestBuilder`](crate::RequestBuilder).
#[derive(Debug)]
pub(crate) struct PendingRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Body>,
    form: Option<FormValues>,
    // Content-Type was set by a body convenience and goes away with its body.
    body_content_type: bool,
}

impl PendingRequest {
    pub(crate) fn new(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            body: None,
            form: None,
            body_content_type: false,
        }
    }

    pub(crate) fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    pub(crate) fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        if name == CONTENT_TYPE {
            self.body_content_type = false;
        }
        self.headers.insert(name, value);
    }

    pub(crate) fn set_form(&mut self, form: FormValues) {
        self.form = Some(form);
    }

    /// Append an already encoded query to the URL's existing query string.
    pub(crate) fn append_query(&mut self, encoded: &str) {
        if encoded.is_empty() {
            return;
        }
        let query = match self.url.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
            _ => encoded.to_owned(),
        };
        self.url.set_query(Some(&query));
    }

    /// Replace the body, and the Content-Type that came with the previous
    /// body, if any.
    pub(crate) fn set_body(&mut self, body: Body, content_type: Option<HeaderValue>) {
        match content_type {
            Some(value) => {
                self.headers.insert(CONTENT_TYPE, value);
                self.body_content_type = true;
            }
            None if self.body_content_type => {
                self.headers.remove(CONTENT_TYPE);
                self.body_content_type = false;
            }
            None => {}
        }
        self.body = Some(body);
    }

    pub(crate) fn into_request(self) -> Request {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            form: self.form,
            context: Context::background(),
        }
    }
}

/// A finalized request, ready to be handed to a
/// [`Transport`](crate::Transport).
#[derive(Debug)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Body>,
    form: Option<FormValues>,
    context: Context,
}

impl Request {
    /// Get the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the URL, including the query string.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get mutable access to the request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Get a header value as a string. Names are case-insensitive.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Get the body, if one was set.
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Get mutable access to the body.
    pub fn body_mut(&mut self) -> Option<&mut Body> {
        self.body.as_mut()
    }

    /// Remove and return the body.
    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }

    /// Declared body length: `Some(0)` without a body, `None` when the
    /// body's length is unknown.
    pub fn content_length(&self) -> Option<u64> {
        match &self.body {
            Some(body) => body.content_length(),
            None => Some(0),
        }
    }

    /// Whether the body can be replayed. A request without a body is.
    pub fn is_replayable(&self) -> bool {
        self.body.as_ref().is_none_or(Body::is_replayable)
    }

    /// Form values attached for inspection. They are not transmitted.
    pub fn form(&self) -> Option<&FormValues> {
        self.form.as_ref()
    }

    /// Get the context the request was finalized with.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Bind the request to its context. Only finalization does this.
    pub(crate) fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }
}
