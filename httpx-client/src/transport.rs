//! The transport seam.

use crate::{Request, Response, TransportError};

/// Sends a finalized request and returns the response.
///
/// Implementations own everything HTTP: connections, redirects, status
/// handling and honouring the request's [`Context`](crate::Context).
/// Only failures to obtain a response are errors; a response with an
/// error status is `Ok`.
///
/// The request is borrowed mutably so the same request can be executed
/// again on retry. Use [`Body::stream_for_attempt`](crate::Body::stream_for_attempt)
/// to obtain the stream to send.
pub trait Transport: Send + Sync {
    /// Execute the request once.
    fn execute(&self, request: &mut Request) -> Result<Response, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(&mut Request) -> Result<Response, TransportError> + Send + Sync,
{
    fn execute(&self, request: &mut Request) -> Result<Response, TransportError> {
        self(request)
    }
}
