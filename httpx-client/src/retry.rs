//! Fixed-count retry.
//!
//! Every transport error is retried the same way, immediately, until the
//! attempt budget is used up. There is no backoff and no distinction
//! between transient and permanent failures. The request context is not
//! consulted between attempts; a transport that honours it fails each
//! remaining attempt promptly.

use crate::{Request, Response, Transport, TransportError};
use tracing::{debug, warn};

/// Number of execution attempts for a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
}

impl RetryPolicy {
    /// Create a policy. Zero and one both mean a single attempt.
    pub fn new(attempts: u32) -> Self {
        Self { attempts }
    }

    /// Effective number of attempts, at least one.
    pub fn attempts(&self) -> u32 {
        self.attempts.max(1)
    }

    /// Execute `request` until the transport succeeds or attempts run out.
    ///
    /// Returns the first response, or the error from the last attempt.
    pub fn execute<T>(&self, transport: &T, request: &mut Request) -> Result<Response, TransportError>
    where
        T: Transport + ?Sized,
    {
        let attempts = self.attempts();
        let mut attempt = 1;

        loop {
            debug!(
                attempt,
                attempts,
                method = %request.method(),
                url = %request.url(),
                "Executing request"
            );

            match transport.execute(request) {
                Ok(response) => return Ok(response),
                Err(e) if attempt < attempts => {
                    if !request.is_replayable() {
                        warn!(attempt, "Retrying request whose body cannot be replayed");
                    }
                    warn!(attempt, error = %e, "Retrying request after transport error");
                    attempt += 1;
                }
                Err(e) => {
                    debug!(attempts, error = %e, "Request failed, no attempts left");
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Body, RequestBuilder};
    use http::{HeaderMap, StatusCode};
    use std::io::Read;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ok(request: &Request) -> Response {
        Response::new(StatusCode::OK, HeaderMap::new(), "ok", request.url().clone())
    }

    fn request() -> Request {
        RequestBuilder::new("http://localhost/").build().unwrap()
    }

    #[test]
    fn test_zero_and_one_mean_single_attempt() {
        assert_eq!(RetryPolicy::new(0).attempts(), 1);
        assert_eq!(RetryPolicy::new(1).attempts(), 1);
        assert_eq!(RetryPolicy::new(5).attempts(), 5);
    }

    #[test]
    fn test_fails_twice_then_succeeds() {
        let calls = AtomicU32::new(0);
        let transport = |req: &mut Request| {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(TransportError::Connection("refused".into()))
            } else {
                Ok(ok(req))
            }
        };

        let response = RetryPolicy::new(3).execute(&transport, &mut request()).unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_always_fails_returns_last_error() {
        let calls = AtomicU32::new(0);
        let transport = |_: &mut Request| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Err::<Response, _>(TransportError::Connection(format!("attempt {n}")))
        };

        let err = RetryPolicy::new(3).execute(&transport, &mut request()).unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.to_string(), "Connection error: attempt 3");
    }

    #[test]
    fn test_error_status_is_not_retried() {
        let calls = AtomicU32::new(0);
        let transport = |req: &mut Request| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, TransportError>(Response::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                HeaderMap::new(),
                "",
                req.url().clone(),
            ))
        };

        let response = RetryPolicy::new(3).execute(&transport, &mut request()).unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_each_attempt_sends_full_replayable_body() {
        let seen = Mutex::new(Vec::new());
        let transport = |req: &mut Request| {
            let mut sent = String::new();
            if let Some(body) = req.body_mut() {
                body.stream_for_attempt().read_to_string(&mut sent).unwrap();
            }
            let mut seen = seen.lock().unwrap();
            seen.push(sent);
            if seen.len() < 3 {
                Err(TransportError::Connection("reset".into()))
            } else {
                Ok(ok(req))
            }
        };

        let mut req = RequestBuilder::new("http://localhost/")
            .post()
            .body("payload")
            .build()
            .unwrap();
        RetryPolicy::new(3).execute(&transport, &mut req).unwrap();

        assert_eq!(*seen.lock().unwrap(), ["payload", "payload", "payload"]);
    }

    #[test]
    fn test_opaque_body_is_exhausted_on_retry() {
        let seen = Mutex::new(Vec::new());
        let transport = |req: &mut Request| {
            let mut sent = String::new();
            if let Some(body) = req.body_mut() {
                body.stream_for_attempt().read_to_string(&mut sent).unwrap();
            }
            seen.lock().unwrap().push(sent);
            Err::<Response, _>(TransportError::Connection("reset".into()))
        };

        let mut req = RequestBuilder::new("http://localhost/")
            .post()
            .body(crate::BodySource::reader(std::io::Cursor::new(b"once".to_vec())))
            .build()
            .unwrap();
        assert!(!req.body().is_some_and(Body::is_replayable));

        let _ = RetryPolicy::new(2).execute(&transport, &mut req);
        assert_eq!(*seen.lock().unwrap(), ["once", ""]);
    }
}
