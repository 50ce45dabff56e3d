//! Settings for the reqwest transport.

use crate::error::ConfigError;
use http::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

/// Per-attempt timeout used when nothing else is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for [`ReqwestTransport`](crate::ReqwestTransport).
///
/// The timeout bounds a single attempt; a context deadline bound to the
/// request can shorten it but never extend it. Default headers are sent
/// with every request that does not set the same header itself.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    timeout: Duration,
    default_headers: HeaderMap,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            default_headers: HeaderMap::new(),
        }
    }
}

impl TransportConfig {
    /// Start from the defaults.
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::default()
    }

    /// Upper bound for one attempt.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Headers added to requests that lack them.
    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }
}

/// Builder for [`TransportConfig`].
///
/// Like [`RequestBuilder`](crate::RequestBuilder), an invalid header is
/// latched and reported by [`build`](Self::build).
#[derive(Debug)]
pub struct TransportConfigBuilder {
    state: Result<TransportConfig, ConfigError>,
}

impl Default for TransportConfigBuilder {
    fn default() -> Self {
        Self {
            state: Ok(TransportConfig::default()),
        }
    }
}

impl TransportConfigBuilder {
    /// Set the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        if let Ok(config) = &mut self.state {
            config.timeout = timeout;
        }
        self
    }

    /// Add a header sent with every request unless the request sets it.
    /// A later value for the same name replaces the earlier one.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let (name, value) = (name.as_ref(), value.as_ref());
        if let Ok(config) = &mut self.state {
            match parse_header(name, value) {
                Ok((name, value)) => {
                    config.default_headers.insert(name, value);
                }
                Err(e) => self.state = Err(e),
            }
        }
        self
    }

    /// Finish, or return the first invalid header.
    pub fn build(self) -> Result<TransportConfig, ConfigError> {
        self.state
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), ConfigError> {
    let header = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ConfigError::InvalidHeaderName(name.to_owned()))?;
    let value = HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeaderValue {
        name: name.to_owned(),
    })?;
    Ok((header, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert!(config.default_headers().is_empty());
    }

    #[test]
    fn test_default_headers_replace_by_name() {
        let config = TransportConfig::builder()
            .timeout(Duration::from_secs(5))
            .default_header("X-Api-Key", "first")
            .default_header("x-api-key", "second")
            .build()
            .unwrap();

        assert_eq!(config.timeout(), Duration::from_secs(5));
        let values: Vec<_> = config.default_headers().get_all("X-Api-Key").iter().collect();
        assert_eq!(values, ["second"]);
    }

    #[test]
    fn test_invalid_default_header_is_latched() {
        let err = TransportConfig::builder()
            .default_header("Bad Header", "v")
            .default_header("X-Ok", "fine")
            .timeout(Duration::from_secs(1))
            .build()
            .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidHeaderName(name) if name == "Bad Header"));
    }
}
