//! Gateway runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the client.
//! Request handling never reads process-wide environment variables; binaries hand a
//! lookup function to [`GatewayConfig::from_lookup`] instead.

use crate::constants::{
    DEFAULT_REQUEST_TIMEOUT_SECS, ENV_PASSWORD, ENV_TIMEOUT_SECS, ENV_USERNAME, ENV_WEBDAV_BASE,
};
use crate::{GatewayError, GatewayResult};
use std::time::Duration;

/// The single shared service credential used for every upstream call.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> GatewayResult<Self> {
        let username = username.into();
        let password = password.into();
        if username.is_empty() || password.is_empty() {
            return Err(GatewayError::Configuration(format!(
                "{ENV_USERNAME}/{ENV_PASSWORD} not set"
            )));
        }
        Ok(Self { username, password })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Gateway configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    base_url: String,
    credentials: Credentials,
    request_timeout: Duration,
}

impl GatewayConfig {
    /// Create a new `GatewayConfig`.
    ///
    /// The base URL has any trailing slashes removed so that joins produce exactly one
    /// separator.
    pub fn new(base_url: impl AsRef<str>, credentials: Credentials) -> GatewayResult<Self> {
        let base_url = base_url.as_ref().trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            return Err(GatewayError::Configuration(format!(
                "{ENV_WEBDAV_BASE} not set"
            )));
        }
        reqwest::Url::parse(&base_url).map_err(|e| {
            GatewayError::Configuration(format!("{ENV_WEBDAV_BASE} is not a valid URL: {e}"))
        })?;

        Ok(Self {
            base_url,
            credentials,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }

    /// Replace the per-connection timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Resolve configuration through `lookup`, typically `|k| std::env::var(k).ok()`.
    ///
    /// Missing or blank base URL and credentials are fatal. A missing or blank timeout
    /// falls back to [`DEFAULT_REQUEST_TIMEOUT_SECS`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> GatewayResult<Self> {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let base_url = value(ENV_WEBDAV_BASE).unwrap_or_default();
        let credentials = Credentials::new(
            value(ENV_USERNAME).unwrap_or_default(),
            value(ENV_PASSWORD).unwrap_or_default(),
        )?;
        let timeout = value(ENV_TIMEOUT_SECS)
            .map(|v| {
                v.parse::<u64>().map_err(|_| {
                    GatewayError::Configuration(format!(
                        "{ENV_TIMEOUT_SECS} must be a whole number of seconds, got {v:?}"
                    ))
                })
            })
            .transpose()?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        Ok(Self::new(base_url, credentials)?.with_request_timeout(Duration::from_secs(timeout)))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn from_lookup_trims_base_and_applies_default_timeout() {
        let cfg = GatewayConfig::from_lookup(lookup(&[
            (ENV_WEBDAV_BASE, "https://cms.example.com/alfresco/webdav/"),
            (ENV_USERNAME, "svc"),
            (ENV_PASSWORD, "secret"),
        ]))
        .expect("valid config");

        assert_eq!(cfg.base_url(), "https://cms.example.com/alfresco/webdav");
        assert_eq!(cfg.credentials().username(), "svc");
        assert_eq!(
            cfg.request_timeout(),
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
    }

    #[test]
    fn from_lookup_honours_timeout_override() {
        let cfg = GatewayConfig::from_lookup(lookup(&[
            (ENV_WEBDAV_BASE, "http://localhost:8080/webdav"),
            (ENV_USERNAME, "svc"),
            (ENV_PASSWORD, "secret"),
            (ENV_TIMEOUT_SECS, "5"),
        ]))
        .expect("valid config");

        assert_eq!(cfg.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn missing_base_url_is_a_configuration_error() {
        let err = GatewayConfig::from_lookup(lookup(&[
            (ENV_USERNAME, "svc"),
            (ENV_PASSWORD, "secret"),
        ]))
        .expect_err("base url is required");
        assert!(matches!(err, GatewayError::Configuration(_)));
    }

    #[test]
    fn missing_password_is_a_configuration_error() {
        let err = GatewayConfig::from_lookup(lookup(&[
            (ENV_WEBDAV_BASE, "http://localhost:8080/webdav"),
            (ENV_USERNAME, "svc"),
            (ENV_PASSWORD, "   "),
        ]))
        .expect_err("password is required");
        assert!(matches!(err, GatewayError::Configuration(_)));
    }

    #[test]
    fn unparsable_timeout_is_rejected() {
        let err = GatewayConfig::from_lookup(lookup(&[
            (ENV_WEBDAV_BASE, "http://localhost:8080/webdav"),
            (ENV_USERNAME, "svc"),
            (ENV_PASSWORD, "secret"),
            (ENV_TIMEOUT_SECS, "soon"),
        ]))
        .expect_err("timeout must be numeric");
        assert!(matches!(err, GatewayError::Configuration(_)));
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let creds = Credentials::new("svc", "hunter2").expect("valid credentials");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("svc"));
        assert!(!rendered.contains("hunter2"));
    }
}
