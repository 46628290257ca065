//! Client builder for credentials, connection settings and observability
//!
//! The `ClientBuilder` collects everything a [`KbMetricsClient`] needs and
//! resolves credentials once, in [`ClientBuilder::build`]:
//!
//! - no credentials: anonymous client
//! - a token: validated against the authorization service
//! - a user name and password: exchanged for a token
//!
//! Invalid credentials fail the build; no client is returned.
//!
//! # Examples
//!
//! ```rust,no_run
//! use kbmetrics_client::ClientBuilder;
//! use std::time::Duration;
//!
//! # fn example() -> kbmetrics_core::Result<()> {
//! let client = ClientBuilder::new("https://kbase.us/services/kb_Metrics")
//!     .token("MY_TOKEN")
//!     .read_timeout(Some(Duration::from_secs(120)))
//!     .service_version("release")
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Environment
//!
//! [`ClientBuilder::from_env`] reads `KB_METRICS_URL` (required),
//! `KB_AUTH_TOKEN` and `KB_AUTH_URL`.

use crate::auth::{AuthProvider, HttpAuthProvider};
use crate::caller::JsonClientCaller;
use crate::{ClientMetrics, KbMetricsClient};
use kbmetrics_core::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

pub const ENV_SERVICE_URL: &str = "KB_METRICS_URL";
pub const ENV_AUTH_TOKEN: &str = "KB_AUTH_TOKEN";
pub const ENV_AUTH_URL: &str = "KB_AUTH_URL";

enum Credentials {
    None,
    Token(String),
    Password { user: String, password: String },
}

/// Builder for configuring and creating a KbMetricsClient
pub struct ClientBuilder {
    url: String,
    credentials: Credentials,
    auth_url: Option<String>,
    auth_provider: Option<Box<dyn AuthProvider>>,
    read_timeout: Option<Option<Duration>>,
    insecure_http_allowed: bool,
    all_certificates_trusted: bool,
    streaming_mode: bool,
    service_version: Option<String>,
    observability_config: Option<kbmetrics_core::ObservabilityConfig>,
    service_name: Option<String>,
}

impl ClientBuilder {
    /// Create a new client builder
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            credentials: Credentials::None,
            auth_url: None,
            auth_provider: None,
            read_timeout: None,
            insecure_http_allowed: false,
            all_certificates_trusted: false,
            streaming_mode: false,
            service_version: None,
            observability_config: None,
            service_name: None,
        }
    }

    /// Create a builder from environment variables
    ///
    /// # Errors
    ///
    /// `Error::Config` if `KB_METRICS_URL` is unset or empty.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let url = non_empty(ENV_SERVICE_URL)
            .ok_or_else(|| Error::Config(format!("{} is not set", ENV_SERVICE_URL)))?;

        let mut builder = Self::new(url);
        if let Some(token) = non_empty(ENV_AUTH_TOKEN) {
            builder = builder.token(token);
        }
        if let Some(auth_url) = non_empty(ENV_AUTH_URL) {
            builder = builder.auth_url(auth_url);
        }
        Ok(builder)
    }

    /// Authenticate with a pre-obtained token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.credentials = Credentials::Token(token.into());
        self
    }

    /// Authenticate by logging in with a user name and password
    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Credentials::Password {
            user: user.into(),
            password: password.into(),
        };
        self
    }

    /// Authorization service used to check credentials
    pub fn auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = Some(url.into());
        self
    }

    /// Replace the authorization service client entirely
    ///
    /// Takes precedence over [`ClientBuilder::auth_url`].
    pub fn auth_provider(mut self, provider: Box<dyn AuthProvider>) -> Self {
        self.auth_provider = Some(provider);
        self
    }

    /// Read timeout; `None` waits forever
    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn insecure_http_allowed(mut self, allowed: bool) -> Self {
        self.insecure_http_allowed = allowed;
        self
    }

    pub fn all_certificates_trusted(mut self, trust_all: bool) -> Self {
        self.all_certificates_trusted = trust_all;
        self
    }

    pub fn streaming_mode(mut self, streaming: bool) -> Self {
        self.streaming_mode = streaming;
        self
    }

    /// Pin the service release for every call
    pub fn service_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = Some(version.into());
        self
    }

    /// Enable observability with custom configuration
    pub fn with_observability(mut self, config: kbmetrics_core::ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self
    }

    /// Enable observability with default configuration
    pub fn with_default_observability(mut self) -> Self {
        self.observability_config = Some(kbmetrics_core::ObservabilityConfig::default());
        self
    }

    /// Set service name for observability (used if observability is enabled)
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Resolve credentials and build the client
    ///
    /// # Errors
    ///
    /// - `Error::Config` for an invalid URL or observability setup failure
    /// - `Error::Unauthorized` if credentials are rejected
    /// - `Error::Io` if the authorization service is unreachable
    pub fn build(self) -> Result<KbMetricsClient> {
        let metrics = if let Some(mut config) = self.observability_config {
            if let Some(name) = self.service_name {
                config.service_name = name;
            }
            kbmetrics_core::init_observability(config.clone()).map_err(|e| {
                Error::Config(format!("Failed to initialize observability: {}", e))
            })?;
            Some(Arc::new(ClientMetrics::new(config.service_name)))
        } else {
            None
        };

        let auth: Box<dyn AuthProvider> = match (self.auth_provider, self.auth_url) {
            (Some(provider), _) => provider,
            (None, Some(url)) => Box::new(HttpAuthProvider::new(url)),
            (None, None) => Box::new(HttpAuthProvider::default()),
        };

        tracing::info!(url = %self.url, "Building kb_Metrics client");
        let mut client = match self.credentials {
            Credentials::None => KbMetricsClient::new(self.url)?,
            Credentials::Token(token) => KbMetricsClient::with_token(self.url, &token, auth.as_ref())?,
            Credentials::Password { user, password } => {
                KbMetricsClient::with_credentials(self.url, &user, &password, auth.as_ref())?
            }
        };

        if let Some(timeout) = self.read_timeout {
            client.set_read_timeout(timeout);
        }
        client.set_insecure_http_allowed(self.insecure_http_allowed);
        client.set_all_certificates_trusted(self.all_certificates_trusted);
        client.set_streaming_mode(self.streaming_mode);
        client.set_service_version(self.service_version);

        if let Some(metrics) = metrics {
            let caller: &mut JsonClientCaller = client.caller_mut();
            caller.set_metrics(metrics);
        }

        if let Some(token) = client.token() {
            tracing::info!(user = %token.user_name(), "Client authenticated");
        }

        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthToken;
    use std::collections::HashMap;

    struct StaticAuth;

    impl AuthProvider for StaticAuth {
        fn validate_token(&self, token: &str) -> Result<AuthToken> {
            if token == "good" {
                Ok(AuthToken::new(token, "alice"))
            } else {
                Err(Error::Unauthorized("token is not valid".into()))
            }
        }

        fn login(&self, user: &str, password: &str) -> Result<AuthToken> {
            if password == "secret" {
                Ok(AuthToken::new("issued", user))
            } else {
                Err(Error::Unauthorized(format!("login failed for {}", user)))
            }
        }
    }

    #[test]
    fn test_builder_creation() {
        let builder = ClientBuilder::new("https://example.org/kb_Metrics");
        assert_eq!(builder.url, "https://example.org/kb_Metrics");
        assert!(matches!(builder.credentials, Credentials::None));
        assert!(builder.auth_url.is_none());
        assert!(builder.observability_config.is_none());
    }

    #[test]
    fn test_anonymous_build() {
        let client = ClientBuilder::new("https://example.org/kb_Metrics")
            .read_timeout(None)
            .streaming_mode(true)
            .service_version("beta")
            .build()
            .unwrap();

        assert!(client.token().is_none());
        assert_eq!(client.read_timeout(), None);
        assert!(client.is_streaming_mode_on());
        assert_eq!(client.service_version(), Some("beta"));
    }

    #[test]
    fn test_token_validated_at_build() {
        let client = ClientBuilder::new("https://example.org/kb_Metrics")
            .token("good")
            .auth_provider(Box::new(StaticAuth))
            .build()
            .unwrap();
        assert_eq!(client.token().unwrap().user_name(), "alice");

        let rejected = ClientBuilder::new("https://example.org/kb_Metrics")
            .token("bad")
            .auth_provider(Box::new(StaticAuth))
            .build();
        assert!(matches!(rejected, Err(Error::Unauthorized(_))));
    }

    #[test]
    fn test_credentials_exchanged_at_build() {
        let client = ClientBuilder::new("https://example.org/kb_Metrics")
            .credentials("bob", "secret")
            .auth_provider(Box::new(StaticAuth))
            .build()
            .unwrap();
        let token = client.token().unwrap();
        assert_eq!(token.token(), "issued");
        assert_eq!(token.user_name(), "bob");

        let rejected = ClientBuilder::new("https://example.org/kb_Metrics")
            .credentials("bob", "wrong")
            .auth_provider(Box::new(StaticAuth))
            .build();
        assert!(matches!(rejected, Err(Error::Unauthorized(_))));
    }

    #[test]
    fn test_last_credentials_win() {
        let builder = ClientBuilder::new("https://x").credentials("u", "p").token("t");
        assert!(matches!(builder.credentials, Credentials::Token(ref t) if t == "t"));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let result = ClientBuilder::new("kbase.us/services/kb_Metrics").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_from_lookup() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_SERVICE_URL, "https://ci.kbase.us/services/kb_Metrics"),
            (ENV_AUTH_TOKEN, "tok"),
            (ENV_AUTH_URL, "https://ci.kbase.us/services/auth/api/legacy/KBase/Sessions/Login"),
        ]);
        let builder = ClientBuilder::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(builder.url, "https://ci.kbase.us/services/kb_Metrics");
        assert!(matches!(builder.credentials, Credentials::Token(ref t) if t == "tok"));
        assert!(builder.auth_url.unwrap().starts_with("https://ci.kbase.us"));
    }

    #[test]
    fn test_from_lookup_requires_url() {
        let result = ClientBuilder::from_lookup(|k| (k == ENV_AUTH_TOKEN).then(|| "tok".to_string()));
        assert!(matches!(result, Err(Error::Config(_))));

        let blank = ClientBuilder::from_lookup(|k| (k == ENV_SERVICE_URL).then(|| "  ".to_string()));
        assert!(matches!(blank, Err(Error::Config(_))));
    }
}
