//! Authorization tokens and the service that issues them
//!
//! A client that carries credentials resolves them once, at construction:
//! a supplied token is validated, a username/password pair is exchanged for
//! a token. Both go through an [`AuthProvider`], so the checks can be pointed
//! at a different authorization service or replaced entirely.
//!
//! [`HttpAuthProvider`] speaks the legacy `Sessions/Login` form API that
//! KBase authorization services still expose.

use kbmetrics_core::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Default authorization endpoint
pub const DEFAULT_AUTH_URL: &str =
    "https://kbase.us/services/auth/api/legacy/KBase/Sessions/Login";

/// A validated authorization token
///
/// `Display` and `Debug` never print the secret itself.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    token: String,
    user_name: String,
}

impl AuthToken {
    /// Wrap an already validated token
    pub fn new(token: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user_name: user_name.into(),
        }
    }

    /// The raw token, as sent in the `Authorization` header
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("user_name", &self.user_name)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl fmt::Display for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token for {}", self.user_name)
    }
}

/// Source of validated tokens
pub trait AuthProvider: Send + Sync {
    /// Check a token and return it with its owner attached
    fn validate_token(&self, token: &str) -> Result<AuthToken>;

    /// Exchange a username and password for a token
    fn login(&self, user: &str, password: &str) -> Result<AuthToken>;
}

/// Reply of the `Sessions/Login` endpoint
#[derive(Debug, Deserialize)]
struct LoginReply {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

/// Authorization provider backed by the `Sessions/Login` form API
#[derive(Debug, Clone)]
pub struct HttpAuthProvider {
    url: String,
    agent: ureq::Agent,
}

impl HttpAuthProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            agent: ureq::AgentBuilder::new()
                .timeout_connect(Duration::from_secs(10))
                .timeout_read(Duration::from_secs(60))
                .build(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn post_form(&self, form: &[(&str, &str)]) -> Result<LoginReply> {
        let response = match self.agent.post(&self.url).send_form(form) {
            Ok(response) => response,
            Err(ureq::Error::Status(code @ (400 | 401 | 403), response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(Error::Unauthorized(format!(
                    "authorization service rejected credentials (http {}): {}",
                    code,
                    body.trim()
                )));
            }
            Err(ureq::Error::Status(code, _)) => {
                return Err(Error::Io(format!(
                    "authorization service at {} returned http {}",
                    self.url, code
                )))
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(Error::Io(format!(
                    "authorization service at {} unreachable: {}",
                    self.url, transport
                )))
            }
        };

        response
            .into_json::<LoginReply>()
            .map_err(|e| Error::Unauthorized(format!("unreadable authorization reply: {}", e)))
    }
}

impl Default for HttpAuthProvider {
    fn default() -> Self {
        Self::new(DEFAULT_AUTH_URL)
    }
}

impl AuthProvider for HttpAuthProvider {
    #[tracing::instrument(skip_all, fields(auth_url = %self.url))]
    fn validate_token(&self, token: &str) -> Result<AuthToken> {
        if token.trim().is_empty() {
            return Err(Error::Unauthorized("token is empty".into()));
        }

        let reply = self.post_form(&[("token", token), ("fields", "user_id")])?;
        let user = reply
            .user_id
            .ok_or_else(|| Error::Unauthorized("token is not valid".into()))?;

        tracing::debug!(user = %user, "Token validated");
        Ok(AuthToken::new(token, user))
    }

    #[tracing::instrument(skip_all, fields(auth_url = %self.url, user = %user))]
    fn login(&self, user: &str, password: &str) -> Result<AuthToken> {
        if user.is_empty() || password.is_empty() {
            return Err(Error::Unauthorized("user name and password are required".into()));
        }

        let reply = self.post_form(&[
            ("user_id", user),
            ("password", password),
            ("fields", "token,user_id"),
        ])?;
        let token = reply
            .token
            .ok_or_else(|| Error::Unauthorized(format!("login failed for {}", user)))?;

        tracing::debug!("Login succeeded");
        Ok(AuthToken::new(token, reply.user_id.unwrap_or_else(|| user.to_string())))
    }
}
