//! Blocking JSON-RPC 1.1 caller over HTTP
//!
//! `JsonClientCaller` is the generic half of a generated client: it owns the
//! endpoint, the credentials and the connection configuration, and turns
//! `(method, params)` into one HTTP POST and one decoded envelope. The typed
//! client in [`crate::client`] only picks method names and record types.
//!
//! # Connection Configuration
//!
//! - **Read timeout**: how long to wait for the response (default 30 minutes,
//!   `None` disables it)
//! - **Insecure HTTP**: whether credentials may be sent over `http://`
//! - **Trust all certificates**: skip TLS certificate verification
//! - **Streaming mode**: spool the request body to a temporary file and send
//!   it chunked, instead of holding it in memory
//!
//! The HTTP agent is built lazily from this configuration and cached; any
//! setter that changes it drops the cached agent.
//!
//! # Error Mapping
//!
//! - transport failures (connect, DNS, timeout, TLS, body read) → `Error::Io`
//! - an error envelope, whatever the HTTP status → `Error::Remote`
//! - a non-JSON body → `Error::Protocol`, quoting the HTTP status

use crate::auth::AuthToken;
use crate::metrics::ClientMetrics;
use kbmetrics_core::{codec, Error, Result, RpcContext, RpcRequest};
use serde_json::Value;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Read timeout applied unless the caller changes it
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Generic JSON-RPC caller shared by generated clients
#[derive(Debug)]
pub struct JsonClientCaller {
    url: String,
    token: Option<AuthToken>,
    read_timeout: Option<Duration>,
    insecure_http_allowed: bool,
    all_certificates_trusted: bool,
    streaming_mode: bool,
    /// One-shot capture target for the next raw response body
    file_for_next_response: Mutex<Option<PathBuf>>,
    /// Lazily built from the fields above
    agent: Mutex<Option<ureq::Agent>>,
    metrics: Option<Arc<ClientMetrics>>,
}

impl JsonClientCaller {
    /// Create a caller for `url` without credentials
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` unless the URL uses the `http` or `https` scheme.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "service url must use http or https: {}",
                url
            )));
        }

        Ok(Self {
            url,
            token: None,
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
            insecure_http_allowed: false,
            all_certificates_trusted: false,
            streaming_mode: false,
            file_for_next_response: Mutex::new(None),
            agent: Mutex::new(None),
            metrics: None,
        })
    }

    /// Create a caller that sends an already validated token
    pub fn with_token(url: impl Into<String>, token: AuthToken) -> Result<Self> {
        let mut caller = Self::new(url)?;
        caller.token = Some(token);
        Ok(caller)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn token(&self) -> Option<&AuthToken> {
        self.token.as_ref()
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Set the read timeout; `None` or zero waits forever
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout.filter(|t| !t.is_zero());
        self.invalidate_agent();
    }

    pub fn is_insecure_http_allowed(&self) -> bool {
        self.insecure_http_allowed
    }

    /// Allow credentials to be sent over plain `http://` (default false)
    pub fn set_insecure_http_allowed(&mut self, allowed: bool) {
        self.insecure_http_allowed = allowed;
    }

    pub fn is_all_certificates_trusted(&self) -> bool {
        self.all_certificates_trusted
    }

    /// Trust every TLS certificate, including self-signed ones (default false)
    pub fn set_all_certificates_trusted(&mut self, trust_all: bool) {
        self.all_certificates_trusted = trust_all;
        self.invalidate_agent();
    }

    pub fn is_streaming_mode_on(&self) -> bool {
        self.streaming_mode
    }

    /// Stream request bodies from a temporary file (default false)
    ///
    /// Many servers do not accept chunked request bodies.
    pub fn set_streaming_mode(&mut self, streaming: bool) {
        self.streaming_mode = streaming;
    }

    /// Also write the raw body of the next response to `path`
    ///
    /// Applies to exactly one call, successful or not. A call that fails
    /// before a response arrives writes nothing but still uses it up.
    pub fn set_file_for_next_response(&self, path: impl Into<PathBuf>) {
        *lock(&self.file_for_next_response) = Some(path.into());
    }

    pub(crate) fn set_metrics(&mut self, metrics: Arc<ClientMetrics>) {
        self.metrics = Some(metrics);
    }

    /// Invoke `method` and return the envelope's `result`
    ///
    /// `service_version`, when given, is added to the call context as
    /// `service_ver`, replacing any pin already present in `context`.
    ///
    /// # Errors
    ///
    /// - `Error::Unauthorized` if credentials are required but missing, or
    ///   would travel over `http://` without permission
    /// - `Error::Io` on transport failure
    /// - `Error::Remote` on an error envelope
    /// - `Error::Protocol` on a malformed response
    #[tracing::instrument(skip(self, params, context), fields(url = %self.url))]
    pub fn jsonrpc_call(
        &self,
        method: &str,
        params: Vec<Value>,
        context: Option<&RpcContext>,
        auth_required: bool,
        service_version: Option<&str>,
    ) -> Result<Value> {
        let start = Instant::now();
        let outcome = self.execute(method, params, context, auth_required, service_version);
        let elapsed = start.elapsed();

        match &outcome {
            Ok(_) => {
                tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "Call succeeded");
                if let Some(m) = &self.metrics {
                    m.record_request(method, "success", elapsed.as_secs_f64());
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, elapsed_ms = elapsed.as_millis() as u64, "Call failed");
                if let Some(m) = &self.metrics {
                    m.record_request(method, "error", elapsed.as_secs_f64());
                    m.record_error(error.kind());
                }
            }
        }

        outcome
    }

    fn execute(
        &self,
        method: &str,
        params: Vec<Value>,
        context: Option<&RpcContext>,
        auth_required: bool,
        service_version: Option<&str>,
    ) -> Result<Value> {
        // One-shot even when the call fails before a response arrives
        let capture = lock(&self.file_for_next_response).take();
        let authorization = self.authorization(auth_required)?;
        let request = RpcRequest::new(method, params, call_context(context, service_version));
        tracing::debug!(id = %request.id, "Sending request");

        let mut http = self
            .agent()?
            .post(&self.url)
            .set("Content-Type", "application/json");
        if let Some(token) = authorization {
            http = http.set("Authorization", token);
        }

        let sent = if self.streaming_mode {
            let spool = spool_request(&request)?;
            http.send(spool)
        } else {
            http.send_bytes(&codec::encode_request(&request)?)
        };

        let (status, body) = match sent {
            Ok(response) => (response.status(), read_body(response)?),
            // SDK servers answer errors with HTTP 500 and an error envelope
            Err(ureq::Error::Status(code, response)) => (code, read_body(response)?),
            Err(ureq::Error::Transport(transport)) => {
                return Err(Error::Io(format!("{}: {}", self.url, transport)))
            }
        };

        if let Some(path) = capture {
            capture_response(&path, &body)?;
        }

        let response = codec::decode_response(&body).map_err(|e| match e {
            Error::Protocol(msg) if status >= 400 => {
                Error::Protocol(format!("http status {} from {}: {}", status, self.url, msg))
            }
            other => other,
        })?;

        codec::into_result(response)
    }

    /// Decide which token, if any, goes into the `Authorization` header
    fn authorization(&self, auth_required: bool) -> Result<Option<&str>> {
        if !auth_required && self.token.is_none() {
            return Ok(None);
        }

        if self.url.starts_with("http://") && !self.insecure_http_allowed {
            return Err(Error::Unauthorized(
                "refusing to send credentials over insecure http; allow insecure http connections to override"
                    .into(),
            ));
        }

        match &self.token {
            Some(token) => Ok(Some(token.token())),
            None => Err(Error::Unauthorized(
                "RPC method requires authentication but credentials were not provided".into(),
            )),
        }
    }

    fn agent(&self) -> Result<ureq::Agent> {
        let mut cached = lock(&self.agent);
        if let Some(agent) = cached.as_ref() {
            return Ok(agent.clone());
        }

        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = self.read_timeout {
            builder = builder.timeout_read(timeout);
        }
        if self.all_certificates_trusted {
            builder = builder.tls_config(crate::tls::trust_all_config()?);
        }

        let agent = builder.build();
        *cached = Some(agent.clone());
        Ok(agent)
    }

    fn invalidate_agent(&mut self) {
        *self
            .agent
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

fn capture_response(path: &Path, body: &[u8]) -> Result<()> {
    std::fs::write(path, body)
        .map_err(|e| Error::Io(format!("failed to write response to {}: {}", path.display(), e)))
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Merge the per-call version pin into the context
fn call_context(context: Option<&RpcContext>, service_version: Option<&str>) -> Option<RpcContext> {
    match (context, service_version) {
        (None, None) => None,
        (Some(ctx), None) => Some(ctx.clone()),
        (ctx, Some(version)) => Some(ctx.cloned().unwrap_or_default().with_service_version(version)),
    }
}

/// Serialize the request into an anonymous temporary file, rewound
fn spool_request(request: &RpcRequest) -> Result<std::fs::File> {
    let file = tempfile::tempfile()?;
    let mut writer = BufWriter::new(file);
    codec::write_request(&mut writer, request)?;
    writer.flush()?;

    let mut file = writer
        .into_inner()
        .map_err(|e| Error::Io(e.error().to_string()))?;
    file.seek(SeekFrom::Start(0))?;
    Ok(file)
}

fn read_body(response: ureq::Response) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut body)
        .map_err(|e| Error::Io(format!("failed to read response body: {}", e)))?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejects_non_http_url() {
        assert!(matches!(JsonClientCaller::new("ftp://host/rpc"), Err(Error::Config(_))));
        assert!(JsonClientCaller::new("https://kbase.us/services/kb_Metrics").is_ok());
    }

    #[test]
    fn test_default_configuration() {
        let caller = JsonClientCaller::new("http://localhost:5000").unwrap();
        assert_eq!(caller.read_timeout(), Some(DEFAULT_READ_TIMEOUT));
        assert!(!caller.is_insecure_http_allowed());
        assert!(!caller.is_all_certificates_trusted());
        assert!(!caller.is_streaming_mode_on());
        assert!(caller.token().is_none());
    }

    #[test]
    fn test_zero_timeout_means_none() {
        let mut caller = JsonClientCaller::new("http://localhost:5000").unwrap();
        caller.set_read_timeout(Some(Duration::ZERO));
        assert_eq!(caller.read_timeout(), None);
        caller.set_read_timeout(Some(Duration::from_secs(5)));
        assert_eq!(caller.read_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_agent_is_cached_until_config_changes() {
        let mut caller = JsonClientCaller::new("https://localhost:5000").unwrap();
        caller.agent().unwrap();
        assert!(lock(&caller.agent).is_some());

        caller.set_all_certificates_trusted(true);
        assert!(lock(&caller.agent).is_none());
        caller.agent().unwrap();
        assert!(lock(&caller.agent).is_some());
    }

    #[test]
    fn test_authorization_rules() {
        let anon = JsonClientCaller::new("http://localhost:5000").unwrap();
        assert_eq!(anon.authorization(false).unwrap(), None);
        assert!(matches!(anon.authorization(true), Err(Error::Unauthorized(_))));

        let mut with_token =
            JsonClientCaller::with_token("http://localhost:5000", AuthToken::new("t", "u")).unwrap();
        // Token present, plain http not allowed: refused even for optional auth
        assert!(matches!(with_token.authorization(false), Err(Error::Unauthorized(_))));
        with_token.set_insecure_http_allowed(true);
        assert_eq!(with_token.authorization(true).unwrap(), Some("t"));

        let https = JsonClientCaller::with_token("https://host", AuthToken::new("t", "u")).unwrap();
        assert_eq!(https.authorization(true).unwrap(), Some("t"));
    }

    #[test]
    fn test_call_context_merging() {
        assert!(call_context(None, None).is_none());

        let pinned = call_context(None, Some("beta")).unwrap();
        assert_eq!(pinned.service_version(), Some("beta"));

        let ctx = RpcContext::new().with_run_id("r").with_service_version("old");
        let merged = call_context(Some(&ctx), Some("new")).unwrap();
        assert_eq!(merged.run_id.as_deref(), Some("r"));
        assert_eq!(merged.service_version(), Some("new"));

        let untouched = call_context(Some(&ctx), None).unwrap();
        assert_eq!(untouched, ctx);
    }

    #[test]
    fn test_capture_target_consumed_by_failed_call() {
        let caller = JsonClientCaller::new("http://localhost:5000").unwrap();
        let dir = tempfile::tempdir().unwrap();
        caller.set_file_for_next_response(dir.path().join("response.json"));

        let err = caller.jsonrpc_call("svc.op", vec![], None, true, None).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
        assert!(lock(&caller.file_for_next_response).is_none());
    }

    #[test]
    fn test_spooled_request_matches_buffered_body() {
        let request = RpcRequest::new("svc.op", vec![json!({"user_ids": ["a"]})], None);
        let mut spooled = Vec::new();
        spool_request(&request).unwrap().read_to_end(&mut spooled).unwrap();
        assert_eq!(spooled, codec::encode_request(&request).unwrap());
    }
}
