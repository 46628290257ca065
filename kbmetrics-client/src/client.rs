//! Typed client for the kb_Metrics service
//!
//! `KbMetricsClient` exposes one method per remote operation. Every typed
//! operation does the same four things:
//!
//! 1. serialize the parameter record as the single positional argument
//! 2. invoke `kb_Metrics.<operation>` through the [`JsonClientCaller`]
//! 3. require a one-element result array
//! 4. decode and return that element
//!
//! `status` is the exception: it takes no arguments, does not require
//! credentials, and returns an open key/value map.
//!
//! # Service Version
//!
//! A release tag pinned with [`KbMetricsClient::set_service_version`] is sent
//! with every call. A context carrying its own tag
//! ([`RpcContext::with_service_version`]) overrides the pin for that call.
//!
//! # Thread Safety
//!
//! Calls take `&self` and block the calling thread until the response arrives
//! or the read timeout expires. Configuration setters take `&mut self`, so a
//! client shared across threads must be configured before it is shared.

use crate::auth::{AuthProvider, AuthToken};
use crate::caller::JsonClientCaller;
use crate::models::{
    AppMetricsParams, AppMetricsResult, MetricsInputParams, MetricsOutput, ServiceStatus,
};
use kbmetrics_core::types::method_name;
use kbmetrics_core::{codec, Result, RpcContext};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Module name of the remote service
pub const SERVICE_NAME: &str = "kb_Metrics";

/// Client for the kb_Metrics JSON-RPC service
#[derive(Debug)]
pub struct KbMetricsClient {
    caller: JsonClientCaller,
    service_version: Option<String>,
}

/// Typed operations: `method => "wire_name" (Params) -> Result;`
macro_rules! typed_operations {
    ($(
        $(#[$meta:meta])*
        $method:ident => $operation:literal ($params:ty) -> $result:ty;
    )*) => {
        impl KbMetricsClient {
            $(
                $(#[$meta])*
                ///
                /// # Errors
                ///
                /// `Io` on transport failure, `Remote` on a service error,
                /// `Protocol` if the result array is empty or malformed,
                /// `Unauthorized` if the client has no usable credentials.
                pub fn $method(
                    &self,
                    params: &$params,
                    context: Option<&RpcContext>,
                ) -> Result<$result> {
                    self.call_single($operation, params, context)
                }
            )*

            /// Remote names of all typed operations, in declaration order
            pub const OPERATIONS: &'static [&'static str] = &[$($operation),*];
        }
    };
}

typed_operations! {
    /// Job states of the given users' app runs within the epoch range
    get_app_metrics => "get_app_metrics" (AppMetricsParams) -> AppMetricsResult;

    /// Refresh the service's metrics store for the given window
    update_metrics => "update_metrics" (MetricsInputParams) -> MetricsOutput;

    /// Profile details of KBase users
    get_user_details => "get_user_details" (MetricsInputParams) -> MetricsOutput;

    /// Profile details of users outside KBase staff
    get_nonkbuser_details => "get_nonkbuser_details" (MetricsInputParams) -> MetricsOutput;

    /// Users who signed up and came back within the window
    get_signup_returning_users => "get_signup_returning_users" (MetricsInputParams) -> MetricsOutput;

    /// Returning sign-ups, excluding KBase staff
    get_signup_returning_nonkbusers => "get_signup_returning_nonkbusers" (MetricsInputParams) -> MetricsOutput;

    /// Daily counts of new and active users
    get_user_counts_per_day => "get_user_counts_per_day" (MetricsInputParams) -> MetricsOutput;

    /// Login totals over the window
    get_total_logins => "get_total_logins" (MetricsInputParams) -> MetricsOutput;

    /// Login totals, excluding KBase staff
    get_nonkb_total_logins => "get_nonkb_total_logins" (MetricsInputParams) -> MetricsOutput;

    /// Per-user login activity
    get_user_logins => "get_user_logins" (MetricsInputParams) -> MetricsOutput;

    /// Per-user counts of workspace objects
    get_user_num_objs => "get_user_numObjs" (MetricsInputParams) -> MetricsOutput;

    /// Narrative creation and access statistics
    get_narrative_stats => "get_narrative_stats" (MetricsInputParams) -> MetricsOutput;

    /// Per-user workspace statistics
    get_user_ws_stats => "get_user_ws_stats" (MetricsInputParams) -> MetricsOutput;
}

impl KbMetricsClient {
    /// Client for `url` without credentials
    ///
    /// Only `status` works without credentials; typed operations fail with
    /// `Error::Unauthorized`.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use kbmetrics_client::KbMetricsClient;
    ///
    /// let client = KbMetricsClient::new("https://kbase.us/services/kb_Metrics")?;
    /// let status = client.status(None)?;
    /// println!("{:?}", status.get("version"));
    /// # Ok::<(), kbmetrics_core::Error>(())
    /// ```
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Ok(Self::from_caller(JsonClientCaller::new(url)?))
    }

    /// Client with a pre-obtained token, validated against `auth` now
    pub fn with_token(url: impl Into<String>, token: &str, auth: &dyn AuthProvider) -> Result<Self> {
        let token = auth.validate_token(token)?;
        Ok(Self::from_caller(JsonClientCaller::with_token(url, token)?))
    }

    /// Client whose token is obtained by logging in to `auth` now
    pub fn with_credentials(
        url: impl Into<String>,
        user: &str,
        password: &str,
        auth: &dyn AuthProvider,
    ) -> Result<Self> {
        let token = auth.login(user, password)?;
        Ok(Self::from_caller(JsonClientCaller::with_token(url, token)?))
    }

    /// Start a [`ClientBuilder`](crate::ClientBuilder) for `url`
    pub fn builder(url: impl Into<String>) -> crate::ClientBuilder {
        crate::ClientBuilder::new(url)
    }

    pub(crate) fn from_caller(caller: JsonClientCaller) -> Self {
        Self {
            caller,
            service_version: None,
        }
    }

    /// Liveness and version probe
    ///
    /// Returns the server's status object unchanged; no key is required.
    #[tracing::instrument(skip(self, context))]
    pub fn status(&self, context: Option<&RpcContext>) -> Result<ServiceStatus> {
        let result = self.caller.jsonrpc_call(
            &method_name(SERVICE_NAME, "status"),
            Vec::new(),
            context,
            false,
            self.effective_version(context),
        )?;
        codec::unwrap_single(result)
    }

    #[tracing::instrument(skip(self, params, context))]
    fn call_single<P, R>(&self, operation: &str, params: &P, context: Option<&RpcContext>) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let args = vec![codec::to_param(params)?];
        let result = self.caller.jsonrpc_call(
            &method_name(SERVICE_NAME, operation),
            args,
            context,
            true,
            self.effective_version(context),
        )?;
        codec::unwrap_single(result)
    }

    /// Per-call tag first, then the client's pin
    fn effective_version<'a>(&'a self, context: Option<&'a RpcContext>) -> Option<&'a str> {
        context
            .and_then(RpcContext::service_version)
            .or(self.service_version.as_deref())
    }

    pub fn url(&self) -> &str {
        self.caller.url()
    }

    /// The token sent with each call, if any
    pub fn token(&self) -> Option<&AuthToken> {
        self.caller.token()
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.caller.read_timeout()
    }

    /// Set the read timeout; `None` or zero waits forever
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.caller.set_read_timeout(timeout);
    }

    pub fn is_insecure_http_allowed(&self) -> bool {
        self.caller.is_insecure_http_allowed()
    }

    pub fn set_insecure_http_allowed(&mut self, allowed: bool) {
        self.caller.set_insecure_http_allowed(allowed);
    }

    pub fn is_all_certificates_trusted(&self) -> bool {
        self.caller.is_all_certificates_trusted()
    }

    pub fn set_all_certificates_trusted(&mut self, trust_all: bool) {
        self.caller.set_all_certificates_trusted(trust_all);
    }

    pub fn is_streaming_mode_on(&self) -> bool {
        self.caller.is_streaming_mode_on()
    }

    pub fn set_streaming_mode(&mut self, streaming: bool) {
        self.caller.set_streaming_mode(streaming);
    }

    pub fn service_version(&self) -> Option<&str> {
        self.service_version.as_deref()
    }

    /// Pin the service release used by subsequent calls; `None` clears it
    pub fn set_service_version(&mut self, version: Option<String>) {
        self.service_version = version;
    }

    /// Write the raw body of the next response to `path` as well
    pub fn set_file_for_next_response(&self, path: impl Into<PathBuf>) {
        self.caller.set_file_for_next_response(path);
    }

    pub(crate) fn caller_mut(&mut self) -> &mut JsonClientCaller {
        &mut self.caller
    }
}
