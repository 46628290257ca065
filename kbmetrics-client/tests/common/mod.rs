//! Common test utilities for kbmetrics-client integration tests
//!
//! This module provides a mock HTTP server that plays both the kb_Metrics
//! service and the authorization service, so clients can be exercised end to
//! end without a deployment.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;
use warp::http::{HeaderMap, Method, Response};
use warp::path::FullPath;
use warp::Filter;

pub const SERVICE_PATH: &str = "/services/kb_Metrics";
pub const AUTH_PATH: &str = "/services/auth/api/legacy/KBase/Sessions/Login";

/// A request as received by the mock server
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: String,
    pub path: String,
    /// Header names are lower-cased
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    /// Decoded form fields; only set for authorization requests
    pub form: HashMap<String, String>,
}

impl MockRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("request body is not JSON")
    }

    pub fn form(&self) -> HashMap<String, String> {
        self.form.clone()
    }

    pub fn is_chunked(&self) -> bool {
        self.header("transfer-encoding")
            .map(|v| v.eq_ignore_ascii_case("chunked"))
            .unwrap_or(false)
    }
}

/// A canned response
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
    pub delay: Option<Duration>,
}

impl MockResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn raw(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn into_reply(self) -> Response<String> {
        Response::builder()
            .status(self.status)
            .header("content-type", "application/json")
            .body(self.body)
            .unwrap()
    }
}

type Handler = dyn Fn(&MockRequest) -> MockResponse + Send + Sync + 'static;
type RequestLog = Arc<Mutex<Vec<MockRequest>>>;

/// Mock HTTP server for client testing
///
/// Runs a warp server on its own Tokio runtime in a background thread, so the
/// blocking client under test can call it from the test thread. Received
/// requests are kept for assertions. Dropping the server shuts it down.
pub struct MockHttpServer {
    addr: SocketAddr,
    requests: RequestLog,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockHttpServer {
    /// Start a server whose service endpoint answers with `service`
    ///
    /// The authorization endpoint accepts token "good-token" for user
    /// "alice" and the password "secret" for any user.
    pub fn with_service<F>(service: F) -> Self
    where
        F: Fn(&MockRequest) -> MockResponse + Send + Sync + 'static,
    {
        let requests: RequestLog = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(service);
        let (addr_tx, addr_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let log = requests.clone();
        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async move {
                let (addr, server) = warp::serve(routes(handler, log))
                    .bind_with_graceful_shutdown(([127, 0, 0, 1], 0), async {
                        shutdown_rx.await.ok();
                    });
                addr_tx.send(addr).unwrap();
                server.await;
            });
        });

        Self {
            addr: addr_rx.recv().unwrap(),
            requests,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn service_url(&self) -> String {
        format!("http://{}{}", self.addr, SERVICE_PATH)
    }

    pub fn auth_url(&self) -> String {
        format!("http://{}{}", self.addr, AUTH_PATH)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Requests received so far, in arrival order
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests sent to the service path only
    pub fn service_requests(&self) -> Vec<MockRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == SERVICE_PATH)
            .collect()
    }

    pub fn last_service_request(&self) -> MockRequest {
        self.service_requests()
            .pop()
            .expect("no request reached the service")
    }

    /// Shutdown the mock server
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockHttpServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn routes(
    handler: Arc<Handler>,
    log: RequestLog,
) -> impl Filter<Extract = (Response<String>,), Error = warp::Rejection> + Clone + Send + Sync + 'static {
    let auth_log = log.clone();
    let auth = warp::post()
        .and(warp::path!("services" / "auth" / "api" / "legacy" / "KBase" / "Sessions" / "Login"))
        .and(warp::header::headers_cloned())
        .and(warp::body::form())
        .map(move |headers: HeaderMap, form: HashMap<String, String>| {
            let response = auth_reply(&form);
            auth_log.lock().unwrap().push(MockRequest {
                method: Method::POST.to_string(),
                path: AUTH_PATH.to_string(),
                headers: header_map(&headers),
                body: Vec::new(),
                form,
            });
            response.into_reply()
        });

    let service = warp::method()
        .and(warp::path::full())
        .and(warp::header::headers_cloned())
        .and(warp::body::bytes())
        .and_then(
            move |method: Method, path: FullPath, headers: HeaderMap, body: bytes::Bytes| {
                let handler = handler.clone();
                let log = log.clone();
                async move {
                    let request = MockRequest {
                        method: method.to_string(),
                        path: path.as_str().to_string(),
                        headers: header_map(&headers),
                        body: body.to_vec(),
                        form: HashMap::new(),
                    };
                    let response = handler(&request);
                    log.lock().unwrap().push(request);

                    if let Some(delay) = response.delay {
                        tokio::time::sleep(delay).await;
                    }
                    Ok::<_, Infallible>(response.into_reply())
                }
            },
        );

    auth.or(service).unify()
}

fn header_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_ascii_lowercase(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect()
}

fn auth_reply(form: &HashMap<String, String>) -> MockResponse {
    if let Some(token) = form.get("token") {
        return if token == "good-token" {
            MockResponse::json(200, json!({"user_id": "alice"}))
        } else {
            MockResponse::json(401, json!({"error": "Invalid token"}))
        };
    }
    match (form.get("user_id"), form.get("password")) {
        (Some(user), Some(password)) if password == "secret" => {
            MockResponse::json(200, json!({"user_id": user, "token": format!("token-for-{}", user)}))
        }
        _ => MockResponse::json(401, json!({"error": "LoginFailure: Authentication failed."})),
    }
}

/// A success envelope whose result array holds `items`
pub fn rpc_result(items: Vec<Value>) -> MockResponse {
    MockResponse::json(200, json!({"version": "1.1", "id": "1", "result": items}))
}

/// An SDK-style error envelope, sent with HTTP 500
pub fn rpc_error(code: i64, message: &str) -> MockResponse {
    MockResponse::json(
        500,
        json!({
            "version": "1.1",
            "id": "1",
            "error": {
                "name": "JSONRPCError",
                "code": code,
                "message": message,
                "error": "Traceback (most recent call last): ..."
            }
        }),
    )
}
