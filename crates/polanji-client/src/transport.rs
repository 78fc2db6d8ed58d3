//! Transport seam between the gateway and the network.
//!
//! The gateway only ever talks to a [`Transport`]. Production runs use
//! [`ReqwestTransport`]; tests substitute scripted transports.

use crate::error::{ClientError, ClientResult};
use crate::operation::Operation;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// Transport-level error codes carried on responses that never got a status.
pub mod error_code {
    pub const NONE: u32 = 0;
    pub const GENERIC: u32 = 1000;
    pub const INVALID_URL: u32 = 1020;
    pub const REQUEST_TIMEOUT: u32 = 1050;
    pub const CONNECTION: u32 = 1200;
    pub const BODY_READ: u32 = 1300;
}

/// HTTP methods used by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A pre-serialized request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Json(String),
    Form(String),
}

impl Body {
    /// Serialize a value as a JSON body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> ClientResult<Self> {
        Ok(Body::Json(serde_json::to_string(value)?))
    }

    /// Serialize a value as an `application/x-www-form-urlencoded` body.
    pub fn form<T: Serialize + ?Sized>(value: &T) -> ClientResult<Self> {
        Ok(Body::Form(serde_urlencoded::to_string(value)?))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Body::Json(s) | Body::Form(s) => s,
        }
    }
}

/// A fully resolved request, ready for the wire.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<Body>,
    pub headers: Vec<(String, String)>,
    pub operation: Operation,
}

impl HttpRequest {
    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Timing breakdown of one exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timings {
    /// Total time from send to the last body byte.
    pub duration: Duration,
    /// Time from send until response headers arrived.
    pub waiting: Duration,
    /// Time spent reading the body.
    pub receiving: Duration,
}

/// The raw outcome of one request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub url: String,
    pub method: HttpMethod,
    /// HTTP status, or `0` when the transport failed.
    pub status: u16,
    pub body: String,
    pub error_code: u32,
    pub error: Option<String>,
    pub timings: Timings,
}

impl HttpResponse {
    /// A response carrying a status and body, with zero timings.
    pub fn new(method: HttpMethod, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            status,
            body: body.into(),
            error_code: error_code::NONE,
            error: None,
            timings: Timings::default(),
        }
    }

    /// A response standing in for a transport failure.
    pub fn transport_error(
        method: HttpMethod,
        url: impl Into<String>,
        error_code: u32,
        message: impl Into<String>,
        timings: Timings,
    ) -> Self {
        Self {
            url: url.into(),
            method,
            status: 0,
            body: String::new(),
            error_code,
            error: Some(message.into()),
            timings,
        }
    }

    /// True for transport failures and statuses outside `200..=399`.
    pub fn is_failed(&self) -> bool {
        self.error.is_some() || !(200..=399).contains(&self.status)
    }

    /// Parse the body into a typed value.
    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Parse the body as an untyped JSON value.
    pub fn json_value(&self) -> ClientResult<Value> {
        self.json()
    }

    /// Select a value by dot path, e.g. `user.id` or `items.0.id`.
    ///
    /// Returns `None` when the body is not JSON or the path does not exist.
    pub fn json_path(&self, path: &str) -> Option<Value> {
        let root = self.json_value().ok()?;
        select_path(&root, path).cloned()
    }

    /// True when the body is a JSON array with no elements.
    pub fn is_empty_list(&self) -> bool {
        matches!(self.json_value(), Ok(Value::Array(items)) if items.is_empty())
    }
}

/// Walk a dot path through a JSON document.
pub fn select_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    path.split('.').try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Issues requests on behalf of the gateway.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a request. Failures are reported inside the response.
    async fn execute(&self, request: &HttpRequest) -> HttpResponse;
}

/// Transport backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with the given per-request timeout.
    pub fn new(timeout: Duration) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| ClientError::Http(e.to_string()))?;

        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn classify(err: &reqwest::Error) -> u32 {
    if err.is_timeout() {
        error_code::REQUEST_TIMEOUT
    } else if err.is_builder() {
        error_code::INVALID_URL
    } else if err.is_connect() {
        error_code::CONNECTION
    } else if err.is_body() || err.is_decode() {
        error_code::BODY_READ
    } else {
        error_code::GENERIC
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &HttpRequest) -> HttpResponse {
        let mut builder = self.client.request(request.method.into(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.as_str().to_owned());
        }

        let start = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let elapsed = start.elapsed();
                debug!(url = %request.url, error = %e, "Request failed before a response arrived");
                return HttpResponse::transport_error(
                    request.method,
                    &request.url,
                    classify(&e),
                    e.to_string(),
                    Timings {
                        duration: elapsed,
                        waiting: elapsed,
                        receiving: Duration::ZERO,
                    },
                );
            }
        };

        let waiting = start.elapsed();
        let status = response.status().as_u16();
        let receive_start = Instant::now();
        let body = response.text().await;
        let receiving = receive_start.elapsed();
        let timings = Timings {
            duration: start.elapsed(),
            waiting,
            receiving,
        };

        match body {
            Ok(body) => HttpResponse {
                url: request.url.clone(),
                method: request.method,
                status,
                body,
                error_code: error_code::NONE,
                error: None,
                timings,
            },
            Err(e) => HttpResponse {
                url: request.url.clone(),
                method: request.method,
                status,
                body: String::new(),
                error_code: classify(&e),
                error: Some(e.to_string()),
                timings,
            },
        }
    }
}
