//! HTTP transport used by every balancer.
//!
//! Balancers only see the [`Transport`] trait: a request goes in, a
//! [`Payload`] comes out, parsed as JSON when the server says so and left as
//! text otherwise. [`HttpClient`] is the reqwest-backed implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{BalancerError, Result};

const DEFAULT_USER_AGENT: &str = concat!("balancers/", env!("CARGO_PKG_VERSION"));

/// A single outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Sent as a JSON body with `Content-Type: application/json`.
    pub body: Option<Value>,
    /// Sent as `Authorization: Bearer <token>`.
    pub bearer: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn bearer(mut self, token: Option<&str>) -> Self {
        self.bearer = token.map(str::to_string);
        self
    }

    #[must_use]
    pub fn json_body(mut self, body: Value) -> Self {
        self.method = Method::POST;
        self.body = Some(body);
        self
    }
}

/// Response body, shaped by the response content type.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    /// The JSON value, or `Null` for a text body.
    pub fn into_json(self) -> Value {
        match self {
            Payload::Json(v) => v,
            Payload::Text(_) => Value::Null,
        }
    }

    /// The markup, or `None` for a JSON body.
    pub fn into_text(self) -> Option<String> {
        match self {
            Payload::Text(t) => Some(t),
            Payload::Json(_) => None,
        }
    }
}

/// Request function the balancers depend on.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, request: HttpRequest) -> Result<Payload>;
}

/// reqwest-backed [`Transport`] with compression, pooling and timeouts.
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        Self::with_options(DEFAULT_USER_AGENT, Duration::from_secs(30))
    }

    pub fn with_options(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            // Keep connections alive across fan-out rounds
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .zstd(true)
            .gzip(true)
            .deflate(true)
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self { client })
    }

    /// Get the underlying reqwest client
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpClient {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn request(&self, request: HttpRequest) -> Result<Payload> {
        let mut builder = self.client.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        debug!(status = %status, "Response received");

        if !status.is_success() {
            return Err(BalancerError::Status {
                url: request.url,
                status: status.as_u16(),
            });
        }

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));

        if is_json {
            Ok(Payload::Json(response.json().await?))
        } else {
            Ok(Payload::Text(response.text().await?))
        }
    }
}
