//! Outbound HTTP transport.
//!
//! Endpoint discovery talks to upstreams only through `HttpTransport`, so
//! tests can substitute scripted transports for the reqwest-backed one.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Default per-call timeout for upstream requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl core::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// A fully rendered upstream call.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<JsonValue>,
    /// Overrides the transport's default timeout when set.
    pub timeout: Option<Duration>,
}

impl OutboundRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn post(url: impl Into<String>, body: JsonValue) -> Self {
        Self {
            method: HttpMethod::Post,
            body: Some(body),
            ..Self::get(url)
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Why a single candidate endpoint did not produce a usable answer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CandidateError {
    #[error("could not build request: {0}")]
    Request(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("unexpected response shape (HTTP {status}): {detail}")]
    Shape { status: u16, detail: String },
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: OutboundRequest) -> Result<TransportResponse, CandidateError>;
}

/// Production transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: OutboundRequest) -> Result<TransportResponse, CandidateError> {
        let timeout = request.timeout.unwrap_or(self.timeout);

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                CandidateError::Timeout(timeout)
            } else {
                CandidateError::Transport(e.to_string())
            }
        };

        let response = builder.timeout(timeout).send().await.map_err(map_err)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_err)?;

        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::extract::Query;
    use axum::http::HeaderMap;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;

    async fn spawn(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn sends_query_headers_and_body() {
        let router = Router::new()
            .route(
                "/check",
                get(|Query(q): Query<Vec<(String, String)>>, headers: HeaderMap| async move {
                    let secret = headers
                        .get("x-service-secret")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    Json(json!({ "query": q, "secret": secret }))
                }),
            )
            .route("/echo", post(|Json(body): Json<JsonValue>| async move { Json(body) }));
        let addr = spawn(router).await;
        let transport = ReqwestTransport::new(DEFAULT_TIMEOUT).unwrap();

        let mut request = OutboundRequest::get(format!("http://{addr}/check"));
        request.query = vec![("role".to_string(), "user".to_string())];
        request.headers = vec![("X-Service-Secret".to_string(), "s".to_string())];
        let response = transport.execute(request).await.unwrap();
        assert_eq!(response.status, 200);
        let body: JsonValue = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body, json!({ "query": [["role", "user"]], "secret": "s" }));

        let response = transport
            .execute(OutboundRequest::post(format!("http://{addr}/echo"), json!({ "token": "t" })))
            .await
            .unwrap();
        let body: JsonValue = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body, json!({ "token": "t" }));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let router = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let addr = spawn(router).await;
        let transport = ReqwestTransport::new(DEFAULT_TIMEOUT).unwrap();

        let mut request = OutboundRequest::get(format!("http://{addr}/slow"));
        request.timeout = Some(Duration::from_millis(50));
        let err = transport.execute(request).await.unwrap_err();
        assert_eq!(err, CandidateError::Timeout(Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = ReqwestTransport::new(DEFAULT_TIMEOUT).unwrap();
        let err = transport
            .execute(OutboundRequest::get(format!("http://{addr}/health")))
            .await
            .unwrap_err();
        assert!(matches!(err, CandidateError::Transport(_)));
    }
}
