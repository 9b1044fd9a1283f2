//! HTTP transport abstraction
//!
//! The dispatcher builds a fully resolved `Request` and hands it to a
//! `Transport`; the transport only moves bytes. `ReqwestTransport` is the
//! production implementation, tests substitute a recording fake.
//!
//! Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn Transport>`).

use std::future::Future;
use std::pin::Pin;

use reqwest::Method;
use reqwest::header::HeaderMap;
use tracing::debug;

use crate::error::{Error, Result};

/// Outgoing request with query and body already encoded.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Absolute URL without query string
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    /// JSON body, absent for reads
    pub body: Option<serde_json::Value>,
}

/// Raw response: status and body bytes.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait Transport: Send + Sync {
    /// Send one request. Non-2xx statuses are returned as `Ok`; only failures
    /// below HTTP (connect, TLS, reading the body) are errors.
    fn send(&self, request: Request) -> Pin<Box<dyn Future<Output = Result<Response>> + Send + '_>>;
}

/// `Transport` backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Transport with a default `reqwest::Client`.
    pub fn try_default() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("building HTTP client: {e}")))?;
        Ok(Self::new(client))
    }
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        request: Request,
    ) -> Pin<Box<dyn Future<Output = Result<Response>> + Send + '_>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .request(request.method, &request.url)
                .headers(request.headers);
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout
                } else {
                    Error::Transport(e.to_string())
                }
            })?;

            let status = response.status().as_u16();
            let body = response
                .bytes()
                .await
                .map_err(|e| Error::Transport(format!("reading response body: {e}")))?;
            debug!(status, bytes = body.len(), "response received");

            Ok(Response {
                status,
                body: body.to_vec(),
            })
        })
    }
}
