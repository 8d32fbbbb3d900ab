//! HTTP transport seam used by the payment client

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::{PaymentError, Result};

/// JSON-over-HTTP capability the client is built on
///
/// Implementations report non-2xx answers through
/// [`PaymentError::from_status`], timeouts as [`PaymentError::Timeout`] and
/// abandoned requests as [`PaymentError::Cancelled`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// GET `path` with the given query parameters
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value>;

    /// POST a JSON body to `path`
    async fn post(&self, path: &str, body: &Value) -> Result<Value>;

    /// PUT a JSON body to `path`
    async fn put(&self, path: &str, body: &Value) -> Result<Value>;
}

/// [`HttpTransport`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    base_url: String,
    client: Client,
    headers: HeaderMap,
}

impl ReqwestTransport {
    /// Create a transport from a validated config
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut client_builder = Client::builder();
        if let Some(timeout) = config.timeout {
            client_builder = client_builder.timeout(timeout);
        }
        let client = client_builder
            .build()
            .map_err(|e| PaymentError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            headers: header_map(&config.headers)?,
        })
    }

    /// Override the underlying reqwest client
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<reqwest::Url> {
        let joined = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        reqwest::Url::parse(&joined)
            .map_err(|e| PaymentError::config(format!("Invalid request URL '{}': {}", joined, e)))
    }

    async fn send(
        &self,
        method: http::Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = self.url(path)?;
        debug!(method = %method, url = %url, "sending payment request");

        let mut builder = self
            .client
            .request(method.clone(), url.clone())
            .headers(self.headers.clone());
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_reqwest)?;
        let status = response.status();
        let text = response.text().await.map_err(map_reqwest)?;

        if !status.is_success() {
            warn!(method = %method, url = %url, status = status.as_u16(), "payment request failed");
            return Err(PaymentError::from_status(status.as_u16(), error_body(text)));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value> {
        self.send(http::Method::GET, path, query, None).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.send(http::Method::POST, path, &[], Some(body)).await
    }

    async fn put(&self, path: &str, body: &Value) -> Result<Value> {
        self.send(http::Method::PUT, path, &[], Some(body)).await
    }
}

fn map_reqwest(error: reqwest::Error) -> PaymentError {
    if error.is_timeout() {
        PaymentError::Timeout
    } else {
        PaymentError::Http(error)
    }
}

/// The server's error body as JSON, or as a JSON string when it is not JSON
fn error_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

fn header_map(headers: &std::collections::HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| PaymentError::config(format!("Invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| PaymentError::config(format!("Invalid header value for '{}': {}", name, e)))?;
        map.insert(name, value);
    }
    Ok(map)
}
