use std::time::Duration;

/// Single-exchange HTTP transport used by the Qloo client
///
/// The trait exists so the retry layer can be exercised against a mock
/// without a network. The production implementation is a thin wrapper over
/// `reqwest`; it performs exactly one request per `send` call and leaves all
/// retry decisions to the caller.
use async_trait::async_trait;

/// HTTP verbs the Qloo API accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Transport-level failures, before any status-code interpretation
///
/// `Timeout` is kept distinct because it is the only transport failure the
/// retry layer treats as transient.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Other(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        method: Method,
        url: &str,
        headers: &[(String, String)],
        query: &[(String, String)],
        json_body: Option<serde_json::Value>,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError>;
}

/// Production transport over `reqwest`
#[derive(Clone, Default)]
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: Method,
        url: &str,
        headers: &[(String, String)],
        query: &[(String, String)],
        json_body: Option<serde_json::Value>,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        let mut request = match method {
            Method::Get => self.http_client.get(url),
            Method::Post => self.http_client.post(url),
        };

        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        if !query.is_empty() {
            request = request.query(query);
        }

        if let Some(body) = json_body {
            request = request.json(&body);
        }

        let response = request.timeout(timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Other(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(TransportResponse { status, body })
    }
}
