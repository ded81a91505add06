use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, AppResult};
use crate::services::qloo::transport::{Method, Transport, TransportError};

pub const MAX_RETRIES: u32 = 3;
pub const BACKOFF_BASE: f64 = 2.0;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Retrying HTTP client for the Qloo API
///
/// One logical call is at most `MAX_RETRIES` sequential attempts. Only rate
/// limiting (429) and transport timeouts are retried; any other non-200
/// status or transport failure is terminal on first occurrence. Every
/// failure surfaces as `AppError::Upstream` so callers see a single error
/// taxonomy; the underlying detail is logged here and goes no further.
pub struct RetryingClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    api_key: String,
    cancel: CancellationToken,
}

impl RetryingClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: String,
        api_key: String,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            base_url,
            api_key,
            cancel,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("x-api-key".to_string(), self.api_key.clone()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ]
    }

    /// Executes one logical request against the Qloo API
    ///
    /// `query` and `json_body` are mutually exclusive in practice: GET calls
    /// carry query parameters, POST calls carry a body with an empty query
    /// string. The caller picks the shape.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        json_body: Option<&Value>,
    ) -> AppResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        let headers = self.headers();
        let mut attempt: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }

            let send = self
                .transport
                .send(method, &url, &headers, query, json_body.cloned(), REQUEST_TIMEOUT);
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(AppError::Cancelled),
                r = send => r,
            };

            match result {
                Ok(response) if response.status == 429 => {
                    if attempt < MAX_RETRIES - 1 {
                        let backoff =
                            BACKOFF_BASE.powi(attempt as i32) + rand::thread_rng().gen_range(0.0..1.0);
                        tracing::warn!(
                            attempt = attempt + 1,
                            max_attempts = MAX_RETRIES,
                            backoff_secs = backoff,
                            "Rate limited by Qloo API, backing off"
                        );
                        self.backoff_sleep(backoff).await?;
                        attempt += 1;
                    } else {
                        tracing::error!("Max retries exceeded for rate limited request");
                        return Err(AppError::Upstream);
                    }
                }
                Ok(response) if response.status != 200 => {
                    // 4xx other than 429 and non-timeout 5xx are assumed
                    // non-transient, so no retry.
                    tracing::error!(
                        status = response.status,
                        body = %response.body,
                        "Qloo API error"
                    );
                    return Err(AppError::Upstream);
                }
                Ok(response) => {
                    return match serde_json::from_str::<Value>(&response.body) {
                        Ok(value) if !is_empty_payload(&value) => Ok(value),
                        Ok(_) => {
                            // A 200 with no usable payload violates the
                            // provider contract just as much as a 5xx.
                            tracing::error!("Qloo API returned an empty response body");
                            Err(AppError::Upstream)
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to parse Qloo API response");
                            Err(AppError::Upstream)
                        }
                    };
                }
                Err(TransportError::Timeout) => {
                    if attempt < MAX_RETRIES - 1 {
                        let backoff = BACKOFF_BASE.powi(attempt as i32);
                        tracing::warn!(
                            attempt = attempt + 1,
                            max_attempts = MAX_RETRIES,
                            backoff_secs = backoff,
                            "Qloo API timeout, backing off"
                        );
                        self.backoff_sleep(backoff).await?;
                        attempt += 1;
                    } else {
                        tracing::error!("Max retries exceeded for timeout");
                        return Err(AppError::Upstream);
                    }
                }
                Err(TransportError::Other(detail)) => {
                    tracing::error!(error = %detail, "Unexpected error calling Qloo API");
                    return Err(AppError::Upstream);
                }
            }
        }
    }

    /// Cancellable backoff sleep between attempts
    async fn backoff_sleep(&self, secs: f64) -> AppResult<()> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AppError::Cancelled),
            _ = tokio::time::sleep(Duration::from_secs_f64(secs)) => Ok(()),
        }
    }
}

/// Mirrors the provider compliance rule that a "successful" response must
/// carry a populated body: null, `{}`, `[]`, `""`, `false` and `0` all count
/// as empty.
fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::qloo::transport::{MockTransport, TransportResponse};
    use mockall::Sequence;

    fn client_with(transport: MockTransport) -> RetryingClient {
        RetryingClient::new(
            Arc::new(transport),
            "http://test.local".to_string(),
            "test_key".to_string(),
            CancellationToken::new(),
        )
    }

    fn ok_response(body: &str) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    fn status_response(status: u16) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse {
            status,
            body: String::new(),
        })
    }

    #[tokio::test]
    async fn test_success_returns_body() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_, _, _, _, _, _| ok_response(r#"{"tags": []}"#));

        let client = client_with(transport);
        let value = client.execute(Method::Get, "/v2/tags", &[], None).await.unwrap();
        assert!(value.get("tags").is_some());
    }

    #[tokio::test]
    async fn test_sends_api_key_header() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .withf(|_, url, headers, _, _, _| {
                url == "http://test.local/v2/tags"
                    && headers.contains(&("x-api-key".to_string(), "test_key".to_string()))
                    && headers
                        .contains(&("Content-Type".to_string(), "application/json".to_string()))
            })
            .returning(|_, _, _, _, _, _| ok_response(r#"{"tags": []}"#));

        let client = client_with(transport);
        client.execute(Method::Get, "/v2/tags", &[], None).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_then_success_uses_all_attempts() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();
        for _ in 0..MAX_RETRIES - 1 {
            transport
                .expect_send()
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _, _, _, _, _| status_response(429));
        }
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _, _, _| ok_response(r#"{"recommendations": [{"id": "r1"}]}"#));

        let client = client_with(transport);
        let value = client.execute(Method::Get, "/v2/insights", &[], None).await.unwrap();
        assert_eq!(value["recommendations"][0]["id"], "r1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_exhaustion_fails_after_max_attempts() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(MAX_RETRIES as usize)
            .returning(|_, _, _, _, _, _| status_response(429));

        let client = client_with(transport);
        let start = tokio::time::Instant::now();
        let err = client.execute(Method::Get, "/v2/insights", &[], None).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream));

        // Two backoffs: 2^0 + jitter and 2^1 + jitter, jitter in [0, 1)
        let elapsed = start.elapsed().as_secs_f64();
        assert!(elapsed >= 3.0, "elapsed {elapsed} below backoff floor");
        assert!(elapsed < 5.0, "elapsed {elapsed} above backoff ceiling");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_retried_without_jitter() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(MAX_RETRIES as usize)
            .returning(|_, _, _, _, _, _| Err(TransportError::Timeout));

        let client = client_with(transport);
        let start = tokio::time::Instant::now();
        let err = client.execute(Method::Get, "/v2/insights", &[], None).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream));

        let elapsed = start.elapsed().as_secs_f64();
        assert!((3.0..3.1).contains(&elapsed), "elapsed {elapsed}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_then_success() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _, _, _| Err(TransportError::Timeout));
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _, _, _| ok_response(r#"{"ok": true}"#));

        let client = client_with(transport);
        let value = client.execute(Method::Get, "/search", &[], None).await.unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn test_non_retryable_status_fails_immediately() {
        for status in [400, 401, 403, 404, 500, 503] {
            let mut transport = MockTransport::new();
            transport
                .expect_send()
                .times(1)
                .returning(move |_, _, _, _, _, _| status_response(status));

            let client = client_with(transport);
            let err = client.execute(Method::Get, "/v2/tags", &[], None).await.unwrap_err();
            assert!(matches!(err, AppError::Upstream), "status {status}");
        }
    }

    #[tokio::test]
    async fn test_connection_error_fails_immediately() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_, _, _, _, _, _| Err(TransportError::Other("connection refused".to_string())));

        let client = client_with(transport);
        let err = client.execute(Method::Get, "/v2/tags", &[], None).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream));
    }

    #[tokio::test]
    async fn test_unparseable_body_fails() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_, _, _, _, _, _| ok_response("not json"));

        let client = client_with(transport);
        let err = client.execute(Method::Get, "/v2/tags", &[], None).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream));
    }

    #[tokio::test]
    async fn test_empty_payloads_fail() {
        for body in ["null", "{}", "[]", r#""""#, "false", "0"] {
            let mut transport = MockTransport::new();
            let body_owned = body.to_string();
            transport
                .expect_send()
                .times(1)
                .returning(move |_, _, _, _, _, _| ok_response(&body_owned));

            let client = client_with(transport);
            let err = client.execute(Method::Get, "/v2/tags", &[], None).await.unwrap_err();
            assert!(matches!(err, AppError::Upstream), "body {body}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_backoff() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_, _, _, _, _, _| status_response(429));

        let cancel = CancellationToken::new();
        let client = RetryingClient::new(
            Arc::new(transport),
            "http://test.local".to_string(),
            "test_key".to_string(),
            cancel.clone(),
        );

        let handle = tokio::spawn(async move {
            client.execute(Method::Get, "/v2/insights", &[], None).await
        });

        // Let the first attempt land and the backoff sleep start
        tokio::task::yield_now().await;
        cancel.cancel();

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(0);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let client = RetryingClient::new(
            Arc::new(transport),
            "http://test.local".to_string(),
            "test_key".to_string(),
            cancel,
        );

        let err = client.execute(Method::Get, "/v2/tags", &[], None).await.unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
    }
}
