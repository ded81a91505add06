use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::models::{Audience, InsightsQuery, InsightsResult, Tag};
use crate::services::qloo::retry::RetryingClient;
use crate::services::qloo::transport::Method;

/// Typed gateway over the Qloo API
///
/// Assembles provider-specific requests on top of `RetryingClient` and
/// enforces the contract rules the retry layer does not know about: the
/// mandatory `filter.type` parameter, the POST-needs-a-reason rule, and the
/// `recommendations` field on insights responses.
pub struct QlooClient {
    client: RetryingClient,
}

impl QlooClient {
    pub fn new(client: RetryingClient) -> Self {
        Self { client }
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    /// Fetches insights from `/v2/insights`
    ///
    /// GET is the default verb for this idempotent read. POST is an
    /// exceptional path: it must be justified via `post_reason`, which is
    /// logged, and moves the parameter set into a `{"params": ...}` body.
    pub async fn get_insights(
        &self,
        query: &InsightsQuery,
        use_post: bool,
        post_reason: Option<&str>,
    ) -> AppResult<InsightsResult> {
        if query.filter_type.is_empty() {
            return Err(AppError::InvalidInput(
                "filter.type is required for all /v2/insights calls".to_string(),
            ));
        }

        let mut params: Vec<(String, String)> =
            vec![("filter.type".to_string(), query.filter_type.clone())];

        if let Some(tags) = &query.filter_tags {
            params.push(("filter.tags".to_string(), tags.clone()));
        }

        if let Some(tags) = &query.signal_interests_tags {
            params.push(("signal.interests.tags".to_string(), tags.clone()));
        }

        for (key, value) in &query.extra {
            // Extras merge last but may not clobber the mandatory parameter
            if key == "filter.type" {
                tracing::debug!("Dropping extra parameter attempting to override filter.type");
                continue;
            }
            params.push((key.clone(), value.clone()));
        }

        let response = if use_post {
            let reason = match post_reason {
                Some(reason) if !reason.is_empty() => reason,
                _ => {
                    return Err(AppError::InvalidInput(
                        "post_reason is required when using POST method".to_string(),
                    ))
                }
            };
            tracing::info!(reason = %reason, "Using POST for /v2/insights");

            let mut body = serde_json::Map::new();
            for (key, value) in params {
                body.insert(key, Value::String(value));
            }
            let body = serde_json::json!({ "params": body });

            self.client
                .execute(Method::Post, "/v2/insights", &[], Some(&body))
                .await?
        } else {
            self.client
                .execute(Method::Get, "/v2/insights", &params, None)
                .await?
        };

        // The field itself is the contract, not just a non-empty body
        if response.get("recommendations").is_none() {
            tracing::warn!("Qloo insights response missing 'recommendations' field");
            return Err(AppError::Upstream);
        }

        serde_json::from_value(response).map_err(|e| {
            tracing::error!(error = %e, "Malformed Qloo insights response");
            AppError::Upstream
        })
    }

    /// Searches Qloo entities via `/search`
    pub async fn search(&self, query: &str, entity_type: Option<&str>) -> AppResult<Value> {
        let mut params = vec![("q".to_string(), query.to_string())];
        if let Some(entity_type) = entity_type {
            params.push(("type".to_string(), entity_type.to_string()));
        }

        self.client.execute(Method::Get, "/search", &params, None).await
    }

    /// Fetches the tag catalog from `/v2/tags`
    ///
    /// Callers must validate tags against this catalog before using them in
    /// insights requests.
    pub async fn get_tags(&self, tag_type: Option<&str>) -> AppResult<Vec<Tag>> {
        let mut params = Vec::new();
        if let Some(tag_type) = tag_type {
            params.push(("type".to_string(), tag_type.to_string()));
        }

        let response = self.client.execute(Method::Get, "/v2/tags", &params, None).await?;

        match response.get("tags") {
            Some(tags) => serde_json::from_value(tags.clone()).map_err(|e| {
                tracing::error!(error = %e, "Malformed Qloo tags response");
                AppError::Upstream
            }),
            None => Ok(Vec::new()),
        }
    }

    /// Fetches the audience catalog from `/v2/audiences`
    pub async fn get_audiences(&self) -> AppResult<Vec<Audience>> {
        let response = self
            .client
            .execute(Method::Get, "/v2/audiences", &[], None)
            .await?;

        match response.get("audiences") {
            Some(audiences) => serde_json::from_value(audiences.clone()).map_err(|e| {
                tracing::error!(error = %e, "Malformed Qloo audiences response");
                AppError::Upstream
            }),
            None => Ok(Vec::new()),
        }
    }

    /// Validates API connectivity and credentials
    ///
    /// Issues a minimal insights call with a known-valid tag pair. Degrades
    /// every failure to `false`; health checks want a boolean, not an error.
    pub async fn validate_connection(&self) -> bool {
        let params = vec![
            (
                "filter.type".to_string(),
                "urn:entity:destination".to_string(),
            ),
            (
                "filter.tags".to_string(),
                "urn:tag:cuisine:thai".to_string(),
            ),
        ];

        match self
            .client
            .execute(Method::Get, "/v2/insights", &params, None)
            .await
        {
            Ok(response) => response
                .get("recommendations")
                .and_then(Value::as_array)
                .is_some_and(|recs| !recs.is_empty()),
            Err(e) => {
                tracing::error!(error = %e, "Qloo connection validation failed");
                false
            }
        }
    }
}
