use axum::{extract::State, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::{
    api::AppState,
    cached,
    db::CacheKey,
    error::{AppError, AppResult},
    models::InsightsQuery,
};

const INSIGHTS_CACHE_TTL: u64 = 300; // 5 minutes

/// Handler for the cuisine tag catalog
pub async fn cuisine_tags(State(state): State<AppState>) -> Json<serde_json::Value> {
    let tags = state.tags.get_cuisine_tags().await;
    Json(json!({ "cuisine_tags": tags }))
}

/// Handler for the audience catalog
pub async fn audiences(State(state): State<AppState>) -> Json<serde_json::Value> {
    let audiences = state.tags.get_all_audiences().await;
    Json(json!({ "audiences": audiences }))
}

#[derive(Debug, Deserialize)]
pub struct InsightsParams {
    #[serde(default = "default_filter_type")]
    pub filter_type: String,
    pub filter_tags: Option<String>,
    pub signal_interests_tags: Option<String>,
}

fn default_filter_type() -> String {
    "urn:entity:destination".to_string()
}

/// Handler for proxied insights requests
///
/// `filter_tags` is validated against the cuisine catalog before any
/// provider call; an unknown tag short-circuits with a hint listing valid
/// URNs. Successful responses are cached briefly in the request cache.
pub async fn insights(
    State(state): State<AppState>,
    Json(params): Json<InsightsParams>,
) -> AppResult<Json<serde_json::Value>> {
    if params.filter_type.is_empty() {
        return Err(AppError::InvalidInput("filter.type is required".to_string()));
    }

    if let Some(tags) = &params.filter_tags {
        if !state.tags.validate_cuisine_tag(tags).await {
            let available: Vec<String> = state
                .tags
                .get_cuisine_tags()
                .await
                .into_iter()
                .take(10)
                .map(|tag| tag.urn)
                .collect();
            return Ok(Json(json!({
                "error": "Invalid cuisine tag",
                "available_tags": available
            })));
        }
    }

    let key = CacheKey::Insights(format!(
        "{}|{}|{}",
        params.filter_type,
        params.filter_tags.as_deref().unwrap_or("-"),
        params.signal_interests_tags.as_deref().unwrap_or("-")
    ));

    let insights: serde_json::Value = cached!(state.cache, key, INSIGHTS_CACHE_TTL, async {
        let mut query = InsightsQuery::new(params.filter_type.clone());
        query.filter_tags = params.filter_tags.clone();
        query.signal_interests_tags = params.signal_interests_tags.clone();

        let result = state.qloo.get_insights(&query, false, None).await?;
        serde_json::to_value(result).map_err(|e| AppError::Internal(e.to_string()))
    })?;

    Ok(Json(insights))
}

/// Handler for provider connectivity validation
pub async fn validate(State(state): State<AppState>) -> Json<serde_json::Value> {
    let valid = state.qloo.validate_connection().await;
    Json(json!({
        "valid": valid,
        "base_url": state.qloo.base_url(),
        "timestamp": Utc::now()
    }))
}
