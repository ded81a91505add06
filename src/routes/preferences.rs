use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::json;

use crate::{
    api::AppState,
    db::CacheKey,
    error::AppResult,
    models::UserPreferences,
};

const PREFERENCES_CACHE_TTL: u64 = 86400; // 24 hours

/// Handler for saving user dietary preferences
pub async fn save_preferences(
    State(state): State<AppState>,
    Json(preferences): Json<UserPreferences>,
) -> AppResult<Json<serde_json::Value>> {
    let key = CacheKey::UserPreferences(preferences.user_id.clone());
    state
        .cache
        .set_in_background(&key, &preferences, PREFERENCES_CACHE_TTL);

    Ok(Json(json!({
        "message": "Preferences saved successfully",
        "user_id": preferences.user_id
    })))
}

/// Handler for retrieving user preferences
pub async fn get_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let key = CacheKey::UserPreferences(user_id.clone());

    match state.cache.get_from_cache::<UserPreferences>(&key).await? {
        Some(preferences) => Ok(Json(json!({
            "preferences": preferences,
            "user_id": user_id
        }))),
        None => Ok(Json(json!({
            "message": "No preferences found",
            "user_id": user_id
        }))),
    }
}
