use axum::{extract::State, Json};
use chrono::Utc;

use crate::{
    api::AppState,
    db::CacheKey,
    error::AppResult,
    models::{InsightsQuery, RecommendationRequest, RecommendationResponse, UserPreferences},
};

const MEAL_INTEREST_MAP: [(&str, &str); 4] = [
    ("breakfast", "urn:tag:meal:breakfast"),
    ("lunch", "urn:tag:meal:lunch"),
    ("dinner", "urn:tag:meal:dinner"),
    ("brunch", "urn:tag:meal:brunch"),
];

/// Handler for personalized recommendations
///
/// Resolves the user's first cuisine preference to a validated tag URN and
/// the meal type to an interest signal, then queries the provider. Provider
/// or cache failures degrade to an empty recommendation set; this endpoint
/// never fails because Qloo is down.
pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    let key = CacheKey::UserPreferences(request.user_id.clone());
    let preferences = match state.cache.get_from_cache::<UserPreferences>(&key).await {
        Ok(preferences) => preferences,
        Err(e) => {
            tracing::warn!(error = %e, user_id = %request.user_id, "Preference lookup failed");
            None
        }
    };

    let filter_tags = match preferences
        .as_ref()
        .and_then(|prefs| prefs.cuisine_preferences.first())
    {
        Some(cuisine) => state.tags.find_cuisine_tag_by_name(cuisine).await,
        None => None,
    };

    let signal_interests = request.meal_type.as_deref().and_then(|meal| {
        let meal = meal.to_lowercase();
        MEAL_INTEREST_MAP
            .iter()
            .find(|(name, _)| *name == meal)
            .map(|(_, urn)| urn.to_string())
    });

    let mut query = InsightsQuery::new("urn:entity:destination");
    query.filter_tags = filter_tags;
    query.signal_interests_tags = signal_interests;

    let recommendations = match state.qloo.get_insights(&query, false, None).await {
        Ok(insights) => {
            tracing::info!(
                count = insights.recommendations.len(),
                user_id = %request.user_id,
                "Retrieved Qloo insights"
            );
            insights.recommendations
        }
        Err(e) => {
            tracing::warn!(error = %e, user_id = %request.user_id, "Qloo insights unavailable, degrading");
            Vec::new()
        }
    };

    Ok(Json(RecommendationResponse {
        recommendations,
        user_id: request.user_id,
        timestamp: Utc::now(),
    }))
}
