use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Qloo tag, as returned by `/v2/tags`
///
/// Identified by its provider-assigned URN (e.g. `urn:tag:cuisine:thai`).
/// Immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub urn: String,
    #[serde(default)]
    pub name: String,
    /// Provider-reported tag type, untouched
    #[serde(rename = "type", default)]
    pub raw_type: String,
}

/// A Qloo audience, as returned by `/v2/audiences`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Audience {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Parameters for a `/v2/insights` call
///
/// `filter_type` is required by the provider on every call; the gateway
/// rejects a query without it before any request is made. `extra` is merged
/// into the parameter set last, in insertion order, and may not override
/// `filter.type`.
#[derive(Debug, Clone, Default)]
pub struct InsightsQuery {
    pub filter_type: String,
    pub filter_tags: Option<String>,
    pub signal_interests_tags: Option<String>,
    pub extra: Vec<(String, String)>,
}

impl InsightsQuery {
    pub fn new(filter_type: impl Into<String>) -> Self {
        Self {
            filter_type: filter_type.into(),
            ..Default::default()
        }
    }

    pub fn with_filter_tags(mut self, tags: impl Into<String>) -> Self {
        self.filter_tags = Some(tags.into());
        self
    }

    pub fn with_signal_interests_tags(mut self, tags: impl Into<String>) -> Self {
        self.signal_interests_tags = Some(tags.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }
}

/// A validated `/v2/insights` response
///
/// The provider contract guarantees a `recommendations` array on success;
/// the gateway treats its absence as an upstream failure, so this struct is
/// only ever built from a body that has the field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsResult {
    pub recommendations: Vec<serde_json::Value>,
    #[serde(default)]
    pub insights: Vec<String>,
}

/// User dietary preferences, stored in the generic cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: String,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub cuisine_preferences: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
}

/// Request body for the recommendations endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationRequest {
    pub user_id: String,
    pub location: Option<String>,
    pub meal_type: Option<String>,
    pub budget_range: Option<String>,
}

/// Response body for the recommendations endpoint
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<serde_json::Value>,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_deserialization() {
        let json = r#"{
            "urn": "urn:tag:cuisine:thai",
            "name": "Thai",
            "type": "urn:tag:cuisine"
        }"#;

        let tag: Tag = serde_json::from_str(json).unwrap();
        assert_eq!(tag.urn, "urn:tag:cuisine:thai");
        assert_eq!(tag.name, "Thai");
        assert_eq!(tag.raw_type, "urn:tag:cuisine");
    }

    #[test]
    fn test_tag_deserialization_missing_optional_fields() {
        let json = r#"{"urn": "urn:tag:cuisine:thai"}"#;

        let tag: Tag = serde_json::from_str(json).unwrap();
        assert_eq!(tag.urn, "urn:tag:cuisine:thai");
        assert_eq!(tag.name, "");
        assert_eq!(tag.raw_type, "");
    }

    #[test]
    fn test_audience_deserialization() {
        let json = r#"{"id": "urn:audience:foodies", "name": "Foodies"}"#;

        let audience: Audience = serde_json::from_str(json).unwrap();
        assert_eq!(audience.id, "urn:audience:foodies");
        assert_eq!(audience.name, "Foodies");
    }

    #[test]
    fn test_insights_query_builder() {
        let query = InsightsQuery::new("urn:entity:destination")
            .with_filter_tags("urn:tag:cuisine:thai")
            .with_extra("take", "5");

        assert_eq!(query.filter_type, "urn:entity:destination");
        assert_eq!(query.filter_tags.as_deref(), Some("urn:tag:cuisine:thai"));
        assert_eq!(query.signal_interests_tags, None);
        assert_eq!(query.extra, vec![("take".to_string(), "5".to_string())]);
    }

    #[test]
    fn test_insights_result_defaults_insights() {
        let json = r#"{"recommendations": [{"id": "r1"}]}"#;

        let result: InsightsResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.recommendations.len(), 1);
        assert!(result.insights.is_empty());
    }
}
