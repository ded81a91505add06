use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::error::AppResult;
use crate::models::{Audience, Tag};
use crate::services::qloo::QlooClient;

const CUISINE_TAG_PREFIX: &str = "urn:tag:cuisine:";
const INTEREST_KEYWORDS: [&str; 3] = ["nightlife", "activity", "interest"];

/// Food keyword → cuisine name, checked in order against the food name
const FOOD_CUISINE_MAP: [(&str, &str); 12] = [
    ("pizza", "italian"),
    ("pasta", "italian"),
    ("sushi", "japanese"),
    ("ramen", "japanese"),
    ("tacos", "mexican"),
    ("burrito", "mexican"),
    ("curry", "indian"),
    ("tikka", "indian"),
    ("pad thai", "thai"),
    ("pho", "vietnamese"),
    ("burger", "american"),
    ("sandwich", "american"),
];

/// One catalog slot
///
/// `value` is installed atomically and only ever read through an `Arc`, so
/// readers never see a half-populated catalog. `fetch_gate` is held across
/// the fetch only; it is what makes population single-flight, and dropping a
/// cancelled fetch releases it so the next caller can retry cleanly.
struct CatalogSlot<T> {
    value: RwLock<Option<Arc<Vec<T>>>>,
    fetch_gate: Mutex<()>,
}

impl<T> CatalogSlot<T> {
    fn new() -> Self {
        Self {
            value: RwLock::new(None),
            fetch_gate: Mutex::new(()),
        }
    }

    async fn clear(&self) {
        *self.value.write().await = None;
    }

    async fn get_or_populate<F, Fut>(&self, fetch: F) -> AppResult<Arc<Vec<T>>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = AppResult<Vec<T>>>,
    {
        if let Some(value) = self.value.read().await.clone() {
            return Ok(value);
        }

        let _gate = self.fetch_gate.lock().await;

        // Another caller may have finished the fetch while we waited on the
        // gate.
        if let Some(value) = self.value.read().await.clone() {
            return Ok(value);
        }

        let fetched = Arc::new(fetch().await?);
        *self.value.write().await = Some(Arc::clone(&fetched));
        Ok(fetched)
    }
}

/// Reference-data cache over the Qloo tag and audience catalogs
///
/// Catalogs are fetched lazily on first use and kept until `refresh_cache`;
/// they change far less often than insight results, so there is no TTL here
/// (unlike the request-level redis cache the route layer uses). Population
/// is single-flight per catalog. Read operations soft-fail to empty on
/// upstream failure: a catalog outage degrades lookups to "nothing known"
/// rather than erroring.
pub struct TagsService {
    qloo: Arc<QlooClient>,
    tags: CatalogSlot<Tag>,
    audiences: CatalogSlot<Audience>,
}

impl TagsService {
    pub fn new(qloo: Arc<QlooClient>) -> Self {
        Self {
            qloo,
            tags: CatalogSlot::new(),
            audiences: CatalogSlot::new(),
        }
    }

    async fn cached_tags(&self) -> AppResult<Arc<Vec<Tag>>> {
        self.tags
            .get_or_populate(|| async { self.qloo.get_tags(None).await })
            .await
    }

    async fn cached_audiences(&self) -> AppResult<Arc<Vec<Audience>>> {
        self.audiences
            .get_or_populate(|| async { self.qloo.get_audiences().await })
            .await
    }

    /// Cuisine tags from the cached catalog, for `filter.tags` use
    pub async fn get_cuisine_tags(&self) -> Vec<Tag> {
        match self.cached_tags().await {
            Ok(tags) => {
                let cuisine_tags: Vec<Tag> = tags
                    .iter()
                    .filter(|tag| tag.urn.starts_with(CUISINE_TAG_PREFIX))
                    .cloned()
                    .collect();
                tracing::info!(count = cuisine_tags.len(), "Retrieved cuisine tags from Qloo");
                cuisine_tags
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to get cuisine tags");
                Vec::new()
            }
        }
    }

    /// Interest tags from the cached catalog, for `signal.interests.tags` use
    pub async fn get_interest_tags(&self) -> Vec<Tag> {
        match self.cached_tags().await {
            Ok(tags) => {
                let interest_tags: Vec<Tag> = tags
                    .iter()
                    .filter(|tag| {
                        INTEREST_KEYWORDS
                            .iter()
                            .any(|keyword| tag.urn.contains(keyword))
                    })
                    .cloned()
                    .collect();
                tracing::info!(count = interest_tags.len(), "Retrieved interest tags from Qloo");
                interest_tags
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to get interest tags");
                Vec::new()
            }
        }
    }

    pub async fn get_all_audiences(&self) -> Vec<Audience> {
        match self.cached_audiences().await {
            Ok(audiences) => {
                tracing::info!(count = audiences.len(), "Retrieved audiences from Qloo");
                audiences.as_ref().clone()
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to get audiences");
                Vec::new()
            }
        }
    }

    /// True iff the URN exists in the cuisine tag catalog
    pub async fn validate_cuisine_tag(&self, cuisine_urn: &str) -> bool {
        self.get_cuisine_tags()
            .await
            .iter()
            .any(|tag| tag.urn == cuisine_urn)
    }

    /// True iff the ID exists in the audience catalog
    pub async fn validate_audience_id(&self, audience_id: &str) -> bool {
        self.get_all_audiences()
            .await
            .iter()
            .any(|audience| audience.id == audience_id)
    }

    /// Resolves a human-readable cuisine name to a tag URN
    ///
    /// Case-insensitive substring match against tag name or URN; first match
    /// in catalog order wins.
    pub async fn find_cuisine_tag_by_name(&self, cuisine_name: &str) -> Option<String> {
        let needle = cuisine_name.to_lowercase();

        self.get_cuisine_tags()
            .await
            .into_iter()
            .find(|tag| {
                tag.name.to_lowercase().contains(&needle)
                    || tag.urn.to_lowercase().contains(&needle)
            })
            .map(|tag| tag.urn)
    }

    /// Maps a food name to cuisine tag URNs via the keyword table
    ///
    /// Only the first matching keyword is considered; an unresolvable
    /// cuisine yields an empty result.
    pub async fn get_recommended_tags_for_food(&self, food_name: &str) -> Vec<String> {
        let food_lower = food_name.to_lowercase();

        for (keyword, cuisine) in FOOD_CUISINE_MAP {
            if food_lower.contains(keyword) {
                if let Some(urn) = self.find_cuisine_tag_by_name(cuisine).await {
                    return vec![urn];
                }
                break;
            }
        }

        Vec::new()
    }

    /// Discards both catalogs and eagerly repopulates them
    ///
    /// Catalogs carry no TTL, so this is the only staleness mechanism; call
    /// it on demand or on a periodic trigger.
    pub async fn refresh_cache(&self) {
        tracing::info!("Refreshing Qloo tags and audiences cache");

        self.tags.clear().await;
        self.audiences.clear().await;

        self.get_cuisine_tags().await;
        self.get_all_audiences().await;

        tracing::info!("Qloo cache refreshed");
    }
}
