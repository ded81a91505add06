/// Read-through caching over the Redis request cache.
///
/// Checks the cache for `$key`; on a miss, runs `$block` to compute the
/// value, stores it with `$ttl` seconds via the background writer, and
/// returns it. `$block` must evaluate to an `AppResult`.
///
/// # Example
/// ```rust,ignore
/// let insights = cached!(state.cache, key, INSIGHTS_CACHE_TTL, async move {
///     state.qloo.get_insights(&query, false, None).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let result: $crate::error::AppResult<_> =
            if let Some(cached) = $cache.get_from_cache(&$key).await? {
                Ok(cached)
            } else {
                let value = $block.await?;
                $cache.set_in_background(&$key, &value, $ttl);
                Ok(value)
            };
        result
    }};
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use serde_json::{json, Value};

    use crate::error::{AppError, AppResult};

    /// In-memory stand-in with the same read/write surface as `Cache`.
    struct MemoryCache {
        stored: Mutex<Option<Value>>,
        writes: AtomicUsize,
    }

    impl MemoryCache {
        fn new(stored: Option<Value>) -> Self {
            Self {
                stored: Mutex::new(stored),
                writes: AtomicUsize::new(0),
            }
        }

        async fn get_from_cache(&self, _key: &str) -> AppResult<Option<Value>> {
            Ok(self.stored.lock().unwrap().clone())
        }

        fn set_in_background(&self, _key: &str, value: &Value, _ttl: u64) {
            self.writes.fetch_add(1, Ordering::SeqCst);
            *self.stored.lock().unwrap() = Some(value.clone());
        }
    }

    #[tokio::test]
    async fn test_cached_miss_computes_and_stores() -> AppResult<()> {
        let cache = MemoryCache::new(None);
        let key = "insights:test".to_string();

        let value = crate::cached!(cache, key, 60, async {
            Ok::<_, AppError>(json!({ "n": 1 }))
        })?;

        assert_eq!(value["n"], 1);
        assert_eq!(cache.writes.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_cached_hit_skips_block() -> AppResult<()> {
        let cache = MemoryCache::new(Some(json!({ "n": 1 })));
        let key = "insights:test".to_string();

        let value: Value = crate::cached!(cache, key, 60, async {
            Err::<Value, _>(AppError::Internal("unreachable".to_string()))
        })?;

        assert_eq!(value["n"], 1);
        assert_eq!(cache.writes.load(Ordering::SeqCst), 0);
        Ok(())
    }
}
