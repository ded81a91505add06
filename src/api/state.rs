use std::sync::Arc;

use crate::db::Cache;
use crate::services::{QlooClient, TagsService};

/// Shared application state
///
/// One client and one reference cache per process, wired in `main` and
/// handed to route handlers by reference. No globals.
#[derive(Clone)]
pub struct AppState {
    pub cache: Cache,
    pub qloo: Arc<QlooClient>,
    pub tags: Arc<TagsService>,
}

impl AppState {
    pub fn new(cache: Cache, qloo: Arc<QlooClient>, tags: Arc<TagsService>) -> Self {
        Self { cache, qloo, tags }
    }
}
