//! Stream descriptor catalog
//!
//! Descriptors are fetched on demand, cached per content identifier and
//! treated as immutable between refreshes. An owned background task
//! re-fetches every cached descriptor on a slow cadence (~95s by default,
//! deliberately out of phase with the 30s pool cadence so the two never
//! synchronize into load bursts). Refresh failures keep the cached entry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use poolcast_api::{ApiClient, QualityTier, StreamDescriptor};

use crate::scheduler::RepeatingTask;

struct CatalogInner {
    api: ApiClient,
    entries: RwLock<HashMap<String, StreamDescriptor>>,
}

/// Per-content-identifier descriptor cache with background refresh.
pub struct DescriptorCache {
    inner: Arc<CatalogInner>,
    _refresh: RepeatingTask,
}

impl DescriptorCache {
    pub fn spawn(api: ApiClient, refresh_interval: Duration) -> Self {
        let inner = Arc::new(CatalogInner {
            api,
            entries: RwLock::new(HashMap::new()),
        });
        let task_inner = inner.clone();
        let refresh = RepeatingTask::spawn("catalog-refresh", refresh_interval, move || {
            let inner = task_inner.clone();
            async move { refresh_all(&inner).await }
        });
        Self {
            inner,
            _refresh: refresh,
        }
    }

    /// The descriptor for a content identifier, from cache or fetched.
    pub async fn get(&self, content_id: &str) -> poolcast_api::Result<StreamDescriptor> {
        if let Some(descriptor) = self.inner.entries.read().get(content_id) {
            return Ok(descriptor.clone());
        }
        let descriptor = self.inner.api.fetch_descriptor(content_id).await?;
        self.inner
            .entries
            .write()
            .insert(content_id.to_string(), descriptor.clone());
        Ok(descriptor)
    }

    /// Quality tier for a content identifier.
    pub async fn quality_tier(&self, content_id: &str) -> poolcast_api::Result<QualityTier> {
        Ok(self.get(content_id).await?.quality_tier())
    }

    /// Cached descriptor, if present, without fetching.
    pub fn cached(&self, content_id: &str) -> Option<StreamDescriptor> {
        self.inner.entries.read().get(content_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }
}

async fn refresh_all(inner: &CatalogInner) {
    let ids: Vec<String> = inner.entries.read().keys().cloned().collect();
    for content_id in ids {
        match inner.api.fetch_descriptor(&content_id).await {
            Ok(descriptor) => {
                inner.entries.write().insert(content_id, descriptor);
            }
            Err(e) => {
                tracing::warn!(content_id, error = %e, "catalog refresh failed");
            }
        }
    }
}
