//! Lazily filled template cache.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use email_bridge_core::types::TemplateSummary;

use crate::api::TemplateApi;

/// Result of [`TemplateCache::get_or_fetch`].
#[derive(Debug, Clone)]
pub struct CacheFill {
    pub templates: Arc<Vec<TemplateSummary>>,
    /// True when this call hit the API.
    pub fetched: bool,
}

/// Template list owned by the embedded editor session.
///
/// Filled on first use and kept until [`invalidate`](Self::invalidate) or
/// [`replace`](Self::replace). An empty list never counts as filled, so the
/// next request fetches again. Each fill stores a fresh immutable snapshot;
/// the last writer wins.
pub struct TemplateCache {
    entries: RwLock<Option<Arc<Vec<TemplateSummary>>>>,
    /// Serializes fills on a miss so concurrent callers share one fetch.
    fill_guard: Option<Mutex<()>>,
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new(true)
    }
}

impl TemplateCache {
    pub fn new(single_flight: bool) -> Self {
        Self {
            entries: RwLock::new(None),
            fill_guard: single_flight.then(|| Mutex::new(())),
        }
    }

    /// Current snapshot, if populated.
    pub async fn get(&self) -> Option<Arc<Vec<TemplateSummary>>> {
        self.entries.read().await.clone()
    }

    pub async fn is_populated(&self) -> bool {
        self.entries.read().await.is_some()
    }

    /// Return the cached list, fetching from `api` on a miss.
    ///
    /// A failed fetch leaves the cache untouched.
    pub async fn get_or_fetch(&self, api: &dyn TemplateApi) -> anyhow::Result<CacheFill> {
        if let Some(templates) = self.get().await {
            return Ok(CacheFill {
                templates,
                fetched: false,
            });
        }

        let _guard = match &self.fill_guard {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };
        // Another caller may have filled it while we waited.
        if let Some(templates) = self.get().await {
            return Ok(CacheFill {
                templates,
                fetched: false,
            });
        }

        debug!("Template cache miss, fetching");
        let templates = api.fetch_templates().await?;
        let templates = self.store(templates).await;
        Ok(CacheFill {
            templates,
            fetched: true,
        })
    }

    /// Replace the cache wholesale with an externally fetched list.
    pub async fn replace(&self, templates: Vec<TemplateSummary>) -> Arc<Vec<TemplateSummary>> {
        self.store(templates).await
    }

    pub async fn invalidate(&self) {
        *self.entries.write().await = None;
        debug!("Template cache invalidated");
    }

    /// Look up a template by id in the current snapshot.
    pub async fn find(&self, template_id: &str) -> Option<TemplateSummary> {
        self.entries
            .read()
            .await
            .as_ref()
            .and_then(|list| list.iter().find(|t| t.id() == template_id).cloned())
    }

    async fn store(&self, templates: Vec<TemplateSummary>) -> Arc<Vec<TemplateSummary>> {
        let snapshot = Arc::new(templates);
        let mut entries = self.entries.write().await;
        *entries = if snapshot.is_empty() {
            None
        } else {
            Some(snapshot.clone())
        };
        debug!(count = snapshot.len(), "Template cache updated");
        snapshot
    }
}
