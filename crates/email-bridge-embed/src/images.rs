//! Image picker backing store.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use email_bridge_core::types::AdminFile;

use crate::api::ImageApi;

/// Images offered by the editor's image picker.
///
/// The list is loaded on first [`open`](Self::open) and reused afterwards,
/// even when it is empty. A failed load keeps nothing, so opening again
/// retries. Uploads and deletes before the first load only touch the API.
pub struct ImageLibrary {
    api: Arc<dyn ImageApi>,
    images: Mutex<Option<Vec<AdminFile>>>,
}

impl ImageLibrary {
    pub fn new(api: Arc<dyn ImageApi>) -> Self {
        Self {
            api,
            images: Mutex::new(None),
        }
    }

    /// Images for display, loading them if not loaded yet.
    pub async fn open(&self) -> anyhow::Result<Vec<AdminFile>> {
        let mut images = self.images.lock().await;
        if let Some(loaded) = images.as_ref() {
            return Ok(loaded.clone());
        }
        let loaded = self.api.list_images().await?;
        debug!(count = loaded.len(), "Loaded image library");
        Ok(images.insert(loaded).clone())
    }

    /// Reload from the API regardless of what is held.
    pub async fn refresh(&self) -> anyhow::Result<Vec<AdminFile>> {
        let fresh = self.api.list_images().await?;
        *self.images.lock().await = Some(fresh.clone());
        Ok(fresh)
    }

    /// Only images with a public URL can be inserted into a document.
    pub async fn selectable(&self) -> Vec<AdminFile> {
        self.images
            .lock()
            .await
            .iter()
            .flatten()
            .filter(|image| image.url.is_some())
            .cloned()
            .collect()
    }

    /// URL of the chosen image, if it exists and has one.
    pub async fn select(&self, file_id: &str) -> Option<String> {
        self.images
            .lock()
            .await
            .iter()
            .flatten()
            .find(|image| image.id == file_id)
            .and_then(|image| image.url.clone())
    }

    pub async fn upload(&self, name: &str, content_type: &str, bytes: &[u8]) -> anyhow::Result<AdminFile> {
        let file = self.api.upload_image(name, content_type, bytes).await?;
        if let Some(images) = self.images.lock().await.as_mut() {
            images.push(file.clone());
        }
        Ok(file)
    }

    pub async fn delete(&self, file_id: &str) -> anyhow::Result<()> {
        self.api.delete_image(file_id).await?;
        if let Some(images) = self.images.lock().await.as_mut() {
            images.retain(|image| image.id != file_id);
        }
        Ok(())
    }
}
