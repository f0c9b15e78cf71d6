//! Admin API collaborators used by the embedded editor.

use async_trait::async_trait;

use email_bridge_core::types::{AdminFile, TemplateSummary};

/// Template storage backing the editor.
#[async_trait]
pub trait TemplateApi: Send + Sync {
    /// Fetch every template summary.
    async fn fetch_templates(&self) -> anyhow::Result<Vec<TemplateSummary>>;

    /// Persist the rendered HTML and the serialized editor document for a template.
    async fn save_template(&self, template_id: &str, html: &str, builder_json: &str) -> anyhow::Result<()>;
}

/// Image file library.
#[async_trait]
pub trait ImageApi: Send + Sync {
    async fn list_images(&self) -> anyhow::Result<Vec<AdminFile>>;

    async fn upload_image(&self, name: &str, content_type: &str, bytes: &[u8]) -> anyhow::Result<AdminFile>;

    async fn delete_image(&self, file_id: &str) -> anyhow::Result<()>;
}
