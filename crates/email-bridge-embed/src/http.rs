//! HTTP implementation of the admin API collaborators.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use tracing::{debug, warn};

use email_bridge_core::config::ApiConfig;
use email_bridge_core::error::{BridgeError, Result};
use email_bridge_core::types::{AdminFile, SaveTemplateRequest, TemplateSummary, UploadFileRequest};

use crate::api::{ImageApi, TemplateApi};

/// Talks to the admin REST API with `reqwest`.
#[derive(Clone)]
pub struct HttpTemplateApi {
    client: reqwest::Client,
    base_url: String,
    templates_path: String,
    files_path: String,
}

impl HttpTemplateApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BridgeError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            templates_path: config.templates_path.clone(),
            files_path: config.files_path.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn templates_url(&self) -> String {
        format!("{}{}", self.base_url, self.templates_path)
    }

    fn files_url(&self) -> String {
        format!("{}{}", self.base_url, self.files_path)
    }
}

/// Turn a non-success response into [`BridgeError::Http`].
fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    warn!(%status, url = %resp.url(), "Admin API returned non-success");
    Err(BridgeError::Http {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
    })
}

fn transport(e: reqwest::Error) -> BridgeError {
    BridgeError::Transport(e.to_string())
}

#[async_trait]
impl TemplateApi for HttpTemplateApi {
    async fn fetch_templates(&self) -> anyhow::Result<Vec<TemplateSummary>> {
        let url = self.templates_url();
        let resp = self.client.get(&url).send().await.map_err(transport)?;
        let templates: Vec<TemplateSummary> = check_status(resp)?
            .json()
            .await
            .map_err(|e| BridgeError::Api(format!("invalid template list: {e}")))?;
        debug!(count = templates.len(), "Fetched templates");
        Ok(templates)
    }

    async fn save_template(&self, template_id: &str, html: &str, builder_json: &str) -> anyhow::Result<()> {
        let url = format!("{}/{}", self.templates_url(), urlencoding::encode(template_id));
        let body = SaveTemplateRequest {
            description: html.to_string(),
            builder_json: builder_json.to_string(),
        };
        let resp = self.client.put(&url).json(&body).send().await.map_err(transport)?;
        check_status(resp)?;
        debug!(template_id, "Template saved");
        Ok(())
    }
}

#[async_trait]
impl ImageApi for HttpTemplateApi {
    async fn list_images(&self) -> anyhow::Result<Vec<AdminFile>> {
        let resp = self.client.get(self.files_url()).send().await.map_err(transport)?;
        let files: Vec<AdminFile> = check_status(resp)?
            .json()
            .await
            .map_err(|e| BridgeError::Api(format!("invalid file list: {e}")))?;
        Ok(files)
    }

    async fn upload_image(&self, name: &str, content_type: &str, bytes: &[u8]) -> anyhow::Result<AdminFile> {
        let body = UploadFileRequest {
            name: name.to_string(),
            file: base64::engine::general_purpose::STANDARD.encode(bytes),
            content_type: content_type.to_string(),
        };
        let resp = self
            .client
            .post(self.files_url())
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        let file: AdminFile = check_status(resp)?
            .json()
            .await
            .map_err(|e| BridgeError::Api(format!("invalid upload response: {e}")))?;
        debug!(file_id = %file.id, name, size = bytes.len(), "Image uploaded");
        Ok(file)
    }

    async fn delete_image(&self, file_id: &str) -> anyhow::Result<()> {
        let url = format!("{}/{}", self.files_url(), urlencoding::encode(file_id));
        let resp = self.client.delete(&url).send().await.map_err(transport)?;
        check_status(resp)?;
        Ok(())
    }
}
