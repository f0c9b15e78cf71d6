use serde::{Deserialize, Serialize};

/// Template summary as returned by the admin template API.
///
/// Kept as the object the API sent. The bridge reads `id`, `subject`,
/// `description` and `builderJson` through accessors and never rewrites the
/// rest, so a `TEMPLATES_LIST` event hands the host exactly what was fetched.
/// Missing or `null` fields read as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateSummary {
    fields: serde_json::Map<String, serde_json::Value>,
}

impl TemplateSummary {
    pub fn new(id: impl Into<String>, subject: impl Into<String>, description: impl Into<String>) -> Self {
        let mut fields = serde_json::Map::new();
        fields.insert("id".into(), serde_json::Value::String(id.into()));
        fields.insert("subject".into(), serde_json::Value::String(subject.into()));
        fields.insert("description".into(), serde_json::Value::String(description.into()));
        Self { fields }
    }

    pub fn with_builder_json(mut self, builder_json: impl Into<String>) -> Self {
        self.fields
            .insert("builderJson".into(), serde_json::Value::String(builder_json.into()));
        self
    }

    pub fn id(&self) -> &str {
        self.str_field("id").unwrap_or_default()
    }

    pub fn subject(&self) -> &str {
        self.str_field("subject").unwrap_or_default()
    }

    /// Rendered HTML of the template.
    pub fn description(&self) -> &str {
        self.str_field("description").unwrap_or_default()
    }

    /// Serialized editor document, present once the template was saved from the builder.
    pub fn builder_json(&self) -> Option<&str> {
        self.str_field("builderJson").filter(|s| !s.is_empty())
    }

    /// Any other field, as sent by the API.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(serde_json::Value::as_str)
    }
}

/// Body of a template save request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTemplateRequest {
    /// Rendered HTML.
    pub description: String,
    pub builder_json: String,
}

/// Image stored in the admin file library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminFile {
    pub id: String,
    pub name: String,
    /// Base64 file content. May be empty in list responses.
    #[serde(default)]
    pub file: String,
    pub content_type: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Body of an image upload request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileRequest {
    pub name: String,
    /// Base64 file content.
    pub file: String,
    pub content_type: String,
}
