//! Template summary → editor document.

use serde_json::json;
use tracing::warn;

use email_bridge_core::document::{EditorBlock, EditorConfiguration, ROOT_BLOCK_ID};
use email_bridge_core::types::TemplateSummary;

/// Build the editor document for a template.
///
/// Uses the stored `builderJson` when it parses into a document with a root
/// block. Otherwise the rendered HTML is wrapped in a single `Html` block.
pub fn transform_api_template(template: &TemplateSummary) -> EditorConfiguration {
    if let Some(builder_json) = template.builder_json() {
        match EditorConfiguration::parse(builder_json) {
            Ok(config) => return config,
            Err(e) => {
                warn!(template_id = template.id(), %e, "Unusable builderJson, falling back to description");
            }
        }
    }
    wrap_html(template.description())
}

fn wrap_html(html: &str) -> EditorConfiguration {
    let block_id = format!("api-html-block-{}", chrono::Utc::now().timestamp_millis());

    let mut config = EditorConfiguration::default();
    config.insert(
        ROOT_BLOCK_ID,
        EditorBlock::new(
            "EmailLayout",
            json!({
                "backdropColor": "#F5F5F5",
                "canvasColor": "#FFFFFF",
                "textColor": "#262626",
                "fontFamily": "MODERN_SANS",
                "childrenIds": [block_id],
            }),
        ),
    );
    config.insert(
        block_id,
        EditorBlock::new(
            "Html",
            json!({
                "style": {
                    "padding": { "top": 16, "bottom": 16, "right": 16, "left": 16 },
                },
                "props": { "contents": html },
            }),
        ),
    );
    config
}
