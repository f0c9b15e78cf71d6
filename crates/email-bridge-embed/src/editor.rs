//! Editor state the messaging client writes into.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use email_bridge_core::document::EditorConfiguration;
use email_bridge_core::types::TemplateSummary;

/// Local editor state seen by the messaging client.
pub trait EditorStore: Send + Sync {
    /// Replace the current document. `template_id` is `None` for documents
    /// that do not correspond to a stored template.
    fn install_configuration(&self, config: EditorConfiguration, template_id: Option<String>);

    fn document(&self) -> EditorConfiguration;

    fn current_template_id(&self) -> Option<String>;

    /// Publish the template list for the samples drawer.
    fn set_api_templates(&self, templates: Vec<TemplateSummary>);

    fn api_templates(&self) -> Vec<TemplateSummary>;
}

#[derive(Debug)]
struct EditorState {
    document: EditorConfiguration,
    template_id: Option<String>,
    api_templates: Vec<TemplateSummary>,
    revision: u64,
}

/// In-memory [`EditorStore`].
#[derive(Debug)]
pub struct EditorDocument {
    state: Mutex<EditorState>,
}

impl Default for EditorDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorDocument {
    /// Start from an empty layout with no template selected.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EditorState {
                document: EditorConfiguration::empty_layout(),
                template_id: None,
                api_templates: Vec::new(),
                revision: 0,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, EditorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of documents installed so far.
    pub fn revision(&self) -> u64 {
        self.state().revision
    }
}

impl EditorStore for EditorDocument {
    fn install_configuration(&self, config: EditorConfiguration, template_id: Option<String>) {
        let mut state = self.state();
        state.document = config;
        state.template_id = template_id;
        state.revision += 1;
        debug!(
            revision = state.revision,
            template_id = state.template_id.as_deref().unwrap_or("-"),
            "Editor document reset"
        );
    }

    fn document(&self) -> EditorConfiguration {
        self.state().document.clone()
    }

    fn current_template_id(&self) -> Option<String> {
        self.state().template_id.clone()
    }

    fn set_api_templates(&self, templates: Vec<TemplateSummary>) {
        self.state().api_templates = templates;
    }

    fn api_templates(&self) -> Vec<TemplateSummary> {
        self.state().api_templates.clone()
    }
}
