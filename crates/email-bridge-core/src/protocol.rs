//! Host ↔ embed wire protocol.
//!
//! Every message is a JSON object with a `type` discriminant. Commands flow
//! from the host into the embedded editor; events flow back out.

use serde::{Deserialize, Serialize};

use crate::types::TemplateSummary;

/// Tag of the readiness handshake event.
pub const EDITOR_READY: &str = "EDITOR_READY";

/// Template id reported for documents loaded from raw JSON.
pub const CUSTOM_TEMPLATE_ID: &str = "custom";

/// Host → embed commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Load a template from the template API by id.
    LoadTemplate {
        #[serde(rename = "templateId")]
        template_id: String,
    },
    /// Load an editor document from a serialized configuration.
    LoadTemplateJson { json: String },
    /// Request the list of available templates.
    GetTemplates,
}

/// Embed → host events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    EditorReady,
    TemplateLoaded {
        #[serde(rename = "templateId")]
        template_id: String,
    },
    TemplateSaved {
        #[serde(rename = "templateId")]
        template_id: String,
        success: bool,
    },
    TemplatesList { templates: Vec<TemplateSummary> },
    Error { message: String },
}

/// Any message crossing the context boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Command(Command),
    Event(Event),
}

impl Command {
    pub fn message_type(&self) -> &'static str {
        match self {
            Command::LoadTemplate { .. } => "LOAD_TEMPLATE",
            Command::LoadTemplateJson { .. } => "LOAD_TEMPLATE_JSON",
            Command::GetTemplates => "GET_TEMPLATES",
        }
    }
}

impl Event {
    pub fn message_type(&self) -> &'static str {
        match self {
            Event::EditorReady => EDITOR_READY,
            Event::TemplateLoaded { .. } => "TEMPLATE_LOADED",
            Event::TemplateSaved { .. } => "TEMPLATE_SAVED",
            Event::TemplatesList { .. } => "TEMPLATES_LIST",
            Event::Error { .. } => "ERROR",
        }
    }

    /// Shorthand for an `ERROR` event.
    pub fn error(message: impl Into<String>) -> Self {
        Event::Error {
            message: message.into(),
        }
    }
}

impl Message {
    pub fn message_type(&self) -> &'static str {
        match self {
            Message::Command(c) => c.message_type(),
            Message::Event(e) => e.message_type(),
        }
    }

    /// True for the readiness handshake, the one message never held back.
    pub fn is_editor_ready(&self) -> bool {
        matches!(self, Message::Event(Event::EditorReady))
    }

    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

impl From<Command> for Message {
    fn from(command: Command) -> Self {
        Message::Command(command)
    }
}

impl From<Event> for Message {
    fn from(event: Event) -> Self {
        Message::Event(event)
    }
}

/// Read the `type` tag of a raw payload.
///
/// Payloads that are not objects, or whose `type` is not a string, are not
/// protocol messages and yield `None`.
pub fn message_type_of(value: &serde_json::Value) -> Option<&str> {
    value.as_object()?.get("type")?.as_str()
}
