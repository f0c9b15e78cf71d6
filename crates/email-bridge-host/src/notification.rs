//! Typed view of the messages forwarded to the host.

use email_bridge_core::protocol::{message_type_of, Event};
use serde::{Deserialize, Serialize};

/// A forwarded editor message, decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorNotification {
    /// One of the protocol's events.
    Event(Event),
    /// A message with a `type` tag this protocol version does not know.
    Unknown {
        message_type: String,
        raw: serde_json::Value,
    },
}

/// Payload of a `TEMPLATE_SAVED` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSavedArgs {
    pub template_id: String,
    pub success: bool,
}

impl EditorNotification {
    /// Decode the JSON text handed to a [`HostSink`](crate::HostSink).
    pub fn parse(json: &str) -> anyhow::Result<Self> {
        let raw: serde_json::Value = serde_json::from_str(json)?;
        let message_type = message_type_of(&raw)
            .ok_or_else(|| anyhow::anyhow!("editor message has no string 'type' field"))?
            .to_string();

        match serde_json::from_value::<Event>(raw.clone()) {
            Ok(event) => Ok(Self::Event(event)),
            Err(_) => Ok(Self::Unknown { message_type, raw }),
        }
    }

    pub fn message_type(&self) -> &str {
        match self {
            Self::Event(event) => event.message_type(),
            Self::Unknown { message_type, .. } => message_type,
        }
    }

    pub fn event(&self) -> Option<&Event> {
        match self {
            Self::Event(event) => Some(event),
            Self::Unknown { .. } => None,
        }
    }

    pub fn template_saved(&self) -> Option<TemplateSavedArgs> {
        match self {
            Self::Event(Event::TemplateSaved {
                template_id,
                success,
            }) => Some(TemplateSavedArgs {
                template_id: template_id.clone(),
                success: *success,
            }),
            _ => None,
        }
    }

    /// Error text of an `ERROR` event, for presenting to the user.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Event(Event::Error { message }) => Some(message),
            _ => None,
        }
    }
}
