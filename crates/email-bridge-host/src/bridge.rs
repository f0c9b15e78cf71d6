//! Host-side bridge to the embedded email builder.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use email_bridge_core::channel::{ContextRef, Envelope, Listener};
use email_bridge_core::protocol::{Command, Message, EDITOR_READY};

use crate::sink::HostSink;

/// Result of [`Bridge::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Posted to the editor context.
    Sent,
    /// Held until the editor reports ready.
    Queued,
    /// No editor is bound, or its context is gone. Nothing was sent.
    Unavailable,
}

impl SendOutcome {
    /// Whether the command was accepted (sent or queued).
    pub fn accepted(self) -> bool {
        !matches!(self, SendOutcome::Unavailable)
    }
}

/// Host-side handshake state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Never initialized.
    Unbound,
    /// Bound, waiting for `EDITOR_READY`.
    NotReady,
    Ready,
    Disposed,
}

struct Binding {
    embed: ContextRef,
    sink: Arc<dyn HostSink>,
    listener: Listener,
}

/// Bridge between a host page and the embedded editor frame.
///
/// The listener, readiness flag and pending queue all belong to the current
/// binding and are reset whenever it is replaced or torn down.
pub struct Bridge {
    host: ContextRef,
    binding: Option<Binding>,
    ready: bool,
    pending: VecDeque<Message>,
    disposed: bool,
}

impl Bridge {
    /// Create a bridge living in the `host` context. Nothing is bound yet.
    pub fn new(host: ContextRef) -> Self {
        Self {
            host,
            binding: None,
            ready: false,
            pending: VecDeque::new(),
            disposed: false,
        }
    }

    /// Bind to an embedded editor context and a host sink.
    ///
    /// Calling again replaces the previous binding; its listener is released.
    pub fn initialize(&mut self, embed: ContextRef, sink: Arc<dyn HostSink>) {
        let listener = self.host.add_listener();
        if let Some(previous) = self.binding.take() {
            debug!(previous = %previous.embed.id(), "Replacing existing editor binding");
        }
        self.binding = Some(Binding {
            embed,
            sink,
            listener,
        });
        self.ready = false;
        self.pending.clear();
        self.disposed = false;
        info!("Email builder bridge initialized");
    }

    pub fn state(&self) -> BridgeState {
        match (&self.binding, self.ready) {
            (Some(_), true) => BridgeState::Ready,
            (Some(_), false) => BridgeState::NotReady,
            (None, _) if self.disposed => BridgeState::Disposed,
            (None, _) => BridgeState::Unbound,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Send a message to the editor.
    ///
    /// Before the editor is ready, everything except `EDITOR_READY` is queued.
    pub fn send(&mut self, message: impl Into<Message>) -> SendOutcome {
        let message = message.into();
        let Some(binding) = &self.binding else {
            warn!(message_type = message.message_type(), "Email builder embed not available");
            return SendOutcome::Unavailable;
        };
        if !binding.embed.is_attached() {
            warn!(message_type = message.message_type(), "Email builder embed context is gone");
            return SendOutcome::Unavailable;
        }

        if !self.ready && !message.is_editor_ready() {
            debug!(
                message_type = message.message_type(),
                queued = self.pending.len() + 1,
                "Queued command (editor not ready)"
            );
            self.pending.push_back(message);
            return SendOutcome::Queued;
        }

        self.transmit(&message)
    }

    pub fn load_template(&mut self, template_id: impl Into<String>) -> SendOutcome {
        self.send(Command::LoadTemplate {
            template_id: template_id.into(),
        })
    }

    pub fn load_template_json(&mut self, json: impl Into<String>) -> SendOutcome {
        self.send(Command::LoadTemplateJson { json: json.into() })
    }

    pub fn get_templates(&mut self) -> SendOutcome {
        self.send(Command::GetTemplates)
    }

    fn transmit(&self, message: &Message) -> SendOutcome {
        let Some(binding) = &self.binding else {
            return SendOutcome::Unavailable;
        };
        let data = match message.to_value() {
            Ok(data) => data,
            Err(e) => {
                error!(%e, message_type = message.message_type(), "Failed to encode message");
                return SendOutcome::Unavailable;
            }
        };
        if binding.embed.post_message(self.host.id(), data) {
            SendOutcome::Sent
        } else {
            SendOutcome::Unavailable
        }
    }

    /// Transmit every queued command in insertion order, emptying the queue.
    fn flush_pending(&mut self) {
        let queued = std::mem::take(&mut self.pending);
        if queued.is_empty() {
            return;
        }
        debug!(count = queued.len(), "Flushing queued commands");
        for (index, message) in queued.iter().enumerate() {
            if self.transmit(message) != SendOutcome::Sent {
                warn!(
                    dropped = queued.len() - index,
                    "Editor context went away during flush, dropping remaining commands"
                );
                break;
            }
            debug!(message_type = message.message_type(), "Executed queued command");
        }
    }

    /// Process one message delivered to the host context.
    ///
    /// Returns `true` if the message came from the bound editor and was
    /// forwarded to the sink. Anything else is dropped without side effects.
    pub fn handle_inbound(&mut self, envelope: Envelope) -> bool {
        let Some(binding) = &self.binding else {
            return false;
        };
        if envelope.source != binding.embed.id() {
            debug!(source = %envelope.source, "Ignoring message from unrelated context");
            return false;
        }
        let Some(message_type) = envelope.message_type() else {
            debug!("Ignoring editor message without a type");
            return false;
        };
        debug!(message_type, "Message from email builder");

        let sink = binding.sink.clone();
        if message_type == EDITOR_READY {
            self.ready = true;
            self.flush_pending();
        }

        match serde_json::to_string(&envelope.data) {
            Ok(json) => sink.on_message_from_editor(&json),
            Err(e) => error!(%e, "Failed to encode editor message for host"),
        }
        true
    }

    /// Handle every message already delivered, without waiting.
    /// Returns the number of messages accepted.
    pub fn pump(&mut self) -> usize {
        let mut accepted = 0;
        while let Some(envelope) = self
            .binding
            .as_mut()
            .and_then(|binding| binding.listener.try_recv())
        {
            if self.handle_inbound(envelope) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Wait for the next message and handle it.
    ///
    /// Returns `false` when there is nothing left to wait for: the bridge is
    /// unbound or the host context was detached.
    pub async fn process_next(&mut self) -> bool {
        let Some(binding) = self.binding.as_mut() else {
            return false;
        };
        match binding.listener.recv().await {
            Some(envelope) => {
                self.handle_inbound(envelope);
                true
            }
            None => false,
        }
    }

    /// Tear down the binding. Queued commands are discarded and later sends
    /// report [`SendOutcome::Unavailable`].
    pub fn dispose(&mut self) {
        let discarded = self.pending.len();
        self.binding = None;
        self.ready = false;
        self.pending.clear();
        self.disposed = true;
        info!(discarded, "Email builder bridge disposed");
    }
}
