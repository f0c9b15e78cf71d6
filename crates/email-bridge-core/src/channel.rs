//! Cross-context message channel.
//!
//! A [`ContextRef`] stands for one browsing context (the host page or the
//! embedded editor frame). Any party holding a reference can post a message
//! into it; the message is delivered to every [`Listener`] currently
//! registered on that context, tagged with the sender's [`ContextId`].
//! Delivery is queued per listener and preserves send order.
//!
//! A `Listener` owns its registration: dropping it unregisters it, so a
//! component that rebinds never leaks the previous subscription.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Identity of a browsing context, used as the message origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(Uuid);

impl ContextId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A posted message as seen by a listener.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Context that posted the message.
    pub source: ContextId,
    pub data: serde_json::Value,
}

impl Envelope {
    /// The `type` tag, if the payload looks like a protocol message.
    pub fn message_type(&self) -> Option<&str> {
        crate::protocol::message_type_of(&self.data)
    }
}

struct Registry {
    next_id: u64,
    listeners: Vec<(u64, mpsc::UnboundedSender<Envelope>)>,
    attached: bool,
}

struct ContextInner {
    id: ContextId,
    label: String,
    parent: Option<ContextRef>,
    registry: Mutex<Registry>,
}

impl ContextInner {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cheap, cloneable handle to a browsing context.
#[derive(Clone)]
pub struct ContextRef {
    inner: Arc<ContextInner>,
}

impl fmt::Debug for ContextRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextRef")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("embedded", &self.is_embedded())
            .finish()
    }
}

impl ContextRef {
    /// Create a top-level context (a page with no parent).
    pub fn top_level(label: impl Into<String>) -> Self {
        Self::create(label.into(), None)
    }

    /// Create a context embedded in `parent`.
    pub fn embedded_in(parent: &ContextRef, label: impl Into<String>) -> Self {
        Self::create(label.into(), Some(parent.clone()))
    }

    fn create(label: String, parent: Option<ContextRef>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                id: ContextId::new(),
                label,
                parent,
                registry: Mutex::new(Registry {
                    next_id: 0,
                    listeners: Vec::new(),
                    attached: true,
                }),
            }),
        }
    }

    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn parent(&self) -> Option<&ContextRef> {
        self.inner.parent.as_ref()
    }

    /// True when this context runs inside another one.
    pub fn is_embedded(&self) -> bool {
        self.inner.parent.is_some()
    }

    /// False once the context has been unloaded.
    pub fn is_attached(&self) -> bool {
        self.inner.registry().attached
    }

    /// Post `data` into this context on behalf of `source`.
    ///
    /// Returns `false` if the context has been detached; the message is dropped.
    /// Posting to an attached context with no listeners succeeds and delivers
    /// nothing.
    pub fn post_message(&self, source: ContextId, data: serde_json::Value) -> bool {
        let mut registry = self.inner.registry();
        if !registry.attached {
            debug!(target_ctx = %self.inner.label, "Dropping message for detached context");
            return false;
        }
        let envelope = Envelope { source, data };
        registry
            .listeners
            .retain(|(_, tx)| tx.send(envelope.clone()).is_ok());
        true
    }

    /// Register a message listener on this context.
    pub fn add_listener(&self) -> Listener {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut registry = self.inner.registry();
        let id = registry.next_id;
        registry.next_id += 1;
        if registry.attached {
            registry.listeners.push((id, tx));
        }
        Listener {
            id,
            context: Arc::downgrade(&self.inner),
            rx,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.registry().listeners.len()
    }

    /// Unload the context. All listeners see end-of-stream and later posts
    /// are dropped.
    pub fn detach(&self) {
        let mut registry = self.inner.registry();
        registry.attached = false;
        registry.listeners.clear();
        debug!(ctx = %self.inner.label, "Context detached");
    }
}

/// A registered message listener. Unregisters itself on drop.
pub struct Listener {
    id: u64,
    context: Weak<ContextInner>,
    rx: mpsc::UnboundedReceiver<Envelope>,
}

impl Listener {
    /// Wait for the next message. `None` once the context is detached.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    /// Take the next already-delivered message without waiting.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Some(inner) = self.context.upgrade() {
            inner.registry().listeners.retain(|(id, _)| *id != self.id);
        }
    }
}
