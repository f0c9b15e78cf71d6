//! Host notification sinks.

use tokio::sync::mpsc;
use tracing::debug;

/// Receives every message the embedded editor sends to the host.
///
/// Messages arrive as compact JSON with every field the editor posted, in
/// the order it posted them. Use
/// [`EditorNotification::parse`](crate::EditorNotification::parse) to decode.
pub trait HostSink: Send + Sync {
    fn on_message_from_editor(&self, json: &str);
}

impl<F> HostSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_message_from_editor(&self, json: &str) {
        self(json)
    }
}

/// Sink that forwards editor messages into an unbounded channel.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl HostSink for ChannelSink {
    fn on_message_from_editor(&self, json: &str) {
        if self.tx.send(json.to_string()).is_err() {
            debug!("Host sink receiver dropped, editor message discarded");
        }
    }
}
