//! Host-side half of the email builder bridge.
//!
//! The [`Bridge`] is bound to one embedded editor context. It holds commands
//! back until the editor announces `EDITOR_READY`, then flushes them in order
//! and forwards every editor event to the host's [`HostSink`].

pub mod bridge;
pub mod notification;
pub mod sink;

pub use bridge::{Bridge, BridgeState, SendOutcome};
pub use notification::{EditorNotification, TemplateSavedArgs};
pub use sink::{ChannelSink, HostSink};
