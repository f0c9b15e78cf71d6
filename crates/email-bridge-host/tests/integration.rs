//! Host bridge integration tests: a scripted editor frame on its own task.
//!
//! Run with: `cargo test -p email-bridge-host --test integration`

use std::sync::Arc;
use std::time::Duration;

use email_bridge_core::channel::ContextRef;
use email_bridge_core::protocol::{Command, Event};
use email_bridge_host::{Bridge, BridgeState, ChannelSink, EditorNotification, SendOutcome};
use serde_json::json;
use tokio::sync::mpsc;

/// Minimal editor frame: announces readiness, then answers each
/// `LOAD_TEMPLATE` with `TEMPLATE_LOADED` and records every command seen.
fn spawn_scripted_editor(frame: ContextRef) -> mpsc::UnboundedReceiver<Command> {
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();
    let mut inbox = frame.add_listener();
    tokio::spawn(async move {
        let Some(parent) = frame.parent().cloned() else {
            return;
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        parent.post_message(frame.id(), serde_json::to_value(Event::EditorReady).unwrap());

        while let Some(envelope) = inbox.recv().await {
            if envelope.source != parent.id() {
                continue;
            }
            let Ok(command) = serde_json::from_value::<Command>(envelope.data) else {
                continue;
            };
            if let Command::LoadTemplate { template_id } = &command {
                let loaded = Event::TemplateLoaded {
                    template_id: template_id.clone(),
                };
                parent.post_message(frame.id(), serde_json::to_value(loaded).unwrap());
            }
            let _ = seen_tx.send(command);
        }
    });
    seen_rx
}

async fn next_notification(rx: &mut mpsc::UnboundedReceiver<String>) -> EditorNotification {
    let json = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for editor message")
        .expect("sink closed");
    EditorNotification::parse(&json).unwrap()
}

#[tokio::test]
async fn test_queued_commands_reach_editor_after_handshake() {
    let host = ContextRef::top_level("host");
    let frame = ContextRef::embedded_in(&host, "editor");
    let (sink, mut notifications) = ChannelSink::new();

    let mut bridge = Bridge::new(host.clone());
    bridge.initialize(frame.clone(), Arc::new(sink));
    let mut seen = spawn_scripted_editor(frame.clone());

    assert_eq!(bridge.load_template("t1"), SendOutcome::Queued);
    assert_eq!(bridge.load_template("t1"), SendOutcome::Queued);
    assert_eq!(bridge.get_templates(), SendOutcome::Queued);

    // EDITOR_READY
    assert!(bridge.process_next().await);
    assert_eq!(bridge.state(), BridgeState::Ready);
    assert_eq!(
        next_notification(&mut notifications).await.event(),
        Some(&Event::EditorReady)
    );

    assert_eq!(bridge.load_template("t2"), SendOutcome::Sent);

    let mut order = Vec::new();
    for _ in 0..4 {
        order.push(seen.recv().await.unwrap());
    }
    assert_eq!(
        order,
        vec![
            Command::LoadTemplate {
                template_id: "t1".into(),
            },
            Command::LoadTemplate {
                template_id: "t1".into(),
            },
            Command::GetTemplates,
            Command::LoadTemplate {
                template_id: "t2".into(),
            },
        ]
    );

    for expected in ["t1", "t1", "t2"] {
        assert!(bridge.process_next().await);
        let notification = next_notification(&mut notifications).await;
        assert_eq!(
            notification.event(),
            Some(&Event::TemplateLoaded {
                template_id: expected.into()
            })
        );
    }
}

#[tokio::test]
async fn test_spoofed_ready_from_sibling_frame_is_ignored() {
    let host = ContextRef::top_level("host");
    let frame = ContextRef::embedded_in(&host, "editor");
    let sibling = ContextRef::embedded_in(&host, "analytics");
    let (sink, mut notifications) = ChannelSink::new();

    let mut bridge = Bridge::new(host.clone());
    bridge.initialize(frame.clone(), Arc::new(sink));
    bridge.load_template("t1");

    host.post_message(sibling.id(), json!({"type": "EDITOR_READY"}));
    host.post_message(sibling.id(), json!({"type": "ERROR", "message": "nope"}));
    assert_eq!(bridge.pump(), 0);
    assert_eq!(bridge.state(), BridgeState::NotReady);
    assert_eq!(bridge.pending_len(), 1);
    assert!(notifications.try_recv().is_err());
}

#[tokio::test]
async fn test_dispose_discards_queue_and_releases_listener() {
    let host = ContextRef::top_level("host");
    let frame = ContextRef::embedded_in(&host, "editor");
    let mut frame_inbox = frame.add_listener();

    let mut bridge = Bridge::new(host.clone());
    bridge.initialize(frame.clone(), Arc::new(|_: &str| {}));
    bridge.load_template("t1");
    bridge.load_template_json("{}");
    assert_eq!(host.listener_count(), 1);

    bridge.dispose();
    assert_eq!(host.listener_count(), 0);
    assert_eq!(bridge.get_templates(), SendOutcome::Unavailable);

    // a ready arriving after teardown has nowhere to go
    host.post_message(frame.id(), json!({"type": "EDITOR_READY"}));
    assert_eq!(bridge.pump(), 0);
    assert!(frame_inbox.try_recv().is_none());
}
