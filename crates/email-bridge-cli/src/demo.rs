//! In-process handshake: a host page and an embedded editor wired together
//! over the message channel, talking to the configured template API.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use email_bridge_core::channel::ContextRef;
use email_bridge_core::config::Config;
use email_bridge_core::protocol::Event;
use email_bridge_embed::{EditorDocument, EditorStore, HttpTemplateApi, MessagingClient};
use email_bridge_host::{Bridge, ChannelSink, EditorNotification, SendOutcome};

pub struct DemoOptions {
    pub template_id: Option<String>,
    pub json: Option<String>,
    pub list: bool,
}

pub async fn run(config: &Config, options: DemoOptions) -> anyhow::Result<()> {
    let api = config.api();
    let host = ContextRef::top_level("host");
    let frame = ContextRef::embedded_in(&host, "email-builder");
    let (sink, mut notifications) = ChannelSink::new();

    let mut bridge = Bridge::new(host);
    bridge.initialize(frame.clone(), Arc::new(sink));

    // Issued before the editor exists; these must survive until it is ready.
    let mut outcomes = Vec::new();
    if options.list {
        outcomes.push(bridge.get_templates());
    }
    if let Some(id) = options.template_id {
        outcomes.push(bridge.load_template(id));
    }
    if let Some(json) = options.json {
        outcomes.push(bridge.load_template_json(json));
    }
    let queued = outcomes.iter().filter(|o| **o == SendOutcome::Queued).count();
    info!(queued, "Commands issued before the editor loaded");

    let editor = Arc::new(EditorDocument::new());
    let mut client = MessagingClient::new(
        frame,
        Arc::new(HttpTemplateApi::new(&api)?),
        editor.clone(),
        config.single_flight(),
    );
    client.start();
    let runner = tokio::spawn(async move { client.run().await });

    let wait = Duration::from_secs(api.timeout_secs + 5);
    let expected = 1 + queued;
    let mut seen = 0;
    while seen < expected {
        match tokio::time::timeout(wait, bridge.process_next()).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(_) => {
                warn!(seen, expected, "Timed out waiting for the editor");
                break;
            }
        }
        while let Ok(json) = notifications.try_recv() {
            seen += 1;
            print_notification(&json);
        }
    }

    bridge.dispose();
    runner.abort();

    println!();
    println!(
        "Editor document: {} block(s), template: {}",
        editor.document().len(),
        editor.current_template_id().as_deref().unwrap_or("(none)")
    );
    Ok(())
}

fn print_notification(json: &str) {
    let notification = match EditorNotification::parse(json) {
        Ok(n) => n,
        Err(e) => {
            warn!(%e, "Undecodable editor message");
            return;
        }
    };
    let detail = match notification.event() {
        Some(Event::TemplateLoaded { template_id }) => template_id.clone(),
        Some(Event::TemplatesList { templates }) => format!("{} template(s)", templates.len()),
        Some(Event::TemplateSaved {
            template_id,
            success,
        }) => format!("{template_id} success={success}"),
        Some(Event::Error { message }) => message.clone(),
        Some(Event::EditorReady) | None => String::new(),
    };
    println!("<- {:<16} {detail}", notification.message_type());
}
