//! Embed-side messaging client.
//!
//! Runs inside the editor context. When the context is embedded in a host it
//! listens for host commands and answers with events; otherwise it stays
//! inert. Commands are handled one at a time, each to completion.

use std::sync::Arc;

use tracing::{debug, info, warn};

use email_bridge_core::channel::{ContextRef, Envelope, Listener};
use email_bridge_core::document::EditorConfiguration;
use email_bridge_core::protocol::{Command, Event, CUSTOM_TEMPLATE_ID};
use email_bridge_core::types::TemplateSummary;

use crate::api::TemplateApi;
use crate::cache::TemplateCache;
use crate::editor::EditorStore;
use crate::transform::transform_api_template;

/// Converts a template summary into an editor document.
pub type TransformFn = Arc<dyn Fn(&TemplateSummary) -> EditorConfiguration + Send + Sync>;

/// Prefix of sample links that refer to an API template by subject.
const API_HREF_PREFIX: &str = "#api/";

/// Client lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// `start` not called yet.
    NotStarted,
    /// Not embedded; messaging disabled.
    Standalone,
    /// Embedded, `EDITOR_READY` sent, listening for commands.
    Ready,
    Disposed,
}

/// Outcome of [`MessagingClient::save_current`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    /// Nothing to save against; the API was not called.
    NoTemplateSelected,
    Saved { template_id: String },
    Failed { template_id: String, reason: String },
}

pub struct MessagingClient {
    context: ContextRef,
    api: Arc<dyn TemplateApi>,
    editor: Arc<dyn EditorStore>,
    cache: TemplateCache,
    transform: TransformFn,
    listener: Option<Listener>,
    state: ClientState,
}

impl MessagingClient {
    pub fn new(
        context: ContextRef,
        api: Arc<dyn TemplateApi>,
        editor: Arc<dyn EditorStore>,
        single_flight: bool,
    ) -> Self {
        Self {
            context,
            api,
            editor,
            cache: TemplateCache::new(single_flight),
            transform: Arc::new(transform_api_template),
            listener: None,
            state: ClientState::NotStarted,
        }
    }

    /// Replace the template → document conversion.
    pub fn with_transform(mut self, transform: TransformFn) -> Self {
        self.transform = transform;
        self
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    pub fn editor(&self) -> &Arc<dyn EditorStore> {
        &self.editor
    }

    /// Begin messaging with the host.
    ///
    /// In an embedded context this registers the command listener and then
    /// announces `EDITOR_READY`. Standalone, nothing is registered or sent.
    /// Returns whether messaging is active.
    pub fn start(&mut self) -> bool {
        match self.state {
            ClientState::Ready => return true,
            ClientState::Disposed => {
                warn!("Messaging client already disposed");
                return false;
            }
            ClientState::NotStarted | ClientState::Standalone => {}
        }

        if !self.context.is_embedded() {
            info!("Not running in an embedded context, parent messaging disabled");
            self.state = ClientState::Standalone;
            return false;
        }

        self.listener = Some(self.context.add_listener());
        self.state = ClientState::Ready;
        self.emit(Event::EditorReady);
        info!("Parent messaging initialized");
        true
    }

    /// Stop listening. Later emits are dropped.
    pub fn dispose(&mut self) {
        self.listener = None;
        self.state = ClientState::Disposed;
        info!("Messaging client disposed");
    }

    /// Handle inbound messages until the context is detached or the client
    /// is disposed.
    pub async fn run(&mut self) {
        while let Some(listener) = self.listener.as_mut() {
            let Some(envelope) = listener.recv().await else {
                debug!("Editor context detached, stopping messaging client");
                break;
            };
            self.handle_inbound(envelope).await;
        }
    }

    /// Handle every message already delivered, without waiting for more.
    /// Returns the number of commands executed.
    pub async fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(envelope) = self.listener.as_mut().and_then(Listener::try_recv) {
            if self.handle_inbound(envelope).await {
                handled += 1;
            }
        }
        handled
    }

    /// Dispatch one inbound message. Returns `true` if it was a host command
    /// and was executed.
    pub async fn handle_inbound(&self, envelope: Envelope) -> bool {
        if self.state != ClientState::Ready {
            return false;
        }
        let Some(parent) = self.context.parent() else {
            return false;
        };
        if envelope.source != parent.id() {
            debug!(source = %envelope.source, "Ignoring message from non-parent context");
            return false;
        }
        let Some(message_type) = envelope.message_type() else {
            return false;
        };

        let command = match serde_json::from_value::<Command>(envelope.data.clone()) {
            Ok(command) => command,
            Err(e) => {
                debug!(message_type, %e, "Ignoring unrecognized host message");
                return false;
            }
        };
        debug!(message_type, "Host command received");

        match command {
            Command::GetTemplates => self.handle_get_templates().await,
            Command::LoadTemplate { template_id } => self.handle_load_template(&template_id).await,
            Command::LoadTemplateJson { json } => self.handle_load_template_json(&json),
        }
        true
    }

    async fn handle_get_templates(&self) {
        match self.ensure_templates().await {
            Ok(templates) => {
                self.emit(Event::TemplatesList {
                    templates: templates.to_vec(),
                });
            }
            Err(e) => {
                warn!(error = %e, "Template fetch failed");
                self.emit(Event::error(format!("Failed to fetch templates: {e:#}")));
            }
        }
    }

    async fn handle_load_template(&self, template_id: &str) {
        if let Err(e) = self.ensure_templates().await {
            warn!(template_id, error = %e, "Template fetch failed");
            self.emit(Event::error(format!("Failed to load template: {e:#}")));
            return;
        }

        let Some(template) = self.cache.find(template_id).await else {
            self.emit(Event::error(format!("Template not found: {template_id}")));
            return;
        };

        let config = (self.transform)(&template);
        self.editor
            .install_configuration(config, Some(template_id.to_string()));
        self.emit(Event::TemplateLoaded {
            template_id: template_id.to_string(),
        });
    }

    fn handle_load_template_json(&self, json: &str) {
        match EditorConfiguration::parse(json) {
            Ok(config) => {
                self.editor.install_configuration(config, None);
                self.emit(Event::TemplateLoaded {
                    template_id: CUSTOM_TEMPLATE_ID.to_string(),
                });
            }
            Err(e) => {
                warn!(error = %e, "Rejected template JSON");
                self.emit(Event::error(format!("Failed to parse template JSON: {e}")));
            }
        }
    }

    /// Cached templates, fetching on a miss. A fresh fetch is published to
    /// the editor store.
    async fn ensure_templates(&self) -> anyhow::Result<Arc<Vec<TemplateSummary>>> {
        let fill = self.cache.get_or_fetch(self.api.as_ref()).await?;
        if fill.fetched {
            self.editor.set_api_templates(fill.templates.to_vec());
        }
        Ok(fill.templates)
    }

    /// Post an event to the host. Dropped unless the client is ready.
    fn emit(&self, event: Event) -> bool {
        if self.state != ClientState::Ready {
            debug!(message_type = event.message_type(), "Messaging inactive, event dropped");
            return false;
        }
        let Some(parent) = self.context.parent() else {
            return false;
        };
        let data = match serde_json::to_value(&event) {
            Ok(data) => data,
            Err(e) => {
                warn!(%e, "Failed to encode event");
                return false;
            }
        };
        parent.post_message(self.context.id(), data)
    }

    /// Report a save result to the host.
    pub fn notify_template_saved(&self, template_id: &str, success: bool) -> bool {
        self.emit(Event::TemplateSaved {
            template_id: template_id.to_string(),
            success,
        })
    }

    /// Report an error from a local action to the host.
    pub fn report_error(&self, message: impl Into<String>) -> bool {
        self.emit(Event::error(message))
    }

    /// Save the current document against the selected template and report
    /// the outcome to the host.
    pub async fn save_current(&self, html: &str) -> SaveStatus {
        let Some(template_id) = self.editor.current_template_id() else {
            info!("No template selected to save");
            return SaveStatus::NoTemplateSelected;
        };

        let result = match self.editor.document().to_json() {
            Ok(builder_json) => self.api.save_template(&template_id, html, &builder_json).await,
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(()) => {
                info!(template_id = %template_id, "Template saved");
                self.notify_template_saved(&template_id, true);
                SaveStatus::Saved { template_id }
            }
            Err(e) => {
                warn!(template_id = %template_id, error = %e, "Template save failed");
                self.notify_template_saved(&template_id, false);
                SaveStatus::Failed {
                    template_id,
                    reason: format!("{e:#}"),
                }
            }
        }
    }

    /// Seed the cache with a list fetched elsewhere.
    pub async fn update_templates_cache(&self, templates: Vec<TemplateSummary>) {
        self.cache.replace(templates).await;
    }

    /// Drop the cached list and fetch it again.
    pub async fn reload_templates(&self) -> anyhow::Result<Arc<Vec<TemplateSummary>>> {
        self.cache.invalidate().await;
        self.ensure_templates().await
    }

    /// Install the sample behind a samples-drawer link.
    ///
    /// `#api/<subject>` selects the published template with that subject;
    /// anything else, or an unknown subject, resets to an empty layout with
    /// no template selected. Returns the selected template id.
    pub fn select_api_template(&self, href: &str) -> Option<String> {
        let templates = self.editor.api_templates();
        let found = href
            .strip_prefix(API_HREF_PREFIX)
            .and_then(|encoded| urlencoding::decode(encoded).ok())
            .and_then(|subject| templates.iter().find(|t| t.subject() == subject.as_ref()));

        match found {
            Some(template) => {
                let config = (self.transform)(template);
                self.editor
                    .install_configuration(config, Some(template.id().to_string()));
                Some(template.id().to_string())
            }
            None => {
                self.editor
                    .install_configuration(EditorConfiguration::empty_layout(), None);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use email_bridge_core::channel::ContextId;
    use serde_json::json;

    use crate::editor::EditorDocument;

    #[derive(Default)]
    struct MockApi {
        templates: Mutex<Vec<TemplateSummary>>,
        fail_fetch: Mutex<bool>,
        fail_save: bool,
        fetches: AtomicUsize,
        saves: Mutex<Vec<(String, String, String)>>,
    }

    impl MockApi {
        fn with(templates: Vec<TemplateSummary>) -> Self {
            Self {
                templates: Mutex::new(templates),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl TemplateApi for MockApi {
        async fn fetch_templates(&self) -> anyhow::Result<Vec<TemplateSummary>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if *self.fail_fetch.lock().unwrap() {
                anyhow::bail!("HTTP 503: Service Unavailable");
            }
            Ok(self.templates.lock().unwrap().clone())
        }

        async fn save_template(&self, template_id: &str, html: &str, builder_json: &str) -> anyhow::Result<()> {
            if self.fail_save {
                anyhow::bail!("HTTP 500: Internal Server Error");
            }
            self.saves
                .lock()
                .unwrap()
                .push((template_id.into(), html.into(), builder_json.into()));
            Ok(())
        }
    }

    struct Harness {
        host: ContextRef,
        host_rx: Listener,
        client: MessagingClient,
        api: Arc<MockApi>,
        editor: Arc<EditorDocument>,
    }

    fn harness(api: MockApi) -> Harness {
        let host = ContextRef::top_level("host");
        let host_rx = host.add_listener();
        let frame = ContextRef::embedded_in(&host, "editor");
        let api = Arc::new(api);
        let editor = Arc::new(EditorDocument::new());
        let mut client = MessagingClient::new(frame, api.clone(), editor.clone(), true);
        assert!(client.start());
        Harness {
            host,
            host_rx,
            client,
            api,
            editor,
        }
    }

    impl Harness {
        fn events(&mut self) -> Vec<Event> {
            let mut out = Vec::new();
            while let Some(env) = self.host_rx.try_recv() {
                out.push(serde_json::from_value(env.data).unwrap());
            }
            out
        }

        async fn command(&self, command: Command) -> bool {
            self.client
                .handle_inbound(Envelope {
                    source: self.host.id(),
                    data: serde_json::to_value(command).unwrap(),
                })
                .await
        }
    }

    fn templates() -> Vec<TemplateSummary> {
        vec![
            TemplateSummary::new("t1", "Welcome aboard", "<p>hi</p>"),
            TemplateSummary::new("t2", "Password reset", "<p>reset</p>"),
        ]
    }

    fn load(id: &str) -> Command {
        Command::LoadTemplate {
            template_id: id.into(),
        }
    }

    #[tokio::test]
    async fn test_start_announces_ready() {
        let mut h = harness(MockApi::default());
        assert_eq!(h.client.state(), ClientState::Ready);
        assert_eq!(h.events(), vec![Event::EditorReady]);
        // starting twice does not announce again
        assert!(h.client.start());
        assert!(h.events().is_empty());
    }

    #[tokio::test]
    async fn test_standalone_is_inert() {
        let page = ContextRef::top_level("editor");
        let mut page_rx = page.add_listener();
        let mut client = MessagingClient::new(
            page.clone(),
            Arc::new(MockApi::default()),
            Arc::new(EditorDocument::new()),
            true,
        );
        assert!(!client.start());
        assert_eq!(client.state(), ClientState::Standalone);
        assert_eq!(page.listener_count(), 1);
        assert!(!client.notify_template_saved("t1", true));
        assert!(page_rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_get_templates_fetches_once() {
        let mut h = harness(MockApi::with(vec![TemplateSummary::new("a", "A", "<p>a</p>")]));
        h.events();

        assert!(h.command(Command::GetTemplates).await);
        assert!(h.command(Command::GetTemplates).await);
        assert_eq!(h.api.fetches.load(Ordering::SeqCst), 1);

        let events = h.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], events[1]);
        match &events[0] {
            Event::TemplatesList { templates } => assert_eq!(templates[0].id(), "a"),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(h.editor.api_templates().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_reports_error_and_retries() {
        let mut h = harness(MockApi::with(templates()));
        h.events();
        *h.api.fail_fetch.lock().unwrap() = true;

        h.command(Command::GetTemplates).await;
        assert_eq!(
            h.events(),
            vec![Event::error("Failed to fetch templates: HTTP 503: Service Unavailable")]
        );
        assert!(!h.client.cache().is_populated().await);

        *h.api.fail_fetch.lock().unwrap() = false;
        h.command(Command::GetTemplates).await;
        assert!(matches!(h.events()[0], Event::TemplatesList { .. }));
        assert_eq!(h.api.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_load_template_twice_emits_two_loaded_events() {
        let mut h = harness(MockApi::with(templates()));
        h.events();

        h.command(load("t1")).await;
        h.command(load("t1")).await;
        let loaded = Event::TemplateLoaded {
            template_id: "t1".into(),
        };
        assert_eq!(h.events(), vec![loaded.clone(), loaded]);
        assert_eq!(h.editor.current_template_id().as_deref(), Some("t1"));
        assert_eq!(h.editor.revision(), 2);
        assert_eq!(h.api.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_load_unknown_template_leaves_editor_untouched() {
        let mut h = harness(MockApi::with(templates()));
        h.command(Command::GetTemplates).await;
        h.events();
        let before = h.editor.document();

        h.command(load("missing")).await;
        assert_eq!(h.events(), vec![Event::error("Template not found: missing")]);
        assert_eq!(h.editor.document(), before);
        assert_eq!(h.editor.revision(), 0);
    }

    #[tokio::test]
    async fn test_load_template_fetch_failure_prefix() {
        let mut h = harness(MockApi::default());
        *h.api.fail_fetch.lock().unwrap() = true;
        h.events();

        h.command(load("t1")).await;
        match &h.events()[0] {
            Event::Error { message } => assert!(message.starts_with("Failed to load template: ")),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_template_json() {
        let mut h = harness(MockApi::default());
        h.events();

        h.command(Command::LoadTemplateJson {
            json: "{not json".into(),
        })
        .await;
        let events = h.events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::Error { message } => assert!(message.starts_with("Failed to parse template JSON: ")),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(h.editor.revision(), 0);

        let doc = r#"{"root":{"type":"EmailLayout","data":{"childrenIds":[]}}}"#;
        h.command(Command::LoadTemplateJson { json: doc.into() }).await;
        assert_eq!(
            h.events(),
            vec![Event::TemplateLoaded {
                template_id: CUSTOM_TEMPLATE_ID.into()
            }]
        );
        assert_eq!(h.editor.document(), EditorConfiguration::parse(doc).unwrap());
        assert!(h.editor.current_template_id().is_none());
    }

    #[tokio::test]
    async fn test_foreign_and_malformed_messages_ignored() {
        let mut h = harness(MockApi::with(templates()));
        h.events();

        let foreign = h
            .client
            .handle_inbound(Envelope {
                source: ContextId::new(),
                data: json!({"type": "GET_TEMPLATES"}),
            })
            .await;
        assert!(!foreign);

        for data in [json!({"type": "RESIZE"}), json!({"kind": "GET_TEMPLATES"}), json!(42)] {
            assert!(
                !h.client
                    .handle_inbound(Envelope {
                        source: h.host.id(),
                        data,
                    })
                    .await
            );
        }
        assert!(h.events().is_empty());
        assert_eq!(h.api.fetches.load(Ordering::SeqCst), 0);
        assert!(!h.client.cache().is_populated().await);
    }

    #[tokio::test]
    async fn test_pump_executes_delivered_commands_in_order() {
        let mut h = harness(MockApi::with(templates()));
        h.events();
        let frame_id = h.client.context.id();
        for command in [load("t2"), Command::GetTemplates] {
            h.client
                .context
                .post_message(h.host.id(), serde_json::to_value(command).unwrap());
        }
        // a message the frame posts to itself is not from the parent
        h.client.context.post_message(frame_id, json!({"type": "GET_TEMPLATES"}));

        assert_eq!(h.client.pump().await, 2);
        let events = h.events();
        assert_eq!(
            events[0],
            Event::TemplateLoaded {
                template_id: "t2".into()
            }
        );
        assert!(matches!(events[1], Event::TemplatesList { .. }));
    }

    #[tokio::test]
    async fn test_save_current() {
        let mut h = harness(MockApi::with(templates()));
        assert_eq!(h.client.save_current("<p/>").await, SaveStatus::NoTemplateSelected);
        assert!(h.api.saves.lock().unwrap().is_empty());

        h.command(load("t1")).await;
        h.events();
        let status = h.client.save_current("<p>rendered</p>").await;
        assert_eq!(
            status,
            SaveStatus::Saved {
                template_id: "t1".into()
            }
        );
        let saves = h.api.saves.lock().unwrap().clone();
        assert_eq!(saves[0].0, "t1");
        assert_eq!(saves[0].1, "<p>rendered</p>");
        assert!(EditorConfiguration::parse(&saves[0].2).is_ok());
        assert_eq!(
            h.events(),
            vec![Event::TemplateSaved {
                template_id: "t1".into(),
                success: true
            }]
        );
    }

    #[tokio::test]
    async fn test_save_failure_notifies_host() {
        let mut h = harness(MockApi {
            templates: Mutex::new(templates()),
            fail_save: true,
            ..Default::default()
        });
        h.command(load("t2")).await;
        h.events();

        match h.client.save_current("<p/>").await {
            SaveStatus::Failed { template_id, reason } => {
                assert_eq!(template_id, "t2");
                assert!(reason.contains("500"));
            }
            other => panic!("unexpected status {other:?}"),
        }
        assert_eq!(
            h.events(),
            vec![Event::TemplateSaved {
                template_id: "t2".into(),
                success: false
            }]
        );
    }

    #[tokio::test]
    async fn test_seeded_cache_and_reload() {
        let h = harness(MockApi::with(templates()));
        h.client
            .update_templates_cache(vec![TemplateSummary::new("seed", "Seed", "")])
            .await;
        h.command(load("seed")).await;
        assert_eq!(h.api.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(h.editor.current_template_id().as_deref(), Some("seed"));

        let reloaded = h.client.reload_templates().await.unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(h.api.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(h.editor.api_templates().len(), 2);
    }

    #[tokio::test]
    async fn test_select_api_template_by_subject() {
        let h = harness(MockApi::with(templates()));
        h.client.reload_templates().await.unwrap();

        let selected = h.client.select_api_template("#api/Password%20reset");
        assert_eq!(selected.as_deref(), Some("t2"));
        assert_eq!(h.editor.current_template_id().as_deref(), Some("t2"));

        assert!(h.client.select_api_template("#api/Nope").is_none());
        assert!(h.editor.current_template_id().is_none());
        assert_eq!(h.editor.document(), EditorConfiguration::empty_layout());

        assert!(h.client.select_api_template("#").is_none());
    }

    #[tokio::test]
    async fn test_custom_transform_is_used() {
        let host = ContextRef::top_level("host");
        let frame = ContextRef::embedded_in(&host, "editor");
        let editor = Arc::new(EditorDocument::new());
        let mut client = MessagingClient::new(frame, Arc::new(MockApi::with(templates())), editor.clone(), true)
            .with_transform(Arc::new(|_: &TemplateSummary| EditorConfiguration::empty_layout()));
        client.start();

        client
            .handle_inbound(Envelope {
                source: host.id(),
                data: serde_json::to_value(load("t1")).unwrap(),
            })
            .await;
        assert_eq!(editor.document(), EditorConfiguration::empty_layout());
        assert_eq!(editor.current_template_id().as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn test_dispose_stops_handling() {
        let mut h = harness(MockApi::with(templates()));
        h.events();
        h.client.dispose();
        assert_eq!(h.client.state(), ClientState::Disposed);
        assert!(!h.command(Command::GetTemplates).await);
        assert!(!h.client.report_error("late"));
        assert!(!h.client.start());
        assert!(h.events().is_empty());
    }
}
