use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use bytes::Bytes;
use chatfeed_core::{EventKind, Router, SharedHandler, TextInput};
use feed_logging::{feed_debug, feed_info, feed_warn};

use crate::document::{DocumentError, DocumentSource, PagedDocument};
use crate::ingest::{step, IngestConfig, IngestEffect, IngestMsg, IngestState, INGEST_HANDLER};
use crate::relay::RelayHandler;
use crate::settings::PromptStore;

/// Everything the pump thread processes, one message at a time.
pub(crate) enum PumpMsg {
    Navigated { back: bool },
    ResponseObserved,
    GenerationStopped,
    InputRecreated(Arc<dyn TextInput>),
    FileDropped(Option<Bytes>),
    DocumentParsed(Result<Arc<dyn PagedDocument>, DocumentError>),
    PageText { index: usize, body: String },
    Ingest(IngestMsg),
    Shutdown,
}

/// Handle through which externally rendered UI feeds page signals into the
/// automation.
///
/// All observation callbacks and timer continuations funnel into one pump
/// thread and run there one at a time, so the router, the ingestion state
/// and the loaded document are only ever touched from a single cooperative
/// flow. The two suspension points (document parsing and the pacing delay)
/// run on a tokio runtime and complete by sending a message back into the
/// pump, where their continuations re-validate state before acting.
pub struct AutomationHandle {
    tx: mpsc::Sender<PumpMsg>,
}

impl AutomationHandle {
    /// Wires the ingestion handler into `router` and starts the pump.
    ///
    /// The caller builds the router (registering any additional handlers or
    /// subscribers) before handing it over.
    pub fn spawn(
        mut router: Router,
        source: Arc<dyn DocumentSource>,
        prompts: Arc<dyn PromptStore>,
        config: IngestConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel();

        let relay: SharedHandler = Arc::new(Mutex::new(RelayHandler::new(tx.clone())));
        router.register_handler(relay.clone());
        // Stop must reach the machine even while another handler is active.
        router.subscribe(EventKind::GenerationStopped, relay);

        let pump_tx = tx.clone();
        thread::spawn(move || run_pump(router, rx, pump_tx, source, prompts, config));

        Self { tx }
    }

    /// The page switched conversations.
    pub fn navigated(&self, back: bool) {
        let _ = self.tx.send(PumpMsg::Navigated { back });
    }

    /// A new response finished rendering.
    pub fn response_observed(&self) {
        let _ = self.tx.send(PumpMsg::ResponseObserved);
    }

    /// The user stopped generation.
    pub fn generation_stopped(&self) {
        let _ = self.tx.send(PumpMsg::GenerationStopped);
    }

    /// The host page recreated the input box.
    pub fn input_recreated(&self, input: Arc<dyn TextInput>) {
        let _ = self.tx.send(PumpMsg::InputRecreated(input));
    }

    /// A file was dropped or picked. `None` models a drop event that
    /// carried no payload; it is logged and ignored.
    pub fn file_dropped(&self, payload: Option<Bytes>) {
        let _ = self.tx.send(PumpMsg::FileDropped(payload));
    }

    /// Stops the pump thread. Pending timers fire into a closed channel and
    /// are dropped.
    pub fn shutdown(&self) {
        let _ = self.tx.send(PumpMsg::Shutdown);
    }
}

fn run_pump(
    router: Router,
    rx: mpsc::Receiver<PumpMsg>,
    tx: mpsc::Sender<PumpMsg>,
    source: Arc<dyn DocumentSource>,
    prompts: Arc<dyn PromptStore>,
    config: IngestConfig,
) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let mut pump = Pump {
        router,
        state: IngestState::new(),
        document: None,
        source,
        prompts,
        config,
        tx,
        runtime,
    };
    while let Ok(msg) = rx.recv() {
        if !pump.handle(msg) {
            break;
        }
    }
    feed_info!("automation pump stopped");
}

struct Pump {
    router: Router,
    state: IngestState,
    document: Option<Arc<dyn PagedDocument>>,
    source: Arc<dyn DocumentSource>,
    prompts: Arc<dyn PromptStore>,
    config: IngestConfig,
    tx: mpsc::Sender<PumpMsg>,
    runtime: tokio::runtime::Runtime,
}

impl Pump {
    /// Returns false when the pump should stop.
    fn handle(&mut self, msg: PumpMsg) -> bool {
        match msg {
            PumpMsg::Navigated { back } => self.router.on_navigated(back),
            PumpMsg::ResponseObserved => self.router.on_response_observed(),
            PumpMsg::GenerationStopped => self.router.on_generation_stopped(),
            PumpMsg::InputRecreated(input) => self.router.on_input_recreated(input),
            PumpMsg::FileDropped(None) => {
                feed_debug!("drop event carried no payload");
            }
            PumpMsg::FileDropped(Some(payload)) => {
                feed_info!("file dropped: {} bytes", payload.len());
                self.apply(IngestMsg::LoadStarted);
                let source = self.source.clone();
                let tx = self.tx.clone();
                let _ = self.runtime.spawn(async move {
                    let result = source.parse(payload).await;
                    let _ = tx.send(PumpMsg::DocumentParsed(result));
                });
            }
            PumpMsg::DocumentParsed(Ok(document)) => {
                let page_count = document.page_count();
                feed_info!("document loaded: {page_count} pages");
                self.document = Some(document);
                self.apply(IngestMsg::DocumentLoaded { page_count });
            }
            PumpMsg::DocumentParsed(Err(err)) => {
                feed_warn!("document parse failed: {err}");
                self.apply(IngestMsg::LoadFailed);
            }
            PumpMsg::PageText { index, body } => {
                // Template is read fresh for every page so edits to the
                // settings store apply mid-run.
                let prompt = self.prompts.prompt(&self.config.default_prompt);
                let payload = format!("{prompt}{body}");
                self.apply(IngestMsg::PageTextReady { index, payload });
            }
            PumpMsg::Ingest(msg) => self.apply(msg),
            PumpMsg::Shutdown => return false,
        }
        true
    }

    fn apply(&mut self, msg: IngestMsg) {
        let (state, effects) = step(self.state.clone(), msg);
        self.state = state;
        for effect in effects {
            self.run_effect(effect);
        }
    }

    fn run_effect(&mut self, effect: IngestEffect) {
        match effect {
            IngestEffect::ClaimInput => {
                let _ = self.router.request_exclusivity(INGEST_HANDLER);
            }
            IngestEffect::FetchPage { index } => {
                let Some(document) = self.document.clone() else {
                    feed_warn!("page {index} requested with no document loaded");
                    return;
                };
                let tx = self.tx.clone();
                let _ = self.runtime.spawn(async move {
                    match document.page_text(index).await {
                        Ok(body) => {
                            let _ = tx.send(PumpMsg::PageText { index, body });
                        }
                        Err(err) => feed_warn!("failed to read page {index}: {err}"),
                    }
                });
            }
            IngestEffect::ScheduleAdvance => {
                let tx = self.tx.clone();
                let delay = self.config.pacing_delay;
                let _ = self.runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(PumpMsg::Ingest(IngestMsg::AdvanceDue));
                });
            }
            IngestEffect::Send { index, payload } => {
                feed_info!("sending page {index}: {} bytes", payload.len());
                self.router.submit_text(&payload);
            }
        }
    }
}
