use std::time::Duration;

/// Registry name of the paginated-ingestion handler.
pub const INGEST_HANDLER: &str = "document_ingest";

/// Tuning for the ingestion loop.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Fixed wait between an observed response and the next page send.
    pub pacing_delay: Duration,
    /// Prompt template used when the settings store has none.
    pub default_prompt: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            pacing_delay: Duration::from_secs(2),
            default_prompt: "Summary the content".to_string(),
        }
    }
}

/// Where the ingestion run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No document loaded.
    Idle,
    /// A file payload is being parsed.
    Loading,
    /// Document loaded, first page on its way out.
    Ready,
    /// A page has been sent; awaiting the paced follow-up.
    Advancing,
    /// Cursor ran past the last page. Terminal until the next load.
    Exhausted,
    /// The stop flag halted the run. Terminal until the next load.
    Stopped,
}

/// Ingestion state. Plain data; the loaded document itself is held by the
/// driver. `cursor` is the zero-based index of the next page to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestState {
    pub phase: Phase,
    pub cursor: usize,
    pub page_count: Option<usize>,
    pub stopped: bool,
}

impl Default for IngestState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            cursor: 0,
            page_count: None,
            stopped: false,
        }
    }
}

impl IngestState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Inputs to the ingestion state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestMsg {
    /// A file payload arrived and parsing began.
    LoadStarted,
    /// Parsing failed; reported, never fatal.
    LoadFailed,
    /// Parsing succeeded.
    DocumentLoaded { page_count: usize },
    /// The chat produced a response while this handler was active.
    ResponseObserved,
    /// Generation was stopped on the page, active or not.
    StopObserved,
    /// The pacing timer fired.
    AdvanceDue,
    /// A page's extracted text, already combined with the prompt template.
    PageTextReady { index: usize, payload: String },
}

/// Effects for the driver to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestEffect {
    /// Re-assert the exclusivity claim before touching shared input.
    ClaimInput,
    /// Asynchronously extract the text of the given page.
    FetchPage { index: usize },
    /// Fire `AdvanceDue` after the pacing delay.
    ScheduleAdvance,
    /// Submit the page's payload through the chat input box.
    Send { index: usize, payload: String },
}

/// Pure transition function: applies a message to the ingestion state and
/// returns the effects to run.
///
/// Every continuation re-validates the stop flag, the cursor bound and (via
/// `ClaimInput`) exclusivity at fire time instead of trusting values
/// captured when it was scheduled. Cancellation is advisory: a stop never
/// unschedules a pending advance, it only turns its firing into a halt.
pub fn step(mut state: IngestState, msg: IngestMsg) -> (IngestState, Vec<IngestEffect>) {
    let effects = match msg {
        IngestMsg::LoadStarted => {
            // A reload over a loaded document leaves the current run
            // undisturbed until the new parse succeeds.
            if state.phase == Phase::Idle {
                state.phase = Phase::Loading;
            }
            Vec::new()
        }
        IngestMsg::LoadFailed => {
            if state.phase == Phase::Loading {
                state.phase = Phase::Idle;
            }
            Vec::new()
        }
        IngestMsg::DocumentLoaded { page_count } => {
            state.page_count = Some(page_count);
            state.cursor = 0;
            state.stopped = false;
            if page_count == 0 {
                state.phase = Phase::Exhausted;
                Vec::new()
            } else {
                state.phase = Phase::Ready;
                // First page goes out immediately, before any pacing.
                vec![IngestEffect::ClaimInput, IngestEffect::FetchPage { index: 0 }]
            }
        }
        IngestMsg::ResponseObserved => {
            if state.page_count.is_none() {
                return (state, Vec::new());
            }
            state.cursor += 1;
            if state.stopped {
                state.phase = Phase::Stopped;
                Vec::new()
            } else {
                vec![IngestEffect::ScheduleAdvance]
            }
        }
        IngestMsg::StopObserved => {
            // Sticky until the next successful load.
            state.stopped = true;
            Vec::new()
        }
        IngestMsg::AdvanceDue => {
            if state.stopped {
                // The scheduled advance is absorbed; this page's content is
                // never fetched or sent.
                state.phase = Phase::Stopped;
                return (state, Vec::new());
            }
            let Some(page_count) = state.page_count else {
                return (state, Vec::new());
            };
            if state.cursor >= page_count {
                state.phase = Phase::Exhausted;
                Vec::new()
            } else {
                vec![
                    IngestEffect::ClaimInput,
                    IngestEffect::FetchPage { index: state.cursor },
                ]
            }
        }
        IngestMsg::PageTextReady { index, payload } => {
            state.phase = Phase::Advancing;
            vec![IngestEffect::Send { index, payload }]
        }
    };
    (state, effects)
}
