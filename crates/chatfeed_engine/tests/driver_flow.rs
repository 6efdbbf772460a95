use std::sync::{Arc, Mutex, Once};
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use chatfeed_core::{
    ChatHandler, ConversationPair, EventKind, PageAdapter, PageControl, PageSnapshot, Router,
    SharedHandler, TextInput,
};
use chatfeed_engine::{
    AutomationHandle, InMemoryPromptStore, IngestConfig, TextDocumentSource,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(feed_logging::initialize_for_tests);
}

struct CollectingInput {
    sends: Arc<Mutex<Vec<String>>>,
}

impl TextInput for CollectingInput {
    fn set_text(&self, text: &str) {
        self.sends.lock().unwrap().push(text.to_string());
    }
}

struct NoopControl;

impl PageControl for NoopControl {
    fn activate(&self) {}
}

struct FakePageAdapter {
    sends: Arc<Mutex<Vec<String>>>,
}

impl PageAdapter for FakePageAdapter {
    fn scan(&mut self) -> PageSnapshot {
        PageSnapshot {
            pairs: Vec::new(),
            input_box: Some(Arc::new(CollectingInput {
                sends: self.sends.clone(),
            })),
            send_control: Some(Arc::new(NoopControl)),
            new_conversation: None,
        }
    }
}

fn wait_for_sends(sends: &Arc<Mutex<Vec<String>>>, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if sends.lock().unwrap().len() >= count {
            return;
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!(
        "timed out waiting for {count} sends, got {:?}",
        sends.lock().unwrap()
    );
}

fn fast_config() -> IngestConfig {
    IngestConfig {
        pacing_delay: Duration::from_millis(25),
        ..IngestConfig::default()
    }
}

fn start(
    sends: &Arc<Mutex<Vec<String>>>,
    prompts: &InMemoryPromptStore,
    config: IngestConfig,
) -> AutomationHandle {
    let router = Router::new(Box::new(FakePageAdapter {
        sends: sends.clone(),
    }));
    AutomationHandle::spawn(
        router,
        Arc::new(TextDocumentSource::default()),
        Arc::new(prompts.clone()),
        config,
    )
}

#[test]
fn three_page_document_is_fed_turn_by_turn() {
    init_logging();
    let sends = Arc::new(Mutex::new(Vec::new()));
    let prompts = InMemoryPromptStore::new();
    prompts.set_prompt("Summary: ");
    let handle = start(&sends, &prompts, fast_config());

    handle.file_dropped(Some(Bytes::from_static(b"alpha\x0cbeta\x0cgamma")));
    wait_for_sends(&sends, 1);
    assert_eq!(sends.lock().unwrap()[0], "Summary: alpha");

    handle.response_observed();
    wait_for_sends(&sends, 2);
    assert_eq!(sends.lock().unwrap()[1], "Summary: beta");

    handle.response_observed();
    wait_for_sends(&sends, 3);
    assert_eq!(sends.lock().unwrap()[2], "Summary: gamma");

    // Exhausted: the response to the last page produces nothing further.
    handle.response_observed();
    thread::sleep(Duration::from_millis(150));
    assert_eq!(sends.lock().unwrap().len(), 3);

    handle.shutdown();
}

#[test]
fn prompt_template_edits_apply_mid_run() {
    init_logging();
    let sends = Arc::new(Mutex::new(Vec::new()));
    let prompts = InMemoryPromptStore::new();
    prompts.set_prompt("First: ");
    let handle = start(&sends, &prompts, fast_config());

    handle.file_dropped(Some(Bytes::from_static(b"alpha\x0cbeta")));
    wait_for_sends(&sends, 1);
    assert_eq!(sends.lock().unwrap()[0], "First: alpha");

    prompts.set_prompt("Second: ");
    handle.response_observed();
    wait_for_sends(&sends, 2);
    assert_eq!(sends.lock().unwrap()[1], "Second: beta");

    handle.shutdown();
}

#[test]
fn stop_before_the_pacing_timer_fires_suppresses_the_page() {
    init_logging();
    let sends = Arc::new(Mutex::new(Vec::new()));
    let prompts = InMemoryPromptStore::new();
    prompts.set_prompt("Summary: ");
    let config = IngestConfig {
        pacing_delay: Duration::from_millis(150),
        ..IngestConfig::default()
    };
    let handle = start(&sends, &prompts, config);

    handle.file_dropped(Some(Bytes::from_static(b"alpha\x0cbeta\x0cgamma")));
    wait_for_sends(&sends, 1);

    // Advance for page 2 gets scheduled, then stop lands before it fires.
    handle.response_observed();
    handle.generation_stopped();

    thread::sleep(Duration::from_millis(400));
    assert_eq!(sends.lock().unwrap().len(), 1);

    // Sticky until the next load: further responses stay silent.
    handle.response_observed();
    thread::sleep(Duration::from_millis(400));
    assert_eq!(sends.lock().unwrap().len(), 1);

    handle.shutdown();
}

#[test]
fn reload_after_stop_starts_a_fresh_run() {
    init_logging();
    let sends = Arc::new(Mutex::new(Vec::new()));
    let prompts = InMemoryPromptStore::new();
    prompts.set_prompt("Summary: ");
    let handle = start(&sends, &prompts, fast_config());

    handle.file_dropped(Some(Bytes::from_static(b"alpha\x0cbeta")));
    wait_for_sends(&sends, 1);
    handle.generation_stopped();

    handle.file_dropped(Some(Bytes::from_static(b"delta")));
    wait_for_sends(&sends, 2);
    assert_eq!(sends.lock().unwrap()[1], "Summary: delta");

    handle.shutdown();
}

#[test]
fn parse_failure_leaves_the_handler_idle_but_alive() {
    init_logging();
    let sends = Arc::new(Mutex::new(Vec::new()));
    let prompts = InMemoryPromptStore::new();
    prompts.set_prompt("Summary: ");
    let handle = start(&sends, &prompts, fast_config());

    // Empty payload does not parse; nothing is sent.
    handle.file_dropped(Some(Bytes::new()));
    thread::sleep(Duration::from_millis(150));
    assert!(sends.lock().unwrap().is_empty());

    // A drop event without a payload is ignored outright.
    handle.file_dropped(None);
    thread::sleep(Duration::from_millis(50));
    assert!(sends.lock().unwrap().is_empty());

    // The handler recovers on the next good payload.
    handle.file_dropped(Some(Bytes::from_static(b"alpha")));
    wait_for_sends(&sends, 1);
    assert_eq!(sends.lock().unwrap()[0], "Summary: alpha");

    handle.shutdown();
}

/// A rival handler that votes for itself on every response event.
struct RivalHandler;

impl ChatHandler for RivalHandler {
    fn name(&self) -> &str {
        "rival"
    }

    fn on_response(&mut self, router: &mut Router, _last: Option<ConversationPair>) {
        let _ = router.request_exclusivity("rival");
    }
}

#[test]
fn ingestion_reclaims_exclusivity_on_every_advance() {
    init_logging();
    let sends = Arc::new(Mutex::new(Vec::new()));
    let prompts = InMemoryPromptStore::new();
    prompts.set_prompt("Summary: ");

    let mut router = Router::new(Box::new(FakePageAdapter {
        sends: sends.clone(),
    }));
    let rival: SharedHandler = Arc::new(Mutex::new(RivalHandler));
    router.register_handler(rival.clone());
    router.subscribe(EventKind::Response, rival);

    let handle = AutomationHandle::spawn(
        router,
        Arc::new(TextDocumentSource::default()),
        Arc::new(prompts.clone()),
        fast_config(),
    );

    handle.file_dropped(Some(Bytes::from_static(b"alpha\x0cbeta")));
    wait_for_sends(&sends, 1);

    // The rival steals the vote when the response lands, but the scheduled
    // advance re-asserts the ingestion claim before sending page 2.
    handle.response_observed();
    wait_for_sends(&sends, 2);
    assert_eq!(sends.lock().unwrap()[1], "Summary: beta");

    handle.shutdown();
}

#[test]
fn stop_reaches_the_machine_while_a_rival_holds_exclusivity() {
    init_logging();
    let sends = Arc::new(Mutex::new(Vec::new()));
    let prompts = InMemoryPromptStore::new();
    prompts.set_prompt("Summary: ");

    let mut router = Router::new(Box::new(FakePageAdapter {
        sends: sends.clone(),
    }));
    let rival: SharedHandler = Arc::new(Mutex::new(RivalHandler));
    router.register_handler(rival.clone());
    router.subscribe(EventKind::Response, rival);

    let config = IngestConfig {
        pacing_delay: Duration::from_millis(150),
        ..IngestConfig::default()
    };
    let handle = AutomationHandle::spawn(
        router,
        Arc::new(TextDocumentSource::default()),
        Arc::new(prompts.clone()),
        config,
    );

    handle.file_dropped(Some(Bytes::from_static(b"alpha\x0cbeta\x0cgamma")));
    wait_for_sends(&sends, 1);

    // The rival takes the vote on the response, so the stop arrives while
    // the ingestion handler is inactive. Its stop subscription still sets
    // the sticky flag, and the pending advance fires into a halt.
    handle.response_observed();
    handle.generation_stopped();

    thread::sleep(Duration::from_millis(400));
    assert_eq!(sends.lock().unwrap().len(), 1);

    handle.shutdown();
}
