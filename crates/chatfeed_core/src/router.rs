use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use feed_logging::{feed_debug, feed_info};

use crate::adapter::{PageAdapter, TextInput};
use crate::handler::{ChatHandler, EventKind, SharedHandler};
use crate::pair::ConversationPair;
use crate::snapshot::PageSnapshot;

/// Activation/deactivation notices queued during a vote and delivered once
/// no handler callback is on the stack.
enum Notice {
    Activated(String),
    Deactivated(String),
}

/// Central event router over one host page.
///
/// Owns the current [`PageSnapshot`], the handler registry and the named
/// subscriber lists, and arbitrates which registered handler is allowed to
/// drive automated input. Dispatch is synchronous and single-threaded: the
/// active handler observes every event strictly before the plain
/// subscribers of the same event, and subscriber order is FIFO by
/// subscription time.
pub struct Router {
    adapter: Box<dyn PageAdapter>,
    snapshot: PageSnapshot,
    subscribers: HashMap<EventKind, Vec<SharedHandler>>,
    registry: HashMap<String, SharedHandler>,
    active: Option<String>,
    pending: VecDeque<Notice>,
    depth: usize,
}

impl Router {
    /// Builds a router and performs the initial page scan.
    pub fn new(adapter: Box<dyn PageAdapter>) -> Self {
        let mut router = Self {
            adapter,
            snapshot: PageSnapshot::default(),
            subscribers: HashMap::new(),
            registry: HashMap::new(),
            active: None,
            pending: VecDeque::new(),
            depth: 0,
        };
        router.rescan();
        router
    }

    /// Re-runs the page adapter and replaces the snapshot wholesale.
    pub fn rescan(&mut self) {
        self.snapshot = self.adapter.scan();
        feed_debug!("rescan: {:?}", self.snapshot);
    }

    /// Current page snapshot.
    pub fn snapshot(&self) -> &PageSnapshot {
        &self.snapshot
    }

    /// The most recent conversation pair, recomputed on every rescan.
    pub fn last_pair(&self) -> Option<&ConversationPair> {
        self.snapshot.last_pair()
    }

    /// Name of the handler currently driving automated input, if any.
    pub fn active_handler(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Whether the named handler currently holds exclusivity.
    pub fn is_active(&self, name: &str) -> bool {
        self.active.as_deref() == Some(name)
    }

    /// Adds `handler` to the registry, keyed by its name.
    ///
    /// Idempotent: re-registering a name replaces the prior registration.
    /// Does not invoke `bind`; only `subscribe` does that.
    pub fn register_handler(&mut self, handler: SharedHandler) {
        let name = handler.lock().expect("handler lock").name().to_string();
        feed_info!("register handler {name}");
        if self.registry.insert(name.clone(), handler).is_some() {
            feed_debug!("handler {name} re-registered, prior registration replaced");
        }
    }

    /// Appends `handler` to the subscriber list for `event` and immediately
    /// invokes its `bind` callback so it can claim exclusivity.
    pub fn subscribe(&mut self, event: EventKind, handler: SharedHandler) {
        {
            let guard = handler.lock().expect("handler lock");
            feed_info!("subscribe {:?} handler {}", event, guard.name());
        }
        self.subscribers.entry(event).or_default().push(handler.clone());

        self.depth += 1;
        {
            let mut guard = handler.lock().expect("handler lock");
            guard.bind(self);
        }
        self.depth -= 1;
        self.drain_notices();
    }

    /// The vote protocol: the only path by which the active handler changes.
    ///
    /// Returns `true` only if `name` is registered and not already active.
    /// On an ownership change the previous owner receives a deactivation
    /// notice strictly before the new owner's activation notice. A repeat
    /// vote by the current owner is an idempotent no-op returning `false`,
    /// as is a vote by an unregistered name; callers treat `false` as
    /// ordinary control flow, not an error.
    pub fn request_exclusivity(&mut self, name: &str) -> bool {
        if !self.registry.contains_key(name) {
            feed_debug!("exclusivity vote by unregistered handler {name}");
            return false;
        }
        if self.active.as_deref() == Some(name) {
            return false;
        }
        if let Some(previous) = self.active.replace(name.to_string()) {
            self.pending.push_back(Notice::Deactivated(previous));
        }
        self.pending.push_back(Notice::Activated(name.to_string()));
        feed_info!("handler {name} now drives automated input");
        self.drain_notices();
        true
    }

    /// Activates the new-conversation control if the page currently has one.
    pub fn trigger_new_conversation(&self) {
        if let Some(control) = &self.snapshot.new_conversation {
            control.activate();
        } else {
            feed_debug!("new-conversation control absent");
        }
    }

    /// Writes `text` into the input box and activates send.
    ///
    /// Silent no-op if either reference is missing; callers that cannot
    /// accept silent failure check the snapshot first.
    pub fn submit_text(&self, text: &str) {
        let (Some(input), Some(send)) = (&self.snapshot.input_box, &self.snapshot.send_control)
        else {
            feed_debug!("submit skipped: input box or send control absent");
            return;
        };
        input.set_text(text);
        send.activate();
    }

    /// Re-submits the last pair's prompt, optionally with replacement text.
    pub fn resubmit_last(&self, override_text: Option<&str>) {
        if let Some(pair) = self.snapshot.last_pair() {
            pair.resubmit(override_text);
        }
    }

    /// The page switched conversations; `back` marks navigation to an
    /// existing conversation rather than a fresh one.
    pub fn on_navigated(&mut self, back: bool) {
        self.rescan();
        self.dispatch(EventKind::Navigated, |handler, router| {
            handler.on_navigated(router, back);
        });
    }

    /// A new response finished rendering. Rescans first: the response that
    /// fired this event is itself the new last pair.
    pub fn on_response_observed(&mut self) {
        self.rescan();
        let last = self.snapshot.last_pair().cloned();
        self.dispatch(EventKind::Response, move |handler, router| {
            handler.on_response(router, last.clone());
        });
    }

    /// Generation was stopped on the page. Stop is observed here, never
    /// caused; no structural change is implied, so no rescan.
    pub fn on_generation_stopped(&mut self) {
        self.dispatch(EventKind::GenerationStopped, |handler, router| {
            handler.on_generation_stopped(router);
        });
    }

    /// The host page recreated the input box; only that reference is
    /// replaced, the rest of the snapshot stands until the next rescan.
    pub fn on_input_recreated(&mut self, input: Arc<dyn TextInput>) {
        self.snapshot.input_box = Some(input.clone());
        self.dispatch(EventKind::InputRecreated, move |handler, router| {
            handler.on_input_recreated(router, &input);
        });
    }

    /// Two-step delivery pipeline: active handler first, then the event's
    /// subscribers in FIFO order.
    fn dispatch<F>(&mut self, event: EventKind, mut deliver: F)
    where
        F: FnMut(&mut dyn ChatHandler, &mut Router),
    {
        self.depth += 1;
        if let Some(handler) = self
            .active
            .as_ref()
            .and_then(|name| self.registry.get(name))
            .cloned()
        {
            let mut guard = handler.lock().expect("handler lock");
            deliver(&mut *guard, self);
        }
        let subscribers = self.subscribers.get(&event).cloned().unwrap_or_default();
        for handler in subscribers {
            let mut guard = handler.lock().expect("handler lock");
            deliver(&mut *guard, self);
        }
        self.depth -= 1;
        self.drain_notices();
    }

    /// Delivers queued activation/deactivation notices once no handler
    /// callback is on the stack. Notice callbacks may vote again; the loop
    /// keeps draining until the queue is empty.
    fn drain_notices(&mut self) {
        if self.depth != 0 {
            return;
        }
        while let Some(notice) = self.pending.pop_front() {
            self.depth += 1;
            match notice {
                Notice::Deactivated(name) => {
                    if let Some(handler) = self.registry.get(&name).cloned() {
                        let mut guard = handler.lock().expect("handler lock");
                        guard.on_deactivated(self);
                    }
                }
                Notice::Activated(name) => {
                    if let Some(handler) = self.registry.get(&name).cloned() {
                        let mut guard = handler.lock().expect("handler lock");
                        guard.on_activated(self);
                    }
                }
            }
            self.depth -= 1;
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("snapshot", &self.snapshot)
            .field("handlers", &self.registry.len())
            .field("active", &self.active)
            .finish()
    }
}
