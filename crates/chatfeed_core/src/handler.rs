use std::sync::{Arc, Mutex};

use crate::pair::ConversationPair;
use crate::router::Router;
use crate::TextInput;

/// Named lifecycle events a handler can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The page switched to a new or previous conversation.
    Navigated,
    /// A new response finished rendering.
    Response,
    /// The user stopped generation mid-response.
    GenerationStopped,
    /// The host page tore down and recreated the input box.
    InputRecreated,
}

/// A handler shared between the registry and subscriber lists.
pub type SharedHandler = Arc<Mutex<dyn ChatHandler>>;

/// Lifecycle callbacks for automation plugins.
///
/// Every callback has a default no-op body, so implementations only spell
/// out the events they care about. Callbacks receive the router rather than
/// storing a reference to it; a handler that wants to drive the shared input
/// box must hold exclusivity (see [`Router::request_exclusivity`]) or
/// re-assert its claim first.
pub trait ChatHandler: Send {
    /// Stable unique name; the registry key and the vote identity.
    fn name(&self) -> &str;

    /// Invoked once when the handler is subscribed, before any event
    /// delivery. A handler typically claims exclusivity here.
    fn bind(&mut self, router: &mut Router) {
        let _ = router;
    }

    /// The handler won the vote and now owns automated input.
    fn on_activated(&mut self, router: &mut Router) {
        let _ = router;
    }

    /// Another handler won the vote; release any held resources.
    fn on_deactivated(&mut self, router: &mut Router) {
        let _ = router;
    }

    fn on_navigated(&mut self, router: &mut Router, back: bool) {
        let _ = (router, back);
    }

    /// Delivered after a rescan, with the freshly recomputed last pair.
    fn on_response(&mut self, router: &mut Router, last: Option<ConversationPair>) {
        let _ = (router, last);
    }

    fn on_generation_stopped(&mut self, router: &mut Router) {
        let _ = router;
    }

    fn on_input_recreated(&mut self, router: &mut Router, input: &Arc<dyn TextInput>) {
        let _ = (router, input);
    }
}
