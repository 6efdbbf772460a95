use std::sync::mpsc;

use chatfeed_core::{ChatHandler, ConversationPair, Router};

use crate::driver::PumpMsg;
use crate::ingest::{IngestMsg, INGEST_HANDLER};

/// Router-side presence of the ingestion handler.
///
/// The state machine itself lives in the pump; this thin handler claims
/// exclusivity on bind and forwards the events the machine cares about into
/// the pump channel. Response events matter only while active, which the
/// router's active-first delivery already guarantees; stop additionally
/// reaches the machine through a plain subscription, so a stop observed
/// while inactive still sets the sticky flag (double delivery while active
/// is an idempotent flag set).
pub(crate) struct RelayHandler {
    tx: mpsc::Sender<PumpMsg>,
}

impl RelayHandler {
    pub(crate) fn new(tx: mpsc::Sender<PumpMsg>) -> Self {
        Self { tx }
    }
}

impl ChatHandler for RelayHandler {
    fn name(&self) -> &str {
        INGEST_HANDLER
    }

    fn bind(&mut self, router: &mut Router) {
        let _ = router.request_exclusivity(INGEST_HANDLER);
    }

    fn on_response(&mut self, _router: &mut Router, _last: Option<ConversationPair>) {
        let _ = self.tx.send(PumpMsg::Ingest(IngestMsg::ResponseObserved));
    }

    fn on_generation_stopped(&mut self, _router: &mut Router) {
        let _ = self.tx.send(PumpMsg::Ingest(IngestMsg::StopObserved));
    }
}
