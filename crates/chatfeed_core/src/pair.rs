use std::sync::Arc;

use feed_logging::feed_debug;

use crate::adapter::{PromptRegion, ResponseRegion};

/// One prompt/response unit on the host page.
///
/// The prompt is the structural sibling immediately preceding the response,
/// which the adapter may fail to resolve; the response is what the pair was
/// built from. Validity is never cached: a pair is only as live as the
/// snapshot it came from, and every operation acts on the current handles.
#[derive(Clone)]
pub struct ConversationPair {
    pub prompt: Option<Arc<dyn PromptRegion>>,
    pub response: Arc<dyn ResponseRegion>,
}

impl ConversationPair {
    pub fn new(prompt: Option<Arc<dyn PromptRegion>>, response: Arc<dyn ResponseRegion>) -> Self {
        Self { prompt, response }
    }

    /// Re-submits this pair's prompt, optionally with replacement text.
    ///
    /// Two-click protocol: enter the edit affordance, inject the override if
    /// given, confirm. Queues a new response on the page as a side effect.
    /// Silent no-op when the prompt region is absent.
    pub fn resubmit(&self, override_text: Option<&str>) {
        let Some(prompt) = &self.prompt else {
            feed_debug!("resubmit skipped: prompt region absent");
            return;
        };
        prompt.begin_edit();
        if let Some(text) = override_text {
            prompt.set_draft(text);
        }
        prompt.confirm();
    }

    /// Plain text of the rendered response.
    pub fn response_text(&self) -> String {
        self.response.text()
    }
}

impl std::fmt::Debug for ConversationPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationPair")
            .field("prompt", &self.prompt.is_some())
            .field("response", &true)
            .finish()
    }
}
