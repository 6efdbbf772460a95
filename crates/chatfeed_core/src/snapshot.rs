use std::sync::Arc;

use crate::adapter::{PageControl, TextInput};
use crate::pair::ConversationPair;

/// One wholesale reading of the host page's structure.
///
/// Rebuilt from scratch on every rescan; the previous snapshot is dropped,
/// so no mutable state is shared across scans. Any element may be absent
/// while the page is mid-navigation.
#[derive(Clone, Default)]
pub struct PageSnapshot {
    /// Prompt/response pairs in page order.
    pub pairs: Vec<ConversationPair>,
    pub input_box: Option<Arc<dyn TextInput>>,
    pub send_control: Option<Arc<dyn PageControl>>,
    pub new_conversation: Option<Arc<dyn PageControl>>,
}

impl PageSnapshot {
    /// The most recent pair on the page, if any.
    pub fn last_pair(&self) -> Option<&ConversationPair> {
        self.pairs.last()
    }
}

impl std::fmt::Debug for PageSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageSnapshot")
            .field("pairs", &self.pairs.len())
            .field("input_box", &self.input_box.is_some())
            .field("send_control", &self.send_control.is_some())
            .field("new_conversation", &self.new_conversation.is_some())
            .finish()
    }
}
