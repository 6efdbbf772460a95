use crate::PageSnapshot;

/// A writable text field on the host page (the chat input box, or the
/// editable field revealed by a prompt's edit affordance).
pub trait TextInput: Send + Sync {
    fn set_text(&self, text: &str);
}

/// A clickable control on the host page (send button, new-conversation link).
pub trait PageControl: Send + Sync {
    fn activate(&self);
}

/// The prompt half of a conversation pair. The host page requires a
/// dedicated edit action before the prompt text becomes writable, hence the
/// two-step begin/confirm protocol.
pub trait PromptRegion: Send + Sync {
    fn begin_edit(&self);
    fn set_draft(&self, text: &str);
    fn confirm(&self);
}

/// The rendered response half of a conversation pair.
pub trait ResponseRegion: Send + Sync {
    fn text(&self) -> String;
}

/// Resolves the current structural layout of the host page.
///
/// `scan` re-reads the page each call and never memoizes. Partial page
/// states are expected transiently during navigation, so missing elements
/// come back as `None` in the snapshot rather than as errors; callers
/// null-check instead of handling failures.
pub trait PageAdapter: Send {
    fn scan(&mut self) -> PageSnapshot;
}
