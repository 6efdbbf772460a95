//! Chatfeed core: page model, event routing and the exclusivity protocol.
mod adapter;
mod handler;
mod pair;
mod router;
mod snapshot;

pub use adapter::{PageAdapter, PageControl, PromptRegion, ResponseRegion, TextInput};
pub use handler::{ChatHandler, EventKind, SharedHandler};
pub use pair::ConversationPair;
pub use router::Router;
pub use snapshot::PageSnapshot;
