//! Chatfeed engine: the paginated-ingestion state machine, the document and
//! settings boundaries, and the automation driver that wires them to a
//! [`chatfeed_core::Router`].
mod document;
mod driver;
mod ingest;
mod relay;
mod settings;

pub use document::{DocumentError, DocumentSource, PagedDocument, TextDocumentSource};
pub use driver::AutomationHandle;
pub use ingest::{
    step, IngestConfig, IngestEffect, IngestMsg, IngestState, Phase, INGEST_HANDLER,
};
pub use settings::{InMemoryPromptStore, PromptStore, RonPromptStore};
