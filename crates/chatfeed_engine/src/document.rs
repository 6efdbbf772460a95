use std::sync::Arc;

use bytes::Bytes;
use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("empty document payload")]
    Empty,
    #[error("document too large (max {max_bytes} bytes, got {actual})")]
    TooLarge { max_bytes: u64, actual: u64 },
    #[error("failed to decode document as {encoding}")]
    Decode { encoding: String },
    #[error("page index {index} out of range for {page_count} pages")]
    PageOutOfRange { index: usize, page_count: usize },
}

/// A loaded multi-page document. Page text extraction is asynchronous; for
/// heavyweight formats it may involve real parsing work per page.
#[async_trait::async_trait]
pub trait PagedDocument: Send + Sync {
    fn page_count(&self) -> usize;
    async fn page_text(&self, index: usize) -> Result<String, DocumentError>;
}

/// Turns a binary payload into a [`PagedDocument`].
#[async_trait::async_trait]
pub trait DocumentSource: Send + Sync {
    async fn parse(&self, payload: Bytes) -> Result<Arc<dyn PagedDocument>, DocumentError>;
}

/// Plain-text document source: decodes the payload to UTF-8 (BOM first,
/// detector fallback) and splits pages on form-feed. Blank pages are
/// dropped.
#[derive(Debug, Clone)]
pub struct TextDocumentSource {
    max_bytes: u64,
}

impl TextDocumentSource {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }
}

impl Default for TextDocumentSource {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

#[async_trait::async_trait]
impl DocumentSource for TextDocumentSource {
    async fn parse(&self, payload: Bytes) -> Result<Arc<dyn PagedDocument>, DocumentError> {
        if payload.is_empty() {
            return Err(DocumentError::Empty);
        }
        if payload.len() as u64 > self.max_bytes {
            return Err(DocumentError::TooLarge {
                max_bytes: self.max_bytes,
                actual: payload.len() as u64,
            });
        }
        let text = decode_payload(&payload)?;
        let pages: Vec<String> = text
            .split('\u{0C}')
            .map(|page| page.trim().to_string())
            .filter(|page| !page.is_empty())
            .collect();
        if pages.is_empty() {
            return Err(DocumentError::Empty);
        }
        Ok(Arc::new(TextDocument { pages }))
    }
}

struct TextDocument {
    pages: Vec<String>,
}

#[async_trait::async_trait]
impl PagedDocument for TextDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    async fn page_text(&self, index: usize) -> Result<String, DocumentError> {
        self.pages
            .get(index)
            .cloned()
            .ok_or(DocumentError::PageOutOfRange {
                index,
                page_count: self.pages.len(),
            })
    }
}

/// Decode raw bytes into UTF-8: BOM-declared encoding wins, otherwise
/// chardetng picks one.
fn decode_payload(bytes: &[u8]) -> Result<String, DocumentError> {
    let encoding = match Encoding::for_bom(bytes) {
        Some((encoding, _)) => encoding,
        None => {
            let mut detector = EncodingDetector::new();
            detector.feed(bytes, true);
            detector.guess(None, true)
        }
    };
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(DocumentError::Decode {
            encoding: encoding.name().to_string(),
        });
    }
    Ok(text.into_owned())
}
