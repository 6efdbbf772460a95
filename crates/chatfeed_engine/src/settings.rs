use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use feed_logging::feed_warn;
use serde::{Deserialize, Serialize};

/// External key-value settings read with a caller-supplied default.
///
/// Implementations must re-read backing storage on every call: the
/// ingestion loop fetches the prompt template fresh before each page so
/// edits apply mid-run.
pub trait PromptStore: Send + Sync {
    fn prompt(&self, default: &str) -> String;
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedSettings {
    prompt: Option<String>,
}

/// RON-file-backed store. A missing file falls back to the default
/// silently; an unreadable or malformed one is reported and falls back.
#[derive(Debug, Clone)]
pub struct RonPromptStore {
    path: PathBuf,
}

impl RonPromptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PromptStore for RonPromptStore {
    fn prompt(&self, default: &str) -> String {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return default.to_string();
            }
            Err(err) => {
                feed_warn!("Failed to read settings from {:?}: {}", self.path, err);
                return default.to_string();
            }
        };

        let settings: PersistedSettings = match ron::from_str(&content) {
            Ok(settings) => settings,
            Err(err) => {
                feed_warn!("Failed to parse settings from {:?}: {}", self.path, err);
                return default.to_string();
            }
        };

        settings.prompt.unwrap_or_else(|| default.to_string())
    }
}

/// In-memory store for tests and embedders without a settings file.
/// Clones share the same slot, so a test can edit the template mid-run.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPromptStore {
    prompt: Arc<Mutex<Option<String>>>,
}

impl InMemoryPromptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_prompt(&self, prompt: impl Into<String>) {
        *self.prompt.lock().expect("prompt lock") = Some(prompt.into());
    }

    pub fn clear(&self) {
        *self.prompt.lock().expect("prompt lock") = None;
    }
}

impl PromptStore for InMemoryPromptStore {
    fn prompt(&self, default: &str) -> String {
        self.prompt
            .lock()
            .expect("prompt lock")
            .clone()
            .unwrap_or_else(|| default.to_string())
    }
}
