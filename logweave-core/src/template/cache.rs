//! Bounded cache of parsed message templates.
//!
//! Templates are usually string literals, so the set seen by a process is
//! small and parsing each one once pays off. Once the cache is full, new
//! templates are parsed on every call instead of evicting old ones.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::MessageTemplate;

/// Maximum number of cached templates.
pub const MAX_CACHED_TEMPLATES: usize = 1000;

#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: RwLock<HashMap<String, Arc<MessageTemplate>>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `text`, or return the cached parse.
    pub fn get_or_parse(&self, text: &str) -> Arc<MessageTemplate> {
        if let Ok(entries) = self.entries.read() {
            if let Some(hit) = entries.get(text) {
                return Arc::clone(hit);
            }
        }

        let parsed = Arc::new(MessageTemplate::parse(text));
        if let Ok(mut entries) = self.entries.write() {
            if entries.len() < MAX_CACHED_TEMPLATES {
                entries
                    .entry(text.to_string())
                    .or_insert_with(|| Arc::clone(&parsed));
            }
        }
        parsed
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
