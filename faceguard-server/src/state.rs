//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use faceguard_core::{AccessDecider, Archive, IdentityIndex};

use crate::validation::DEFAULT_MAX_FILE_SIZE;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Decision pipeline (verifier, extractor, index, archive hand-off)
    pub decider: Arc<AccessDecider>,
    /// Archive backing the listing endpoint
    pub archive: Arc<dyn Archive>,
    /// Maximum accepted frame size in bytes
    pub max_file_size: usize,
}

impl AppState {
    pub fn new(decider: Arc<AccessDecider>, archive: Arc<dyn Archive>) -> Self {
        Self {
            decider,
            archive,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    pub fn with_max_file_size(mut self, max_file_size: usize) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn index(&self) -> &Arc<IdentityIndex> {
        self.decider.index()
    }

    pub fn archive_folder(&self) -> &str {
        self.decider.archive_folder()
    }
}
