//! Command Catalogue v0.2.0
//!
//! The registry of commands hark is allowed to resolve to. Nothing outside
//! this catalogue is ever matched, confirmed, or executed - it is the hard
//! boundary between "something the user said" and "something the system does".
//!
//! Source format: a JSON array of `{intent, trigger_phrase, system_call}`
//! records, loaded read-only at startup. Insertion order is preserved and
//! meaningful: lexical tie-breaks resolve to the earliest entry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// One registered command.
///
/// `intent` doubles as the classification label handed to the zero-shot
/// backend, so it must be unique within a catalogue. `trigger_phrase` may be
/// empty, in which case the entry participates only in semantic matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEntry {
    pub intent: String,
    #[serde(default)]
    pub trigger_phrase: String,
    pub system_call: String,
}

/// Catalogue load/validation errors. All of these are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    #[error("catalogue file not found: {0}")]
    NotFound(String),

    #[error("failed to read catalogue {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed catalogue {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate intent '{0}' in catalogue")]
    DuplicateIntent(String),

    #[error("catalogue entry {index} has an empty intent")]
    EmptyIntent { index: usize },
}

/// Immutable, insertion-ordered command registry.
#[derive(Debug, Clone)]
pub struct Catalogue {
    entries: Vec<CommandEntry>,
    by_intent: HashMap<String, usize>,
}

impl Catalogue {
    /// Load and validate a catalogue from a JSON file.
    pub fn load(path: &Path) -> Result<Self, CatalogueError> {
        if !path.exists() {
            return Err(CatalogueError::NotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path).map_err(|e| CatalogueError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        let entries: Vec<CommandEntry> =
            serde_json::from_str(&content).map_err(|e| CatalogueError::Malformed {
                path: path.display().to_string(),
                source: e,
            })?;

        let catalogue = Self::from_entries(entries)?;
        tracing::info!(
            entries = catalogue.len(),
            path = %path.display(),
            "catalogue loaded"
        );
        Ok(catalogue)
    }

    /// Build a catalogue from in-memory entries, enforcing invariants.
    pub fn from_entries(entries: Vec<CommandEntry>) -> Result<Self, CatalogueError> {
        let mut by_intent = HashMap::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            if entry.intent.trim().is_empty() {
                return Err(CatalogueError::EmptyIntent { index });
            }
            if by_intent.insert(entry.intent.clone(), index).is_some() {
                return Err(CatalogueError::DuplicateIntent(entry.intent.clone()));
            }
        }
        Ok(Self { entries, by_intent })
    }

    /// Classification label universe, in insertion order.
    pub fn intents(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.intent.clone()).collect()
    }

    pub fn lookup_by_intent(&self, intent: &str) -> Option<&CommandEntry> {
        self.by_intent.get(intent).map(|&i| &self.entries[i])
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
