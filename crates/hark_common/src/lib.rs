//! Hark Common - intent resolution engine for spoken commands
//!
//! Resolves transcribed utterances against a catalogue of registered
//! commands using two independent strategies (lexical trigger matching and
//! zero-shot classification), arbitrates their results, gates execution
//! behind operator confirmation, and records every decision in an
//! append-only audit log.

pub mod audit;
pub mod catalogue;
pub mod classifier;
pub mod config;
pub mod confirm;
pub mod exec;
pub mod lexical;
pub mod resolution;

pub use audit::{AuditError, AuditLog, AuditRecord};
pub use catalogue::{Catalogue, CatalogueError, CommandEntry};
pub use classifier::{
    ClassificationResult, ClassifierConfig, ClassifierError, FakeClassifier, HttpClassifier,
    IntentClassifier,
};
pub use config::HarkConfig;
pub use confirm::{confirm, confirm_with};
pub use exec::{run_system_call, ExecOutcome};
pub use lexical::{LexicalStrategy, MatchResult};
pub use resolution::{
    Arbiter, ArbiterPolicy, AudioRef, Rationale, Resolution, Utterance, Verdict,
};
