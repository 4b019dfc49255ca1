//! Lexical Matcher v0.3.0
//!
//! Surface-form matching of an utterance against the catalogue's trigger
//! phrases, with no model in the loop. Two strategies behind one enum, both
//! returning the same `MatchResult` shape so the arbiter never cares which
//! one ran:
//!
//! - `TfIdf`: cosine similarity over TF-IDF vectors built from the joint set
//!   {utterance, all non-empty trigger phrases}. Recomputed per utterance;
//!   fine for catalogues of tens of entries.
//! - `Substring`: case-insensitive "trigger phrase occurs in utterance".
//!
//! A match is accepted only when its score is strictly above the configured
//! threshold. Ties resolve to the earliest catalogue entry.

use crate::catalogue::Catalogue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of lexical matching. `system_call` is `None` when nothing scored
/// above the threshold; `score` still carries the best sub-threshold value
/// for the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub system_call: Option<String>,
    pub score: f64,
}

impl MatchResult {
    pub fn no_match() -> Self {
        Self {
            system_call: None,
            score: 0.0,
        }
    }

    pub fn is_match(&self) -> bool {
        self.system_call.is_some()
    }
}

/// Closed set of lexical strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LexicalStrategy {
    #[default]
    #[serde(rename = "tfidf")]
    TfIdf,
    Substring,
}

impl LexicalStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LexicalStrategy::TfIdf => "tfidf",
            LexicalStrategy::Substring => "substring",
        }
    }

    /// Match `text` against every non-empty trigger phrase in the catalogue.
    ///
    /// Deterministic for fixed inputs: entries are scanned in catalogue
    /// insertion order and the running best is replaced only on a strictly
    /// greater score.
    pub fn match_text(&self, text: &str, catalogue: &Catalogue, threshold: f64) -> MatchResult {
        match self {
            LexicalStrategy::TfIdf => tfidf_match(text, catalogue, threshold),
            LexicalStrategy::Substring => substring_match(text, catalogue),
        }
    }
}

fn substring_match(text: &str, catalogue: &Catalogue) -> MatchResult {
    let lowered = text.to_lowercase();
    for entry in catalogue.entries() {
        if entry.trigger_phrase.is_empty() {
            continue;
        }
        if lowered.contains(&entry.trigger_phrase.to_lowercase()) {
            return MatchResult {
                system_call: Some(entry.system_call.clone()),
                score: 1.0,
            };
        }
    }
    MatchResult::no_match()
}

fn tfidf_match(text: &str, catalogue: &Catalogue, threshold: f64) -> MatchResult {
    let utterance_tokens = tokenize(text);
    if utterance_tokens.is_empty() {
        return MatchResult::no_match();
    }

    // Candidate triggers, keeping their catalogue position for the tie-break.
    let candidates: Vec<(&str, Vec<String>)> = catalogue
        .entries()
        .iter()
        .filter(|e| !e.trigger_phrase.is_empty())
        .map(|e| (e.system_call.as_str(), tokenize(&e.trigger_phrase)))
        .collect();
    if candidates.is_empty() {
        return MatchResult::no_match();
    }

    // Document frequencies over the joint set {utterance, triggers}.
    let n_docs = candidates.len() + 1;
    let mut df: BTreeMap<&str, usize> = BTreeMap::new();
    for token in unique(&utterance_tokens) {
        *df.entry(token).or_insert(0) += 1;
    }
    for (_, tokens) in &candidates {
        for token in unique(tokens) {
            *df.entry(token).or_insert(0) += 1;
        }
    }

    let idf = |term: &str| -> f64 {
        let d = *df.get(term).unwrap_or(&0) as f64;
        // Smoothed idf, so terms present in every document still contribute.
        ((1.0 + n_docs as f64) / (1.0 + d)).ln() + 1.0
    };

    let utterance_vec = weigh(&utterance_tokens, &idf);

    let mut best_score = 0.0;
    let mut best_call: Option<&str> = None;
    for (system_call, tokens) in &candidates {
        let score = cosine(&utterance_vec, &weigh(tokens, &idf));
        if score > best_score {
            best_score = score;
            best_call = Some(system_call);
        }
    }

    if best_score > threshold {
        MatchResult {
            system_call: best_call.map(str::to_string),
            score: best_score,
        }
    } else {
        MatchResult {
            system_call: None,
            score: best_score,
        }
    }
}

/// Lowercased alphanumeric word split.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn unique(tokens: &[String]) -> BTreeSet<&str> {
    tokens.iter().map(String::as_str).collect()
}

/// TF-IDF weights keyed by term. BTreeMap keeps summation order stable.
fn weigh(tokens: &[String], idf: impl Fn(&str) -> f64) -> BTreeMap<String, f64> {
    let mut tf: BTreeMap<String, f64> = BTreeMap::new();
    for token in tokens {
        *tf.entry(token.clone()).or_insert(0.0) += 1.0;
    }
    for (term, weight) in tf.iter_mut() {
        *weight *= idf(term);
    }
    tf
}

fn cosine(a: &BTreeMap<String, f64>, b: &BTreeMap<String, f64>) -> f64 {
    let dot: f64 = a
        .iter()
        .filter_map(|(term, wa)| b.get(term).map(|wb| wa * wb))
        .sum();
    let norm_a: f64 = a.values().map(|w| w * w).sum::<f64>().sqrt();
    let norm_b: f64 = b.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}
