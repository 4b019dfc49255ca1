//! Resolution Arbiter v0.4.0
//!
//! Combines the lexical match and the zero-shot classification into one
//! auditable decision. The precedence is fixed:
//!
//! 1. both strategies name the same system_call -> `LexicalAgreement`
//!    (strongest signal, applies even when semantic confidence is low);
//! 2. semantic confidence strictly above its threshold -> `SemanticOnly`
//!    (degrades gracefully on paraphrased utterances the trigger phrases
//!    cannot see);
//! 3. a lexical hit alone -> `LexicalOnly`;
//! 4. otherwise -> `NoMatch`.
//!
//! `resolve()` is total per utterance: an empty transcript degrades to a
//! `NoMatch` resolution instead of aborting, while an unreachable backend
//! propagates (nothing can be resolved without it).

use crate::catalogue::Catalogue;
use crate::classifier::{ClassificationResult, ClassifierError, IntentClassifier};
use crate::lexical::{LexicalStrategy, MatchResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque reference to the audio artifact an utterance came from. The audio
/// itself is owned by the capture/transcription collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRef(pub String);

impl AudioRef {
    pub fn none() -> Self {
        Self(String::new())
    }
}

/// One transcribed utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    pub source: AudioRef,
}

impl Utterance {
    pub fn new(text: impl Into<String>, source: AudioRef) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }
}

/// Why the arbiter decided what it decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rationale {
    LexicalAgreement,
    SemanticOnly,
    LexicalOnly,
    NoMatch,
}

impl Rationale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rationale::LexicalAgreement => "lexical_agreement",
            Rationale::SemanticOnly => "semantic_only",
            Rationale::LexicalOnly => "lexical_only",
            Rationale::NoMatch => "no_match",
        }
    }
}

/// The full decision record for one utterance. Immutable once produced; a
/// fresh Resolution is created per utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub id: String,
    pub utterance: Utterance,
    pub lexical: MatchResult,
    /// None when classification was skipped (empty transcript degradation).
    pub semantic: Option<ClassificationResult>,
    pub final_call: Option<String>,
    pub rationale: Rationale,
}

impl Resolution {
    /// Total fallback when classification could not run for this utterance.
    pub fn no_match(utterance: Utterance, lexical: MatchResult) -> Self {
        Self {
            id: new_id(),
            utterance,
            lexical,
            semantic: None,
            final_call: None,
            rationale: Rationale::NoMatch,
        }
    }
}

/// The recorded outcome of human confirmation. Terminal; written once to
/// the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub resolution: Resolution,
    pub approved: bool,
    pub decided_at: DateTime<Utc>,
}

/// Arbitration thresholds and strategy. Both thresholds compare with strict
/// `>`; a score exactly at the threshold is not accepted.
#[derive(Debug, Clone, Copy)]
pub struct ArbiterPolicy {
    pub strategy: LexicalStrategy,
    pub lexical_threshold: f64,
    pub semantic_threshold: f64,
}

impl Default for ArbiterPolicy {
    fn default() -> Self {
        Self {
            strategy: LexicalStrategy::TfIdf,
            lexical_threshold: 0.2,
            semantic_threshold: 0.5,
        }
    }
}

/// Per-process resolution engine: owns the catalogue, the once-initialized
/// classifier handle, and the decision policy.
pub struct Arbiter {
    catalogue: Catalogue,
    classifier: Box<dyn IntentClassifier>,
    policy: ArbiterPolicy,
}

impl Arbiter {
    pub fn new(
        catalogue: Catalogue,
        classifier: Box<dyn IntentClassifier>,
        policy: ArbiterPolicy,
    ) -> Self {
        Self {
            catalogue,
            classifier,
            policy,
        }
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    /// Run both strategies and arbitrate. An empty transcript (or an empty
    /// catalogue label set) degrades to a `NoMatch` resolution; backend
    /// failures propagate.
    pub fn resolve(&self, utterance: Utterance) -> Result<Resolution, ClassifierError> {
        let lexical = self.policy.strategy.match_text(
            &utterance.text,
            &self.catalogue,
            self.policy.lexical_threshold,
        );

        let labels = self.catalogue.intents();
        let semantic = match self.classifier.classify(&utterance.text, &labels) {
            Ok(result) => result,
            Err(ClassifierError::EmptyInput) => {
                tracing::debug!("empty classifier input, degrading to no_match");
                return Ok(Resolution::no_match(utterance, lexical));
            }
            Err(e @ ClassifierError::InvalidResponse(_)) => {
                // One garbled response must not halt a batch; the backend is
                // still up, so this utterance degrades instead of aborting.
                tracing::warn!(error = %e, "classifier response unusable, degrading to no_match");
                return Ok(Resolution::no_match(utterance, lexical));
            }
            Err(e) => return Err(e),
        };

        Ok(self.arbitrate(utterance, lexical, semantic))
    }

    /// Pure decision step: deterministic and total over its inputs.
    pub fn arbitrate(
        &self,
        utterance: Utterance,
        lexical: MatchResult,
        semantic: ClassificationResult,
    ) -> Resolution {
        let semantic_call = self
            .catalogue
            .lookup_by_intent(&semantic.intent)
            .map(|e| e.system_call.clone());

        let (final_call, rationale) = match (&lexical.system_call, &semantic_call) {
            (Some(lex), Some(sem)) if lex == sem => {
                (Some(lex.clone()), Rationale::LexicalAgreement)
            }
            _ if semantic_call.is_some() && semantic.confidence > self.policy.semantic_threshold => {
                (semantic_call.clone(), Rationale::SemanticOnly)
            }
            (Some(lex), _) => (Some(lex.clone()), Rationale::LexicalOnly),
            _ => (None, Rationale::NoMatch),
        };

        tracing::info!(
            text = %utterance.text,
            lexical_score = lexical.score,
            semantic_intent = %semantic.intent,
            semantic_confidence = semantic.confidence,
            rationale = rationale.as_str(),
            final_call = final_call.as_deref().unwrap_or("-"),
            "utterance resolved"
        );

        Resolution {
            id: new_id(),
            utterance,
            lexical,
            semantic: Some(semantic),
            final_call,
            rationale,
        }
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::CommandEntry;
    use crate::classifier::FakeClassifier;

    fn catalogue() -> Catalogue {
        Catalogue::from_entries(vec![
            CommandEntry {
                intent: "check_weather".into(),
                trigger_phrase: "what's the weather".into(),
                system_call: "get_weather".into(),
            },
            CommandEntry {
                intent: "order_food".into(),
                trigger_phrase: "order me a pizza".into(),
                system_call: "order_pizza".into(),
            },
        ])
        .unwrap()
    }

    fn arbiter(classifier: FakeClassifier) -> Arbiter {
        Arbiter::new(catalogue(), Box::new(classifier), ArbiterPolicy::default())
    }

    fn utterance(text: &str) -> Utterance {
        Utterance::new(text, AudioRef("clip_001.mp3".into()))
    }

    #[test]
    fn test_lexical_agreement() {
        let arbiter = arbiter(FakeClassifier::always("check_weather", 0.9));
        let resolution = arbiter.resolve(utterance("what's the weather today")).unwrap();

        assert_eq!(resolution.rationale, Rationale::LexicalAgreement);
        assert_eq!(resolution.final_call.as_deref(), Some("get_weather"));
        assert!(resolution.lexical.score > 0.2);
    }

    #[test]
    fn test_agreement_wins_even_with_low_semantic_confidence() {
        // Semantic confidence below its own threshold must not demote an
        // agreement between the two strategies.
        let arbiter = arbiter(FakeClassifier::always("check_weather", 0.1));
        let resolution = arbiter.resolve(utterance("what's the weather today")).unwrap();

        assert_eq!(resolution.rationale, Rationale::LexicalAgreement);
        assert_eq!(resolution.final_call.as_deref(), Some("get_weather"));
    }

    #[test]
    fn test_semantic_only_on_paraphrase() {
        let arbiter = arbiter(FakeClassifier::always("check_weather", 0.85));
        let resolution = arbiter.resolve(utterance("is it sunny outside")).unwrap();

        assert_eq!(resolution.rationale, Rationale::SemanticOnly);
        assert_eq!(resolution.final_call.as_deref(), Some("get_weather"));
        assert!(!resolution.lexical.is_match());
    }

    #[test]
    fn test_no_match_when_both_strategies_weak() {
        let arbiter = arbiter(FakeClassifier::always("order_food", 0.3));
        let resolution = arbiter.resolve(utterance("play some jazz")).unwrap();

        assert_eq!(resolution.rationale, Rationale::NoMatch);
        assert!(resolution.final_call.is_none());
    }

    #[test]
    fn test_lexical_only_when_strategies_disagree() {
        // Lexical points at weather, semantic confidently at food but for a
        // different call, below-threshold semantic loses; above-threshold
        // semantic would win rule 2, so keep it below here.
        let arbiter = arbiter(FakeClassifier::always("order_food", 0.4));
        let resolution = arbiter.resolve(utterance("what's the weather today")).unwrap();

        assert_eq!(resolution.rationale, Rationale::LexicalOnly);
        assert_eq!(resolution.final_call.as_deref(), Some("get_weather"));
    }

    #[test]
    fn test_disagreement_with_confident_semantic_prefers_semantic() {
        let arbiter = arbiter(FakeClassifier::always("order_food", 0.9));
        let resolution = arbiter.resolve(utterance("what's the weather today")).unwrap();

        assert_eq!(resolution.rationale, Rationale::SemanticOnly);
        assert_eq!(resolution.final_call.as_deref(), Some("order_pizza"));
    }

    #[test]
    fn test_semantic_confidence_exactly_at_threshold_is_rejected() {
        let arbiter = arbiter(FakeClassifier::always("check_weather", 0.5));
        let resolution = arbiter.resolve(utterance("is it sunny outside")).unwrap();

        assert_eq!(resolution.rationale, Rationale::NoMatch);
        assert!(resolution.final_call.is_none());
    }

    #[test]
    fn test_unknown_intent_falls_through() {
        // A label outside the catalogue cannot be mapped to a call; with no
        // lexical hit the only total answer is NoMatch.
        let arbiter = arbiter(FakeClassifier::always("book_flight", 0.95));
        let resolution = arbiter.resolve(utterance("get me to paris")).unwrap();

        assert_eq!(resolution.rationale, Rationale::NoMatch);
        assert!(resolution.final_call.is_none());
    }

    #[test]
    fn test_empty_transcript_degrades_to_no_match() {
        let arbiter = arbiter(FakeClassifier::always("check_weather", 0.9));
        let resolution = arbiter.resolve(utterance("")).unwrap();

        assert_eq!(resolution.rationale, Rationale::NoMatch);
        assert!(resolution.final_call.is_none());
        assert!(resolution.semantic.is_none());
    }

    #[test]
    fn test_invalid_response_degrades_to_no_match() {
        let arbiter = arbiter(FakeClassifier::always_error(ClassifierError::InvalidResponse(
            "not json".into(),
        )));
        let resolution = arbiter.resolve(utterance("what's the weather today")).unwrap();

        assert_eq!(resolution.rationale, Rationale::NoMatch);
        assert!(resolution.final_call.is_none());
        // The lexical score is still recorded for the audit trail.
        assert!(resolution.lexical.score > 0.0);
    }

    #[test]
    fn test_backend_unavailable_propagates() {
        let arbiter = arbiter(FakeClassifier::always_error(ClassifierError::Unavailable(
            "connection refused".into(),
        )));
        let err = arbiter.resolve(utterance("what's the weather")).unwrap_err();
        assert!(matches!(err, ClassifierError::Unavailable(_)));
    }

    #[test]
    fn test_determinism_for_fixed_inputs() {
        let arbiter = arbiter(FakeClassifier::always("check_weather", 0.9));
        let a = arbiter.resolve(utterance("what's the weather today")).unwrap();
        let b = arbiter.resolve(utterance("what's the weather today")).unwrap();

        // Everything except the per-record id must be identical.
        assert_eq!(a.rationale, b.rationale);
        assert_eq!(a.final_call, b.final_call);
        assert_eq!(a.lexical, b.lexical);
        assert_eq!(a.semantic, b.semantic);
    }
}
