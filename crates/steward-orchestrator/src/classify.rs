use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use steward_core::{Intent, StewardResult, NAVIGATOR_AGENT};
use steward_security::with_timeout;
use tracing::{debug, warn};

/// The outcome of intent classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    /// Resolved intent, or [`Intent::Unknown`].
    pub intent: Intent,
    /// Agent the intent routes to.
    pub agent: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Human-readable explanation of how the decision was made.
    pub reason: String,
}

impl Classification {
    fn for_intent(intent: Intent, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            intent,
            agent: intent.default_agent().to_string(),
            confidence: confidence.clamp(0.0, 1.0),
            reason: reason.into(),
        }
    }

    /// The degraded fallback: unknown intent, navigator, zero confidence.
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            intent: Intent::Unknown,
            agent: NAVIGATOR_AGENT.to_string(),
            confidence: 0.0,
            reason: reason.into(),
        }
    }
}

/// The slower probabilistic classification tier.
///
/// The underlying model call is an external collaborator; implementations
/// wrap whatever inference backend the deployment uses. [`HeuristicModel`]
/// is the in-process default.
#[async_trait]
pub trait IntentModel: Send + Sync {
    /// Infer an intent for a query the deterministic tier could not match.
    async fn infer(&self, query: &str) -> StewardResult<Classification>;
}

/// In-process fallback model: scores vocabulary overlap per intent.
pub struct HeuristicModel;

#[async_trait]
impl IntentModel for HeuristicModel {
    async fn infer(&self, query: &str) -> StewardResult<Classification> {
        let lower = query.to_lowercase();
        let vocab: [(Intent, &[&str]); 5] = [
            (
                Intent::DocumentConversion,
                &["file", "document", "export", "scan", "page"],
            ),
            (
                Intent::Localization,
                &["language", "locale", "region", "audience", "version"],
            ),
            (
                Intent::GrantProposal,
                &["funding", "foundation", "application", "award", "nonprofit"],
            ),
            (
                Intent::BusinessPlan,
                &["revenue", "market", "strategy", "investor", "forecast"],
            ),
            (
                Intent::SafetyLog,
                &["hazard", "inspection", "report", "compliance", "site"],
            ),
        ];

        let mut best: Option<(Intent, usize)> = None;
        for (intent, words) in vocab {
            let hits = words.iter().filter(|w| lower.contains(*w)).count();
            if hits > 0 && best.map_or(true, |(_, b)| hits > b) {
                best = Some((intent, hits));
            }
        }

        match best {
            Some((intent, hits)) => Ok(Classification::for_intent(
                intent,
                0.4 + 0.1 * hits as f64,
                format!("heuristic vocabulary overlap ({hits} terms)"),
            )),
            None => Ok(Classification::fallback("no vocabulary overlap")),
        }
    }
}

/// Two-tier intent classifier.
///
/// The deterministic keyword tier runs first and takes precedence, keeping
/// routing reproducible and free for common phrasings. Only unmatched
/// queries escalate to the probabilistic tier, which runs under a timeout.
/// `classify` never errors: any internal failure degrades to the navigator
/// fallback.
pub struct Classifier {
    patterns: Vec<(Regex, Intent)>,
    model: Arc<dyn IntentModel>,
    model_timeout: Duration,
}

impl Classifier {
    /// Build a classifier around the given probabilistic tier.
    pub fn new(model: Arc<dyn IntentModel>, model_timeout: Duration) -> Self {
        // Compiled once at startup; these literals are known-good patterns.
        let patterns = [
            (r"(?i)\b(convert|conversion|pdf|docx|reformat)\b", Intent::DocumentConversion),
            (r"(?i)\b(translate|translation|localiz\w*|spanish|french|german)\b", Intent::Localization),
            (r"(?i)\bgrant\b|\bfunding proposal\b|\brfp\b", Intent::GrantProposal),
            (r"(?i)\bbusiness plan\b|\bpitch\b", Intent::BusinessPlan),
            (r"(?i)\bsafety\b|\bincident\b|\bosha\b", Intent::SafetyLog),
        ]
        .into_iter()
        .filter_map(|(pattern, intent)| Regex::new(pattern).ok().map(|re| (re, intent)))
        .collect();

        Self {
            patterns,
            model,
            model_timeout,
        }
    }

    /// A classifier backed by the in-process [`HeuristicModel`].
    pub fn with_default_model(model_timeout: Duration) -> Self {
        Self::new(Arc::new(HeuristicModel), model_timeout)
    }

    /// Classify a query. Never errors; degrades to the navigator fallback.
    pub async fn classify(&self, query: &str) -> Classification {
        for (pattern, intent) in &self.patterns {
            if pattern.is_match(query) {
                debug!(intent = %intent, "keyword tier matched");
                return Classification::for_intent(
                    *intent,
                    0.95,
                    format!("keyword match: {}", pattern.as_str()),
                );
            }
        }

        match with_timeout(self.model_timeout, self.model.infer(query)).await {
            Ok(classification) => classification,
            Err(err) => {
                warn!(error = %err, "probabilistic tier failed, degrading to navigator");
                Classification::fallback("classifier degraded after internal failure")
            }
        }
    }
}
