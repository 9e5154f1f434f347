//! Quality gating for generated chapters.
//!
//! Combines the provider's own validation pass with the local scoring
//! heuristics and applies the conjunctive thresholds. If no provider
//! can validate, the gate degrades to heuristics-only rather than
//! blocking the pipeline.

use tracing::warn;

use coursegen_core::content::GeneratedContent;
use coursegen_core::course::ProficiencyLevel;
use coursegen_core::quality::{
    self, QualityReport, QualityThresholds, QualityWeights, ScorerSet, ScoringContext,
};
use coursegen_provider::router::ProviderRouter;

/// Gate decision for one piece of content.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Accepted(QualityReport),
    NeedsRegeneration(QualityReport),
}

impl Outcome {
    pub fn report(&self) -> &QualityReport {
        match self {
            Self::Accepted(r) | Self::NeedsRegeneration(r) => r,
        }
    }
}

pub struct QualityGate {
    thresholds: QualityThresholds,
    weights: QualityWeights,
    scorers: ScorerSet,
}

impl QualityGate {
    pub fn new(thresholds: QualityThresholds, weights: QualityWeights) -> Self {
        Self {
            thresholds,
            weights,
            scorers: ScorerSet::default(),
        }
    }

    /// Replace the default heuristic scorers.
    pub fn with_scorers(mut self, scorers: ScorerSet) -> Self {
        self.scorers = scorers;
        self
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    /// Score one chapter and decide whether it clears the gate.
    ///
    /// The provider validation call goes through the router with full
    /// failover; if it still fails, scoring proceeds without the
    /// provider signal.
    pub async fn check(
        &self,
        router: &ProviderRouter,
        content: &GeneratedContent,
        level: ProficiencyLevel,
        objectives: &[String],
        domain: &str,
    ) -> Outcome {
        let signal = match router
            .validate_content(content, level, objectives, domain)
            .await
        {
            Ok(routed) => Some(routed.value),
            Err(e) => {
                warn!(
                    chapter_id = %content.chapter_id,
                    error = %e,
                    "Provider validation unavailable, scoring heuristics only"
                );
                None
            }
        };

        let ctx = ScoringContext {
            level,
            objectives,
            domain,
            provider_signal: signal.as_ref(),
        };
        let report = quality::assess(content, &ctx, &self.thresholds, &self.weights, &self.scorers);
        if report.meets_standards {
            Outcome::Accepted(report)
        } else {
            Outcome::NeedsRegeneration(report)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use coursegen_core::content::{BlockKind, ContentBlock};
    use coursegen_provider::adapter::ProviderAdapter;
    use coursegen_provider::router::{RoutedProvider, RouterConfig};
    use coursegen_provider::testing::ScriptedProvider;

    fn router_of(adapters: Vec<Arc<dyn ProviderAdapter>>) -> ProviderRouter {
        let providers = adapters
            .into_iter()
            .map(|a| RoutedProvider::new(a, 60))
            .collect();
        ProviderRouter::new(providers, RouterConfig::default())
    }

    fn lenient() -> QualityThresholds {
        QualityThresholds {
            min_readability: None,
            min_pedagogy: 0.0,
            min_coverage: 0.0,
            min_accuracy: 0.0,
            max_bias: 1.0,
        }
    }

    fn content() -> GeneratedContent {
        GeneratedContent {
            chapter_id: uuid::Uuid::new_v4(),
            blocks: vec![ContentBlock {
                kind: BlockKind::Text,
                order: 1,
                body: "Ownership moves values. For example, recall that each value \
                       has one owner."
                    .to_string(),
            }],
            key_concepts: vec!["ownership".to_string()],
            examples: vec![],
            exercises: vec!["Explain ownership.".to_string()],
            summary: "Ownership governs moves.".to_string(),
        }
    }

    #[tokio::test]
    async fn lenient_gate_accepts() {
        let router = router_of(vec![Arc::new(ScriptedProvider::new("scripted"))]);
        let gate = QualityGate::new(lenient(), QualityWeights::default());
        let outcome = gate
            .check(
                &router,
                &content(),
                ProficiencyLevel::Beginner,
                &["Understand ownership".to_string()],
                "programming",
            )
            .await;
        assert_matches!(outcome, Outcome::Accepted(_));
    }

    #[tokio::test]
    async fn impossible_threshold_requires_regeneration() {
        let router = router_of(vec![Arc::new(ScriptedProvider::new("scripted"))]);
        let mut thresholds = lenient();
        thresholds.min_accuracy = 1.0;
        let gate = QualityGate::new(thresholds, QualityWeights::default());
        let outcome = gate
            .check(
                &router,
                &content(),
                ProficiencyLevel::Beginner,
                &["Understand ownership".to_string()],
                "programming",
            )
            .await;
        assert_matches!(outcome, Outcome::NeedsRegeneration(_));
        assert!(!outcome.report().issues.is_empty());
    }

    #[tokio::test]
    async fn validation_failure_degrades_to_heuristics() {
        let router = router_of(vec![Arc::new(ScriptedProvider::always_failing("down"))]);
        let gate = QualityGate::new(lenient(), QualityWeights::default());
        let outcome = gate
            .check(
                &router,
                &content(),
                ProficiencyLevel::Beginner,
                &["Understand ownership".to_string()],
                "programming",
            )
            .await;
        // Heuristics alone still produce a decision.
        assert_matches!(outcome, Outcome::Accepted(_));
    }
}
