//! Regeneration control loop.
//!
//! A chapter that fails the gate (or is flagged by a reviewer) gets a
//! bounded number of regeneration attempts: classify the reason,
//! regenerate at the requested scope, re-gate, and either accept the
//! candidate or try again. When the attempt budget is exhausted the
//! chapter keeps its prior content and is routed to manual review.

use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use coursegen_core::content::{splice_blocks, GeneratedContent};
use coursegen_core::course::{ChapterSpec, ProficiencyLevel};
use coursegen_core::quality::QualityReport;
use coursegen_core::regeneration::{
    classify_reason, RegenerationRecord, RegenerationScope, MAX_AUTO_RETRIES,
};
use coursegen_provider::router::ProviderRouter;

use crate::gate::{Outcome, QualityGate};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct RegenerationConfig {
    /// Automatic retries after the first failed regeneration attempt.
    pub auto_retry_cap: u32,
}

impl Default for RegenerationConfig {
    fn default() -> Self {
        Self {
            auto_retry_cap: MAX_AUTO_RETRIES,
        }
    }
}

/// Final disposition of a regeneration request.
#[derive(Debug, Clone)]
pub enum RegenOutcome {
    /// A regenerated candidate cleared the gate.
    Accepted {
        content: GeneratedContent,
        report: QualityReport,
    },
    /// The attempt budget ran out. The prior content is kept so the
    /// course stays intact while a human reviews the chapter.
    ManualReviewRequired {
        content: GeneratedContent,
        report: QualityReport,
    },
}

/// Outcome plus the audit trail of every attempt made.
#[derive(Debug)]
pub struct RegenerationResult {
    pub outcome: RegenOutcome,
    pub records: Vec<RegenerationRecord>,
}

impl RegenerationResult {
    pub fn needs_manual_review(&self) -> bool {
        matches!(self.outcome, RegenOutcome::ManualReviewRequired { .. })
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct RegenerationController {
    config: RegenerationConfig,
}

impl RegenerationController {
    pub fn new(config: RegenerationConfig) -> Self {
        Self { config }
    }

    /// Run the regeneration loop for one chapter.
    ///
    /// Total attempts are `1 + auto_retry_cap`. Every attempt is
    /// recorded whether it succeeded, failed the gate, or failed to
    /// generate at all.
    #[allow(clippy::too_many_arguments)]
    pub async fn regenerate(
        &self,
        router: &ProviderRouter,
        gate: &QualityGate,
        chapter: &ChapterSpec,
        prior: &GeneratedContent,
        prior_report: &QualityReport,
        reason: &str,
        scope: &RegenerationScope,
        level: ProficiencyLevel,
        prior_concepts: &[String],
        domain: &str,
    ) -> RegenerationResult {
        let (category, severity) = classify_reason(reason);
        let max_attempts = 1 + self.config.auto_retry_cap;
        let mut records = Vec::new();

        info!(
            chapter = chapter.sequence_number,
            category = category.name(),
            severity = ?severity,
            "Regenerating chapter"
        );

        for attempt in 1..=max_attempts {
            let started = Instant::now();
            let routed = match router
                .generate_content(chapter, level, prior_concepts)
                .await
            {
                Ok(routed) => routed,
                Err(e) => {
                    warn!(
                        chapter = chapter.sequence_number,
                        attempt,
                        error = %e,
                        "Regeneration attempt produced no content"
                    );
                    records.push(RegenerationRecord {
                        chapter_id: chapter.id,
                        reason: reason.to_string(),
                        category,
                        severity,
                        before_overall: prior_report.overall,
                        after_overall: None,
                        duration: started.elapsed(),
                        provider: String::new(),
                        at: Utc::now(),
                    });
                    continue;
                }
            };

            let candidate = match scope {
                RegenerationScope::Full => routed.value,
                RegenerationScope::Targeted(indices) => {
                    splice_blocks(prior, &routed.value, indices)
                }
            };

            let outcome = gate
                .check(router, &candidate, level, &chapter.objectives, domain)
                .await;
            let report = outcome.report().clone();
            records.push(RegenerationRecord {
                chapter_id: chapter.id,
                reason: reason.to_string(),
                category,
                severity,
                before_overall: prior_report.overall,
                after_overall: Some(report.overall),
                duration: started.elapsed(),
                provider: routed.provider,
                at: Utc::now(),
            });

            if let Outcome::Accepted(report) = outcome {
                info!(
                    chapter = chapter.sequence_number,
                    attempt, "Regenerated content accepted"
                );
                return RegenerationResult {
                    outcome: RegenOutcome::Accepted {
                        content: candidate,
                        report,
                    },
                    records,
                };
            }
            warn!(
                chapter = chapter.sequence_number,
                attempt, "Regenerated content failed the gate"
            );
        }

        info!(
            chapter = chapter.sequence_number,
            attempts = max_attempts,
            "Regeneration budget exhausted, flagging for manual review"
        );
        RegenerationResult {
            outcome: RegenOutcome::ManualReviewRequired {
                content: prior.clone(),
                report: prior_report.clone(),
            },
            records,
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
    use coursegen_core::quality::{QualityScores, QualityThresholds, QualityWeights};
    use coursegen_provider::adapter::ProviderAdapter;
    use coursegen_provider::router::{ProviderRouter, RoutedProvider, RouterConfig};
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

    fn chapter() -> ChapterSpec {
        ChapterSpec {
            id: uuid::Uuid::new_v4(),
            sequence_number: 1,
            title: "Ownership".to_string(),
            objectives: vec!["Understand ownership".to_string()],
            duration_minutes: 45,
            complexity: 1.5,
            prerequisites: vec![],
        }
    }

    fn prior_content(chapter: &ChapterSpec) -> GeneratedContent {
        GeneratedContent {
            chapter_id: chapter.id,
            blocks: vec![ContentBlock {
                kind: BlockKind::Text,
                order: 1,
                body: "Old prose.".to_string(),
            }],
            key_concepts: vec![],
            examples: vec![],
            exercises: vec![],
            summary: "Old summary.".to_string(),
        }
    }

    fn prior_report() -> QualityReport {
        QualityReport {
            scores: QualityScores {
                readability: 50.0,
                pedagogy: 0.5,
                coverage: 0.5,
                accuracy: 0.5,
                bias: 0.0,
            },
            overall: 0.5,
            meets_standards: false,
            issues: vec![],
        }
    }

    #[tokio::test]
    async fn accepted_on_first_attempt() {
        let router = router_of(vec![Arc::new(ScriptedProvider::new("scripted"))]);
        let gate = QualityGate::new(lenient(), QualityWeights::default());
        let controller = RegenerationController::new(RegenerationConfig::default());
        let spec = chapter();

        let result = controller
            .regenerate(
                &router,
                &gate,
                &spec,
                &prior_content(&spec),
                &prior_report(),
                "chapter feels incomplete",
                &RegenerationScope::Full,
                ProficiencyLevel::Beginner,
                &[],
                "programming",
            )
            .await;

        assert_matches!(result.outcome, RegenOutcome::Accepted { .. });
        assert_eq!(result.records.len(), 1);
        assert!(result.records[0].after_overall.is_some());
        assert!(!result.records[0].provider.is_empty());
    }

    #[tokio::test]
    async fn exhausted_budget_routes_to_manual_review() {
        let router = router_of(vec![Arc::new(ScriptedProvider::new("scripted"))]);
        // Accuracy of 1.0 is unreachable for the heuristic blend.
        let mut thresholds = lenient();
        thresholds.min_accuracy = 1.0;
        let gate = QualityGate::new(thresholds, QualityWeights::default());
        let controller =
            RegenerationController::new(RegenerationConfig { auto_retry_cap: 1 });
        let spec = chapter();
        let prior = prior_content(&spec);

        let result = controller
            .regenerate(
                &router,
                &gate,
                &spec,
                &prior,
                &prior_report(),
                "factually incorrect example",
                &RegenerationScope::Full,
                ProficiencyLevel::Beginner,
                &[],
                "programming",
            )
            .await;

        assert!(result.needs_manual_review());
        // 1 attempt + 1 automatic retry, both recorded.
        assert_eq!(result.records.len(), 2);
        // The prior content survives untouched.
        assert_matches!(
            result.outcome,
            RegenOutcome::ManualReviewRequired { ref content, .. } if *content == prior
        );
    }

    #[tokio::test]
    async fn provider_failure_recorded_without_score() {
        let router = router_of(vec![Arc::new(ScriptedProvider::always_failing("down"))]);
        let gate = QualityGate::new(lenient(), QualityWeights::default());
        let controller =
            RegenerationController::new(RegenerationConfig { auto_retry_cap: 0 });
        let spec = chapter();

        let result = controller
            .regenerate(
                &router,
                &gate,
                &spec,
                &prior_content(&spec),
                &prior_report(),
                "redo",
                &RegenerationScope::Full,
                ProficiencyLevel::Beginner,
                &[],
                "programming",
            )
            .await;

        assert!(result.needs_manual_review());
        assert_eq!(result.records.len(), 1);
        assert!(result.records[0].after_overall.is_none());
    }

    #[tokio::test]
    async fn targeted_scope_splices_into_prior() {
        let router = router_of(vec![Arc::new(ScriptedProvider::new("scripted"))]);
        let gate = QualityGate::new(lenient(), QualityWeights::default());
        let controller = RegenerationController::new(RegenerationConfig::default());
        let spec = chapter();
        let mut prior = prior_content(&spec);
        prior.blocks.push(ContentBlock {
            kind: BlockKind::Text,
            order: 2,
            body: "Second old block.".to_string(),
        });

        let result = controller
            .regenerate(
                &router,
                &gate,
                &spec,
                &prior,
                &prior_report(),
                "block one is unclear",
                &RegenerationScope::Targeted(vec![1]),
                ProficiencyLevel::Beginner,
                &[],
                "programming",
            )
            .await;

        let content = match result.outcome {
            RegenOutcome::Accepted { content, .. } => content,
            other => panic!("expected acceptance, got {other:?}"),
        };
        assert_ne!(content.blocks[0].body, "Old prose.");
        assert_eq!(content.blocks[1].body, "Second old block.");
        assert_eq!(content.summary, "Old summary.");
    }
}
