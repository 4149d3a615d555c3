mod config;
pub(crate) mod rules;

pub use config::MatchingConfig;

use serde::{Deserialize, Serialize};

use super::domain::{Job, WorkerId, WorkerProfile};

/// Strong-signal tags attached to a match when a sub-score clears its
/// significance threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchFactor {
    SkillsMatch,
    BudgetFit,
    HighTrust,
    AvailableNow,
    Reliable,
}

impl MatchFactor {
    pub const fn label(self) -> &'static str {
        match self {
            MatchFactor::SkillsMatch => "skills_match",
            MatchFactor::BudgetFit => "budget_fit",
            MatchFactor::HighTrust => "high_trust",
            MatchFactor::AvailableNow => "available_now",
            MatchFactor::Reliable => "reliable",
        }
    }
}

/// Human-readable justification for a match, derived deterministically
/// from the fired factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchExplanation {
    pub reason: String,
    pub factors: Vec<MatchFactor>,
}

/// Ephemeral scoring output for one candidate. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub worker_id: WorkerId,
    pub score: f64,
    pub confidence: f64,
    pub explanation: MatchExplanation,
}

/// Stateless scorer ranking a candidate pool against one job. Scoring is
/// deterministic and independent per candidate.
pub struct MatchingEngine {
    config: MatchingConfig,
}

impl MatchingEngine {
    pub fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    /// Scores every candidate, sorts descending (stable, so ties keep pool
    /// order), and truncates to the configured result count.
    pub fn rank(&self, job: &Job, candidates: &[WorkerProfile]) -> Vec<MatchResult> {
        let job_keywords = rules::keywords(&job.description, self.config.max_keywords);
        let reference_budget = job.budget.midpoint();

        let mut results: Vec<MatchResult> = candidates
            .iter()
            .map(|candidate| self.score_candidate(&job_keywords, reference_budget, candidate))
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(self.config.max_results);
        results
    }

    fn score_candidate(
        &self,
        job_keywords: &[String],
        reference_budget: f64,
        candidate: &WorkerProfile,
    ) -> MatchResult {
        let scores = rules::SubScores {
            skills: rules::skills_score(job_keywords, &candidate.skills),
            budget: rules::budget_score(candidate.avg_price, reference_budget),
            trust: rules::trust_score(candidate.trust_score),
            availability: rules::availability_score(candidate.available),
            completion: rules::completion_score(candidate.completion_rate),
        };

        let total = self.config.skills_weight * scores.skills
            + self.config.budget_weight * scores.budget
            + self.config.trust_weight * scores.trust
            + self.config.availability_weight * scores.availability
            + self.config.completion_weight * scores.completion;

        let factors = rules::fired_factors(&scores, candidate.available);
        let confidence = (0.5 + 0.1 * factors.len() as f64).min(0.95);

        MatchResult {
            worker_id: candidate.worker_id.clone(),
            score: total,
            confidence,
            explanation: MatchExplanation {
                reason: reason_for(&factors),
                factors,
            },
        }
    }
}

fn reason_for(factors: &[MatchFactor]) -> String {
    match factors {
        [] => "Basic match".to_string(),
        [only] => format!("Good match based on {}", only.label()),
        [first, second] => format!("Strong match: {} and {}", first.label(), second.label()),
        [first, second, ..] => format!(
            "Excellent match: {}, {} and more",
            first.label(),
            second.label()
        ),
    }
}
