use serde::{Deserialize, Serialize};

/// Tunables for the compatibility scorer. The weights sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub skills_weight: f64,
    pub budget_weight: f64,
    pub trust_weight: f64,
    pub availability_weight: f64,
    pub completion_weight: f64,
    /// Ranked results are truncated to this many entries.
    pub max_results: usize,
    /// Keyword extraction stops once this many distinct terms are found.
    pub max_keywords: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            skills_weight: 0.40,
            budget_weight: 0.25,
            trust_weight: 0.20,
            availability_weight: 0.10,
            completion_weight: 0.05,
            max_results: 3,
            max_keywords: 10,
        }
    }
}
