use super::MatchFactor;

/// Neutral sub-score substituted when a candidate or job is missing the
/// data a dimension needs.
pub(crate) const NEUTRAL_SCORE: f64 = 0.5;

/// Canonical maximum of the worker trust scale.
pub(crate) const TRUST_SCALE_MAX: f64 = 100.0;

const SKILLS_FACTOR_THRESHOLD: f64 = 0.7;
const BUDGET_FACTOR_THRESHOLD: f64 = 0.7;
const TRUST_FACTOR_THRESHOLD: f64 = 0.8;
const COMPLETION_FACTOR_THRESHOLD: f64 = 0.9;

const STOP_WORDS: &[&str] = &[
    "with", "from", "that", "this", "have", "need", "want", "will", "your",
    "looking", "please", "about", "some", "very", "their", "would",
];

/// Distinct lowercase keywords from a job description: words longer than
/// three characters, stop words dropped, capped at `limit` terms.
pub(crate) fn keywords(description: &str, limit: usize) -> Vec<String> {
    let mut terms = Vec::new();
    for raw in description.split(|c: char| !c.is_alphanumeric()) {
        if terms.len() == limit {
            break;
        }
        let word = raw.to_lowercase();
        if word.chars().count() <= 3 || STOP_WORDS.contains(&word.as_str()) {
            continue;
        }
        if !terms.contains(&word) {
            terms.push(word);
        }
    }
    terms
}

/// Per-dimension sub-scores for one candidate, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SubScores {
    pub skills: f64,
    pub budget: f64,
    pub trust: f64,
    pub availability: f64,
    pub completion: f64,
}

/// Fraction of job keywords covered by at least one skill tag, using
/// case-insensitive substring containment in either direction.
pub(crate) fn skills_score(job_keywords: &[String], skills: &[String]) -> f64 {
    if job_keywords.is_empty() {
        return 0.0;
    }
    let tags: Vec<String> = skills.iter().map(|tag| tag.to_lowercase()).collect();
    let matched = job_keywords
        .iter()
        .filter(|keyword| {
            tags.iter()
                .any(|tag| tag.contains(keyword.as_str()) || keyword.contains(tag.as_str()))
        })
        .count();
    matched as f64 / job_keywords.len() as f64
}

/// Tiered price-fit score from the ratio of the worker's average price to
/// the job's reference budget. Missing or zero inputs score neutral.
pub(crate) fn budget_score(avg_price: Option<f64>, reference_budget: f64) -> f64 {
    let avg = match avg_price {
        Some(value) if value > 0.0 && value.is_finite() => value,
        _ => return NEUTRAL_SCORE,
    };
    if reference_budget <= 0.0 || !reference_budget.is_finite() {
        return NEUTRAL_SCORE;
    }
    let ratio = avg / reference_budget;
    if (0.9..=1.1).contains(&ratio) {
        1.0
    } else if (0.75..=1.25).contains(&ratio) {
        0.8
    } else if (0.5..=1.5).contains(&ratio) {
        0.6
    } else {
        0.3
    }
}

pub(crate) fn trust_score(trust: Option<f64>) -> f64 {
    trust
        .map(|value| (value / TRUST_SCALE_MAX).clamp(0.0, 1.0))
        .unwrap_or(NEUTRAL_SCORE)
}

pub(crate) fn availability_score(available: bool) -> f64 {
    if available {
        1.0
    } else {
        0.5
    }
}

pub(crate) fn completion_score(rate: Option<f64>) -> f64 {
    rate.map(|value| (value / 100.0).clamp(0.0, 1.0))
        .unwrap_or(NEUTRAL_SCORE)
}

/// Strong-signal tags, in fixed dimension order.
pub(crate) fn fired_factors(scores: &SubScores, available: bool) -> Vec<MatchFactor> {
    let mut factors = Vec::new();
    if scores.skills > SKILLS_FACTOR_THRESHOLD {
        factors.push(MatchFactor::SkillsMatch);
    }
    if scores.budget > BUDGET_FACTOR_THRESHOLD {
        factors.push(MatchFactor::BudgetFit);
    }
    if scores.trust > TRUST_FACTOR_THRESHOLD {
        factors.push(MatchFactor::HighTrust);
    }
    if available {
        factors.push(MatchFactor::AvailableNow);
    }
    if scores.completion > COMPLETION_FACTOR_THRESHOLD {
        factors.push(MatchFactor::Reliable);
    }
    factors
}
