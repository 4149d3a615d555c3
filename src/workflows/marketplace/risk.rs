use serde::{Deserialize, Serialize};

/// Feature snapshot for an in-progress job. Each dimension is expected on
/// a 0-1 scale; out-of-range inputs are clamped rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRiskFeatures {
    pub worker_reliability: f64,
    pub complexity: f64,
    pub weather_risk: f64,
    pub material_availability: f64,
}

impl DelayRiskFeatures {
    fn clamped(self) -> Self {
        Self {
            worker_reliability: self.worker_reliability.clamp(0.0, 1.0),
            complexity: self.complexity.clamp(0.0, 1.0),
            weather_risk: self.weather_risk.clamp(0.0, 1.0),
            material_availability: self.material_availability.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::High => "high",
            RiskLevel::Medium => "medium",
            RiskLevel::Low => "low",
        }
    }
}

/// Tags naming which penalty rules fired, in rule order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    WorkerHistory,
    ComplexJob,
    Weather,
    MaterialShortage,
}

impl RiskFactor {
    pub const fn label(self) -> &'static str {
        match self {
            RiskFactor::WorkerHistory => "worker_history",
            RiskFactor::ComplexJob => "complex_job",
            RiskFactor::Weather => "weather",
            RiskFactor::MaterialShortage => "material_shortage",
        }
    }
}

/// Advisory output; callers must never gate a state transition on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayRiskAssessment {
    pub risk: RiskLevel,
    pub probability: f64,
    pub factors: Vec<RiskFactor>,
}

const HIGH_THRESHOLD: f64 = 0.6;
const MEDIUM_THRESHOLD: f64 = 0.3;

/// Additive penalty model: each rule that fires contributes a fixed
/// penalty and a tag. The penalties sum to 0.85 at most, so the
/// probability stays within [0, 1] by construction.
pub fn estimate(features: DelayRiskFeatures) -> DelayRiskAssessment {
    let features = features.clamped();
    let mut probability = 0.0;
    let mut factors = Vec::new();

    if features.worker_reliability < 0.8 {
        probability += 0.30;
        factors.push(RiskFactor::WorkerHistory);
    }
    if features.complexity > 0.7 {
        probability += 0.20;
        factors.push(RiskFactor::ComplexJob);
    }
    if features.weather_risk > 0.5 {
        probability += 0.15;
        factors.push(RiskFactor::Weather);
    }
    if features.material_availability < 0.8 {
        probability += 0.20;
        factors.push(RiskFactor::MaterialShortage);
    }

    let risk = if probability > HIGH_THRESHOLD {
        RiskLevel::High
    } else if probability > MEDIUM_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    DelayRiskAssessment {
        risk,
        probability,
        factors,
    }
}
