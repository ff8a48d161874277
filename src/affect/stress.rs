use serde::Serialize;

use super::{LabelScore, NegativeLabels, VadMapper};

const VALENCE_WEIGHT: f64 = 0.6;
const AROUSAL_WEIGHT: f64 = 0.4;
const NEGATIVE_MASS_WEIGHT: f64 = 0.15;

const LOW_UPPER_BOUND: f64 = 0.33;
const MEDIUM_UPPER_BOUND: f64 = 0.66;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StressLevel {
    Low,
    Medium,
    High,
}

impl StressLevel {
    pub fn from_score(score: f64) -> Self {
        if score < LOW_UPPER_BOUND {
            StressLevel::Low
        } else if score < MEDIUM_UPPER_BOUND {
            StressLevel::Medium
        } else {
            StressLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StressLevel::Low => "low",
            StressLevel::Medium => "medium",
            StressLevel::High => "high",
        }
    }
}

impl std::fmt::Display for StressLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StressResult {
    pub score: f64,
    pub level: StressLevel,
}

/// Total score of the entries whose canonical label is considered negative.
pub fn negative_mass(
    distribution: &[LabelScore],
    mapper: &VadMapper,
    negative: &NegativeLabels,
) -> f64 {
    if negative.is_empty() {
        return 0.0;
    }
    distribution
        .iter()
        .filter(|p| negative.contains(&mapper.canonical(&p.label)))
        .map(|p| p.score)
        .sum()
}

pub fn stress_from_components(valence: f64, arousal: f64, negative_mass: f64) -> StressResult {
    let raw = VALENCE_WEIGHT * (1.0 - valence)
        + AROUSAL_WEIGHT * arousal
        + NEGATIVE_MASS_WEIGHT * negative_mass;
    let score = raw.clamp(0.0, 1.0);
    StressResult {
        score,
        level: StressLevel::from_score(score),
    }
}

pub fn derive_stress(
    valence: f64,
    arousal: f64,
    distribution: &[LabelScore],
    mapper: &VadMapper,
    negative: &NegativeLabels,
) -> StressResult {
    stress_from_components(
        valence,
        arousal,
        negative_mass(distribution, mapper, negative),
    )
}
