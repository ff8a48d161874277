use serde::{Deserialize, Serialize};

/// A single `(label, score)` pair as produced by a text classifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Normalizes a single-label distribution so that it sums to 1.
///
/// Negative scores are clamped to zero first. When nothing is left after
/// clamping, every label gets the same share.
pub fn normalize_distribution(pairs: &[LabelScore]) -> Vec<LabelScore> {
    let total: f64 = pairs.iter().map(|p| p.score.max(0.0)).sum();
    if total <= 0.0 {
        let share = 1.0 / pairs.len().max(1) as f64;
        return pairs
            .iter()
            .map(|p| LabelScore::new(p.label.clone(), share))
            .collect();
    }
    pairs
        .iter()
        .map(|p| LabelScore::new(p.label.clone(), p.score.max(0.0) / total))
        .collect()
}

/// Stable descending sort by score. Equal scores keep their input order.
pub fn sort_descending(pairs: &mut [LabelScore]) {
    pairs.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
