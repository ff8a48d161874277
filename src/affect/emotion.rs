use super::distribution::{normalize_distribution, sort_descending};
use super::LabelScore;

#[derive(Clone, Debug, PartialEq)]
pub struct EmotionSelection {
    /// Labels are independent probabilities rather than one distribution.
    pub multi_label: bool,
    /// Minimum score for a label to be reported in multi-label mode.
    pub threshold: f64,
    /// Maximum number of labels reported. `None` and `Some(0)` mean no cap.
    pub top_k: Option<usize>,
}

impl Default for EmotionSelection {
    fn default() -> Self {
        Self {
            multi_label: false,
            threshold: 0.3,
            top_k: None,
        }
    }
}

impl EmotionSelection {
    fn cap(&self) -> Option<usize> {
        self.top_k.filter(|k| *k > 0)
    }

    /// Turns a raw classifier distribution into the reported emotions, highest first.
    pub fn select(&self, raw: &[LabelScore]) -> Vec<LabelScore> {
        if self.multi_label {
            self.select_multi_label(raw)
        } else {
            self.select_single_label(raw)
        }
    }

    fn select_single_label(&self, raw: &[LabelScore]) -> Vec<LabelScore> {
        let mut pairs = normalize_distribution(raw);
        sort_descending(&mut pairs);
        if let Some(k) = self.cap() {
            pairs.truncate(k);
        }
        pairs
    }

    fn select_multi_label(&self, raw: &[LabelScore]) -> Vec<LabelScore> {
        let mut selected: Vec<LabelScore> = raw
            .iter()
            .filter(|p| p.score >= self.threshold)
            .cloned()
            .collect();
        sort_descending(&mut selected);
        if let Some(k) = self.cap() {
            selected.truncate(k);
        }
        if selected.is_empty() {
            if let Some(best) = highest(raw) {
                selected.push(best.clone());
            }
        }
        selected
    }
}

/// First entry with the maximum score.
fn highest(pairs: &[LabelScore]) -> Option<&LabelScore> {
    pairs.iter().fold(None, |best, p| match best {
        Some(b) if p.score <= b.score => Some(b),
        _ => Some(p),
    })
}
