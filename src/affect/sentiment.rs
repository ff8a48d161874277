//! Normalization of arbitrary sentiment classifier vocabularies.
//!
//! Classifiers come with binary (positive/negative), ternary or star-rating
//! label sets. Everything is reduced to a `{positive, negative[, neutral]}`
//! distribution that sums to 1, with the neutral class governed by a
//! [`NeutralMode`] policy.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::LabelScore;

/// Model family whose labels are "1 star" .. "5 stars".
pub const STAR_RATING_MODEL_PREFIX: &str = "nlptown/bert-base-multilingual-uncased-sentiment";

/// Floor for the star-rating denominator.
const MIN_STAR_TOTAL: f64 = 1e-9;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NeutralMode {
    /// Keep neutral only when the classifier natively has a neutral class.
    #[default]
    Auto,
    On,
    Off,
}

impl std::fmt::Display for NeutralMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NeutralMode::Auto => f.write_str("auto"),
            NeutralMode::On => f.write_str("on"),
            NeutralMode::Off => f.write_str("off"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }

    /// Substring heuristic used for generic classifiers. Checked in order
    /// pos, neg, neu, so a label matching several stems takes the first one.
    fn classify(raw_label: &str) -> Option<Self> {
        let l = raw_label.to_lowercase();
        if l.contains("pos") {
            Some(SentimentLabel::Positive)
        } else if l.contains("neg") {
            Some(SentimentLabel::Negative)
        } else if l.contains("neu") {
            Some(SentimentLabel::Neutral)
        } else {
            None
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Insertion-ordered sentiment scores.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SentimentScores(Vec<(SentimentLabel, f64)>);

impl SentimentScores {
    fn from_pairs(pairs: &[(SentimentLabel, f64)]) -> Self {
        Self(pairs.to_vec())
    }

    fn add(&mut self, label: SentimentLabel, score: f64) {
        match self.0.iter_mut().find(|(l, _)| *l == label) {
            Some((_, s)) => *s += score,
            None => self.0.push((label, score)),
        }
    }

    fn set_default(&mut self, label: SentimentLabel) {
        if !self.contains(label) {
            self.0.push((label, 0.0));
        }
    }

    fn total(&self) -> f64 {
        self.0.iter().map(|(_, s)| s).sum()
    }

    /// Divides every score by the total; a zero total leaves scores as they are.
    fn normalized(mut self) -> Self {
        let total = self.total();
        let total = if total == 0.0 { 1.0 } else { total };
        for (_, s) in self.0.iter_mut() {
            *s /= total;
        }
        self
    }

    pub fn get(&self, label: SentimentLabel) -> f64 {
        self.0
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, s)| *s)
            .unwrap_or(0.0)
    }

    pub fn contains(&self, label: SentimentLabel) -> bool {
        self.0.iter().any(|(l, _)| *l == label)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(SentimentLabel, f64)> {
        self.0.iter()
    }

    /// Highest scoring label; the earliest inserted one wins ties.
    pub fn top(&self) -> Option<SentimentLabel> {
        let mut best: Option<(SentimentLabel, f64)> = None;
        for &(label, score) in &self.0 {
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((label, score)),
            }
        }
        best.map(|(label, _)| label)
    }
}

impl Serialize for SentimentScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, score) in &self.0 {
            map.serialize_entry(label.as_str(), score)?;
        }
        map.end()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SentimentResult {
    pub label: SentimentLabel,
    pub scores: SentimentScores,
    pub raw_model: String,
}

fn parse_stars(label: &str) -> Option<u32> {
    label.split_whitespace().next()?.parse().ok()
}

fn is_star_label(label: &str) -> bool {
    let mut parts = label.split_whitespace();
    let stars = parts.next().and_then(|p| p.parse::<u32>().ok());
    let unit = parts.next().map(str::to_lowercase);
    stars.is_some() && matches!(unit.as_deref(), Some("star") | Some("stars")) && parts.next().is_none()
}

pub fn is_star_rating(model_id: &str, pairs: &[LabelScore]) -> bool {
    model_id.starts_with(STAR_RATING_MODEL_PREFIX)
        || (!pairs.is_empty() && pairs.iter().all(|p| is_star_label(&p.label)))
}

/// Whether the classifier vocabulary has a neutral-like class of its own.
pub fn has_native_neutral<S: AsRef<str>>(vocabulary: &[S]) -> bool {
    vocabulary
        .iter()
        .any(|l| l.as_ref().to_lowercase().contains("neu"))
}

/// Keeps only positive and negative, renormalized. Without any mass at all
/// the result leans positive.
fn without_neutral(scores: &SentimentScores) -> SentimentScores {
    let positive = scores.get(SentimentLabel::Positive);
    let negative = scores.get(SentimentLabel::Negative);
    let denominator = positive + negative;
    if denominator <= 0.0 {
        return SentimentScores::from_pairs(&[
            (SentimentLabel::Positive, 1.0),
            (SentimentLabel::Negative, 0.0),
        ]);
    }
    SentimentScores::from_pairs(&[
        (SentimentLabel::Positive, positive / denominator),
        (SentimentLabel::Negative, negative / denominator),
    ])
}

/// Ensures all three classes exist and sum to 1. Without any mass the
/// result is fully neutral.
fn with_neutral(mut scores: SentimentScores) -> SentimentScores {
    for label in [
        SentimentLabel::Negative,
        SentimentLabel::Neutral,
        SentimentLabel::Positive,
    ] {
        scores.set_default(label);
    }
    if scores.total() <= 0.0 {
        for (label, score) in scores.0.iter_mut() {
            *score = if *label == SentimentLabel::Neutral { 1.0 } else { 0.0 };
        }
        return scores;
    }
    scores.normalized()
}

fn normalize_star_rating(pairs: &[LabelScore], mode: NeutralMode) -> SentimentScores {
    let mut by_stars = [0.0; 6];
    for pair in pairs {
        match parse_stars(&pair.label) {
            Some(stars @ 1..=5) => by_stars[stars as usize] = pair.score,
            _ => continue,
        }
    }
    let negative = by_stars[1] + by_stars[2];
    let neutral = by_stars[3];
    let positive = by_stars[4] + by_stars[5];
    let total = (negative + neutral + positive).max(MIN_STAR_TOTAL);
    let scores = SentimentScores::from_pairs(&[
        (SentimentLabel::Negative, negative / total),
        (SentimentLabel::Neutral, neutral / total),
        (SentimentLabel::Positive, positive / total),
    ]);
    match mode {
        NeutralMode::Off => without_neutral(&scores),
        _ => with_neutral(scores),
    }
}

fn normalize_generic<S: AsRef<str>>(
    pairs: &[LabelScore],
    vocabulary: &[S],
    mode: NeutralMode,
) -> SentimentScores {
    let native_neutral = has_native_neutral(vocabulary);
    let mut scores = SentimentScores::default();
    let mut unmatched = 0.0;
    for pair in pairs {
        match SentimentLabel::classify(&pair.label) {
            Some(label) => scores.add(label, pair.score),
            None => unmatched += pair.score,
        }
    }
    if native_neutral && mode != NeutralMode::Off && unmatched > 0.0 {
        scores.add(SentimentLabel::Neutral, unmatched);
    }
    let scores = scores.normalized();

    let drop_neutral = match mode {
        NeutralMode::Off => true,
        NeutralMode::Auto => !native_neutral,
        NeutralMode::On => false,
    };
    if drop_neutral {
        without_neutral(&scores)
    } else {
        with_neutral(scores)
    }
}

/// Maps a raw sentiment distribution onto canonical sentiment classes.
///
/// `vocabulary` is the classifier's full label set, used to detect a native
/// neutral class; `model_id` selects the star-rating path for known models.
pub fn normalize_sentiment<S: AsRef<str>>(
    pairs: &[LabelScore],
    vocabulary: &[S],
    model_id: &str,
    mode: NeutralMode,
) -> SentimentScores {
    if is_star_rating(model_id, pairs) {
        normalize_star_rating(pairs, mode)
    } else {
        normalize_generic(pairs, vocabulary, mode)
    }
}

pub fn analyze_sentiment<S: AsRef<str>>(
    pairs: &[LabelScore],
    vocabulary: &[S],
    model_id: &str,
    mode: NeutralMode,
) -> SentimentResult {
    let scores = normalize_sentiment(pairs, vocabulary, model_id, mode);
    SentimentResult {
        // normalization always yields at least positive and negative
        label: scores.top().unwrap_or(SentimentLabel::Positive),
        scores,
        raw_model: model_id.to_string(),
    }
}
