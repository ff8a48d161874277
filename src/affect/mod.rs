mod canonical;
mod distribution;
mod emotion;
mod engine;
mod negative;
pub mod paths;
mod sentiment;
pub mod stress;
mod vad;

pub use canonical::LabelCanonicalizer;
pub use distribution::{normalize_distribution, sort_descending, LabelScore};
pub use emotion::EmotionSelection;
pub use engine::{AffectEngine, AffectScore, AffectSettings, AffectSnapshot, AffectStatus};
pub use negative::{NegativeLabels, NegativeSource};
pub use sentiment::{
    analyze_sentiment, has_native_neutral, is_star_rating, normalize_sentiment, NeutralMode,
    SentimentLabel, SentimentResult, SentimentScores, STAR_RATING_MODEL_PREFIX,
};
pub use stress::{StressLevel, StressResult};
pub use vad::{load_vad_table, parse_vad_table, Vad, VadMapper};
