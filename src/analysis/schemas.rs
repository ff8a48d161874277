use serde::{Deserialize, Serialize};

use crate::affect::{LabelScore, SentimentResult, StressResult, Vad};

/// Name of the method VAD vectors are obtained with.
pub const VAD_METHOD: &str = "emotion_mapping";

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VadResult {
    pub valence: f64,
    pub arousal: f64,
    pub dominance: f64,
    pub method: &'static str,
}

impl From<Vad> for VadResult {
    fn from(vad: Vad) -> Self {
        Self {
            valence: vad.valence,
            arousal: vad.arousal,
            dominance: vad.dominance,
            method: VAD_METHOD,
        }
    }
}

/// Same vector as [`VadResult`] under the pleasure-arousal-dominance naming.
#[derive(Debug, Clone, Serialize)]
pub struct PadResult {
    pub pleasure: f64,
    pub arousal: f64,
    pub dominance: f64,
}

impl From<Vad> for PadResult {
    fn from(vad: Vad) -> Self {
        Self {
            pleasure: vad.valence,
            arousal: vad.arousal,
            dominance: vad.dominance,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelIds {
    pub sentiment: String,
    pub emotion: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    pub sentiment: SentimentResult,
    pub emotions: Vec<LabelScore>,
    pub vad: VadResult,
    pub pad: PadResult,
    pub stress: StressResult,
    pub models: ModelIds,
}
