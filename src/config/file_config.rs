use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub host: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub models_dir: Option<String>,
    pub config_dir: Option<String>,
    pub default_vad_map: Option<String>,
    pub inference_url: Option<String>,
    pub inference_timeout_sec: Option<u64>,
    pub sentiment_model: Option<String>,
    pub emotion_model: Option<String>,

    pub affect: Option<AffectConfig>,
}

/// The `[affect]` table.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AffectConfig {
    pub negative_valence_threshold: Option<f64>,
    pub emotion_multi_label: Option<bool>,
    pub emotion_threshold: Option<f64>,
    pub emotion_top_k: Option<usize>,
    /// One of "auto", "on", "off".
    pub sentiment_neutral_mode: Option<String>,
    pub use_emotion_label_alias: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
