mod file_config;

pub use file_config::{AffectConfig, FileConfig};

use crate::affect::{AffectSettings, EmotionSelection, NeutralMode};
use crate::analysis::AnalysisSettings;
use crate::server::{RequestsLoggingLevel, ServerConfig};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_METRICS_PORT: u16 = 9092;
pub const DEFAULT_INFERENCE_URL: &str = "http://127.0.0.1:8500";
pub const DEFAULT_INFERENCE_TIMEOUT_SEC: u64 = 30;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub host: String,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub models_dir: PathBuf,
    pub config_dir: PathBuf,
    pub default_vad_map: PathBuf,
    pub inference_url: String,
    pub inference_timeout_sec: u64,
    pub sentiment_model: Option<String>,
    pub emotion_model: Option<String>,
    pub negative_valence_threshold: f64,
    pub emotion_multi_label: bool,
    pub emotion_threshold: f64,
    pub emotion_top_k: Option<usize>,
    pub sentiment_neutral_mode: NeutralMode,
    pub use_emotion_label_alias: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            metrics_port: DEFAULT_METRICS_PORT,
            logging_level: RequestsLoggingLevel::Path,
            models_dir: PathBuf::from("models"),
            config_dir: PathBuf::from("config"),
            default_vad_map: PathBuf::from("vad_maps/default.json"),
            inference_url: DEFAULT_INFERENCE_URL.to_string(),
            inference_timeout_sec: DEFAULT_INFERENCE_TIMEOUT_SEC,
            sentiment_model: None,
            emotion_model: None,
            negative_valence_threshold: 0.5,
            emotion_multi_label: false,
            emotion_threshold: 0.3,
            emotion_top_k: None,
            sentiment_neutral_mode: NeutralMode::Auto,
            use_emotion_label_alias: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub host: String,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,

    // Models
    pub models_dir: PathBuf,
    pub config_dir: PathBuf,
    pub default_vad_map: PathBuf,
    pub inference_url: String,
    pub inference_timeout_sec: u64,
    pub sentiment_model: Option<String>,
    pub emotion_model: Option<String>,

    pub affect: AffectOptions,
}

/// Resolved `[affect]` table.
#[derive(Debug, Clone, PartialEq)]
pub struct AffectOptions {
    pub negative_valence_threshold: f64,
    pub emotion_selection: EmotionSelection,
    pub sentiment_neutral_mode: NeutralMode,
    pub use_emotion_label_alias: bool,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn check_unit_interval(name: &str, value: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&value) {
        bail!("{} must be within [0, 1], got {}", name, value);
    }
    Ok(value)
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let host = file.host.unwrap_or_else(|| cli.host.clone());
        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let models_dir = file
            .models_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.models_dir.clone());
        if models_dir.exists() && !models_dir.is_dir() {
            bail!("models_dir is not a directory: {:?}", models_dir);
        }
        let config_dir = file
            .config_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.config_dir.clone());
        let default_vad_map = file
            .default_vad_map
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.default_vad_map.clone());

        let inference_url = file
            .inference_url
            .unwrap_or_else(|| cli.inference_url.clone());
        let inference_timeout_sec = file
            .inference_timeout_sec
            .unwrap_or(cli.inference_timeout_sec);
        if inference_timeout_sec == 0 {
            bail!("inference_timeout_sec must be greater than zero");
        }

        let sentiment_model =
            non_blank(file.sentiment_model).or_else(|| non_blank(cli.sentiment_model.clone()));
        let emotion_model =
            non_blank(file.emotion_model).or_else(|| non_blank(cli.emotion_model.clone()));

        // Affect settings - merge file config with CLI values
        let affect_file = file.affect.unwrap_or_default();
        let sentiment_neutral_mode = match affect_file.sentiment_neutral_mode {
            Some(s) => match parse_neutral_mode(&s) {
                Some(mode) => mode,
                None => bail!(
                    "Invalid sentiment_neutral_mode {:?}, expected auto, on or off",
                    s
                ),
            },
            None => cli.sentiment_neutral_mode,
        };
        let affect = AffectOptions {
            negative_valence_threshold: check_unit_interval(
                "negative_valence_threshold",
                affect_file
                    .negative_valence_threshold
                    .unwrap_or(cli.negative_valence_threshold),
            )?,
            emotion_selection: EmotionSelection {
                multi_label: affect_file
                    .emotion_multi_label
                    .unwrap_or(cli.emotion_multi_label),
                threshold: check_unit_interval(
                    "emotion_threshold",
                    affect_file.emotion_threshold.unwrap_or(cli.emotion_threshold),
                )?,
                top_k: affect_file.emotion_top_k.or(cli.emotion_top_k),
            },
            sentiment_neutral_mode,
            use_emotion_label_alias: affect_file
                .use_emotion_label_alias
                .unwrap_or(cli.use_emotion_label_alias),
        };

        Ok(Self {
            host,
            port,
            metrics_port,
            logging_level,
            models_dir,
            config_dir,
            default_vad_map,
            inference_url,
            inference_timeout_sec,
            sentiment_model,
            emotion_model,
            affect,
        })
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_sec)
    }

    pub fn affect_settings(&self) -> AffectSettings {
        AffectSettings {
            shared_config_dir: self.config_dir.clone(),
            default_vad_map: self.default_vad_map.clone(),
            default_model_dir: self.models_dir.join("emotion"),
            negative_valence_threshold: self.affect.negative_valence_threshold,
        }
    }

    pub fn analysis_settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            emotion_selection: self.affect.emotion_selection.clone(),
            neutral_mode: self.affect.sentiment_neutral_mode,
            use_emotion_label_alias: self.affect.use_emotion_label_alias,
        }
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            host: self.host.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
        }
    }
}

fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

fn parse_neutral_mode(s: &str) -> Option<NeutralMode> {
    NeutralMode::from_str(s, true).ok()
}
