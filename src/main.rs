use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::{fmt::Debug, path::PathBuf};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sentra_emo::affect::{AffectEngine, NeutralMode};
use sentra_emo::analysis::Analyzer;
use sentra_emo::classifier::{HttpClassifierFactory, ModelManager};
use sentra_emo::config;
use sentra_emo::inference_stats::InferenceStats;
use sentra_emo::server::{metrics, run_server, RequestsLoggingLevel};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

fn parse_unit_interval(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("Invalid number '{}': {}", s, e))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("Value must be within [0, 1], got {}", value));
    }
    Ok(value)
}

#[derive(Parser, Debug)]
#[clap(version, about = "Text affect analysis service")]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The address to bind to.
    #[clap(long, default_value = config::DEFAULT_HOST)]
    pub host: String,

    /// The port to listen on.
    #[clap(short, long, default_value_t = config::DEFAULT_PORT)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = config::DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Directory holding the `sentiment` and `emotion` model directories.
    #[clap(long, value_parser = parse_path, default_value = "models")]
    pub models_dir: PathBuf,

    /// Shared directory searched for VAD maps, aliases and negative emotion lists.
    #[clap(long, value_parser = parse_path, default_value = "config")]
    pub config_dir: PathBuf,

    /// VAD mapping used when the emotion model has none of its own.
    #[clap(long, value_parser = parse_path, default_value = "vad_maps/default.json")]
    pub default_vad_map: PathBuf,

    /// Base URL of the inference service running the classifiers.
    #[clap(long, default_value = config::DEFAULT_INFERENCE_URL)]
    pub inference_url: String,

    /// Timeout in seconds for inference requests.
    #[clap(long, default_value_t = config::DEFAULT_INFERENCE_TIMEOUT_SEC)]
    pub inference_timeout_sec: u64,

    /// Sentiment model to use: a sub-directory of models/sentiment or an absolute path.
    #[clap(long)]
    pub sentiment_model: Option<String>,

    /// Emotion model to use: a sub-directory of models/emotion or an absolute path.
    #[clap(long)]
    pub emotion_model: Option<String>,

    /// Emotions whose valence is below this value count towards stress.
    #[clap(long, value_parser = parse_unit_interval, default_value_t = 0.5)]
    pub negative_valence_threshold: f64,

    /// Treat emotion scores as independent probabilities.
    #[clap(long)]
    pub emotion_multi_label: bool,

    /// Minimum score of a reported emotion in multi-label mode.
    #[clap(long, value_parser = parse_unit_interval, default_value_t = 0.3)]
    pub emotion_threshold: f64,

    /// Maximum number of reported emotions. 0 means no limit.
    #[clap(long)]
    pub emotion_top_k: Option<usize>,

    /// Whether the sentiment result carries a neutral class.
    #[clap(long, default_value = "auto")]
    pub sentiment_neutral_mode: NeutralMode,

    /// Report emotions under their raw classifier labels instead of canonical ones.
    #[clap(long)]
    pub no_emotion_label_alias: bool,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            host: args.host.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            models_dir: args.models_dir.clone(),
            config_dir: args.config_dir.clone(),
            default_vad_map: args.default_vad_map.clone(),
            inference_url: args.inference_url.clone(),
            inference_timeout_sec: args.inference_timeout_sec,
            sentiment_model: args.sentiment_model.clone(),
            emotion_model: args.emotion_model.clone(),
            negative_valence_threshold: args.negative_valence_threshold,
            emotion_multi_label: args.emotion_multi_label,
            emotion_threshold: args.emotion_threshold,
            emotion_top_k: args.emotion_top_k,
            sentiment_neutral_mode: args.sentiment_neutral_mode,
            use_emotion_label_alias: !args.no_emotion_label_alias,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  models_dir: {:?}", app_config.models_dir);
    info!("  config_dir: {:?}", app_config.config_dir);
    info!("  default_vad_map: {:?}", app_config.default_vad_map);
    info!("  inference_url: {}", app_config.inference_url);
    info!("  affect: {:?}", app_config.affect);

    info!("Initializing metrics...");
    metrics::init_metrics();

    let factory = HttpClassifierFactory::new(
        app_config.inference_url.clone(),
        app_config.inference_timeout(),
        app_config.affect.emotion_selection.multi_label,
    );
    let models = ModelManager::new(app_config.models_dir.clone(), Arc::new(factory))
        .with_selectors(
            app_config.sentiment_model.clone(),
            app_config.emotion_model.clone(),
        );
    let affect = AffectEngine::new(app_config.affect_settings());
    let analyzer = Analyzer::new(
        Arc::new(models),
        Arc::new(affect),
        Arc::new(InferenceStats::new()),
        app_config.analysis_settings(),
    );

    info!("Warming up models...");
    analyzer.warm_up().await;

    info!("Ready to serve at port {}!", app_config.port);
    info!("Metrics available at port {}!", app_config.metrics_port);
    run_server(app_config.server_config(), Arc::new(analyzer)).await
}
