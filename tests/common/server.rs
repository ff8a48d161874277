//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own models directory and
//! its own mock inference endpoint.

use super::constants::*;
use super::inference::MockInference;
use sentra_emo::affect::{AffectEngine, AffectSettings, EmotionSelection};
use sentra_emo::analysis::{AnalysisSettings, Analyzer};
use sentra_emo::classifier::{HttpClassifierFactory, ModelManager};
use sentra_emo::inference_stats::InferenceStats;
use sentra_emo::server::{make_app, RequestsLoggingLevel, ServerConfig, ServerState};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Knobs for [`TestServer::spawn_with`]
#[derive(Default)]
pub struct TestServerOptions {
    /// Report every emotion above the threshold instead of one distribution
    pub multi_label: bool,
    /// Content of `negative_emotions.json` written next to the emotion model
    pub negative_emotions: Option<&'static str>,
    /// Load the models and affect tables before serving, as the binary does
    pub warm_up: bool,
}

/// Test server instance with isolated models and inference backend
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Directory holding the `sentiment` and `emotion` models
    pub models_dir: PathBuf,

    /// Scripted inference endpoint the classifiers talk to
    pub inference: MockInference,

    // Private fields - keep resources alive until drop
    _temp_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

fn write_model(dir: &Path, model_id: &str, labels: &[&str]) {
    fs::create_dir_all(dir).expect("Failed to create model dir");
    let id2label: serde_json::Map<String, serde_json::Value> = labels
        .iter()
        .enumerate()
        .map(|(i, label)| (i.to_string(), serde_json::Value::from(*label)))
        .collect();
    let config = serde_json::json!({
        "_name_or_path": model_id,
        "id2label": id2label,
    });
    fs::write(dir.join("config.json"), config.to_string()).expect("Failed to write config.json");
}

impl TestServer {
    /// Spawns a new test server with default options
    pub async fn spawn() -> Self {
        Self::spawn_with(TestServerOptions::default()).await
    }

    /// Spawns a new test server on a random port
    ///
    /// This function:
    /// 1. Creates a temporary models directory with one sentiment and one emotion model
    /// 2. Starts the mock inference endpoint
    /// 3. Binds to a random port (127.0.0.1:0)
    /// 4. Spawns the server in a background task
    /// 5. Waits for the server to be ready
    pub async fn spawn_with(options: TestServerOptions) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let models_dir = temp_dir.path().join("models");
        let emotion_dir = models_dir.join("emotion").join(EMOTION_MODEL_DIR);

        write_model(
            &models_dir.join("sentiment").join(SENTIMENT_MODEL_DIR),
            SENTIMENT_MODEL_ID,
            &["NEGATIVE", "POSITIVE"],
        );
        write_model(&emotion_dir, EMOTION_MODEL_ID, &EMOTION_LABELS);
        fs::write(emotion_dir.join("vad_map.json"), EMOTION_VAD_MAP)
            .expect("Failed to write vad map");
        if let Some(negative) = options.negative_emotions {
            fs::write(emotion_dir.join("negative_emotions.json"), negative)
                .expect("Failed to write negative emotions");
        }

        let inference = MockInference::spawn().await;

        let factory = HttpClassifierFactory::new(
            inference.base_url.clone(),
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            options.multi_label,
        );
        let models = ModelManager::new(&models_dir, Arc::new(factory));
        let affect = AffectEngine::new(AffectSettings {
            shared_config_dir: temp_dir.path().join("config"),
            default_vad_map: temp_dir.path().join("vad_maps").join("default.json"),
            default_model_dir: models_dir.join("emotion"),
            negative_valence_threshold: 0.5,
        });
        let analyzer = Analyzer::new(
            Arc::new(models),
            Arc::new(affect),
            Arc::new(InferenceStats::new()),
            AnalysisSettings {
                emotion_selection: EmotionSelection {
                    multi_label: options.multi_label,
                    ..Default::default()
                },
                use_emotion_label_alias: true,
                ..Default::default()
            },
        );

        if options.warm_up {
            analyzer.warm_up().await;
        }

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            ..Default::default()
        };
        let app = make_app(ServerState::new(config, Arc::new(analyzer)));

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            models_dir,
            inference,
            _temp_dir: temp_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the /health endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/health", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Send shutdown signal
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
