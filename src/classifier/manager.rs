//! Lazy discovery and loading of the sentiment and emotion classifiers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{discover_candidates, read_model_config, ModelConfig, ModelKind, TextClassifier};
use crate::server::metrics;

/// Turns a discovered model directory into a usable classifier.
#[async_trait]
pub trait ClassifierFactory: Send + Sync {
    /// Short name of the inference backend, reported by the status endpoint.
    fn backend(&self) -> &'static str;

    async fn load(
        &self,
        kind: ModelKind,
        dir: &Path,
        config: &ModelConfig,
    ) -> anyhow::Result<Arc<dyn TextClassifier>>;
}

#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("No local {kind} model found. Please place a model folder under: {base:?}")]
    NotFound { kind: ModelKind, base: PathBuf },

    #[error("No available {kind} model. Last error: {last_error}")]
    Unavailable { kind: ModelKind, last_error: String },
}

pub struct LoadedModel {
    pub classifier: Arc<dyn TextClassifier>,
    pub dir: PathBuf,
    pub load_time: Duration,
    pub loaded_at: DateTime<Utc>,
}

impl LoadedModel {
    pub fn model_id(&self) -> &str {
        self.classifier.model_id()
    }

    pub fn labels(&self) -> &[String] {
        self.classifier.labels()
    }
}

#[derive(Default)]
struct ModelSlot {
    candidates: Vec<PathBuf>,
    loaded: Option<Arc<LoadedModel>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub selected: Option<String>,
    pub model_dir: Option<PathBuf>,
    pub candidates: Vec<PathBuf>,
    pub loaded: bool,
    pub load_time_sec: Option<f64>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelsStatus {
    pub backend: &'static str,
    pub sentiment: ModelStatus,
    pub emotion: ModelStatus,
}

pub struct ModelManager {
    models_dir: PathBuf,
    sentiment_selector: Option<String>,
    emotion_selector: Option<String>,
    factory: Arc<dyn ClassifierFactory>,
    sentiment: Mutex<ModelSlot>,
    emotion: Mutex<ModelSlot>,
}

impl ModelManager {
    pub fn new(models_dir: impl Into<PathBuf>, factory: Arc<dyn ClassifierFactory>) -> Self {
        Self {
            models_dir: models_dir.into(),
            sentiment_selector: None,
            emotion_selector: None,
            factory,
            sentiment: Mutex::new(ModelSlot::default()),
            emotion: Mutex::new(ModelSlot::default()),
        }
    }

    pub fn with_selectors(mut self, sentiment: Option<String>, emotion: Option<String>) -> Self {
        self.sentiment_selector = sentiment;
        self.emotion_selector = emotion;
        self
    }

    /// Directory searched for models of the given kind.
    pub fn base_dir(&self, kind: ModelKind) -> PathBuf {
        self.models_dir.join(kind.as_str())
    }

    fn slot(&self, kind: ModelKind) -> &Mutex<ModelSlot> {
        match kind {
            ModelKind::Sentiment => &self.sentiment,
            ModelKind::Emotion => &self.emotion,
        }
    }

    fn selector(&self, kind: ModelKind) -> Option<&str> {
        match kind {
            ModelKind::Sentiment => self.sentiment_selector.as_deref(),
            ModelKind::Emotion => self.emotion_selector.as_deref(),
        }
    }

    pub async fn ensure_sentiment(&self) -> Result<Arc<LoadedModel>, ModelLoadError> {
        self.ensure(ModelKind::Sentiment).await
    }

    pub async fn ensure_emotion(&self) -> Result<Arc<LoadedModel>, ModelLoadError> {
        self.ensure(ModelKind::Emotion).await
    }

    /// Returns the loaded model, discovering and loading it on first use.
    ///
    /// Concurrent callers wait for a single load. A failed load is retried on
    /// the next call.
    pub async fn ensure(&self, kind: ModelKind) -> Result<Arc<LoadedModel>, ModelLoadError> {
        let mut slot = self.slot(kind).lock().await;
        if let Some(loaded) = &slot.loaded {
            return Ok(loaded.clone());
        }

        let base = self.base_dir(kind);
        let candidates = discover_candidates(&base, self.selector(kind));
        slot.candidates = candidates.clone();
        if candidates.is_empty() {
            metrics::record_model_load_failure(kind);
            return Err(ModelLoadError::NotFound { kind, base });
        }

        let mut last_error = String::from("none");
        for dir in &candidates {
            let start = Instant::now();
            let attempt = match read_model_config(dir) {
                Ok(config) => self.factory.load(kind, dir, &config).await,
                Err(e) => Err(e),
            };
            match attempt {
                Ok(classifier) => {
                    let load_time = start.elapsed();
                    info!(
                        "Loaded {} model {} from {:?} in {:.1} ms",
                        kind,
                        classifier.model_id(),
                        dir,
                        load_time.as_secs_f64() * 1000.0
                    );
                    metrics::record_model_load(kind, load_time);
                    let loaded = Arc::new(LoadedModel {
                        classifier,
                        dir: dir.clone(),
                        load_time,
                        loaded_at: Utc::now(),
                    });
                    slot.loaded = Some(loaded.clone());
                    return Ok(loaded);
                }
                Err(e) => {
                    warn!("Failed to load {} model from {:?}: {:#}", kind, dir, e);
                    last_error = format!("{:#}", e);
                }
            }
        }

        metrics::record_model_load_failure(kind);
        Err(ModelLoadError::Unavailable { kind, last_error })
    }

    async fn slot_status(&self, kind: ModelKind) -> ModelStatus {
        let slot = self.slot(kind).lock().await;
        let loaded = slot.loaded.as_deref();
        ModelStatus {
            selected: loaded.map(|m| m.model_id().to_string()),
            model_dir: loaded.map(|m| m.dir.clone()),
            candidates: slot.candidates.clone(),
            loaded: loaded.is_some(),
            load_time_sec: loaded.map(|m| m.load_time.as_secs_f64()),
            loaded_at: loaded.map(|m| m.loaded_at),
            labels: loaded.map(|m| m.labels().to_vec()).unwrap_or_default(),
        }
    }

    pub async fn status(&self) -> ModelsStatus {
        ModelsStatus {
            backend: self.factory.backend(),
            sentiment: self.slot_status(ModelKind::Sentiment).await,
            emotion: self.slot_status(ModelKind::Emotion).await,
        }
    }
}
