//! Access to the pretrained text classifiers.
//!
//! Inference itself happens behind [`TextClassifier`]; the shipped
//! implementation talks to an external inference endpoint over HTTP.

mod discovery;
mod http;
mod manager;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::affect::LabelScore;

pub use discovery::{discover_candidates, is_model_dir, read_model_config, ModelConfig};
pub use http::{HttpClassifier, HttpClassifierFactory};
pub use manager::{
    ClassifierFactory, LoadedModel, ModelLoadError, ModelManager, ModelStatus, ModelsStatus,
};

/// A loaded text classification model.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    /// Full label distribution for `text`, in the order the model reports it.
    async fn classify(&self, text: &str) -> Result<Vec<LabelScore>>;

    /// Native label vocabulary ordered by class index. May be empty when the
    /// model does not expose one.
    fn labels(&self) -> &[String];

    fn model_id(&self) -> &str;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Sentiment,
    Emotion,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Sentiment => "sentiment",
            ModelKind::Emotion => "emotion",
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
