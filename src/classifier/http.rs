//! Classifier backed by an external inference endpoint.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ClassifierFactory, ModelConfig, ModelKind, TextClassifier};
use crate::affect::LabelScore;

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_to_apply: Option<&'static str>,
}

#[derive(Deserialize)]
struct RawScore {
    #[serde(default)]
    label: String,
    #[serde(default)]
    score: f64,
}

/// Endpoints answer either with the distribution or with a batch of one.
#[derive(Deserialize)]
#[serde(untagged)]
enum ClassifyResponse {
    Flat(Vec<RawScore>),
    Nested(Vec<Vec<RawScore>>),
}

impl ClassifyResponse {
    fn into_pairs(self) -> Vec<LabelScore> {
        let raw = match self {
            ClassifyResponse::Flat(raw) => raw,
            ClassifyResponse::Nested(batch) => batch.into_iter().next().unwrap_or_default(),
        };
        raw.into_iter()
            .map(|r| LabelScore::new(r.label.trim(), r.score))
            .collect()
    }
}

/// Posts `{"text", "model"}` to `<base_url>/classify`.
#[derive(Clone)]
pub struct HttpClassifier {
    client: Client,
    base_url: String,
    /// Model directory, as the inference endpoint knows it.
    model_path: String,
    model_id: String,
    labels: Vec<String>,
    multi_label: bool,
}

impl HttpClassifier {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        model_dir: &Path,
        config: &ModelConfig,
        multi_label: bool,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model_path: model_dir.to_string_lossy().into_owned(),
            model_id: config.model_id(model_dir),
            labels: config.labels.clone(),
            multi_label,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TextClassifier for HttpClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<LabelScore>> {
        let url = format!("{}/classify", self.base_url);
        let request = ClassifyRequest {
            text,
            model: &self.model_path,
            function_to_apply: self.multi_label.then_some("sigmoid"),
        };
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Inference request to {} failed", url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Inference request for {} failed with status: {}",
                self.model_id,
                response.status()
            ));
        }

        let body: ClassifyResponse = response
            .json()
            .await
            .context("Malformed inference response")?;
        Ok(body.into_pairs())
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Builds [`HttpClassifier`]s for discovered model directories.
pub struct HttpClassifierFactory {
    base_url: String,
    timeout: Duration,
    multi_label_emotions: bool,
}

impl HttpClassifierFactory {
    pub fn new(base_url: impl Into<String>, timeout: Duration, multi_label_emotions: bool) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
            multi_label_emotions,
        }
    }
}

#[async_trait]
impl ClassifierFactory for HttpClassifierFactory {
    fn backend(&self) -> &'static str {
        "http"
    }

    async fn load(
        &self,
        kind: ModelKind,
        dir: &Path,
        config: &ModelConfig,
    ) -> Result<Arc<dyn TextClassifier>> {
        let multi_label = kind == ModelKind::Emotion && self.multi_label_emotions;
        let classifier = HttpClassifier::new(&self.base_url, self.timeout, dir, config, multi_label)?;
        Ok(Arc::new(classifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::path::PathBuf;

    fn parse(value: Value) -> Vec<LabelScore> {
        serde_json::from_value::<ClassifyResponse>(value)
            .unwrap()
            .into_pairs()
    }

    #[test]
    fn parses_flat_and_nested_responses() {
        let flat = parse(json!([{"label": " joy ", "score": 0.75}, {"label": "anger", "score": 0.25}]));
        assert_eq!(
            flat,
            vec![LabelScore::new("joy", 0.75), LabelScore::new("anger", 0.25)]
        );

        let nested = parse(json!([[{"label": "POSITIVE", "score": 0.9}]]));
        assert_eq!(nested, vec![LabelScore::new("POSITIVE", 0.9)]);

        assert!(parse(json!([])).is_empty());
        assert_eq!(parse(json!([{"label": "x"}])), vec![LabelScore::new("x", 0.0)]);
    }

    async fn spawn_inference_server() -> String {
        let app = Router::new().route(
            "/classify",
            post(|Json(body): Json<Value>| async move {
                let second = if body["function_to_apply"] == "sigmoid" { 0.5 } else { 0.0 };
                Json(json!([[
                    {"label": body["model"], "score": 1.0},
                    {"label": body["text"], "score": second},
                ]]))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn posts_text_and_model_path() {
        let base_url = spawn_inference_server().await;
        let config = ModelConfig {
            labels: vec!["joy".to_string()],
            name_or_path: Some("org/emotion".to_string()),
        };
        let dir = PathBuf::from("/models/emotion/go");
        let factory = HttpClassifierFactory::new(base_url, Duration::from_secs(5), true);

        let emotion = factory.load(ModelKind::Emotion, &dir, &config).await.unwrap();
        assert_eq!(emotion.model_id(), "org/emotion");
        assert_eq!(emotion.labels(), &["joy".to_string()]);
        let pairs = emotion.classify("hello").await.unwrap();
        assert_eq!(
            pairs,
            vec![
                LabelScore::new("/models/emotion/go", 1.0),
                LabelScore::new("hello", 0.5)
            ]
        );

        let sentiment = factory.load(ModelKind::Sentiment, &dir, &config).await.unwrap();
        let pairs = sentiment.classify("hi").await.unwrap();
        assert_eq!(pairs[1], LabelScore::new("hi", 0.0));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        let classifier = HttpClassifier::new(
            "http://127.0.0.1:1",
            Duration::from_secs(1),
            Path::new("m"),
            &ModelConfig::default(),
            false,
        )
        .unwrap();
        assert!(classifier.classify("text").await.is_err());
        assert_eq!(classifier.model_id(), "m");
    }
}
