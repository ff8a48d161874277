//! Runs one text through both classifiers and the affect tables.

mod error;
mod schemas;

pub use error::AnalyzeError;
pub use schemas::{
    AnalyzeRequest, AnalyzeResponse, ModelIds, PadResult, VadResult, VAD_METHOD,
};

use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::affect::{analyze_sentiment, AffectEngine, EmotionSelection, NeutralMode};
use crate::classifier::{LoadedModel, ModelManager};
use crate::inference_stats::InferenceStats;
use crate::server::metrics;

#[derive(Debug, Clone, Default)]
pub struct AnalysisSettings {
    pub emotion_selection: EmotionSelection,
    pub neutral_mode: NeutralMode,
    /// Report emotions under their canonical (alias-resolved) labels.
    pub use_emotion_label_alias: bool,
}

pub struct Analyzer {
    models: Arc<ModelManager>,
    affect: Arc<AffectEngine>,
    stats: Arc<InferenceStats>,
    settings: AnalysisSettings,
}

impl Analyzer {
    pub fn new(
        models: Arc<ModelManager>,
        affect: Arc<AffectEngine>,
        stats: Arc<InferenceStats>,
        settings: AnalysisSettings,
    ) -> Self {
        Self {
            models,
            affect,
            stats,
            settings,
        }
    }

    pub fn models(&self) -> &ModelManager {
        &self.models
    }

    pub fn affect(&self) -> &AffectEngine {
        &self.affect
    }

    pub fn stats(&self) -> &InferenceStats {
        &self.stats
    }

    /// Analyzes `text`, recording latency and confidence statistics.
    ///
    /// Blank text is rejected before any model is touched and is not counted
    /// as an inference.
    pub async fn analyze(&self, text: &str) -> Result<AnalyzeResponse, AnalyzeError> {
        let text = text.trim();
        if text.is_empty() {
            metrics::record_error(AnalyzeError::EmptyText.kind(), "/analyze");
            return Err(AnalyzeError::EmptyText);
        }

        let start = Instant::now();
        let result = self.run(text).await;
        let elapsed = start.elapsed();
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        self.stats.record_latency(elapsed_ms);

        match &result {
            Ok(response) => {
                let top1 = response.emotions.first().map(|e| e.score);
                if let Some(score) = top1 {
                    self.stats.record_top1(score);
                }
                metrics::record_analysis(
                    elapsed,
                    response.sentiment.label,
                    response.stress.level,
                    top1,
                );
                info!(
                    "Analyze OK in {:.1} ms | sent={} stress={} V={:.2} A={:.2} D={:.2} text_len={}",
                    elapsed_ms,
                    response.sentiment.label,
                    response.stress.level,
                    response.vad.valence,
                    response.vad.arousal,
                    response.vad.dominance,
                    text.chars().count()
                );
            }
            Err(e) => {
                self.stats.record_error();
                metrics::record_analysis_failure("error", elapsed);
                metrics::record_error(e.kind(), "/analyze");
                error!("Analyze error in {:.1} ms: {}", elapsed_ms, e);
            }
        }
        result
    }

    /// Loads both models and builds the affect tables ahead of the first
    /// request. Failures are logged; the next analysis retries them.
    pub async fn warm_up(&self) {
        match self.models.ensure_emotion().await {
            Ok(emotion_model) => self.prepare_affect(&emotion_model),
            Err(e) => warn!("Emotion model warm-up failed: {}", e),
        }
        if let Err(e) = self.models.ensure_sentiment().await {
            warn!("Sentiment model warm-up failed: {}", e);
        }
    }

    /// Rebuilds the affect tables when the emotion model or its labels changed.
    fn prepare_affect(&self, emotion_model: &LoadedModel) {
        let labels = emotion_model.labels();
        let labels = (!labels.is_empty()).then_some(labels);
        if self.affect.ensure_initialized(&emotion_model.dir, labels) {
            metrics::update_affect_tables(&self.affect.status());
        }
    }

    async fn run(&self, text: &str) -> Result<AnalyzeResponse, AnalyzeError> {
        let emotion_model = self.models.ensure_emotion().await?;
        self.prepare_affect(&emotion_model);

        let sentiment_model = self.models.ensure_sentiment().await?;
        let raw_sentiment = sentiment_model
            .classifier
            .classify(text)
            .await
            .map_err(AnalyzeError::Classifier)?;
        let sentiment = analyze_sentiment(
            &raw_sentiment,
            sentiment_model.labels(),
            sentiment_model.model_id(),
            self.settings.neutral_mode,
        );

        let raw_emotions = emotion_model
            .classifier
            .classify(text)
            .await
            .map_err(AnalyzeError::Classifier)?;
        let selected = self.settings.emotion_selection.select(&raw_emotions);
        let scored = self
            .affect
            .score(selected, self.settings.use_emotion_label_alias);

        Ok(AnalyzeResponse {
            sentiment,
            emotions: scored.emotions,
            vad: scored.vad.into(),
            pad: scored.vad.into(),
            stress: scored.stress,
            models: ModelIds {
                sentiment: sentiment_model.model_id().to_string(),
                emotion: emotion_model.model_id().to_string(),
            },
        })
    }
}
