use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, GaugeVec, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

use crate::affect::{AffectStatus, SentimentLabel, StressLevel};
use crate::classifier::ModelKind;

/// Metric name prefix for all sentra-emo metrics
const PREFIX: &str = "sentra";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Analysis Metrics
    pub static ref ANALYZE_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_analyze_requests_total"), "Analysis requests by outcome"),
        &["outcome"]
    ).expect("Failed to create analyze_requests_total metric");

    pub static ref ANALYZE_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_analyze_duration_seconds"),
            "Time spent running one analysis, classifier calls included"
        )
        .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0])
    ).expect("Failed to create analyze_duration_seconds metric");

    pub static ref EMOTION_TOP1_SCORE: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_emotion_top1_score"),
            "Score of the highest ranked emotion"
        )
        .buckets(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0])
    ).expect("Failed to create emotion_top1_score metric");

    pub static ref SENTIMENT_LABELS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_sentiment_labels_total"), "Reported sentiment labels"),
        &["label"]
    ).expect("Failed to create sentiment_labels_total metric");

    pub static ref STRESS_LEVELS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_stress_levels_total"), "Reported stress levels"),
        &["level"]
    ).expect("Failed to create stress_levels_total metric");

    // Model Metrics
    pub static ref MODEL_LOAD_SECONDS: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_model_load_seconds"), "Time taken to load the active model"),
        &["kind"]
    ).expect("Failed to create model_load_seconds metric");

    pub static ref MODEL_LOAD_FAILURES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_model_load_failures_total"), "Failed model load attempts"),
        &["kind"]
    ).expect("Failed to create model_load_failures_total metric");

    // Affect Table Metrics
    pub static ref UNKNOWN_EMOTION_LABELS: Gauge = Gauge::new(
        format!("{PREFIX}_unknown_emotion_labels"),
        "Emotion labels without a VAD entry"
    ).expect("Failed to create unknown_emotion_labels metric");

    pub static ref NEGATIVE_EMOTION_LABELS: Gauge = Gauge::new(
        format!("{PREFIX}_negative_emotion_labels"),
        "Size of the negative emotion label set"
    ).expect("Failed to create negative_emotion_labels metric");

    // Error Metrics
    pub static ref ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_errors_total"), "Total errors by type and endpoint"),
        &["error_type", "endpoint"]
    ).expect("Failed to create errors_total metric");

    pub static ref PROCESS_MEMORY_BYTES: Gauge = Gauge::new(
        format!("{PREFIX}_process_memory_bytes"),
        "Process memory usage in bytes"
    ).expect("Failed to create process_memory_bytes metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Registering twice fails, which is expected when tests call this repeatedly
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(ANALYZE_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ANALYZE_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(EMOTION_TOP1_SCORE.clone()));
    let _ = REGISTRY.register(Box::new(SENTIMENT_LABELS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(STRESS_LEVELS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(MODEL_LOAD_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(MODEL_LOAD_FAILURES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(UNKNOWN_EMOTION_LABELS.clone()));
    let _ = REGISTRY.register(Box::new(NEGATIVE_EMOTION_LABELS.clone()));
    let _ = REGISTRY.register(Box::new(ERRORS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESS_MEMORY_BYTES.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Collapses request paths onto the known routes to bound label cardinality
pub fn categorize_endpoint(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/analyze" => "/analyze",
        "/models" => "/models",
        "/metrics" => "/metrics",
        _ => "other",
    }
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let path = categorize_endpoint(path);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record a successful analysis
pub fn record_analysis(
    duration: Duration,
    sentiment: SentimentLabel,
    stress: StressLevel,
    top1_score: Option<f64>,
) {
    ANALYZE_REQUESTS_TOTAL.with_label_values(&["ok"]).inc();
    ANALYZE_DURATION_SECONDS.observe(duration.as_secs_f64());
    SENTIMENT_LABELS_TOTAL
        .with_label_values(&[sentiment.as_str()])
        .inc();
    STRESS_LEVELS_TOTAL.with_label_values(&[stress.as_str()]).inc();
    if let Some(score) = top1_score {
        EMOTION_TOP1_SCORE.observe(score);
    }
}

/// Record an analysis that did not produce a result
pub fn record_analysis_failure(outcome: &str, duration: Duration) {
    ANALYZE_REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
    ANALYZE_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Record a finished model load
pub fn record_model_load(kind: ModelKind, duration: Duration) {
    MODEL_LOAD_SECONDS
        .with_label_values(&[kind.as_str()])
        .set(duration.as_secs_f64());
}

pub fn record_model_load_failure(kind: ModelKind) {
    MODEL_LOAD_FAILURES_TOTAL
        .with_label_values(&[kind.as_str()])
        .inc();
}

/// Mirror the affect table sizes after a rebuild
pub fn update_affect_tables(status: &AffectStatus) {
    UNKNOWN_EMOTION_LABELS.set(status.unknown_labels_count as f64);
    NEGATIVE_EMOTION_LABELS.set(status.negative_labels_count as f64);
}

/// Record an error
pub fn record_error(error_type: &str, endpoint: &str) {
    ERRORS_TOTAL
        .with_label_values(&[error_type, endpoint])
        .inc();
}

/// Update process memory usage
pub fn update_memory_usage() {
    #[cfg(target_os = "linux")]
    {
        let Ok(status) = std::fs::read_to_string("/proc/self/status") else {
            return;
        };
        let rss_kb = status
            .lines()
            .find(|line| line.starts_with("VmRSS:"))
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|kb| kb.parse::<f64>().ok());
        if let Some(kb) = rss_kb {
            PROCESS_MEMORY_BYTES.set(kb * 1024.0);
        }
    }
}

/// Handler for the Prometheus /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    update_memory_usage();

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_default();
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_metric(name: &str) -> bool {
        REGISTRY.gather().iter().any(|m| m.get_name() == name)
    }

    #[test]
    fn test_metrics_initialization() {
        init_metrics();
        assert!(!REGISTRY.gather().is_empty(), "Metrics should be registered");
    }

    #[test]
    fn test_record_http_request() {
        init_metrics();
        record_http_request("GET", "/health", 200, Duration::from_millis(5));
        record_http_request("GET", "/does/not/exist", 404, Duration::from_millis(1));

        assert!(has_metric("sentra_http_requests_total"));
        let other = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "other", "404"])
            .get();
        assert!(other >= 1.0);
    }

    #[test]
    fn test_record_analysis() {
        init_metrics();
        record_analysis(
            Duration::from_millis(20),
            SentimentLabel::Negative,
            StressLevel::High,
            Some(0.8),
        );
        record_analysis_failure("error", Duration::from_millis(3));

        assert!(has_metric("sentra_analyze_requests_total"));
        assert!(has_metric("sentra_emotion_top1_score"));
        assert!(STRESS_LEVELS_TOTAL.with_label_values(&["high"]).get() >= 1.0);
    }

    #[test]
    fn test_model_and_affect_gauges() {
        init_metrics();
        record_model_load(ModelKind::Emotion, Duration::from_millis(1500));
        assert!(has_metric("sentra_model_load_seconds"));

        update_affect_tables(&AffectStatus {
            unknown_labels_count: 3,
            negative_labels_count: 7,
            ..Default::default()
        });
        assert!(has_metric("sentra_negative_emotion_labels"));
    }

    #[test]
    fn test_categorize_endpoint() {
        assert_eq!(categorize_endpoint("/analyze"), "/analyze");
        assert_eq!(categorize_endpoint("/analyze/extra"), "other");
    }
}
