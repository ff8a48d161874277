//! End-to-end tests for GET /models and GET /metrics

mod common;

use common::{
    TestClient, TestServer, TestServerOptions, EMOTION_MODEL_DIR, EMOTION_MODEL_ID, FAILING_MARKER,
    HAPPY_TEXT, SAD_TEXT,
};
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn test_models_are_loaded_lazily() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.models().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["models"]["backend"], "http");
    assert_eq!(body["models"]["emotion"]["loaded"], false);
    assert_eq!(body["models"]["sentiment"]["loaded"], false);
    assert!(body["models"]["emotion"]["load_time_sec"].is_null());

    client.analyze(HAPPY_TEXT).await;

    let body: Value = client.models().await.json().await.unwrap();
    let emotion = &body["models"]["emotion"];
    assert_eq!(emotion["loaded"], true);
    assert!(emotion["model_dir"]
        .as_str()
        .unwrap()
        .ends_with(EMOTION_MODEL_DIR));
    assert_eq!(
        emotion["labels"],
        serde_json::json!(["joy", "sadness", "fear", "awe"])
    );
    assert!(emotion["load_time_sec"].as_f64().unwrap() >= 0.0);
    assert!(emotion["loaded_at"].is_string());
    assert_eq!(body["models"]["sentiment"]["loaded"], true);
}

#[tokio::test]
async fn test_warm_up_fills_status_before_any_analysis() {
    let server = TestServer::spawn_with(TestServerOptions {
        warm_up: true,
        ..Default::default()
    })
    .await;
    let client = TestClient::new(server.base_url.clone());

    let body: Value = client.models().await.json().await.unwrap();
    assert_eq!(body["models"]["emotion"]["loaded"], true);
    assert_eq!(body["models"]["sentiment"]["loaded"], true);
    assert!(body["vad"]["map_path"]
        .as_str()
        .unwrap()
        .ends_with("vad_map.json"));
    assert_eq!(body["vad"]["negative_labels_source"], "derived");
    assert_eq!(body["vad"]["negative_labels_count"], 2);
    assert_eq!(body["vad"]["unknown_labels"], serde_json::json!(["awe"]));

    // Loading models hits no inference endpoint
    assert_eq!(server.inference.request_count(), 0);
    let metrics: Value = client.metrics().await.json().await.unwrap();
    assert_eq!(metrics["inference_count"], 0);
}

#[tokio::test]
async fn test_models_report_affect_tables() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    client.analyze(SAD_TEXT).await;

    let body: Value = client.models().await.json().await.unwrap();
    let vad = &body["vad"];
    assert!(vad["map_path"]
        .as_str()
        .unwrap()
        .ends_with("vad_map.json"));
    assert_eq!(vad["unknown_labels"], serde_json::json!(["awe"]));
    assert_eq!(vad["unknown_labels_count"], 1);
    assert_eq!(vad["negative_labels_source"], "derived");
    assert_eq!(vad["negative_labels_count"], 2);

    let report = server.models_dir.join("emotion").join("unknown_labels.json");
    let report: Value = serde_json::from_str(&std::fs::read_to_string(report).unwrap()).unwrap();
    assert_eq!(report["unknown_labels"], serde_json::json!(["awe"]));
}

#[tokio::test]
async fn test_metrics_summary_tracks_inferences() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let body: Value = client.metrics().await.json().await.unwrap();
    assert_eq!(body["inference_count"], 0);
    assert!(body["emotion_top1_score"]["avg"].is_null());

    client.analyze(HAPPY_TEXT).await;
    client.analyze(SAD_TEXT).await;
    client
        .analyze(&format!("broken {}", FAILING_MARKER))
        .await;

    let response = client.metrics().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["inference_count"], 3);
    assert_eq!(body["error_count"], 1);
    assert_eq!(body["emotion_top1_score"]["count"], 2);
    assert!((body["emotion_top1_score"]["avg"].as_f64().unwrap() - 0.75).abs() < 1e-6);
    assert_eq!(body["emotion_top1_score_recent"]["60s"]["count"], 2);
    assert!(body["inference_latency_ms"]["p95"].as_f64().is_some());
    assert!(body["uptime_sec"].as_f64().unwrap() >= 0.0);
    assert!(body["model_load_sec"]["emotion"].as_f64().is_some());
}

#[tokio::test]
async fn test_model_id_reported_in_analysis() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let body: Value = client.analyze(HAPPY_TEXT).await.json().await.unwrap();
    assert_eq!(body["models"]["emotion"], EMOTION_MODEL_ID);
}
