//! Mock inference endpoint
//!
//! Answers `POST /classify` with scripted distributions picked from the
//! request text and the model path.

use super::constants::*;
use axum::{http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

fn sentiment_scores(text: &str) -> Value {
    if text == SAD_TEXT {
        json!([{"label": "NEGATIVE", "score": 0.95}, {"label": "POSITIVE", "score": 0.05}])
    } else {
        json!([{"label": "POSITIVE", "score": 0.9}, {"label": "NEGATIVE", "score": 0.1}])
    }
}

fn emotion_scores(text: &str, sigmoid: bool) -> Value {
    if text == SAD_TEXT {
        json!([
            {"label": "sadness", "score": 0.8},
            {"label": "fear", "score": 0.2},
            {"label": "joy", "score": 0.0},
            {"label": "awe", "score": 0.0},
        ])
    } else if sigmoid {
        json!([
            {"label": "joy", "score": 0.85},
            {"label": "awe", "score": 0.4},
            {"label": "sadness", "score": 0.1},
            {"label": "fear", "score": 0.05},
        ])
    } else {
        json!([
            {"label": "joy", "score": 0.7},
            {"label": "sadness", "score": 0.3},
            {"label": "fear", "score": 0.0},
            {"label": "awe", "score": 0.0},
        ])
    }
}

pub struct MockInference {
    pub base_url: String,
    pub requests: Arc<AtomicUsize>,
}

impl MockInference {
    pub async fn spawn() -> Self {
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = requests.clone();

        let app = Router::new().route(
            "/classify",
            post(move |Json(body): Json<Value>| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let text = body["text"].as_str().unwrap_or_default();
                    let model = body["model"].as_str().unwrap_or_default();
                    if text.contains(FAILING_MARKER) {
                        return (StatusCode::INTERNAL_SERVER_ERROR, "model crashed").into_response();
                    }
                    let scores = if model.ends_with(SENTIMENT_MODEL_DIR) {
                        sentiment_scores(text)
                    } else {
                        emotion_scores(text, body["function_to_apply"] == "sigmoid")
                    };
                    // Pipelines answer with a batch of one
                    Json(json!([scores])).into_response()
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock inference server");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Mock inference server failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            requests,
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}
