//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per API endpoint.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// GET /health
    pub async fn health(&self) -> Response {
        self.client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .expect("Health request failed")
    }

    /// POST /analyze
    pub async fn analyze(&self, text: &str) -> Response {
        self.client
            .post(format!("{}/analyze", self.base_url))
            .json(&json!({ "text": text }))
            .send()
            .await
            .expect("Analyze request failed")
    }

    /// POST /analyze with an arbitrary body
    pub async fn analyze_raw(&self, body: &'static str) -> Response {
        self.client
            .post(format!("{}/analyze", self.base_url))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Analyze request failed")
    }

    /// GET /models
    pub async fn models(&self) -> Response {
        self.client
            .get(format!("{}/models", self.base_url))
            .send()
            .await
            .expect("Models request failed")
    }

    /// GET /metrics
    pub async fn metrics(&self) -> Response {
        self.client
            .get(format!("{}/metrics", self.base_url))
            .send()
            .await
            .expect("Metrics request failed")
    }
}
