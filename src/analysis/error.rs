use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::classifier::ModelLoadError;

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("text must not be empty")]
    EmptyText,

    #[error(transparent)]
    ModelUnavailable(#[from] ModelLoadError),

    #[error("Classifier failed: {0:#}")]
    Classifier(anyhow::Error),
}

impl AnalyzeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AnalyzeError::EmptyText => StatusCode::BAD_REQUEST,
            AnalyzeError::ModelUnavailable(_) | AnalyzeError::Classifier(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short error kind used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalyzeError::EmptyText => "empty_text",
            AnalyzeError::ModelUnavailable(_) => "model_unavailable",
            AnalyzeError::Classifier(_) => "classifier",
        }
    }
}

impl IntoResponse for AnalyzeError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(json!({ "detail": self.to_string() })),
        )
            .into_response()
    }
}
