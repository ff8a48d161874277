//! Shared constants for end-to-end tests
//!
//! When the scripted inference outputs change, update only this file.

// ============================================================================
// Model fixtures
// ============================================================================

/// Directory name of the sentiment model under `models/sentiment`
pub const SENTIMENT_MODEL_DIR: &str = "sst2";

/// Model id reported for the sentiment classifier
pub const SENTIMENT_MODEL_ID: &str = "test/sst2-english";

/// Directory name of the emotion model under `models/emotion`
pub const EMOTION_MODEL_DIR: &str = "go-emotions";

/// Model id reported for the emotion classifier
pub const EMOTION_MODEL_ID: &str = "test/go-emotions";

/// Labels declared by the emotion model. `awe` has no VAD entry.
pub const EMOTION_LABELS: [&str; 4] = ["joy", "sadness", "fear", "awe"];

/// VAD map shipped next to the emotion model
pub const EMOTION_VAD_MAP: &str = r#"{
    "joy": [0.9, 0.6, 0.7],
    "sadness": [0.1, 0.4, 0.3],
    "fear": [0.15, 0.8, 0.2]
}"#;

// ============================================================================
// Scripted texts
// ============================================================================

/// Answered with POSITIVE 0.9 and joy 0.7 / sadness 0.3
pub const HAPPY_TEXT: &str = "What a wonderful day at the lake";

/// Answered with NEGATIVE 0.95 and sadness 0.8 / fear 0.2
pub const SAD_TEXT: &str = "I lost my job and I am scared";

/// The inference endpoint answers 500 for any text containing this marker
pub const FAILING_MARKER: &str = "#fail";

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for the server to become ready
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Polling interval while waiting for the server
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;

/// Request timeout of the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Tolerance used when comparing floating point scores
pub const EPSILON: f64 = 1e-6;
