//! sentra-emo library
//!
//! Turns text classifier outputs into sentiment, emotions, a VAD vector and a
//! stress score. The modules are exposed for the binary and for testing.

pub mod affect;
pub mod analysis;
pub mod classifier;
pub mod config;
pub mod inference_stats;
pub mod server;

// Re-export commonly used types for convenience
pub use affect::{AffectEngine, AffectSettings};
pub use analysis::{AnalysisSettings, Analyzer};
pub use classifier::{ClassifierFactory, HttpClassifierFactory, ModelManager, TextClassifier};
pub use inference_stats::InferenceStats;
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig, ServerState};
