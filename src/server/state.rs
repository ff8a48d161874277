use axum::extract::FromRef;
use std::sync::Arc;

use crate::analysis::Analyzer;

use super::ServerConfig;

pub type GuardedAnalyzer = Arc<Analyzer>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub analyzer: GuardedAnalyzer,
}

impl ServerState {
    pub fn new(config: ServerConfig, analyzer: GuardedAnalyzer) -> Self {
        Self {
            config,
            analyzer,
        }
    }
}

impl FromRef<ServerState> for GuardedAnalyzer {
    fn from_ref(input: &ServerState) -> Self {
        input.analyzer.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
