//! Label canonicalization through an alias table.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

use super::LabelScore;

/// Maps raw classifier labels onto the lower-case keys used by every affect table.
#[derive(Debug, Clone, Default)]
pub struct LabelCanonicalizer {
    aliases: HashMap<String, String>,
}

impl LabelCanonicalizer {
    pub fn new(aliases: HashMap<String, String>) -> Self {
        let aliases = aliases
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v.to_lowercase()))
            .collect();
        Self { aliases }
    }

    /// Reads a JSON object of `raw label -> canonical label`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read alias file: {:?}", path))?;
        let aliases: HashMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse alias file: {:?}", path))?;
        Ok(Self::new(aliases))
    }

    pub fn canonical(&self, label: &str) -> String {
        let lowered = label.to_lowercase();
        match self.aliases.get(&lowered) {
            Some(canonical) => canonical.clone(),
            None => lowered,
        }
    }

    pub fn canonicalize_distribution(&self, distribution: &[LabelScore]) -> Vec<LabelScore> {
        distribution
            .iter()
            .map(|p| LabelScore::new(self.canonical(&p.label), p.score))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
