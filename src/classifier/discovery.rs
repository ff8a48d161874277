//! Discovery of local model directories.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const MODEL_CONFIG_FILE: &str = "config.json";
pub const PRIORITY_FILE: &str = "priority.txt";

/// Any of these marks a directory as holding a model.
const MODEL_MARKERS: [&str; 3] = [MODEL_CONFIG_FILE, "pytorch_model.bin", "model.safetensors"];

pub fn is_model_dir(path: &Path) -> bool {
    MODEL_MARKERS.iter().any(|marker| path.join(marker).exists())
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// First line of `priority.txt`, when present and not blank.
fn read_priority(base: &Path) -> Option<String> {
    let content = std::fs::read_to_string(base.join(PRIORITY_FILE)).ok()?;
    let first = content.lines().next()?.trim();
    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}

/// Lists the model directories to try for one model kind, best first.
///
/// A valid `selector` (absolute, or relative to `base`) is the only candidate.
/// Otherwise `base` itself when it holds a model, else its model
/// sub-directories by case-insensitive name with the one named in
/// `priority.txt` first.
pub fn discover_candidates(base: &Path, selector: Option<&str>) -> Vec<PathBuf> {
    if !base.exists() {
        warn!("Local models directory not found: {:?}", base);
        return vec![];
    }

    if let Some(selector) = selector.map(str::trim).filter(|s| !s.is_empty()) {
        let selected = Path::new(selector);
        let selected = if selected.is_absolute() {
            selected.to_path_buf()
        } else {
            base.join(selected)
        };
        if is_model_dir(&selected) {
            return vec![selected];
        }
        warn!(
            "Model selector not found or not a model directory: {:?}",
            selected
        );
    }

    if is_model_dir(base) {
        return vec![base.to_path_buf()];
    }

    let entries = match std::fs::read_dir(base) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to list models directory {:?}: {}", base, e);
            return vec![];
        }
    };
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir() && is_model_dir(path))
        .collect();

    let priority = read_priority(base);
    candidates.sort_by_key(|path| {
        let name = dir_name(path);
        (priority.as_deref() != Some(name.as_str()), name.to_lowercase())
    });

    if candidates.is_empty() {
        warn!("No local models discovered under: {:?}", base);
    } else {
        info!("Discovered local models under {:?}: {:?}", base, candidates);
    }
    candidates
}

/// What the service needs from a model's `config.json`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelConfig {
    /// Labels ordered by class index.
    pub labels: Vec<String>,
    /// Upstream model name the weights were exported from.
    pub name_or_path: Option<String>,
}

impl ModelConfig {
    /// Identifier reported for the model: its upstream name, else its directory.
    pub fn model_id(&self, dir: &Path) -> String {
        match &self.name_or_path {
            Some(name) => name.clone(),
            None => dir.to_string_lossy().into_owned(),
        }
    }
}

fn label_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Labels from `id2label`, numerically ordered when every key is an index.
fn labels_from_id2label(config: &Value) -> Vec<String> {
    let Some(id2label) = config.get("id2label").and_then(Value::as_object) else {
        return vec![];
    };
    let indexed: Option<Vec<(u64, &Value)>> = id2label
        .iter()
        .map(|(k, v)| k.trim().parse::<u64>().ok().map(|i| (i, v)))
        .collect();
    match indexed {
        Some(mut indexed) => {
            indexed.sort_by_key(|(i, _)| *i);
            indexed.into_iter().map(|(_, v)| label_text(v)).collect()
        }
        None => id2label.values().map(label_text).collect(),
    }
}

/// Reads `config.json` from a model directory. A directory holding only
/// weights yields an empty config.
pub fn read_model_config(dir: &Path) -> Result<ModelConfig> {
    let path = dir.join(MODEL_CONFIG_FILE);
    if !path.is_file() {
        return Ok(ModelConfig::default());
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read model config: {:?}", path))?;
    let config: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse model config: {:?}", path))?;

    let name_or_path = config
        .get("_name_or_path")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(ModelConfig {
        labels: labels_from_id2label(&config),
        name_or_path,
    })
}
