//! The set of emotion labels that count towards stress.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::paths::{ConfigSearchPath, NEGATIVE_FILE};
use super::VadMapper;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NegativeSource {
    File,
    Derived,
}

/// Shapes accepted for `negative_emotions.json`.
#[derive(Debug, PartialEq)]
enum NegativeLabelsFile {
    /// `["anger", "fear"]`
    List(Vec<String>),
    /// `{"labels": ["anger", "fear"]}`
    Wrapped(Vec<String>),
    /// `{"anger": true, "joy": false}`
    Flags(Vec<String>),
}

fn label_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

impl TryFrom<Value> for NegativeLabelsFile {
    type Error = anyhow::Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => Ok(Self::List(items.iter().map(label_text).collect())),
            Value::Object(map) => match map.get("labels") {
                Some(Value::Array(items)) => {
                    Ok(Self::Wrapped(items.iter().map(label_text).collect()))
                }
                _ => Ok(Self::Flags(
                    map.iter()
                        .filter(|(_, v)| is_truthy(v))
                        .map(|(k, _)| k.clone())
                        .collect(),
                )),
            },
            other => Err(anyhow!("expected a list or an object, got {}", other)),
        }
    }
}

impl NegativeLabelsFile {
    fn into_labels(self) -> HashSet<String> {
        let labels = match self {
            Self::List(l) | Self::Wrapped(l) | Self::Flags(l) => l,
        };
        labels.into_iter().map(|l| l.to_lowercase()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct NegativeLabels {
    labels: HashSet<String>,
    source: NegativeSource,
    path: Option<PathBuf>,
    threshold: Option<f64>,
}

impl NegativeLabels {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read negative emotions file: {:?}", path))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse negative emotions file: {:?}", path))?;
        let file = NegativeLabelsFile::try_from(value)
            .with_context(|| format!("Unsupported negative emotions file: {:?}", path))?;
        Ok(Self {
            labels: file.into_labels(),
            source: NegativeSource::File,
            path: Some(path.to_path_buf()),
            threshold: None,
        })
    }

    /// Collects every candidate whose valence falls below `threshold`.
    ///
    /// Candidates are the given labels, or the whole VAD table when none are given.
    pub fn derive<S: AsRef<str>>(
        mapper: &VadMapper,
        candidates: Option<&[S]>,
        threshold: f64,
    ) -> Self {
        let below = |label: &str| mapper.map_label(label).valence < threshold;
        let labels: HashSet<String> = match candidates {
            Some(candidates) if !candidates.is_empty() => candidates
                .iter()
                .map(|l| l.as_ref())
                .filter(|l| below(l))
                .map(|l| mapper.canonical(l))
                .collect(),
            _ => mapper
                .labels()
                .filter(|l| below(l))
                .map(|l| mapper.canonical(l))
                .collect(),
        };
        Self {
            labels,
            source: NegativeSource::Derived,
            path: None,
            threshold: Some(threshold),
        }
    }

    /// Prefers an explicit file on the search path, deriving from `mapper` otherwise.
    pub fn resolve<S: AsRef<str>>(
        search: &ConfigSearchPath,
        mapper: &VadMapper,
        candidates: Option<&[S]>,
        threshold: f64,
    ) -> Self {
        if let Some(path) = search.find(NEGATIVE_FILE) {
            match Self::from_file(&path) {
                Ok(loaded) => {
                    info!(
                        "Loaded negative emotions from {:?} (count={})",
                        path,
                        loaded.len()
                    );
                    return loaded;
                }
                Err(e) => warn!("{:#}", e),
            }
        }
        let derived = Self::derive(mapper, candidates, threshold);
        info!(
            "Derived negative emotions by V<{}: count={}",
            threshold,
            derived.len()
        );
        derived
    }

    pub fn contains(&self, canonical_label: &str) -> bool {
        self.labels.contains(canonical_label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn source(&self) -> NegativeSource {
        self.source
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    pub fn labels(&self) -> &HashSet<String> {
        &self.labels
    }
}
