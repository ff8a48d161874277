//! Lookup of the per-model affect configuration files.
//!
//! A file is searched for in the model directory, then in its parent, then in
//! the shared configuration directory. The project default is handled by the
//! caller since only the VAD mapping has one.

use std::path::{Path, PathBuf};

pub const VAD_MAP_FILE: &str = "vad_map.json";
pub const ALIAS_FILE: &str = "label_alias.json";
pub const NEGATIVE_FILE: &str = "negative_emotions.json";
pub const UNKNOWN_LABELS_FILE: &str = "unknown_labels.json";

#[derive(Debug, Clone)]
pub struct ConfigSearchPath {
    model_dir: PathBuf,
    shared_dir: PathBuf,
}

impl ConfigSearchPath {
    pub fn new(model_dir: impl Into<PathBuf>, shared_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            shared_dir: shared_dir.into(),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Every location `file_name` may live at, highest precedence first.
    pub fn candidates(&self, file_name: &str) -> Vec<PathBuf> {
        let mut candidates = vec![self.model_dir.join(file_name)];
        if let Some(parent) = self.model_dir.parent() {
            if !parent.as_os_str().is_empty() {
                candidates.push(parent.join(file_name));
            }
        }
        candidates.push(self.shared_dir.join(file_name));
        candidates
    }

    pub fn find(&self, file_name: &str) -> Option<PathBuf> {
        self.candidates(file_name).into_iter().find(|p| p.is_file())
    }

    /// Where the unknown-label report is written: next to the model directory.
    pub fn unknown_labels_path(&self) -> PathBuf {
        match self.model_dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join(UNKNOWN_LABELS_FILE),
            _ => self.model_dir.join(UNKNOWN_LABELS_FILE),
        }
    }
}
