//! Shared, swappable affect tables.
//!
//! The VAD mapper and the negative-label set are held in an immutable
//! [`AffectSnapshot`]. Re-initialization builds a whole new snapshot and swaps
//! the `Arc`, so a reader either sees the previous tables or the new ones.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{info, warn};

use super::paths::{ConfigSearchPath, ALIAS_FILE, VAD_MAP_FILE};
use super::{
    load_vad_table, stress, LabelCanonicalizer, LabelScore, NegativeLabels, NegativeSource,
    StressResult, Vad, VadMapper,
};

#[derive(Debug, Clone)]
pub struct AffectSettings {
    /// Shared configuration directory, last stop of the search path.
    pub shared_config_dir: PathBuf,
    /// Project-wide VAD mapping used when no model specific one exists.
    pub default_vad_map: PathBuf,
    /// Model directory assumed when the negative set is needed before any model was seen.
    pub default_model_dir: PathBuf,
    pub negative_valence_threshold: f64,
}

impl Default for AffectSettings {
    fn default() -> Self {
        Self {
            shared_config_dir: PathBuf::from("config"),
            default_vad_map: PathBuf::from("vad_maps/default.json"),
            default_model_dir: PathBuf::from("models/emotion"),
            negative_valence_threshold: 0.5,
        }
    }
}

/// VAD and stress derived from one emotion distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct AffectScore {
    /// The distribution the scores were computed from, canonicalized when requested.
    pub emotions: Vec<LabelScore>,
    pub vad: Vad,
    pub stress: StressResult,
}

/// Introspection data exposed by the status endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AffectStatus {
    pub emotion_model_dir: Option<PathBuf>,
    pub map_path: Option<PathBuf>,
    pub alias_path: Option<PathBuf>,
    pub unknown_labels_path: Option<PathBuf>,
    pub unknown_labels_count: usize,
    pub unknown_labels: Vec<String>,
    pub negative_path: Option<PathBuf>,
    pub negative_labels_count: usize,
    pub negative_labels_source: Option<NegativeSource>,
    pub negative_threshold: Option<f64>,
}

/// Identity of the classifier the tables were built for.
#[derive(Debug, Clone, PartialEq)]
struct Generation {
    model_dir: PathBuf,
    labels: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct AffectSnapshot {
    mapper: Arc<VadMapper>,
    negative: Option<Arc<NegativeLabels>>,
    status: AffectStatus,
    generation: Option<Generation>,
}

impl AffectSnapshot {
    pub fn mapper(&self) -> &VadMapper {
        &self.mapper
    }

    pub fn negative(&self) -> Option<&NegativeLabels> {
        self.negative.as_deref()
    }

    pub fn status(&self) -> AffectStatus {
        let mut status = self.status.clone();
        if let Some(negative) = &self.negative {
            status.negative_path = negative.path().map(Path::to_path_buf);
            status.negative_labels_count = negative.len();
            status.negative_labels_source = Some(negative.source());
            status.negative_threshold = negative.threshold();
        }
        status
    }
}

fn write_unknown_labels(path: &Path, unknown: &[String]) -> Result<()> {
    let body = serde_json::to_string_pretty(&serde_json::json!({ "unknown_labels": unknown }))?;
    std::fs::write(path, body)
        .with_context(|| format!("Failed to write unknown labels file: {:?}", path))
}

pub struct AffectEngine {
    settings: AffectSettings,
    current: RwLock<Arc<AffectSnapshot>>,
    init_lock: Mutex<()>,
}

impl AffectEngine {
    /// Starts with the project default mapping and no negative set.
    pub fn new(settings: AffectSettings) -> Self {
        let mapper = Self::default_mapper(&settings.default_vad_map);
        let snapshot = AffectSnapshot {
            mapper: Arc::new(mapper),
            negative: None,
            status: AffectStatus::default(),
            generation: None,
        };
        Self {
            settings,
            current: RwLock::new(Arc::new(snapshot)),
            init_lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &AffectSettings {
        &self.settings
    }

    pub fn snapshot(&self) -> Arc<AffectSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace(&self, snapshot: AffectSnapshot) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
    }

    fn search_path(&self, model_dir: &Path) -> ConfigSearchPath {
        ConfigSearchPath::new(model_dir, &self.settings.shared_config_dir)
    }

    fn default_mapper(path: &Path) -> VadMapper {
        if !path.is_file() {
            warn!(
                "Default VAD mapping {:?} not found; using neutral-only fallback",
                path
            );
            return VadMapper::neutral_only();
        }
        match load_vad_table(path) {
            Ok(table) => {
                info!("Loaded default VAD mapping from {:?}", path);
                VadMapper::new(table, LabelCanonicalizer::default())
            }
            Err(e) => {
                warn!("{:#}; using neutral-only fallback", e);
                VadMapper::neutral_only()
            }
        }
    }

    /// Loads the model specific mapping and aliases, falling back to the default mapping.
    fn build_mapper(&self, search: &ConfigSearchPath) -> (VadMapper, Option<PathBuf>, Option<PathBuf>) {
        let Some(map_path) = search.find(VAD_MAP_FILE) else {
            info!("No specific VAD map found; falling back to default");
            return (Self::default_mapper(&self.settings.default_vad_map), None, None);
        };
        let table = match load_vad_table(&map_path) {
            Ok(table) => table,
            Err(e) => {
                warn!("{:#}; falling back to default", e);
                return (Self::default_mapper(&self.settings.default_vad_map), None, None);
            }
        };
        let (canonicalizer, alias_path) = match search.find(ALIAS_FILE) {
            Some(alias_path) => match LabelCanonicalizer::load(&alias_path) {
                Ok(c) => (c, Some(alias_path)),
                Err(e) => {
                    warn!("{:#}", e);
                    (LabelCanonicalizer::default(), None)
                }
            },
            None => (LabelCanonicalizer::default(), None),
        };
        info!(
            "Loaded VAD mapping from {:?} (alias: {:?})",
            map_path, alias_path
        );
        (VadMapper::new(table, canonicalizer), Some(map_path), alias_path)
    }

    /// Rebuilds every table for the given emotion model and its label set.
    ///
    /// The unknown-label report is written next to the model directory; failing
    /// to write it is logged and otherwise ignored.
    pub fn initialize(&self, model_dir: &Path, labels: Option<&[String]>) {
        let _guard = self.init_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.initialize_locked(model_dir, labels);
    }

    /// Same as [`Self::initialize`], skipped when the tables were already built
    /// for this model directory and label set. Returns whether a rebuild happened.
    pub fn ensure_initialized(&self, model_dir: &Path, labels: Option<&[String]>) -> bool {
        let wanted = Generation {
            model_dir: model_dir.to_path_buf(),
            labels: labels.map(<[String]>::to_vec),
        };
        if self.snapshot().generation.as_ref() == Some(&wanted) {
            return false;
        }
        let _guard = self.init_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.snapshot().generation.as_ref() == Some(&wanted) {
            return false;
        }
        self.initialize_locked(model_dir, labels);
        true
    }

    fn initialize_locked(&self, model_dir: &Path, labels: Option<&[String]>) {
        let search = self.search_path(model_dir);
        let (mapper, map_path, alias_path) = self.build_mapper(&search);

        let unknown = labels
            .map(|l| mapper.unknown_labels(l))
            .unwrap_or_default();
        let unknown_path = search.unknown_labels_path();
        let unknown_labels_path = match write_unknown_labels(&unknown_path, &unknown) {
            Ok(()) => {
                info!(
                    "Wrote unknown emotion labels to {:?} (count={})",
                    unknown_path,
                    unknown.len()
                );
                Some(unknown_path)
            }
            Err(e) => {
                warn!("{:#}", e);
                None
            }
        };

        let negative = NegativeLabels::resolve(
            &search,
            &mapper,
            labels,
            self.settings.negative_valence_threshold,
        );

        self.replace(AffectSnapshot {
            mapper: Arc::new(mapper),
            negative: Some(Arc::new(negative)),
            status: AffectStatus {
                emotion_model_dir: Some(model_dir.to_path_buf()),
                map_path,
                alias_path,
                unknown_labels_path,
                unknown_labels_count: unknown.len(),
                unknown_labels: unknown,
                ..Default::default()
            },
            generation: Some(Generation {
                model_dir: model_dir.to_path_buf(),
                labels: labels.map(<[String]>::to_vec),
            }),
        });
    }

    /// Rebuilds only the negative-label set against the current mapper.
    pub fn init_negative_labels(&self, model_dir: &Path, labels: Option<&[String]>) {
        let _guard = self.init_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.snapshot();
        let negative = NegativeLabels::resolve(
            &self.search_path(model_dir),
            current.mapper(),
            labels,
            self.settings.negative_valence_threshold,
        );
        let mut next = (*current).clone();
        next.negative = Some(Arc::new(negative));
        self.replace(next);
    }

    /// Derives the negative-label set unless another caller got there first.
    fn init_negative_labels_if_missing(&self, model_dir: &Path) {
        let _guard = self.init_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.snapshot();
        if current.negative.is_some() {
            return;
        }
        let negative = NegativeLabels::resolve::<String>(
            &self.search_path(model_dir),
            current.mapper(),
            None,
            self.settings.negative_valence_threshold,
        );
        let mut next = (*current).clone();
        next.negative = Some(Arc::new(negative));
        self.replace(next);
    }

    fn negative_snapshot(&self) -> Arc<AffectSnapshot> {
        let snapshot = self.snapshot();
        if snapshot.negative.is_some() {
            return snapshot;
        }
        let model_dir = snapshot
            .status
            .emotion_model_dir
            .clone()
            .unwrap_or_else(|| self.settings.default_model_dir.clone());
        self.init_negative_labels_if_missing(&model_dir);
        self.snapshot()
    }

    pub fn canonical(&self, label: &str) -> String {
        self.snapshot().mapper().canonical(label)
    }

    pub fn canonicalize_distribution(&self, distribution: &[LabelScore]) -> Vec<LabelScore> {
        self.snapshot()
            .mapper()
            .canonicalizer()
            .canonicalize_distribution(distribution)
    }

    pub fn map_label(&self, label: &str) -> Vad {
        self.snapshot().mapper().map_label(label)
    }

    pub fn map_distribution(&self, distribution: &[LabelScore]) -> Vad {
        self.snapshot().mapper().map_distribution(distribution)
    }

    pub fn unknown_labels(&self, labels: &[String]) -> Vec<String> {
        self.snapshot().mapper().unknown_labels(labels)
    }

    /// Stress score for the given valence/arousal and emotion distribution.
    ///
    /// Derives the negative-label set first when it was never initialized.
    pub fn derive_stress(
        &self,
        valence: f64,
        arousal: f64,
        distribution: &[LabelScore],
    ) -> StressResult {
        let snapshot = self.negative_snapshot();
        match snapshot.negative() {
            Some(negative) => {
                stress::derive_stress(valence, arousal, distribution, snapshot.mapper(), negative)
            }
            None => stress::stress_from_components(valence, arousal, 0.0),
        }
    }

    /// Maps an emotion distribution to VAD and stress against a single snapshot.
    pub fn score(&self, emotions: Vec<LabelScore>, use_aliases: bool) -> AffectScore {
        let snapshot = self.negative_snapshot();
        let mapper = snapshot.mapper();
        let emotions = if use_aliases {
            mapper.canonicalizer().canonicalize_distribution(&emotions)
        } else {
            emotions
        };
        let vad = mapper.map_distribution(&emotions);
        let stress = match snapshot.negative() {
            Some(negative) => {
                stress::derive_stress(vad.valence, vad.arousal, &emotions, mapper, negative)
            }
            None => stress::stress_from_components(vad.valence, vad.arousal, 0.0),
        };
        AffectScore {
            emotions,
            vad,
            stress,
        }
    }

    pub fn status(&self) -> AffectStatus {
        self.snapshot().status()
    }
}
