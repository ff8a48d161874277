//! Valence-Arousal-Dominance lookup and aggregation.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

use super::{LabelCanonicalizer, LabelScore};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Vad {
    pub valence: f64,
    pub arousal: f64,
    pub dominance: f64,
}

impl Vad {
    /// Returned for unknown labels and degenerate distributions.
    pub const NEUTRAL: Vad = Vad::new(0.5, 0.5, 0.5);

    pub const fn new(valence: f64, arousal: f64, dominance: f64) -> Self {
        Self {
            valence,
            arousal,
            dominance,
        }
    }
}

fn half() -> f64 {
    0.5
}

#[derive(Debug, Deserialize)]
struct VadAxes {
    #[serde(default = "half")]
    valence: f64,
    #[serde(default = "half")]
    arousal: f64,
    #[serde(default = "half")]
    dominance: f64,
}

/// The two accepted shapes of a mapping entry.
#[derive(Debug)]
enum VadEntry {
    Axes(VadAxes),
    Triple([f64; 3]),
}

impl TryFrom<&Value> for VadEntry {
    type Error = String;

    fn try_from(value: &Value) -> std::result::Result<Self, Self::Error> {
        match value {
            Value::Object(_) => serde_json::from_value::<VadAxes>(value.clone())
                .map(VadEntry::Axes)
                .map_err(|e| e.to_string()),
            Value::Array(items) if items.len() == 3 => {
                let mut triple = [0.0; 3];
                for (slot, item) in triple.iter_mut().zip(items) {
                    *slot = item
                        .as_f64()
                        .ok_or_else(|| format!("non-numeric component {}", item))?;
                }
                Ok(VadEntry::Triple(triple))
            }
            other => Err(format!("unsupported entry {}", other)),
        }
    }
}

impl From<VadEntry> for Vad {
    fn from(entry: VadEntry) -> Self {
        match entry {
            VadEntry::Axes(a) => Vad::new(a.valence, a.arousal, a.dominance),
            VadEntry::Triple([v, a, d]) => Vad::new(v, a, d),
        }
    }
}

/// Parses a VAD mapping document. Malformed entries are logged and skipped.
pub fn parse_vad_table(content: &str, origin: &str) -> Result<HashMap<String, Vad>> {
    let document: Value = serde_json::from_str(content)
        .with_context(|| format!("Failed to parse VAD mapping: {}", origin))?;
    let Value::Object(entries) = document else {
        bail!("VAD mapping {} is not a JSON object", origin);
    };

    let mut table = HashMap::with_capacity(entries.len());
    for (label, value) in entries.iter() {
        match VadEntry::try_from(value) {
            Ok(entry) => {
                table.insert(label.to_lowercase(), entry.into());
            }
            Err(reason) => warn!("Invalid VAD entry for label={} in {}: {}", label, origin, reason),
        }
    }
    Ok(table)
}

pub fn load_vad_table(path: &Path) -> Result<HashMap<String, Vad>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read VAD mapping: {:?}", path))?;
    parse_vad_table(&content, &path.to_string_lossy())
}

/// Immutable label -> VAD table with its alias resolution.
#[derive(Debug, Clone)]
pub struct VadMapper {
    table: HashMap<String, Vad>,
    canonicalizer: LabelCanonicalizer,
}

impl VadMapper {
    pub fn new(table: HashMap<String, Vad>, canonicalizer: LabelCanonicalizer) -> Self {
        let table = table
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        Self {
            table,
            canonicalizer,
        }
    }

    /// Last-resort table used when no mapping file can be found at all.
    pub fn neutral_only() -> Self {
        Self::new(
            HashMap::from([("neutral".to_string(), Vad::new(0.5, 0.3, 0.5))]),
            LabelCanonicalizer::default(),
        )
    }

    pub fn canonicalizer(&self) -> &LabelCanonicalizer {
        &self.canonicalizer
    }

    pub fn canonical(&self, label: &str) -> String {
        self.canonicalizer.canonical(label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.table.contains_key(&self.canonical(label))
    }

    pub fn labels(&self) -> impl Iterator<Item = &String> {
        self.table.keys()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn map_label(&self, label: &str) -> Vad {
        self.table
            .get(&self.canonical(label))
            .copied()
            .unwrap_or(Vad::NEUTRAL)
    }

    /// Score-weighted mean of the per-label vectors.
    pub fn map_distribution(&self, distribution: &[LabelScore]) -> Vad {
        if distribution.is_empty() {
            return Vad::NEUTRAL;
        }
        let (mut v, mut a, mut d, mut total) = (0.0, 0.0, 0.0, 0.0);
        for pair in distribution {
            let vad = self.map_label(&pair.label);
            v += pair.score * vad.valence;
            a += pair.score * vad.arousal;
            d += pair.score * vad.dominance;
            total += pair.score;
        }
        if total <= 0.0 {
            return Vad::NEUTRAL;
        }
        Vad::new(v / total, a / total, d / total)
    }

    /// Input labels whose canonical form has no entry, sorted and de-duplicated.
    pub fn unknown_labels<S: AsRef<str>>(&self, labels: &[S]) -> Vec<String> {
        let mut unknown: Vec<String> = labels
            .iter()
            .map(|l| l.as_ref())
            .filter(|l| !self.contains(l))
            .map(str::to_string)
            .collect();
        unknown.sort();
        unknown.dedup();
        unknown
    }
}
