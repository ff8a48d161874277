//! In-process aggregation of analysis latencies and emotion confidences.
//!
//! Buffers are bounded: once an append would go over [`BUFFER_CAPACITY`]
//! entries, only the most recent [`BUFFER_RETAINED`] are kept before the new
//! sample goes in.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

pub const BUFFER_CAPACITY: usize = 2000;
pub const BUFFER_RETAINED: usize = 1000;

/// Windows reported under `emotion_top1_score_recent`.
pub const RECENT_WINDOWS: [Duration; 2] = [Duration::from_secs(60), Duration::from_secs(300)];

#[derive(Debug, Default)]
struct Buffers {
    latencies_ms: Vec<f64>,
    top1_scores: Vec<f64>,
    top1_times: Vec<Instant>,
    inference_count: u64,
    error_count: u64,
}

fn compact<T>(buffer: &mut Vec<T>) {
    if buffer.len() >= BUFFER_CAPACITY {
        let excess = buffer.len() - BUFFER_RETAINED;
        buffer.drain(..excess);
    }
}

/// Nearest-rank percentile over an unsorted sample.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let last = sorted.len() - 1;
    let index = ((q * last as f64).floor().max(0.0) as usize).min(last);
    Some(sorted[index])
}

fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatencySummary {
    pub avg: Option<f64>,
    pub p50: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
}

impl LatencySummary {
    fn of(values: &[f64]) -> Self {
        Self {
            avg: average(values),
            p50: percentile(values, 0.50),
            p95: percentile(values, 0.95),
            p99: percentile(values, 0.99),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub avg: Option<f64>,
    pub p50: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
    pub count: usize,
}

impl ScoreSummary {
    fn of(values: &[f64]) -> Self {
        let LatencySummary { avg, p50, p95, p99 } = LatencySummary::of(values);
        Self {
            avg,
            p50,
            p95,
            p99,
            count: values.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub uptime_sec: f64,
    pub inference_count: u64,
    pub error_count: u64,
    pub inference_latency_ms: LatencySummary,
    pub emotion_top1_score: ScoreSummary,
    pub emotion_top1_score_recent: BTreeMap<String, ScoreSummary>,
}

#[derive(Debug)]
pub struct InferenceStats {
    started_at: Instant,
    buffers: Mutex<Buffers>,
}

impl Default for InferenceStats {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            buffers: Mutex::new(Buffers::default()),
        }
    }

    fn buffers(&self) -> std::sync::MutexGuard<'_, Buffers> {
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records one finished analysis, successful or not.
    pub fn record_latency(&self, ms: f64) {
        let mut buffers = self.buffers();
        buffers.inference_count += 1;
        compact(&mut buffers.latencies_ms);
        buffers.latencies_ms.push(ms);
    }

    pub fn record_error(&self) {
        self.buffers().error_count += 1;
    }

    pub fn record_top1(&self, score: f64) {
        self.record_top1_at(score, Instant::now());
    }

    pub fn record_top1_at(&self, score: f64, at: Instant) {
        let mut buffers = self.buffers();
        compact(&mut buffers.top1_scores);
        compact(&mut buffers.top1_times);
        buffers.top1_scores.push(score);
        buffers.top1_times.push(at);
    }

    pub fn window_summary(&self, window: Duration) -> ScoreSummary {
        self.window_summary_at(window, Instant::now())
    }

    /// Summary of the top-1 scores recorded no longer than `window` before `now`.
    pub fn window_summary_at(&self, window: Duration, now: Instant) -> ScoreSummary {
        let buffers = self.buffers();
        Self::window_of(&buffers, window, now)
    }

    fn window_of(buffers: &Buffers, window: Duration, now: Instant) -> ScoreSummary {
        let selected: Vec<f64> = buffers
            .top1_scores
            .iter()
            .zip(&buffers.top1_times)
            .filter(|(_, t)| now.saturating_duration_since(**t) <= window)
            .map(|(score, _)| *score)
            .collect();
        ScoreSummary::of(&selected)
    }

    pub fn inference_count(&self) -> u64 {
        self.buffers().inference_count
    }

    pub fn error_count(&self) -> u64 {
        self.buffers().error_count
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let now = Instant::now();
        let buffers = self.buffers();
        let recent = RECENT_WINDOWS
            .iter()
            .map(|w| {
                (
                    format!("{}s", w.as_secs()),
                    Self::window_of(&buffers, *w, now),
                )
            })
            .collect();
        StatsSnapshot {
            uptime_sec: now.duration_since(self.started_at).as_secs_f64(),
            inference_count: buffers.inference_count,
            error_count: buffers.error_count,
            inference_latency_ms: LatencySummary::of(&buffers.latencies_ms),
            emotion_top1_score: ScoreSummary::of(&buffers.top1_scores),
            emotion_top1_score_recent: recent,
        }
    }

    #[cfg(test)]
    fn buffer_lengths(&self) -> (usize, usize, usize) {
        let b = self.buffers();
        (b.latencies_ms.len(), b.top1_scores.len(), b.top1_times.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_uses_nearest_rank() {
        let values = [50.0, 10.0, 40.0, 20.0, 30.0];
        assert_eq!(percentile(&values, 0.5), Some(30.0));
        assert_eq!(percentile(&values, 0.0), Some(10.0));
        assert_eq!(percentile(&values, 0.99), Some(40.0));
        assert_eq!(percentile(&values, 1.0), Some(50.0));
        assert_eq!(percentile(&[], 0.5), None);
        assert_eq!(percentile(&[7.0], 0.95), Some(7.0));
    }

    #[test]
    fn buffers_compact_to_most_recent_entries() {
        let stats = InferenceStats::new();
        for i in 0..BUFFER_CAPACITY {
            stats.record_latency(i as f64);
            stats.record_top1(0.5);
        }
        assert_eq!(stats.buffer_lengths(), (2000, 2000, 2000));

        stats.record_latency(9999.0);
        stats.record_top1(0.9);
        assert_eq!(stats.buffer_lengths(), (1001, 1001, 1001));
        assert_eq!(stats.inference_count(), 2001);

        let snapshot = stats.snapshot();
        // oldest retained latency is 1000
        assert_eq!(snapshot.inference_latency_ms.p50.map(|v| v >= 1000.0), Some(true));
        assert_eq!(snapshot.emotion_top1_score.count, 1001);
    }

    #[test]
    fn empty_window_reports_nothing() {
        let stats = InferenceStats::new();
        assert_eq!(stats.window_summary(Duration::from_secs(60)), ScoreSummary::default());

        let at = Instant::now();
        stats.record_top1_at(0.8, at);
        let later = at + Duration::from_secs(120);
        let summary = stats.window_summary_at(Duration::from_secs(60), later);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.avg, None);
        assert_eq!(summary.p99, None);
    }

    #[test]
    fn windows_select_recent_samples() {
        let stats = InferenceStats::new();
        let start = Instant::now();
        stats.record_top1_at(0.2, start);
        stats.record_top1_at(0.6, start + Duration::from_secs(200));
        stats.record_top1_at(0.8, start + Duration::from_secs(250));
        let now = start + Duration::from_secs(260);

        let last_minute = stats.window_summary_at(Duration::from_secs(60), now);
        assert_eq!(last_minute.count, 2);
        assert!((last_minute.avg.unwrap() - 0.7).abs() < 1e-9);

        let last_five = stats.window_summary_at(Duration::from_secs(300), now);
        assert_eq!(last_five.count, 3);
        assert_eq!(last_five.p50, Some(0.6));
    }

    #[test]
    fn snapshot_reports_counters() {
        let stats = InferenceStats::new();
        stats.record_latency(10.0);
        stats.record_latency(30.0);
        stats.record_error();
        stats.record_top1(0.4);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.inference_count, 2);
        assert_eq!(snapshot.error_count, 1);
        assert_eq!(snapshot.inference_latency_ms.avg, Some(20.0));
        assert_eq!(snapshot.emotion_top1_score.count, 1);
        assert_eq!(snapshot.emotion_top1_score_recent["60s"].count, 1);
        assert_eq!(snapshot.emotion_top1_score_recent["300s"].avg, Some(0.4));
        assert!(snapshot.uptime_sec >= 0.0);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json["inference_latency_ms"]["p95"].is_number());
        assert!(json["emotion_top1_score_recent"]["300s"].is_object());
    }
}
