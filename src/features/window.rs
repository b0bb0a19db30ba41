//! Rolling per-source history and the statistics computed over it.

use super::{destination_port_class, FeatureVector};
use crate::events::Event;
use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;

const UNKNOWN_ATTACK: &str = "UNKNOWN";
/// Extractions remembered per source so a replayed event id reuses its vector.
const RECENT_EXTRACTIONS: usize = 16;

/// Window lengths and history caps, resolved from `FeaturesConfig`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Limits {
    pub rate_window: ChronoDuration,
    pub burst_window: ChronoDuration,
    pub max_history: usize,
    pub max_distinct: usize,
}

impl Limits {
    fn retention(&self) -> ChronoDuration {
        self.rate_window.max(self.burst_window)
    }
}

/// History for one source address. Only the feature extractor mutates it.
#[derive(Debug, Clone)]
pub struct SourceState {
    timestamps: VecDeque<DateTime<Utc>>,
    lengths: VecDeque<u64>,
    malicious: VecDeque<bool>,
    attack_types: HashMap<String, u64>,
    destinations: HashSet<String>,
    honeypots: HashSet<String>,
    first_seen: Option<DateTime<Utc>>,
    last_seen: Option<DateTime<Utc>>,
    event_count: u64,
    recent: VecDeque<(String, FeatureVector)>,
    touched: Instant,
}

impl Default for SourceState {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceState {
    pub fn new() -> Self {
        Self {
            timestamps: VecDeque::new(),
            lengths: VecDeque::new(),
            malicious: VecDeque::new(),
            attack_types: HashMap::new(),
            destinations: HashSet::new(),
            honeypots: HashSet::new(),
            first_seen: None,
            last_seen: None,
            event_count: 0,
            recent: VecDeque::with_capacity(RECENT_EXTRACTIONS),
            touched: Instant::now(),
        }
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    pub fn window_len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn length_samples(&self) -> usize {
        self.lengths.len()
    }

    pub fn idle_for(&self) -> std::time::Duration {
        self.touched.elapsed()
    }

    /// Vector previously extracted for `event_id`, if it is still remembered.
    pub(crate) fn cached(&self, event_id: &str) -> Option<FeatureVector> {
        self.recent
            .iter()
            .find(|(id, _)| id == event_id)
            .map(|(_, features)| *features)
    }

    pub(crate) fn remember(&mut self, event_id: &str, features: FeatureVector) {
        push_capped(&mut self.recent, (event_id.to_string(), features), RECENT_EXTRACTIONS);
    }

    /// Append the event to every history, then enforce caps on the count-bounded ones.
    pub(crate) fn record(&mut self, event: &Event, limits: &Limits) {
        let ts = event.ts;
        push_capped(&mut self.timestamps, ts, limits.max_history);
        push_capped(&mut self.lengths, event.length, limits.max_history);
        push_capped(
            &mut self.malicious,
            event.is_malicious.unwrap_or(false),
            limits.max_history,
        );

        let label = event.attack_type.as_deref().unwrap_or(UNKNOWN_ATTACK);
        *self.attack_types.entry(label.to_string()).or_insert(0) += 1;

        if !event.dest_addr.is_empty() && self.destinations.len() < limits.max_distinct {
            self.destinations.insert(event.dest_addr.clone());
        }
        if let Some(hp) = event.honeypot_type.as_deref() {
            if self.honeypots.len() < limits.max_distinct {
                self.honeypots.insert(hp.to_ascii_uppercase());
            }
        }

        self.first_seen = Some(self.first_seen.map_or(ts, |f| f.min(ts)));
        self.last_seen = Some(self.last_seen.map_or(ts, |l| l.max(ts)));
        self.event_count += 1;
        self.touched = Instant::now();
    }

    /// Drop window timestamps older than the longest window, measured from `event`.
    /// A single future-dated event must not age out everything recorded after it.
    pub(crate) fn trim(&mut self, event: &Event, limits: &Limits) {
        let cutoff = event.ts - limits.retention();
        self.timestamps.retain(|t| *t >= cutoff);
    }

    fn count_since(&self, start: DateTime<Utc>) -> usize {
        self.timestamps.iter().filter(|t| **t >= start).count()
    }

    fn length_stats(&self) -> LengthStats {
        LengthStats::from_samples(&self.lengths)
    }

    /// Compute the feature vector for `event`, which must already be recorded.
    pub(crate) fn features(&self, event: &Event, limits: &Limits) -> FeatureVector {
        let ts = event.ts;
        let length = event.length as f64;
        let rate_secs = limits.rate_window.num_milliseconds() as f64 / 1000.0;
        let rate_count = self.count_since(ts - limits.rate_window) as f64;
        let stats = self.length_stats();

        let malicious_ratio = if self.malicious.is_empty() {
            0.0
        } else {
            self.malicious.iter().filter(|m| **m).count() as f64 / self.malicious.len() as f64
        };
        let hour = ts.hour();
        let session = match (self.first_seen, self.last_seen) {
            (Some(first), Some(last)) if self.event_count >= 2 => {
                (last - first).num_milliseconds() as f64 / 1000.0
            }
            _ => 0.0,
        };

        FeatureVector {
            packet_length: length,
            protocol_encoding: event.protocol.encoding() as f64,
            source_ip_event_rate: rate_count * (60.0 / rate_secs),
            destination_port_class: destination_port_class(event.dest_port) as f64,
            threat_score: event.baseline_threat_score.unwrap_or(0.0),
            malicious_flag_ratio: malicious_ratio,
            attack_type_frequency: self.attack_types.values().copied().max().unwrap_or(0) as f64,
            time_of_day_deviation: if !(6..=22).contains(&hour) { 1.0 } else { 0.0 },
            burst_rate: self.count_since(ts - limits.burst_window) as f64,
            packet_size_variance: stats.variance,
            honeypot_interaction_count: self.honeypots.len() as f64,
            session_duration_estimate: session,
            unique_destination_count: self.destinations.len() as f64,
            rolling_average_deviation: if stats.count == 0 { 0.0 } else { length - stats.mean },
            z_score_anomaly: stats.z_score(length),
        }
    }
}

fn push_capped<T>(history: &mut VecDeque<T>, value: T, cap: usize) {
    history.push_back(value);
    while history.len() > cap {
        history.pop_front();
    }
}

/// Mean and sample (n-1) variance of packet lengths.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LengthStats {
    count: usize,
    mean: f64,
    variance: f64,
}

impl LengthStats {
    fn from_samples(samples: &VecDeque<u64>) -> Self {
        let count = samples.len();
        if count == 0 {
            return Self { count, mean: 0.0, variance: 0.0 };
        }
        let mean = samples.iter().map(|v| *v as f64).sum::<f64>() / count as f64;
        let variance = if count < 2 {
            0.0
        } else {
            samples
                .iter()
                .map(|v| (*v as f64 - mean).powi(2))
                .sum::<f64>()
                / (count - 1) as f64
        };
        Self { count, mean, variance }
    }

    fn z_score(&self, value: f64) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let std = self.variance.sqrt();
        if std == 0.0 {
            0.0
        } else {
            (value - self.mean) / std
        }
    }
}
