//! Feature extraction pipeline: event → per-source window (sharded) → feature vector.

use super::window::{Limits, SourceState};
use super::FeatureVector;
use crate::config::FeaturesConfig;
use crate::events::Event;
use chrono::Duration as ChronoDuration;
use dashmap::DashMap;
use std::time::Duration;

const NUM_SHARDS: usize = 64;

/// Owns all per-source state. Extraction for one source runs under that key's shard lock,
/// so concurrent events from the same source are linearized while other sources proceed.
pub struct FeatureExtractor {
    config: FeaturesConfig,
    limits: Limits,
    states: DashMap<String, SourceState>,
}

impl FeatureExtractor {
    pub fn new(config: FeaturesConfig) -> Self {
        let limits = Limits {
            rate_window: ChronoDuration::seconds(config.rate_window_secs.max(1) as i64),
            burst_window: ChronoDuration::seconds(config.burst_window_secs.max(1) as i64),
            max_history: config.max_history.max(1),
            max_distinct: config.max_distinct,
        };
        Self {
            config,
            limits,
            states: DashMap::with_capacity_and_shard_amount(1024, NUM_SHARDS),
        }
    }

    pub fn config(&self) -> &FeaturesConfig {
        &self.config
    }

    /// Record `event` into its source's state and return the features for it.
    ///
    /// Each distinct event is recorded once: extracting an event id the source has just seen
    /// returns the vector computed the first time and leaves the history untouched.
    pub fn extract(&self, event: &Event) -> FeatureVector {
        let mut state = self
            .states
            .entry(event.source_addr.clone())
            .or_insert_with(SourceState::new);
        if let Some(features) = state.cached(&event.id) {
            return features;
        }
        state.record(event, &self.limits);
        let features = state.features(event, &self.limits);
        state.trim(event, &self.limits);
        state.remember(&event.id, features);
        features
    }

    /// Remove sources untouched for at least `ttl`. Returns how many were dropped.
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let before = self.states.len();
        self.states.retain(|_, state| state.idle_for() < ttl);
        let evicted = before.saturating_sub(self.states.len());
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.states.len(), "evicted idle sources");
        }
        evicted
    }

    pub fn tracked_sources(&self) -> usize {
        self.states.len()
    }

    /// Total events recorded for `source`, if it is tracked.
    pub fn event_count(&self, source: &str) -> Option<u64> {
        self.states.get(source).map(|s| s.event_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Protocol;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Arc;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn ev(src: &str, len: u64, secs: i64) -> Event {
        Event::new(src, "10.0.0.1", 443, Protocol::Udp, len).at(base() + ChronoDuration::seconds(secs))
    }

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(FeaturesConfig::default())
    }

    #[test]
    fn first_event_has_zero_spread_features() {
        let fx = extractor();
        let fv = fx.extract(&ev("1.1.1.1", 120, 0));
        assert_eq!(fv.packet_length, 120.0);
        assert_eq!(fv.protocol_encoding, 2.0);
        assert_eq!(fv.destination_port_class, 1.0);
        assert_eq!(fv.source_ip_event_rate, 1.0);
        assert_eq!(fv.burst_rate, 1.0);
        assert_eq!(fv.packet_size_variance, 0.0);
        assert_eq!(fv.z_score_anomaly, 0.0);
        assert_eq!(fv.session_duration_estimate, 0.0);
        assert_eq!(fv.rolling_average_deviation, 0.0);
        assert_eq!(fv.attack_type_frequency, 1.0);
    }

    #[test]
    fn statistics_include_current_event() {
        let fx = extractor();
        fx.extract(&ev("1.1.1.1", 100, 0));
        fx.extract(&ev("1.1.1.1", 200, 1));
        let fv = fx.extract(&ev("1.1.1.1", 300, 2));
        // lengths 100, 200, 300: mean 200, sample variance 10000
        assert_eq!(fv.packet_size_variance, 10000.0);
        assert_eq!(fv.rolling_average_deviation, 100.0);
        assert_eq!(fv.z_score_anomaly, 1.0);
        assert_eq!(fv.session_duration_estimate, 2.0);
    }

    #[test]
    fn identical_lengths_give_zero_z_score() {
        let fx = extractor();
        fx.extract(&ev("1.1.1.1", 64, 0));
        let fv = fx.extract(&ev("1.1.1.1", 64, 1));
        assert_eq!(fv.packet_size_variance, 0.0);
        assert_eq!(fv.z_score_anomaly, 0.0);
    }

    #[test]
    fn rates_grow_inside_window_and_reset_after() {
        let fx = extractor();
        let mut last_rate = 0.0;
        let mut last_burst = 0.0;
        for i in 0..5 {
            let fv = fx.extract(&ev("2.2.2.2", 10, i));
            assert!(fv.source_ip_event_rate >= last_rate);
            assert!(fv.burst_rate >= last_burst);
            last_rate = fv.source_ip_event_rate;
            last_burst = fv.burst_rate;
        }
        assert_eq!(last_rate, 5.0);
        assert_eq!(last_burst, 5.0);

        // 30s later: burst window (10s) has aged out, rate window (60s) has not
        let fv = fx.extract(&ev("2.2.2.2", 10, 34));
        assert_eq!(fv.burst_rate, 1.0);
        assert_eq!(fv.source_ip_event_rate, 6.0);

        // 5 minutes later both windows are empty apart from this event
        let fv = fx.extract(&ev("2.2.2.2", 10, 334));
        assert_eq!(fv.burst_rate, 1.0);
        assert_eq!(fv.source_ip_event_rate, 1.0);
        assert_eq!(fv.session_duration_estimate, 334.0);
    }

    #[test]
    fn rate_is_normalized_to_per_minute() {
        let fx = FeatureExtractor::new(FeaturesConfig {
            rate_window_secs: 30,
            ..FeaturesConfig::default()
        });
        fx.extract(&ev("3.3.3.3", 1, 0));
        let fv = fx.extract(&ev("3.3.3.3", 1, 1));
        assert_eq!(fv.source_ip_event_rate, 4.0);
    }

    #[test]
    fn per_source_labels_flags_and_destinations() {
        let fx = extractor();
        fx.extract(&ev("4.4.4.4", 1, 0).with_attack_type("BRUTE_FORCE").with_malicious(true));
        fx.extract(&ev("4.4.4.4", 1, 1).with_attack_type("BRUTE_FORCE").with_honeypot("ssh"));
        let mut e = ev("4.4.4.4", 1, 2).with_attack_type("SCAN").with_honeypot("HTTP");
        e.dest_addr = "10.0.0.2".into();
        let fv = fx.extract(&e);
        assert_eq!(fv.attack_type_frequency, 2.0);
        assert!((fv.malicious_flag_ratio - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(fv.honeypot_interaction_count, 2.0);
        assert_eq!(fv.unique_destination_count, 2.0);

        // other sources are unaffected
        let other = fx.extract(&ev("5.5.5.5", 1, 2));
        assert_eq!(other.malicious_flag_ratio, 0.0);
        assert_eq!(other.unique_destination_count, 1.0);
    }

    #[test]
    fn night_hours_flag_deviation() {
        let fx = extractor();
        let at = |h| Event::new("6.6.6.6", "d", 1, Protocol::Icmp, 1)
            .at(Utc.with_ymd_and_hms(2026, 3, 1, h, 30, 0).unwrap());
        assert_eq!(fx.extract(&at(5)).time_of_day_deviation, 1.0);
        assert_eq!(fx.extract(&at(6)).time_of_day_deviation, 0.0);
        assert_eq!(fx.extract(&at(22)).time_of_day_deviation, 0.0);
        assert_eq!(fx.extract(&at(23)).time_of_day_deviation, 1.0);
    }

    #[test]
    fn same_event_is_recorded_once() {
        let fx = extractor();
        let e = ev("7.7.7.7", 50, 0);
        let a = fx.extract(&e);
        let b = fx.extract(&e);
        assert_eq!(a, b);
        assert_eq!(fx.event_count("7.7.7.7"), Some(1));

        // an identical-looking but distinct event is new history
        let c = fx.extract(&ev("7.7.7.7", 50, 0));
        assert_ne!(a, c);
        assert_eq!(c.burst_rate, 2.0);
        assert_eq!(fx.event_count("7.7.7.7"), Some(2));
    }

    #[test]
    fn idle_sources_are_evicted() {
        let fx = extractor();
        fx.extract(&ev("8.8.8.8", 1, 0));
        fx.extract(&ev("8.8.4.4", 1, 0));
        assert_eq!(fx.evict_idle(Duration::from_secs(3600)), 0);
        assert_eq!(fx.tracked_sources(), 2);
        assert_eq!(fx.evict_idle(Duration::ZERO), 2);
        assert_eq!(fx.tracked_sources(), 0);
        assert_eq!(fx.event_count("8.8.8.8"), None);
    }

    #[test]
    fn concurrent_events_from_one_source_are_all_counted() {
        let fx = Arc::new(extractor());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let fx = Arc::clone(&fx);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        fx.extract(&ev("10.9.9.9", (t * 50 + i) as u64, 0));
                        fx.extract(&ev(&format!("10.8.{}.1", t), 1, 0));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(fx.event_count("10.9.9.9"), Some(400));
        assert_eq!(fx.tracked_sources(), 9);
        let fv = fx.extract(&ev("10.9.9.9", 0, 0));
        assert_eq!(fv.burst_rate, 401.0);
    }
}
