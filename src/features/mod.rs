//! Windowed per-source feature extraction.

mod pipeline;
mod window;

pub use pipeline::FeatureExtractor;
pub use window::SourceState;

use serde::{Deserialize, Serialize};

pub const FEATURE_COUNT: usize = 15;

/// Column order of [`FeatureVector::to_array`]. Model weights are laid out in this order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "packet_length",
    "protocol_encoding",
    "source_ip_event_rate",
    "destination_port_class",
    "threat_score",
    "malicious_flag_ratio",
    "attack_type_frequency",
    "time_of_day_deviation",
    "burst_rate",
    "packet_size_variance",
    "honeypot_interaction_count",
    "session_duration_estimate",
    "unique_destination_count",
    "rolling_average_deviation",
    "z_score_anomaly",
];

/// Fixed 15-feature vector for one event. Field order is the model contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub packet_length: f64,
    pub protocol_encoding: f64,
    pub source_ip_event_rate: f64,
    pub destination_port_class: f64,
    pub threat_score: f64,
    pub malicious_flag_ratio: f64,
    pub attack_type_frequency: f64,
    pub time_of_day_deviation: f64,
    pub burst_rate: f64,
    pub packet_size_variance: f64,
    pub honeypot_interaction_count: f64,
    pub session_duration_estimate: f64,
    pub unique_destination_count: f64,
    pub rolling_average_deviation: f64,
    pub z_score_anomaly: f64,
}

impl FeatureVector {
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.packet_length,
            self.protocol_encoding,
            self.source_ip_event_rate,
            self.destination_port_class,
            self.threat_score,
            self.malicious_flag_ratio,
            self.attack_type_frequency,
            self.time_of_day_deviation,
            self.burst_rate,
            self.packet_size_variance,
            self.honeypot_interaction_count,
            self.session_duration_estimate,
            self.unique_destination_count,
            self.rolling_average_deviation,
            self.z_score_anomaly,
        ]
    }

    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> {
        FEATURE_NAMES.into_iter().zip(self.to_array())
    }
}

/// Well-known (<1024) = 1, registered (<49152) = 2, ephemeral = 3
pub fn destination_port_class(port: u16) -> u8 {
    if port < 1024 {
        1
    } else if port < 49152 {
        2
    } else {
        3
    }
}
