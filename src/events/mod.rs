//! Connection/honeypot events as received from listeners and the ingestion loop.
//!
//! [`RawEvent`] is the lenient wire shape; [`Event`] is the validated, immutable form the
//! pipeline works on. Missing optional fields get defaults, contract violations are rejected.

mod timestamp;

pub use timestamp::parse_timestamp;

use crate::error::ScoringError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Other,
}

impl Protocol {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "TCP" => Protocol::Tcp,
            "UDP" => Protocol::Udp,
            "ICMP" => Protocol::Icmp,
            _ => Protocol::Other,
        }
    }

    /// Model encoding: TCP=1, UDP=2, ICMP=3, anything else 0
    pub fn encoding(self) -> u8 {
        match self {
            Protocol::Tcp => 1,
            Protocol::Udp => 2,
            Protocol::Icmp => 3,
            Protocol::Other => 0,
        }
    }
}

/// Service-level metadata reported by a honeypot listener. Used by signatures only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    /// Authentication outcome, e.g. "Failed"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_size: Option<u64>,
}

impl ServiceMetadata {
    pub fn is_empty(&self) -> bool {
        *self == ServiceMetadata::default()
    }
}

/// Validated event. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub source_addr: String,
    pub dest_addr: String,
    pub dest_port: u16,
    pub protocol: Protocol,
    pub length: u64,
    pub ts: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attack_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_malicious: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub honeypot_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_threat_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ServiceMetadata>,
}

impl Event {
    pub fn new(
        source_addr: impl Into<String>,
        dest_addr: impl Into<String>,
        dest_port: u16,
        protocol: Protocol,
        length: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source_addr: source_addr.into(),
            dest_addr: dest_addr.into(),
            dest_port,
            protocol,
            length,
            ts: Utc::now(),
            attack_type: None,
            is_malicious: None,
            honeypot_type: None,
            baseline_threat_score: None,
            metadata: None,
        }
    }

    pub fn at(mut self, ts: DateTime<Utc>) -> Self {
        self.ts = ts;
        self
    }

    pub fn with_attack_type(mut self, attack_type: impl Into<String>) -> Self {
        self.attack_type = Some(attack_type.into());
        self
    }

    pub fn with_malicious(mut self, flag: bool) -> Self {
        self.is_malicious = Some(flag);
        self
    }

    pub fn with_honeypot(mut self, honeypot: impl Into<String>) -> Self {
        self.honeypot_type = Some(honeypot.into());
        self
    }

    pub fn with_threat_score(mut self, score: f64) -> Self {
        self.baseline_threat_score = Some(score);
        self
    }

    pub fn with_metadata(mut self, metadata: ServiceMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Service type for signature matching: explicit metadata first, then the honeypot tag.
    pub fn service_type(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.service_type.as_deref())
            .or(self.honeypot_type.as_deref())
    }
}

/// Event as delivered by collaborators. Field aliases accept the listener/DB column names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(alias = "src_ip", alias = "attacker_ip")]
    pub source_addr: String,
    #[serde(default, alias = "dst_ip")]
    pub dest_addr: Option<String>,
    #[serde(default, alias = "dst_port")]
    pub dest_port: Option<i64>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub length: Option<i64>,
    /// ISO-8601 string or epoch seconds; anything unparseable becomes "now"
    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,
    #[serde(default)]
    pub attack_type: Option<String>,
    #[serde(default)]
    pub is_malicious: Option<bool>,
    #[serde(default)]
    pub honeypot_type: Option<String>,
    #[serde(default, alias = "threat_score")]
    pub baseline_threat_score: Option<f64>,
    #[serde(flatten)]
    pub metadata: ServiceMetadata,
}

impl TryFrom<RawEvent> for Event {
    type Error = ScoringError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        let source_addr = raw.source_addr.trim().to_string();
        if source_addr.is_empty() {
            return Err(ScoringError::InvalidEvent("empty source address".into()));
        }
        let length = match raw.length {
            Some(l) if l < 0 => {
                return Err(ScoringError::InvalidEvent(format!("negative length {}", l)))
            }
            Some(l) => l as u64,
            None => 0,
        };
        let dest_port = match raw.dest_port {
            Some(p) => u16::try_from(p)
                .map_err(|_| ScoringError::InvalidEvent(format!("port {} out of range", p)))?,
            None => 0,
        };
        if let Some(score) = raw.baseline_threat_score {
            if !score.is_finite() {
                return Err(ScoringError::InvalidEvent("non-finite threat score".into()));
            }
        }

        Ok(Event {
            id: raw.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            source_addr,
            dest_addr: raw.dest_addr.unwrap_or_default(),
            dest_port,
            protocol: raw
                .protocol
                .as_deref()
                .map(Protocol::parse)
                .unwrap_or(Protocol::Other),
            length,
            ts: parse_timestamp(raw.timestamp.as_ref()),
            attack_type: raw.attack_type,
            is_malicious: raw.is_malicious,
            honeypot_type: raw.honeypot_type,
            baseline_threat_score: raw.baseline_threat_score,
            metadata: (!raw.metadata.is_empty()).then_some(raw.metadata),
        })
    }
}
