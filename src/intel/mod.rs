//! Static reputation feed keyed by source address.

use crate::error::Result;
use std::collections::HashMap;
use std::path::Path;

/// Risk contributed by a feed hit
pub const FEED_HIT_RISK: f64 = 100.0;

/// Known-bad source addresses and their category label (e.g. `KNOWN_BOTNET`).
/// Read-only after construction.
#[derive(Debug, Clone, Default)]
pub struct ThreatFeed {
    entries: HashMap<String, String>,
}

impl ThreatFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into().trim().to_string(), v.into()))
                .collect(),
        }
    }

    /// Load a JSON object `{ "address": "CATEGORY", ... }`.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let entries: HashMap<String, String> = serde_json::from_str(&data)?;
        Ok(Self::from_entries(entries))
    }

    /// Like [`ThreatFeed::load`], but a missing or malformed file yields an empty feed.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(feed) => {
                tracing::info!(path = %path.display(), entries = feed.len(), "threat feed loaded");
                feed
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "threat feed unavailable; continuing without it");
                Self::default()
            }
        }
    }

    pub fn lookup(&self, source: &str) -> Option<&str> {
        self.entries.get(source.trim()).map(String::as_str)
    }

    /// 100 on a hit, 0 otherwise
    pub fn risk(&self, source: &str) -> f64 {
        if self.lookup(source).is_some() {
            FEED_HIT_RISK
        } else {
            0.0
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
