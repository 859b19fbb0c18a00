use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::field::fingerprint::FieldFingerprint;
use crate::guidance::guidance_model::GuidanceRecord;

#[derive(Debug, Clone)]
struct CacheEntry {
    record: GuidanceRecord,
    inserted_at: Instant,
}

/// Fingerprint → record map with optional expiry and capacity.
///
/// With neither `ttl` nor `max_entries` set, entries live as long as the
/// cache itself.
#[derive(Debug, Default)]
pub struct GuidanceCache {
    entries: HashMap<FieldFingerprint, CacheEntry>,
    ttl: Option<Duration>,
    max_entries: Option<usize>,
}

impl GuidanceCache {
    pub fn new(ttl: Option<Duration>, max_entries: Option<usize>) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            max_entries,
        }
    }

    /// Look up a record, dropping it first if it has expired.
    pub fn get(&mut self, fingerprint: &FieldFingerprint) -> Option<GuidanceRecord> {
        if let (Some(ttl), Some(entry)) = (self.ttl, self.entries.get(fingerprint)) {
            if entry.inserted_at.elapsed() >= ttl {
                self.entries.remove(fingerprint);
                return None;
            }
        }
        self.entries.get(fingerprint).map(|e| e.record.clone())
    }

    pub fn contains(&mut self, fingerprint: &FieldFingerprint) -> bool {
        self.get(fingerprint).is_some()
    }

    /// Stored records are immutable: a second insert for a live key is ignored.
    pub fn insert(&mut self, fingerprint: FieldFingerprint, record: GuidanceRecord) {
        if self.contains(&fingerprint) {
            return;
        }

        if let Some(max) = self.max_entries {
            if max == 0 {
                return;
            }
            while self.entries.len() >= max {
                self.evict_oldest();
            }
        }

        self.entries.insert(
            fingerprint,
            CacheEntry {
                record,
                inserted_at: Instant::now(),
            },
        );
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.inserted_at)
            .map(|(k, _)| k.clone());

        if let Some(key) = oldest {
            tracing::debug!(fingerprint = %key, "evicting cached guidance");
            self.entries.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
