//! Tiered in-memory TTL cache.
//!
//! Three layers with distinct default TTLs (hot 5 min, warm 45 min, cold
//! 24 h) over one key space. Per-key statistics live exactly as long as
//! their entry: expiry, delete, layer invalidation and clear all remove
//! the entry and its statistics in the same critical section, so
//! `|stats| ≤ |entries|` holds at every observable moment. Entry count is
//! unbounded; sizing is an operator concern.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Cache layer tags with their default TTLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheLayer {
    Hot,
    Warm,
    Cold,
}

impl CacheLayer {
    /// TTL applied when `set` does not override it.
    pub fn default_ttl(self) -> Duration {
        match self {
            CacheLayer::Hot => Duration::from_secs(5 * 60),
            CacheLayer::Warm => Duration::from_secs(45 * 60),
            CacheLayer::Cold => Duration::from_secs(24 * 60 * 60),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CacheLayer::Hot => "hot",
            CacheLayer::Warm => "warm",
            CacheLayer::Cold => "cold",
        }
    }

    pub const ALL: [CacheLayer; 3] = [CacheLayer::Hot, CacheLayer::Warm, CacheLayer::Cold];
}

impl std::str::FromStr for CacheLayer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hot" => Ok(CacheLayer::Hot),
            "warm" => Ok(CacheLayer::Warm),
            "cold" => Ok(CacheLayer::Cold),
            other => Err(format!("unknown cache layer: {other}")),
        }
    }
}

struct CacheEntry {
    data: Vec<u8>,
    layer: CacheLayer,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

/// Per-key hit/miss/eviction counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct KeyStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Aggregate counters across the cache lifetime.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateStats {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub evictions: u64,
}

impl AggregateStats {
    /// Hit rate in `[0, 1]`.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// One entry of the debug listing.
#[derive(Debug, Clone, Serialize)]
pub struct EntryDebug {
    pub key: String,
    pub layer: CacheLayer,
    pub age_secs: u64,
    pub ttl_secs: u64,
    pub remaining_secs: u64,
    pub hits: u64,
}

/// Point-in-time snapshot for the stats/debug surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct CacheSnapshot {
    pub total_items: usize,
    pub by_layer: BTreeMap<&'static str, usize>,
    pub totals: AggregateStats,
    pub entries: Vec<EntryDebug>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    key_stats: HashMap<String, KeyStats>,
    totals: AggregateStats,
}

impl CacheState {
    /// Remove an entry and its statistics together.
    fn remove_entry(&mut self, key: &str) -> bool {
        let existed = self.entries.remove(key).is_some();
        self.key_stats.remove(key);
        existed
    }
}

/// The tiered cache. All state sits behind one lock so expiry removes the
/// entry and its statistics atomically from the caller's perspective.
#[derive(Default)]
pub struct TieredCache {
    state: RwLock<CacheState>,
}

impl TieredCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key. Expired entries are removed (entry and statistics)
    /// and accounted as a miss.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        match state.entries.get(key) {
            Some(entry) if entry.is_expired() => {
                if let Some(stats) = state.key_stats.get(key) {
                    debug!(key, hits = stats.hits, "Cache entry expired; dropping statistics");
                }
            }
            Some(entry) => {
                let data = entry.data.clone();
                state.key_stats.entry(key.to_string()).or_default().hits += 1;
                state.totals.hits += 1;
                return Some(data);
            }
            None => {
                state.totals.misses += 1;
                return None;
            }
        }

        // Expired: drop the entry and its statistics in the same critical
        // section and account the lookup as a miss.
        state.remove_entry(key);
        state.totals.misses += 1;
        state.totals.expirations += 1;
        None
    }

    /// Insert a value into a layer. A custom TTL overrides the layer
    /// default. Statistics start at zero for a fresh key.
    pub async fn set(&self, key: &str, value: Vec<u8>, layer: CacheLayer, ttl: Option<Duration>) {
        let mut state = self.state.write().await;
        state.entries.insert(
            key.to_string(),
            CacheEntry {
                data: value,
                layer,
                created_at: Instant::now(),
                ttl: ttl.unwrap_or_else(|| layer.default_ttl()),
            },
        );
        state.key_stats.entry(key.to_string()).or_default();
    }

    /// Delete a key and its statistics. Returns whether the key existed.
    pub async fn delete(&self, key: &str) -> bool {
        self.state.write().await.remove_entry(key)
    }

    /// Remove every entry and every statistics record. Returns the number
    /// of entries removed.
    pub async fn clear(&self) -> usize {
        let mut state = self.state.write().await;
        let count = state.entries.len();
        state.entries.clear();
        state.key_stats.clear();
        count
    }

    /// Remove every entry in one layer. Eviction counters are bumped and
    /// logged before the statistics records are dropped with the entries.
    pub async fn invalidate_layer(&self, layer: CacheLayer) -> usize {
        let mut state = self.state.write().await;
        let keys: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.layer == layer)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            let stats = state.key_stats.entry(key.clone()).or_default();
            stats.evictions += 1;
            debug!(key = %key, layer = layer.as_str(), hits = stats.hits, evictions = stats.evictions, "Evicting cache entry");
            state.remove_entry(key);
        }
        keys.len()
    }

    /// Remove every entry whose key starts with `prefix`.
    pub async fn delete_prefix(&self, prefix: &str) -> usize {
        let mut state = self.state.write().await;
        let keys: Vec<String> = state
            .entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in &keys {
            state.remove_entry(key);
        }
        keys.len()
    }

    /// Per-key statistics; `None` once the entry is gone.
    pub async fn key_stats(&self, key: &str) -> Option<KeyStats> {
        self.state.read().await.key_stats.get(key).cloned()
    }

    /// Aggregate counters.
    pub async fn aggregate(&self) -> AggregateStats {
        self.state.read().await.totals.clone()
    }

    /// Live entry count.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    /// Statistics-record count; bounded by [`TieredCache::len`].
    pub async fn stats_len(&self) -> usize {
        self.state.read().await.key_stats.len()
    }

    /// Full snapshot for the stats/debug endpoints, optionally restricted
    /// to one layer.
    pub async fn snapshot(&self, layer: Option<CacheLayer>) -> CacheSnapshot {
        let state = self.state.read().await;
        let mut by_layer: BTreeMap<&'static str, usize> = BTreeMap::new();
        for l in CacheLayer::ALL {
            by_layer.insert(l.as_str(), 0);
        }
        let mut entries: Vec<EntryDebug> = Vec::new();
        for (key, entry) in &state.entries {
            *by_layer.entry(entry.layer.as_str()).or_default() += 1;
            if layer.is_some_and(|l| l != entry.layer) {
                continue;
            }
            let age = entry.created_at.elapsed();
            entries.push(EntryDebug {
                key: key.clone(),
                layer: entry.layer,
                age_secs: age.as_secs(),
                ttl_secs: entry.ttl.as_secs(),
                remaining_secs: entry.ttl.saturating_sub(age).as_secs(),
                hits: state.key_stats.get(key).map(|s| s.hits).unwrap_or(0),
            });
        }
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        CacheSnapshot {
            total_items: state.entries.len(),
            by_layer,
            totals: state.totals.clone(),
            entries,
        }
    }
}

/// Get a typed value from the cache (deserialize from JSON).
pub async fn cache_get_json<T: serde::de::DeserializeOwned>(
    cache: &TieredCache,
    key: &str,
) -> Option<T> {
    let bytes = cache.get(key).await?;
    serde_json::from_slice(&bytes).ok()
}

/// Set a typed value in the cache (serialize to JSON).
pub async fn cache_set_json<T: Serialize>(
    cache: &TieredCache,
    key: &str,
    value: &T,
    layer: CacheLayer,
    ttl: Option<Duration>,
) -> crate::error::Result<()> {
    let bytes = serde_json::to_vec(value)?;
    cache.set(key, bytes, layer, ttl).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn assert_invariant(cache: &TieredCache) {
        assert!(
            cache.stats_len().await <= cache.len().await,
            "statistics map exceeded entry map"
        );
    }

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let cache = TieredCache::new();
        cache.set("k", b"v".to_vec(), CacheLayer::Warm, None).await;
        assert_eq!(cache.get("k").await, Some(b"v".to_vec()));
        assert_invariant(&cache).await;
    }

    #[tokio::test]
    async fn test_miss_on_absent_key() {
        let cache = TieredCache::new();
        assert_eq!(cache.get("nope").await, None);
        let totals = cache.aggregate().await;
        assert_eq!(totals.misses, 1);
        assert_eq!(cache.stats_len().await, 0);
    }

    #[tokio::test]
    async fn test_expiry_removes_entry_and_stats() {
        let cache = TieredCache::new();
        cache
            .set("k", b"v".to_vec(), CacheLayer::Warm, Some(Duration::from_millis(30)))
            .await;
        assert!(cache.key_stats("k").await.is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(cache.get("k").await, None);
        // Statistics died with the entry.
        assert!(cache.key_stats("k").await.is_none());
        let totals = cache.aggregate().await;
        assert_eq!(totals.misses, 1);
        assert_eq!(totals.expirations, 1);
        assert_invariant(&cache).await;
    }

    #[tokio::test]
    async fn test_custom_ttl_overrides_layer_default() {
        let cache = TieredCache::new();
        cache
            .set("short", b"v".to_vec(), CacheLayer::Cold, Some(Duration::from_millis(20)))
            .await;
        cache.set("long", b"v".to_vec(), CacheLayer::Hot, None).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(cache.get("short").await, None);
        assert_eq!(cache.get("long").await, Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_delete_removes_stats() {
        let cache = TieredCache::new();
        cache.set("k", b"v".to_vec(), CacheLayer::Hot, None).await;
        let _ = cache.get("k").await;
        assert!(cache.delete("k").await);
        assert!(!cache.delete("k").await);
        assert!(cache.key_stats("k").await.is_none());
        assert_invariant(&cache).await;
    }

    #[tokio::test]
    async fn test_hit_counters() {
        let cache = TieredCache::new();
        cache.set("k", b"v".to_vec(), CacheLayer::Hot, None).await;
        let _ = cache.get("k").await;
        let _ = cache.get("k").await;
        let _ = cache.get("absent").await;

        let stats = cache.key_stats("k").await.unwrap();
        assert_eq!(stats.hits, 2);
        let totals = cache.aggregate().await;
        assert_eq!(totals.hits, 2);
        assert_eq!(totals.misses, 1);
        assert!((totals.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_invalidate_layer() {
        let cache = TieredCache::new();
        cache.set("h1", b"v".to_vec(), CacheLayer::Hot, None).await;
        cache.set("h2", b"v".to_vec(), CacheLayer::Hot, None).await;
        cache.set("w1", b"v".to_vec(), CacheLayer::Warm, None).await;

        let removed = cache.invalidate_layer(CacheLayer::Hot).await;
        assert_eq!(removed, 2);
        assert_eq!(cache.get("h1").await, None);
        assert_eq!(cache.get("w1").await, Some(b"v".to_vec()));
        // Stats records for the evicted keys are gone.
        assert!(cache.key_stats("h1").await.is_none());
        assert!(cache.key_stats("h2").await.is_none());
        assert_invariant(&cache).await;
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let cache = TieredCache::new();
        cache.set("a", b"1".to_vec(), CacheLayer::Hot, None).await;
        cache.set("b", b"2".to_vec(), CacheLayer::Cold, None).await;
        assert_eq!(cache.clear().await, 2);
        assert!(cache.is_empty().await);
        assert_eq!(cache.stats_len().await, 0);
    }

    #[tokio::test]
    async fn test_delete_prefix() {
        let cache = TieredCache::new();
        cache.set("dag:a:1", b"v".to_vec(), CacheLayer::Warm, None).await;
        cache.set("dag:a:2", b"v".to_vec(), CacheLayer::Warm, None).await;
        cache.set("dag:b:1", b"v".to_vec(), CacheLayer::Warm, None).await;
        assert_eq!(cache.delete_prefix("dag:a:").await, 2);
        assert_eq!(cache.len().await, 1);
        assert_invariant(&cache).await;
    }

    #[tokio::test]
    async fn test_invariant_over_mixed_operations() {
        let cache = TieredCache::new();
        for i in 0..20 {
            cache
                .set(
                    &format!("k{i}"),
                    vec![i as u8],
                    CacheLayer::ALL[i % 3],
                    if i % 4 == 0 {
                        Some(Duration::from_millis(10))
                    } else {
                        None
                    },
                )
                .await;
            assert_invariant(&cache).await;
        }
        tokio::time::sleep(Duration::from_millis(40)).await;
        for i in 0..20 {
            let _ = cache.get(&format!("k{i}")).await;
            assert_invariant(&cache).await;
        }
        cache.invalidate_layer(CacheLayer::Hot).await;
        assert_invariant(&cache).await;
        cache.delete("k1").await;
        assert_invariant(&cache).await;
        cache.clear().await;
        assert_invariant(&cache).await;
        assert_eq!(cache.stats_len().await, 0);
    }

    #[tokio::test]
    async fn test_snapshot_layers_and_entries() {
        let cache = TieredCache::new();
        cache.set("h", b"v".to_vec(), CacheLayer::Hot, None).await;
        cache.set("w", b"v".to_vec(), CacheLayer::Warm, None).await;
        let _ = cache.get("h").await;

        let snapshot = cache.snapshot(None).await;
        assert_eq!(snapshot.total_items, 2);
        assert_eq!(snapshot.by_layer["hot"], 1);
        assert_eq!(snapshot.by_layer["warm"], 1);
        assert_eq!(snapshot.by_layer["cold"], 0);
        assert_eq!(snapshot.entries.len(), 2);

        let hot_only = cache.snapshot(Some(CacheLayer::Hot)).await;
        assert_eq!(hot_only.entries.len(), 1);
        assert_eq!(hot_only.entries[0].key, "h");
        assert_eq!(hot_only.entries[0].hits, 1);
    }

    #[tokio::test]
    async fn test_json_helpers() {
        #[derive(Debug, PartialEq, Serialize, serde::Deserialize)]
        struct Payload {
            id: String,
            n: u32,
        }
        let cache = TieredCache::new();
        let payload = Payload {
            id: "x".to_string(),
            n: 7,
        };
        cache_set_json(&cache, "p", &payload, CacheLayer::Warm, None)
            .await
            .unwrap();
        let back: Option<Payload> = cache_get_json(&cache, "p").await;
        assert_eq!(back, Some(payload));
    }

    #[tokio::test]
    async fn test_layer_default_ttls() {
        assert_eq!(CacheLayer::Hot.default_ttl().as_secs(), 300);
        assert_eq!(CacheLayer::Warm.default_ttl().as_secs(), 2700);
        assert_eq!(CacheLayer::Cold.default_ttl().as_secs(), 86_400);
    }

    #[tokio::test]
    async fn test_layer_parse() {
        assert_eq!("hot".parse::<CacheLayer>().unwrap(), CacheLayer::Hot);
        assert!("tepid".parse::<CacheLayer>().is_err());
    }
}
