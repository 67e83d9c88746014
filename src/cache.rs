//! Two-tier resolution: an optional cache in front of an authoritative source.
//!
//! [`CacheOrchestrator::resolve_batch`] is shared by label lookups and by
//! translation/detection. It reads every requested key from the cache in one
//! call, asks the authoritative source only for the misses, merges the two
//! and writes the freshly fetched values back.

use crate::error::{BoxError, Error, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Prefix shared by every cache key this crate builds.
pub const KEY_PREFIX: &str = "locale-kit";

/// Key/value store used as the fast tier.
///
/// Keys are plain strings; callers are responsible for namespacing them.
/// A backend may return `None` (or leave a key out) for entries it does not
/// hold.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Whether the backend can currently serve requests.
    fn is_ready(&self) -> bool {
        true
    }

    async fn pull_multi(
        &self,
        keys: &[String],
    ) -> std::result::Result<HashMap<String, Option<String>>, BoxError>;

    async fn push_multi(
        &self,
        entries: HashMap<String, String>,
    ) -> std::result::Result<(), BoxError>;

    /// Remove every entry under this backend's namespace.
    async fn invalidate(&self) -> std::result::Result<(), BoxError>;
}

/// Outcome of a cache read for one requested key.
///
/// A key that was not requested never appears at all, so a cached empty
/// string (`Present("")`) is never confused with a miss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedValue {
    Present(String),
    Absent,
}

impl From<Option<String>> for CachedValue {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(value) => CachedValue::Present(value),
            None => CachedValue::Absent,
        }
    }
}

/// SHA-256 hex digest used to turn free text into a fixed-size key segment.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Runs the cache-then-source pipeline for one batch of keys.
pub struct CacheOrchestrator<'a> {
    backend: Option<&'a dyn CacheBackend>,
}

impl<'a> CacheOrchestrator<'a> {
    pub fn new(backend: Option<&'a dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// An orchestrator that always goes straight to the source.
    pub fn disabled() -> Self {
        Self { backend: None }
    }

    /// Resolve `keys`, each a `(logical cache key, item)` pair.
    ///
    /// `fetch_missing` receives only the items whose key missed the cache
    /// (all items when caching is off) and returns the values it could
    /// resolve. The result maps every resolved item to its value; items that
    /// neither the cache nor the source could resolve are left out.
    ///
    /// A failed write-back fails the whole call with [`Error::CacheWrite`],
    /// even though the fetched values were already correct.
    pub async fn resolve_batch<T, F, Fut>(
        &self,
        keys: Vec<(String, T)>,
        fetch_missing: F,
    ) -> Result<HashMap<T, String>>
    where
        T: Eq + Hash + Clone,
        F: FnOnce(Vec<T>) -> Fut,
        Fut: Future<Output = Result<HashMap<T, String>>>,
    {
        let mut seen = HashSet::new();
        let keys: Vec<(String, T)> = keys
            .into_iter()
            .filter(|(key, _)| seen.insert(key.clone()))
            .collect();

        let Some(backend) = self.backend else {
            let items: Vec<T> = keys.iter().map(|(_, item)| item.clone()).collect();
            let fetched = fetch_missing(items).await?;
            return Ok(retain_requested(fetched, keys.iter().map(|(_, item)| item)));
        };

        let logical: Vec<String> = keys.iter().map(|(key, _)| key.clone()).collect();
        let mut cached = backend.pull_multi(&logical).await.map_err(Error::CacheRead)?;

        let mut data = HashMap::with_capacity(keys.len());
        let mut misses: Vec<(String, T)> = Vec::new();
        for (key, item) in keys {
            match CachedValue::from(cached.remove(&key).flatten()) {
                CachedValue::Present(value) => {
                    data.insert(item, value);
                }
                CachedValue::Absent => misses.push((key, item)),
            }
        }

        debug!("Cache lookup: {} hits, {} misses", data.len(), misses.len());

        if misses.is_empty() {
            return Ok(data);
        }

        let fetched = fetch_missing(misses.iter().map(|(_, item)| item.clone()).collect()).await?;

        let mut write_back = HashMap::new();
        for (key, item) in misses {
            if let Some(value) = fetched.get(&item) {
                write_back.insert(key, value.clone());
                data.insert(item, value.clone());
            }
        }

        if write_back.is_empty() {
            return Ok(data);
        }

        let written = write_back.len();
        if let Err(err) = backend.push_multi(write_back).await {
            warn!(
                "Cache write-back failed, discarding {} freshly fetched values: {}",
                written, err
            );
            return Err(Error::CacheWrite(err));
        }
        debug!("Wrote {} entries back to the cache", written);

        Ok(data)
    }
}

fn retain_requested<'k, T>(
    mut fetched: HashMap<T, String>,
    requested: impl Iterator<Item = &'k T>,
) -> HashMap<T, String>
where
    T: Eq + Hash + 'k,
{
    let mut data = HashMap::new();
    for item in requested {
        if let Some((item, value)) = fetched.remove_entry(item) {
            data.insert(item, value);
        }
    }
    data
}

/// In-process [`CacheBackend`] backed by a shared `HashMap`.
///
/// Keys are stored as `<namespace>:<key>`. Clones and [`MemoryCache::namespaced`]
/// views share the same storage; `invalidate` clears only the caller's
/// namespace. No eviction.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    namespace: String,
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryCache {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// A view over the same storage under another namespace.
    pub fn namespaced(&self, namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: Arc::clone(&self.entries),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Number of entries under this namespace.
    pub fn len(&self) -> usize {
        let prefix = self.prefix();
        self.entries
            .lock()
            .map(|entries| entries.keys().filter(|k| k.starts_with(&prefix)).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prefix(&self) -> String {
        format!("{}:", self.namespace)
    }

    fn lock(&self) -> std::result::Result<std::sync::MutexGuard<'_, HashMap<String, String>>, BoxError> {
        self.entries
            .lock()
            .map_err(|_| BoxError::from("memory cache lock poisoned"))
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn pull_multi(
        &self,
        keys: &[String],
    ) -> std::result::Result<HashMap<String, Option<String>>, BoxError> {
        let prefix = self.prefix();
        let entries = self.lock()?;
        Ok(keys
            .iter()
            .map(|key| (key.clone(), entries.get(&format!("{prefix}{key}")).cloned()))
            .collect())
    }

    async fn push_multi(
        &self,
        values: HashMap<String, String>,
    ) -> std::result::Result<(), BoxError> {
        let prefix = self.prefix();
        let mut entries = self.lock()?;
        for (key, value) in values {
            entries.insert(format!("{prefix}{key}"), value);
        }
        Ok(())
    }

    async fn invalidate(&self) -> std::result::Result<(), BoxError> {
        let prefix = self.prefix();
        self.lock()?.retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::FailingCache;
    use super::*;
    use proptest::prelude::*;

    fn key(item: &str) -> (String, String) {
        (format!("test:{item}"), item.to_string())
    }

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Runs `resolve_batch` against `source`, recording every miss set.
    async fn resolve_recording(
        orchestrator: &CacheOrchestrator<'_>,
        keys: Vec<(String, String)>,
        source: &HashMap<String, String>,
        calls: &Mutex<Vec<Vec<String>>>,
    ) -> Result<HashMap<String, String>> {
        orchestrator
            .resolve_batch(keys, |missing: Vec<String>| async move {
                calls.lock().unwrap().push(missing.clone());
                Ok(missing
                    .into_iter()
                    .filter_map(|item| source.get(&item).map(|v| (item, v.clone())))
                    .collect())
            })
            .await
    }

    // ==================== Content Hash Tests ====================

    #[test]
    fn test_content_hash_is_stable_hex() {
        let hash = content_hash("Hello world!");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, content_hash("Hello world!"));
        assert_ne!(hash, content_hash("Hello world"));
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    // ==================== Disabled Cache Tests ====================

    #[tokio::test]
    async fn test_disabled_fetches_everything() {
        let orchestrator = CacheOrchestrator::disabled();
        let calls = Mutex::new(Vec::new());
        let source = source(&[("a", "A"), ("b", "B")]);

        let result = resolve_recording(&orchestrator, vec![key("a"), key("b"), key("a")], &source, &calls)
            .await
            .expect("Should succeed");

        assert_eq!(result.len(), 2);
        assert_eq!(result["a"], "A");
        let calls = calls.into_inner().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_disabled_drops_unrequested_values() {
        let orchestrator = CacheOrchestrator::disabled();
        let result = orchestrator
            .resolve_batch(vec![key("a")], |_missing: Vec<String>| async {
                Ok(source(&[("a", "A"), ("zzz", "extra")]))
            })
            .await
            .expect("Should succeed");

        assert_eq!(result.len(), 1);
        assert!(!result.contains_key("zzz"));
    }

    // ==================== Partial Hit Tests ====================

    #[tokio::test]
    async fn test_only_misses_are_fetched() {
        let cache = MemoryCache::new("test");
        cache
            .push_multi(source(&[("test:a", "cached A")]))
            .await
            .unwrap();
        let orchestrator = CacheOrchestrator::new(Some(&cache));
        let calls = Mutex::new(Vec::new());
        let source = source(&[("a", "fresh A"), ("b", "B")]);

        let result = resolve_recording(&orchestrator, vec![key("a"), key("b")], &source, &calls)
            .await
            .expect("Should succeed");

        assert_eq!(result["a"], "cached A");
        assert_eq!(result["b"], "B");
        assert_eq!(calls.into_inner().unwrap(), vec![vec!["b".to_string()]]);

        let stored = cache.pull_multi(&["test:b".to_string()]).await.unwrap();
        assert_eq!(stored["test:b"], Some("B".to_string()));
    }

    #[tokio::test]
    async fn test_full_hit_never_calls_source() {
        let cache = MemoryCache::new("test");
        cache
            .push_multi(source(&[("test:a", "A"), ("test:b", "B")]))
            .await
            .unwrap();
        let orchestrator = CacheOrchestrator::new(Some(&cache));
        let calls = Mutex::new(Vec::new());

        let result = resolve_recording(&orchestrator, vec![key("a"), key("b")], &HashMap::new(), &calls)
            .await
            .expect("Should succeed");

        assert_eq!(result.len(), 2);
        assert!(calls.into_inner().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cached_empty_string_is_a_hit() {
        let cache = MemoryCache::new("test");
        cache.push_multi(source(&[("test:a", "")])).await.unwrap();
        let orchestrator = CacheOrchestrator::new(Some(&cache));
        let calls = Mutex::new(Vec::new());

        let result = resolve_recording(&orchestrator, vec![key("a")], &HashMap::new(), &calls)
            .await
            .expect("Should succeed");

        assert_eq!(result["a"], "");
        assert!(calls.into_inner().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unresolved_keys_are_absent() {
        let cache = MemoryCache::new("test");
        let orchestrator = CacheOrchestrator::new(Some(&cache));
        let calls = Mutex::new(Vec::new());
        let source = source(&[("a", "A")]);

        let result = resolve_recording(&orchestrator, vec![key("a"), key("missing")], &source, &calls)
            .await
            .expect("Should succeed");

        assert_eq!(result.len(), 1);
        assert!(!result.contains_key("missing"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_fetched_skips_write() {
        let cache = FailingCache {
            fail_reads: false,
            fail_writes: true,
            inner: MemoryCache::new("test"),
        };
        let orchestrator = CacheOrchestrator::new(Some(&cache));

        let result = orchestrator
            .resolve_batch(vec![key("a")], |_missing: Vec<String>| async {
                Ok(HashMap::new())
            })
            .await
            .expect("No write should be attempted");

        assert!(result.is_empty());
    }

    // ==================== Failure Tests ====================

    #[tokio::test]
    async fn test_read_failure_is_cache_read() {
        let cache = FailingCache {
            fail_reads: true,
            fail_writes: false,
            inner: MemoryCache::new("test"),
        };
        let orchestrator = CacheOrchestrator::new(Some(&cache));

        let result = orchestrator
            .resolve_batch(vec![key("a")], |_missing: Vec<String>| async {
                Ok(source(&[("a", "A")]))
            })
            .await;

        assert!(matches!(result, Err(Error::CacheRead(_))));
    }

    #[tokio::test]
    async fn test_write_failure_is_fatal() {
        let cache = FailingCache {
            fail_reads: false,
            fail_writes: true,
            inner: MemoryCache::new("test"),
        };
        let orchestrator = CacheOrchestrator::new(Some(&cache));

        let result = orchestrator
            .resolve_batch(vec![key("a")], |_missing: Vec<String>| async {
                Ok(source(&[("a", "A")]))
            })
            .await;

        assert!(matches!(result, Err(Error::CacheWrite(_))));
    }

    #[tokio::test]
    async fn test_source_failure_propagates() {
        let cache = MemoryCache::new("test");
        let orchestrator = CacheOrchestrator::new(Some(&cache));

        let result = orchestrator
            .resolve_batch(vec![key("a")], |_missing: Vec<String>| async {
                Err::<HashMap<String, String>, _>(Error::NotBound("no package".to_string()))
            })
            .await;

        assert!(matches!(result, Err(Error::NotBound(_))));
        assert!(cache.is_empty());
    }

    // ==================== MemoryCache Tests ====================

    #[tokio::test]
    async fn test_memory_cache_missing_keys_are_none() {
        let cache = MemoryCache::new("demo");
        let pulled = cache.pull_multi(&["nope".to_string()]).await.unwrap();
        assert_eq!(pulled["nope"], None);
    }

    #[tokio::test]
    async fn test_memory_cache_invalidate_is_namespaced() {
        let demo = MemoryCache::new("demo");
        let other = demo.namespaced("other");
        demo.push_multi(source(&[("k", "v")])).await.unwrap();
        other.push_multi(source(&[("k", "w")])).await.unwrap();

        demo.invalidate().await.unwrap();

        assert!(demo.is_empty());
        assert_eq!(other.len(), 1);
        let pulled = other.pull_multi(&["k".to_string()]).await.unwrap();
        assert_eq!(pulled["k"], Some("w".to_string()));
    }

    #[tokio::test]
    async fn test_memory_cache_clone_shares_storage() {
        let cache = MemoryCache::new("demo");
        let clone = cache.clone();
        clone.push_multi(source(&[("k", "v")])).await.unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.namespace(), "demo");
    }

    // ==================== Property Tests ====================

    proptest! {
        #[test]
        fn prop_misses_are_disjoint_from_hits(
            requested in proptest::collection::vec("[a-e]", 1..8),
            cached in proptest::collection::hash_set("[a-e]", 0..5),
        ) {
            tokio_test::block_on(async {
                let cache = MemoryCache::new("prop");
                let preload = cached
                    .iter()
                    .map(|item| (format!("test:{item}"), format!("cached {item}")))
                    .collect();
                cache.push_multi(preload).await.unwrap();

                let orchestrator = CacheOrchestrator::new(Some(&cache));
                let calls = Mutex::new(Vec::new());
                let source: HashMap<String, String> = requested
                    .iter()
                    .map(|item| (item.clone(), format!("fresh {item}")))
                    .collect();
                let keys = requested.iter().map(|item| key(item)).collect();

                let result = resolve_recording(&orchestrator, keys, &source, &calls)
                    .await
                    .unwrap();

                let distinct: HashSet<&String> = requested.iter().collect();
                assert_eq!(result.len(), distinct.len());

                let calls = calls.into_inner().unwrap();
                let all_hits = distinct.iter().all(|item| cached.contains(*item));
                if all_hits {
                    assert!(calls.is_empty());
                } else {
                    assert_eq!(calls.len(), 1);
                    for item in &calls[0] {
                        assert!(distinct.contains(&item));
                        assert!(!cached.contains(item));
                    }
                }
            });
        }

        #[test]
        fn prop_second_call_is_served_from_cache(
            requested in proptest::collection::vec("[a-h]", 1..10),
        ) {
            tokio_test::block_on(async {
                let cache = MemoryCache::new("prop");
                let orchestrator = CacheOrchestrator::new(Some(&cache));
                let source: HashMap<String, String> = requested
                    .iter()
                    .filter(|item| item.as_str() != "h")
                    .map(|item| (item.clone(), item.to_uppercase()))
                    .collect();
                let keys: Vec<_> = requested.iter().map(|item| key(item)).collect();

                let first_calls = Mutex::new(Vec::new());
                let first = resolve_recording(&orchestrator, keys.clone(), &source, &first_calls)
                    .await
                    .unwrap();
                let second_calls = Mutex::new(Vec::new());
                let second = resolve_recording(&orchestrator, keys, &source, &second_calls)
                    .await
                    .unwrap();

                assert_eq!(first, second);
                let unresolved: HashSet<String> = requested
                    .iter()
                    .filter(|item| !source.contains_key(*item))
                    .cloned()
                    .collect();
                for call in second_calls.into_inner().unwrap() {
                    let call: HashSet<String> = call.into_iter().collect();
                    assert_eq!(call, unresolved);
                }
            });
        }
    }
}
