use crate::nodes::Node;
use ahash::AHashMap;
use log::debug;
use parking_lot::Mutex;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// Parsed asset fragment, shared between the cache and every graft of it.
pub type Fragment = Arc<[Node]>;

/// Cache handle, shareable between scenes.
pub type SharedAssetCache = Arc<Mutex<AssetCache>>;

struct CacheEntry {
    fragment: Fragment,
    last_used: Instant,
}

/// Cache of loaded asset fragments, keyed by URI.
///
/// Entries are touched every time a scene renders a loaded asset node. Entries that haven't been
/// touched for longer than `max_inactive` are dropped on [`AssetCache::evict`].
pub struct AssetCache {
    entries: AHashMap<String, CacheEntry>,
    max_inactive: Duration,
}

impl AssetCache {
    pub fn new(max_inactive: Duration) -> Self {
        Self {
            entries: AHashMap::new(),
            max_inactive,
        }
    }

    pub fn shared(max_inactive: Duration) -> SharedAssetCache {
        Arc::new(Mutex::new(Self::new(max_inactive)))
    }

    pub fn max_inactive(&self) -> Duration {
        self.max_inactive
    }

    /// Returns a cached fragment, marking it as used.
    pub fn get(&mut self, uri: &str, now: Instant) -> Option<Fragment> {
        let entry = self.entries.get_mut(uri)?;
        entry.last_used = now;
        Some(entry.fragment.clone())
    }

    pub fn insert(&mut self, uri: impl Into<String>, fragment: Fragment, now: Instant) {
        self.entries.insert(
            uri.into(),
            CacheEntry {
                fragment,
                last_used: now,
            },
        );
    }

    /// Marks an entry as used, without retrieving it.
    pub fn touch(&mut self, uri: &str, now: Instant) {
        if let Some(entry) = self.entries.get_mut(uri) {
            entry.last_used = now;
        }
    }

    /// Drops entries inactive for longer than `max_inactive`. Returns the amount of dropped
    /// entries.
    pub fn evict(&mut self, now: Instant) -> usize {
        let max_inactive = self.max_inactive;
        let before = self.entries.len();
        self.entries.retain(|uri, entry| {
            let keep = now.saturating_duration_since(entry.last_used) <= max_inactive;
            if !keep {
                debug!("Evicting inactive asset `{uri}`");
            }
            keep
        });
        before - self.entries.len()
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.entries.contains_key(uri)
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

impl Default for AssetCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(crate::config::DEFAULT_CACHE_MAX_INACTIVE_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::params::Sphere;

    fn fragment() -> Fragment {
        Arc::from(vec![Node::sphere(Sphere::default())])
    }

    #[test]
    fn inactive_entries_are_evicted() {
        let start = Instant::now();
        let mut cache = AssetCache::new(Duration::from_secs(10));
        cache.insert("a", fragment(), start);
        cache.insert("b", fragment(), start);

        // `a` keeps being used, `b` doesn't
        cache.touch("a", start + Duration::from_secs(8));
        assert_eq!(cache.evict(start + Duration::from_secs(9)), 0);
        assert!(cache.get("a", start + Duration::from_secs(15)).is_some());

        assert_eq!(cache.evict(start + Duration::from_secs(15)), 1);
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));

        assert_eq!(cache.evict(start + Duration::from_secs(60)), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn fragments_are_shared() {
        let now = Instant::now();
        let mut cache = AssetCache::default();
        let original = fragment();
        cache.insert("a", original.clone(), now);

        let cached = cache.get("a", now).unwrap();
        assert!(Arc::ptr_eq(&original, &cached));
        assert!(cache.get("missing", now).is_none());
    }
}
