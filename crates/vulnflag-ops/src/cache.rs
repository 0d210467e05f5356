//! Per-run memo of analyzer verdicts.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;

use crate::analyzer::ScanOutcome;
use crate::resolve::ResolvedPath;

/// Identifies one physical file within one clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Local clone root.
    pub clone_root: PathBuf,
    /// Normalized forward-slash path relative to the clone root.
    pub relative: String,
}

impl From<&ResolvedPath> for CacheKey {
    fn from(resolved: &ResolvedPath) -> Self {
        Self {
            clone_root: resolved.clone_root.clone(),
            relative: resolved.relative.clone(),
        }
    }
}

/// Verdicts for every file scanned during one run.
///
/// Holds at most one entry per distinct scanned file. Entries are never
/// replaced or evicted; clone contents are assumed not to change mid-run.
#[derive(Debug, Default)]
pub struct ScanCache {
    entries: HashMap<CacheKey, ScanOutcome>,
}

impl ScanCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the stored verdict for `key`, computing it on first use.
    ///
    /// `compute` is only called when the key has no entry yet.
    pub async fn get_or_compute<F, Fut>(&mut self, key: CacheKey, compute: F) -> ScanOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ScanOutcome>,
    {
        if let Some(outcome) = self.entries.get(&key) {
            return outcome.clone();
        }

        let outcome = compute().await;
        self.entries.insert(key, outcome.clone());
        outcome
    }

    /// Stored verdict for `key`, if any.
    pub fn get(&self, key: &CacheKey) -> Option<&ScanOutcome> {
        self.entries.get(key)
    }

    /// Number of distinct files scanned.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been scanned yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all stored verdicts.
    pub fn iter(&self) -> impl Iterator<Item = (&CacheKey, &ScanOutcome)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::UnscannedReason;

    fn key(relative: &str) -> CacheKey {
        CacheKey {
            clone_root: PathBuf::from("repos/o/r"),
            relative: relative.to_string(),
        }
    }

    #[tokio::test]
    async fn test_compute_runs_once_per_key() {
        let mut cache = ScanCache::new();
        let mut calls = 0;

        let first = cache
            .get_or_compute(key("app.py"), || {
                calls += 1;
                async { ScanOutcome::Flagged { findings: 3 } }
            })
            .await;
        let second = cache
            .get_or_compute(key("app.py"), || {
                calls += 1;
                async { ScanOutcome::Clean }
            })
            .await;

        assert_eq!(calls, 1);
        assert_eq!(first, ScanOutcome::Flagged { findings: 3 });
        assert_eq!(second, first);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_are_independent() {
        let mut cache = ScanCache::new();
        cache
            .get_or_compute(key("a.py"), || async { ScanOutcome::Clean })
            .await;
        cache
            .get_or_compute(key("b.py"), || async {
                ScanOutcome::Unknown {
                    reason: UnscannedReason::EmptyOutput,
                }
            })
            .await;

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&key("a.py")), Some(&ScanOutcome::Clean));
        assert!(cache.get(&key("b.py")).unwrap().is_unknown());
        assert!(cache.get(&key("c.py")).is_none());
    }

    #[tokio::test]
    async fn test_unknown_verdicts_are_cached_too() {
        let mut cache = ScanCache::new();
        let mut calls = 0;
        for _ in 0..3 {
            cache
                .get_or_compute(key("broken.py"), || {
                    calls += 1;
                    async {
                        ScanOutcome::Unknown {
                            reason: UnscannedReason::TimedOut { secs: 1 },
                        }
                    }
                })
                .await;
        }
        assert_eq!(calls, 1);
    }
}
