//! Query result cache.
//!
//! Results are stored behind [Arc] keyed by [QuerySignature]. Each entry is tagged with the
//! [Section] of its query when it is inserted, which allows whole sections to be invalidated
//! while others are kept.
//!
//! Each signature has its own slot lock, so concurrent requests for the same signature compute
//! the result once. The other requesters wait for that computation and then read the stored
//! result.

use crate::error::AnalysisError;
use crate::metrics::{CACHE_HITS, CACHE_MISSES};
use crate::query::{QuerySignature, Section};

use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

/// Whether a lookup may use the cache.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CachePolicy {
    /// Read a stored result, or compute and store one.
    #[default]
    Use,
    /// Always compute. The cache is neither read nor written.
    Bypass,
}

type Value = Arc<dyn Any + Send + Sync>;

/// A cache entry. The value is `None` until the first computation succeeds.
struct Slot {
    section: Section,
    value: Mutex<Option<Value>>,
}

/// Removes an empty slot from the cache if the computation filling it does not complete.
struct Pending<'a> {
    cache: &'a QueryCache,
    signature: QuerySignature,
    slot: &'a Arc<Slot>,
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        let mut slots = self.cache.slots();
        if slots
            .get(&self.signature)
            .is_some_and(|slot| Arc::ptr_eq(slot, self.slot))
        {
            slots.remove(&self.signature);
        }
    }
}

/// Cache of query results keyed by query signature.
#[derive(Default)]
pub struct QueryCache {
    slots: Mutex<HashMap<QuerySignature, Arc<Slot>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<QuerySignature, Arc<Slot>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the result for a signature, computing and storing it if it is not cached.
    ///
    /// Errors from `compute` are returned unchanged and leave no entry behind.
    ///
    /// # Arguments
    ///
    /// * `signature`: Query and filter identifying the result
    /// * `policy`: Whether the cache may be used
    /// * `compute`: Computes the result on a miss
    pub fn get_or_compute<T, F>(
        &self,
        signature: QuerySignature,
        policy: CachePolicy,
        compute: F,
    ) -> Result<Arc<T>, AnalysisError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T, AnalysisError>,
    {
        if policy == CachePolicy::Bypass {
            debug!(%signature, "query cache bypass");
            return compute().map(Arc::new);
        }

        let section = signature.kind.section();
        loop {
            let slot = Arc::clone(self.slots().entry(signature).or_insert_with(|| {
                Arc::new(Slot {
                    section,
                    value: Mutex::new(None),
                })
            }));
            let mut value = slot.value.lock().unwrap_or_else(PoisonError::into_inner);

            if let Some(value) = value.as_ref() {
                debug!(%signature, "query cache hit");
                CACHE_HITS.with_label_values(&[&section.to_string()]).inc();
                return Arc::clone(value)
                    .downcast::<T>()
                    .map_err(|_| AnalysisError::CacheEntryType {
                        kind: signature.kind,
                    });
            }

            // An empty slot that has left the map was discarded by a failed computation or a clear.
            if !self.holds(&signature, &slot) {
                continue;
            }

            debug!(%signature, "query cache miss");
            CACHE_MISSES.with_label_values(&[&section.to_string()]).inc();
            let pending = Pending {
                cache: self,
                signature,
                slot: &slot,
            };
            let result = Arc::new(compute()?);
            std::mem::forget(pending);
            *value = Some(Arc::clone(&result) as Value);
            return Ok(result);
        }
    }

    /// Returns whether `slot` is the current entry for a signature.
    fn holds(&self, signature: &QuerySignature, slot: &Arc<Slot>) -> bool {
        self.slots()
            .get(signature)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    /// Remove every entry.
    ///
    /// Returns the number of entries removed.
    pub fn clear_all(&self) -> usize {
        let mut slots = self.slots();
        let removed = slots.len();
        slots.clear();
        debug!(removed, "query cache cleared");
        removed
    }

    /// Remove every entry whose section is not in `keep`.
    ///
    /// Returns the number of entries removed.
    pub fn clear_sections(&self, keep: &HashSet<Section>) -> usize {
        let mut slots = self.slots();
        let before = slots.len();
        slots.retain(|_, slot| keep.contains(&slot.section));
        let removed = before - slots.len();
        debug!(?keep, removed, "query cache sections cleared");
        removed
    }

    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots().is_empty()
    }

    pub fn contains(&self, signature: &QuerySignature) -> bool {
        self.slots().contains_key(signature)
    }

    /// Returns the number of entries of every section.
    pub fn section_counts(&self) -> BTreeMap<Section, usize> {
        let mut counts: BTreeMap<Section, usize> =
            Section::ALL.into_iter().map(|section| (section, 0)).collect();
        for slot in self.slots().values() {
            *counts.entry(slot.section).or_default() += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::TripFilter;
    use crate::query::QueryKind;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn signature(kind: QueryKind) -> QuerySignature {
        QuerySignature::new(kind, TripFilter::all())
    }

    #[test]
    fn computes_once() {
        let cache = QueryCache::new();
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1_u64, 2, 3])
        };
        let sig = signature(QueryKind::HourlyPattern);
        let first = cache.get_or_compute(sig, CachePolicy::Use, compute).unwrap();
        let second = cache.get_or_compute(sig, CachePolicy::Use, compute).unwrap();
        assert_eq!(1, calls.load(Ordering::SeqCst));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(1, cache.len());
        assert!(cache.contains(&sig));
    }

    #[test]
    fn filters_are_separate_entries() {
        let cache = QueryCache::new();
        let all = signature(QueryKind::MonthlyTrend);
        let one_year = QuerySignature::new(QueryKind::MonthlyTrend, TripFilter::new(Some(2019), None));
        let a = cache.get_or_compute(all, CachePolicy::Use, || Ok(1_u64)).unwrap();
        let b = cache.get_or_compute(one_year, CachePolicy::Use, || Ok(2_u64)).unwrap();
        assert_eq!((1, 2), (*a, *b));
        assert_eq!(2, cache.len());
    }

    #[test]
    fn bypass_never_touches_cache() {
        let cache = QueryCache::new();
        let calls = AtomicUsize::new(0);
        let compute = || Ok(calls.fetch_add(1, Ordering::SeqCst));
        let sig = signature(QueryKind::RawCount);
        cache.get_or_compute(sig, CachePolicy::Bypass, compute).unwrap();
        assert!(cache.is_empty());

        // A stored result is not returned on bypass either.
        let stored = cache.get_or_compute(sig, CachePolicy::Use, compute).unwrap();
        let bypassed = cache.get_or_compute(sig, CachePolicy::Bypass, compute).unwrap();
        assert_eq!(1, *stored);
        assert_eq!(2, *bypassed);
        assert_eq!(3, calls.load(Ordering::SeqCst));
        assert_eq!(1, cache.len());
    }

    #[test]
    fn failed_compute_leaves_no_entry() {
        let cache = QueryCache::new();
        let sig = signature(QueryKind::FareComposition);
        let result: Result<Arc<u64>, _> = cache.get_or_compute(sig, CachePolicy::Use, || {
            Err(AnalysisError::InvalidYear("1999".to_string()))
        });
        assert!(matches!(result, Err(AnalysisError::InvalidYear(_))));
        assert!(!cache.contains(&sig));
        assert!(cache.is_empty());

        let value = cache.get_or_compute(sig, CachePolicy::Use, || Ok(7_u64)).unwrap();
        assert_eq!(7, *value);
        assert!(cache.contains(&sig));
    }

    #[test]
    fn panicking_compute_leaves_no_entry() {
        let cache = QueryCache::new();
        let sig = signature(QueryKind::TipsByPayment);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            cache.get_or_compute::<u64, _>(sig, CachePolicy::Use, || panic!("compute failed"))
        }));
        assert!(result.is_err());
        assert!(cache.is_empty());
        let value = cache.get_or_compute(sig, CachePolicy::Use, || Ok(3_u64)).unwrap();
        assert_eq!(3, *value);
    }

    #[test]
    fn unexpected_entry_type() {
        let cache = QueryCache::new();
        let sig = signature(QueryKind::PaymentTrend);
        cache.get_or_compute(sig, CachePolicy::Use, || Ok(1_u64)).unwrap();
        let result = cache.get_or_compute(sig, CachePolicy::Use, || Ok("text"));
        assert!(matches!(
            result,
            Err(AnalysisError::CacheEntryType {
                kind: QueryKind::PaymentTrend
            })
        ));
    }

    fn fill_every_section(cache: &QueryCache) {
        for section in Section::ALL {
            let kind = section.queries().next().unwrap();
            cache
                .get_or_compute(signature(kind), CachePolicy::Use, || Ok(kind.as_str()))
                .unwrap();
        }
    }

    #[test]
    fn clear_sections_keeps_requested() {
        let cache = QueryCache::new();
        fill_every_section(&cache);
        assert_eq!(Section::ALL.len(), cache.len());

        let removed = cache.clear_sections(&HashSet::from([Section::Temporal]));
        assert_eq!(Section::ALL.len() - 1, removed);
        assert_eq!(1, cache.len());
        assert!(cache.contains(&signature(QueryKind::HourlyPattern)));
        let counts = cache.section_counts();
        assert_eq!(Some(&1), counts.get(&Section::Temporal));
        assert_eq!(Some(&0), counts.get(&Section::Fare));
    }

    #[test]
    fn clear_sections_keep_nothing() {
        let cache = QueryCache::new();
        fill_every_section(&cache);
        assert_eq!(Section::ALL.len(), cache.clear_sections(&HashSet::new()));
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_all() {
        let cache = QueryCache::new();
        fill_every_section(&cache);
        assert_eq!(Section::ALL.len(), cache.clear_all());
        assert!(cache.is_empty());
        assert!(cache.section_counts().values().all(|count| *count == 0));
    }

    #[test]
    fn concurrent_requests_compute_once() {
        let cache = QueryCache::new();
        let calls = AtomicUsize::new(0);
        let sig = signature(QueryKind::BehaviorChanges);
        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let value = cache
                        .get_or_compute(sig, CachePolicy::Use, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(std::time::Duration::from_millis(20));
                            Ok(42_u64)
                        })
                        .unwrap();
                    assert_eq!(42, *value);
                });
            }
        });
        assert_eq!(1, calls.load(Ordering::SeqCst));
    }

    #[test]
    fn waiters_on_failed_compute_retry() {
        let cache = QueryCache::new();
        let successes = AtomicUsize::new(0);
        let sig = signature(QueryKind::VolumeComparison);
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        thread::scope(|scope| {
            let failing = scope.spawn(|| {
                cache.get_or_compute::<u64, _>(sig, CachePolicy::Use, || {
                    started_tx.send(()).unwrap();
                    thread::sleep(std::time::Duration::from_millis(50));
                    Err(AnalysisError::InvalidMonth("13".to_string()))
                })
            });
            // Queue the waiters behind the failing computation.
            started_rx.recv().unwrap();
            let waiters: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        cache
                            .get_or_compute(sig, CachePolicy::Use, || {
                                successes.fetch_add(1, Ordering::SeqCst);
                                Ok(5_u64)
                            })
                            .unwrap()
                    })
                })
                .collect();
            assert!(failing.join().unwrap().is_err());
            for waiter in waiters {
                assert_eq!(5, *waiter.join().unwrap());
            }
        });
        assert_eq!(1, successes.load(Ordering::SeqCst));
        assert!(cache.contains(&sig));
        let value = cache
            .get_or_compute(sig, CachePolicy::Use, || Ok(6_u64))
            .unwrap();
        assert_eq!(5, *value);
    }
}
