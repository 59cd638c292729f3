//! Benchmark fixture layer.
//!
//! A store under test plugs into the harness through [`KvStore`]; the
//! benchmark driver calls [`WorkloadHarness::prefill`] before measurement
//! phases that need pre-populated state, and [`FindStats`] accounts for
//! entries a measurement phase failed to find (a measurable benchmark
//! outcome, never a harness failure).

use std::sync::atomic::{AtomicU64, Ordering};

use cinder_common::{HarnessConfig, HarnessError, HarnessResult};

use crate::affinity::{AffinityBackend, AffinityController, SchedAffinity};
use crate::parallel::run_partitioned;

/// Contract for a key-value store under test.
///
/// Each operation covers the half-open logical index range
/// `[start_idx, end_idx)` and returns the number of entries affected. The
/// harness invokes these from multiple threads concurrently with disjoint
/// ranges; the store is responsible for its own internal thread-safety.
pub trait KvStore: Send + Sync {
    /// Inserts entries for the given index range.
    fn insert(&self, start_idx: u64, end_idx: u64) -> HarnessResult<u64>;

    /// Looks up entries for the given index range.
    fn find(&self, start_idx: u64, end_idx: u64) -> HarnessResult<u64>;

    /// Updates entries for the given index range.
    fn update(&self, start_idx: u64, end_idx: u64) -> HarnessResult<u64>;

    /// Deletes entries for the given index range.
    fn delete(&self, start_idx: u64, end_idx: u64) -> HarnessResult<u64>;
}

/// Counts entries a find phase reported against what was expected.
///
/// A shortfall is data loss from the benchmark's point of view: it is
/// logged and counted, not escalated, because it is a result to report
/// rather than a harness defect.
#[derive(Debug, Default)]
pub struct FindStats {
    found: AtomicU64,
    missing: AtomicU64,
}

impl FindStats {
    /// Creates an empty counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of one find phase.
    pub fn record(&self, found: u64, expected: u64) {
        self.found.fetch_add(found, Ordering::Relaxed);
        if found != expected {
            self.missing
                .fetch_add(expected.saturating_sub(found), Ordering::Relaxed);
            tracing::warn!("did not find all entries ({found}/{expected})");
        }
    }

    /// Total entries found across recorded phases.
    #[must_use]
    pub fn found(&self) -> u64 {
        self.found.load(Ordering::Relaxed)
    }

    /// Total entries expected but not found.
    #[must_use]
    pub fn missing(&self) -> u64 {
        self.missing.load(Ordering::Relaxed)
    }
}

/// Drives partitioned, affinity-pinned workloads against a store.
///
/// # Example
///
/// ```rust,no_run
/// use cinder_common::HarnessConfig;
/// use cinder_harness::fixture::WorkloadHarness;
/// # use cinder_harness::fixture::KvStore;
/// # use cinder_common::HarnessResult;
/// # struct NullStore;
/// # impl KvStore for NullStore {
/// #     fn insert(&self, s: u64, e: u64) -> HarnessResult<u64> { Ok(e - s) }
/// #     fn find(&self, s: u64, e: u64) -> HarnessResult<u64> { Ok(e - s) }
/// #     fn update(&self, s: u64, e: u64) -> HarnessResult<u64> { Ok(e - s) }
/// #     fn delete(&self, s: u64, e: u64) -> HarnessResult<u64> { Ok(e - s) }
/// # }
///
/// let harness = WorkloadHarness::new(&HarnessConfig::for_testing())?;
/// let inserted = harness.prefill(&NullStore, 1000)?;
/// assert_eq!(inserted, 1000);
/// # Ok::<(), cinder_common::HarnessError>(())
/// ```
#[derive(Debug)]
pub struct WorkloadHarness<B: AffinityBackend = SchedAffinity> {
    affinity: AffinityController<B>,
    workers: usize,
}

impl WorkloadHarness<SchedAffinity> {
    /// Creates a harness from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration fails validation.
    pub fn new(config: &HarnessConfig) -> HarnessResult<Self> {
        config.validate().map_err(HarnessError::invalid_config)?;
        Ok(Self {
            affinity: AffinityController::new(config.topology.clone()),
            workers: config.util_workers,
        })
    }
}

impl<B: AffinityBackend> WorkloadHarness<B> {
    /// Creates a harness over an explicit affinity controller.
    #[must_use]
    pub fn with_affinity(affinity: AffinityController<B>, workers: usize) -> Self {
        Self { affinity, workers }
    }

    /// Returns the affinity controller used for worker pinning.
    #[must_use]
    pub fn affinity(&self) -> &AffinityController<B> {
        &self.affinity
    }

    /// Inserts `num_prefills` entries into the store, partitioned across
    /// the configured workers.
    ///
    /// The calling thread's affinity is captured first and restored when
    /// the call returns, so prefill never leaks thread placement into the
    /// measurement phases that follow. Each worker pins itself to its own
    /// topology index before inserting its disjoint sub-range.
    ///
    /// Returns the total number of entries the store reported inserted.
    /// `prefill(0)` performs no work and spawns no threads.
    ///
    /// # Errors
    ///
    /// A worker's insertion failure propagates once all workers have been
    /// joined; partial inserts from other workers are not rolled back
    /// (prefill is not transactional).
    pub fn prefill<S: KvStore>(&self, store: &S, num_prefills: usize) -> HarnessResult<u64> {
        let _restore = self.affinity.snapshot()?;
        self.affinity.pin_all();

        let counts = run_partitioned(num_prefills, self.workers, |worker, range| {
            self.affinity.pin_index(worker)?;
            store.insert(range.start as u64, range.end as u64)
        })?;

        Ok(counts.into_iter().sum())
    }
}
