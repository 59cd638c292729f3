//! Partitioned parallel execution.
//!
//! Both prefill and device zeroing distribute a contiguous index range
//! across a fixed worker count: compute the ranges, spawn one OS thread per
//! non-empty range, join them all, propagate the first failure. The workers
//! operate on disjoint ranges, so no synchronization beyond the final join
//! barrier is needed.
//!
//! Threads are spawned per call and joined before return; there is no
//! persistent pool and no way to cancel an in-flight worker.

use std::ops::Range;
use std::thread;

use cinder_common::{HarnessError, HarnessResult};

/// Splits `[0, total)` into at most `workers` contiguous half-open ranges.
///
/// Chunk size is `ceil(total / workers)`; the last range may be short, and
/// empty ranges are omitted (this happens when `total < workers`). The
/// returned ranges are pairwise disjoint and their union is exactly
/// `[0, total)`.
///
/// # Panics
///
/// Panics if `workers` is 0.
///
/// # Example
///
/// ```rust
/// use cinder_harness::parallel::partition;
///
/// let parts = partition(1000, 4);
/// assert_eq!(parts, vec![0..250, 250..500, 500..750, 750..1000]);
/// assert_eq!(partition(3, 4).len(), 3);
/// ```
#[must_use]
pub fn partition(total: usize, workers: usize) -> Vec<Range<usize>> {
    assert!(workers >= 1, "workers must be at least 1");

    if total == 0 {
        return Vec::new();
    }

    let chunk = total.div_ceil(workers);
    (0..workers)
        .map(|t| t * chunk..((t + 1) * chunk).min(total))
        .filter(|range| !range.is_empty())
        .collect()
}

/// Runs `f` over the partitions of `[0, total)`, one OS thread per
/// non-empty partition.
///
/// `f` receives the worker index (its position in the partition sequence,
/// usable as a topology index) and its half-open range. The call blocks
/// until every worker has completed or failed; the first failure is then
/// propagated. Later partitions are not cancelled by an earlier failure,
/// and completed work is not rolled back.
///
/// `total = 0` returns immediately with no threads spawned.
///
/// # Errors
///
/// Returns the first worker error, or `WorkerPanic` if a worker panicked.
pub fn run_partitioned<T, F>(total: usize, workers: usize, f: F) -> HarnessResult<Vec<T>>
where
    T: Send,
    F: Fn(usize, Range<usize>) -> HarnessResult<T> + Sync,
{
    let parts = partition(total, workers);
    if parts.is_empty() {
        return Ok(Vec::new());
    }

    let results: Vec<HarnessResult<T>> = thread::scope(|scope| {
        let f = &f;
        let handles: Vec<_> = parts
            .into_iter()
            .enumerate()
            .map(|(worker, range)| scope.spawn(move || f(worker, range)))
            .collect();

        handles
            .into_iter()
            .enumerate()
            .map(|(worker, handle)| {
                handle
                    .join()
                    .unwrap_or(Err(HarnessError::WorkerPanic { worker }))
            })
            .collect()
    });

    // All workers have joined; now surface the first failure.
    results.into_iter().collect()
}
