//! Parallel block-device zeroing.
//!
//! Before a store takes ownership of a raw DAX device, the harness wipes
//! it so no run observes a predecessor's data. The device is mapped
//! shared-writable and overwritten chunk-by-chunk across a fixed worker
//! count.
//!
//! No flush or sync is performed: durability of the zeroing across a crash
//! is not guaranteed. Callers that need durable zeroing must sync the
//! device themselves.

use std::fs::OpenOptions;
use std::path::Path;
use std::ptr;

use memmap2::MmapOptions;

use cinder_common::{HarnessError, HarnessResult, ZERO_CHUNK_SIZE};

use crate::parallel::run_partitioned;

/// Base address of the mapping, sendable to worker threads.
struct SendPtr(*mut u8);

// SAFETY: workers write through the pointer at pairwise-disjoint offsets
// only, and the mapping outlives every worker (they are joined before the
// mapping is dropped).
unsafe impl Send for SendPtr {}
unsafe impl Sync for SendPtr {}

/// Overwrites the first `length` bytes of the device at `path` with zeros.
///
/// The region is split into `ZERO_CHUNK_SIZE` chunks distributed evenly
/// across `workers` threads. The call blocks until every worker completes;
/// either the whole region is zeroed or the call fails before any write.
///
/// `length` is assumed to be a multiple of the chunk size, and device page
/// alignment is the caller's responsibility.
///
/// # Errors
///
/// Returns `DeviceOpen` if the device cannot be opened read-write, or
/// `DeviceMap` if the mapping fails. Both are fatal; there is no
/// partial-success path.
pub fn zero_device(path: &Path, length: usize, workers: usize) -> HarnessResult<()> {
    debug_assert_eq!(
        length % ZERO_CHUNK_SIZE,
        0,
        "length must be a multiple of the chunk size"
    );

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| HarnessError::device_open(path, e))?;

    // SAFETY: the mapping is private to this call and dropped before the
    // file handle; concurrent external mutation of a raw device being
    // zeroed is outside the harness's contract.
    let mut mmap = unsafe { MmapOptions::new().len(length).map_mut(&file) }
        .map_err(|e| HarnessError::device_map(path, length, e))?;

    let num_chunks = length / ZERO_CHUNK_SIZE;
    let base = SendPtr(mmap.as_mut_ptr());

    run_partitioned(num_chunks, workers, |_worker, chunks| {
        // Capture the whole `SendPtr` (which is Sync), not the raw-pointer
        // field, so disjoint closure capture doesn't require `*mut u8: Sync`.
        let base = &base;
        let offset = chunks.start * ZERO_CHUNK_SIZE;
        let len = chunks.len() * ZERO_CHUNK_SIZE;
        // SAFETY: chunk partitions are pairwise disjoint and lie within the
        // `length`-byte mapping, so concurrent writers never alias.
        unsafe { ptr::write_bytes(base.0.add(offset), 0, len) };
        Ok(())
    })?;

    // Mapping is dropped (unmapped) here; no msync on purpose.
    Ok(())
}
