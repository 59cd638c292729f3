//! # cinder-harness
//!
//! NUMA-aware benchmark harness for persistent-memory key-value stores.
//!
//! The harness owns the parts of a PMem benchmark that must be identical
//! across every store under test:
//!
//! - **Affinity**: pinning benchmark threads to a fixed, NUMA-ordered core
//!   table so thread placement never becomes a variable
//! - **Parallel partitioning**: splitting a key range across a fixed worker
//!   count with spawn/join semantics
//! - **Pool lifecycle**: exactly-once creation and teardown of the PMem
//!   pool shared by concurrent benchmark fixtures
//! - **Device zeroing**: wiping a raw DAX block device in parallel before
//!   a store takes ownership of it
//!
//! Stores under test plug in through the [`KvStore`](fixture::KvStore)
//! trait; the benchmark driver calls [`PoolManager`](pool::PoolManager)
//! from its setup/teardown hooks and
//! [`WorkloadHarness::prefill`](fixture::WorkloadHarness::prefill) before
//! measurement phases that need pre-populated state.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod affinity;
pub mod fixture;
pub mod parallel;
pub mod pool;
pub mod zero;

pub use affinity::{AffinityBackend, AffinityController, AffinityGuard, AffinityMask, SchedAffinity};
pub use fixture::{FindStats, KvStore, WorkloadHarness};
pub use parallel::{partition, run_partitioned};
pub use pool::{random_pool_file, PoolHandle, PoolManager};
pub use zero::zero_device;
