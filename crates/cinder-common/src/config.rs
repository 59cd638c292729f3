//! Harness configuration structures.
//!
//! A `HarnessConfig` fixes everything that must not vary between benchmark
//! runs: where pool files live, how large a pool is, how many utility
//! workers drive prefill and zeroing, and the CPU topology workers pin to.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{DEFAULT_POOL_SIZE, DEFAULT_UTIL_WORKERS, MIN_POOL_SIZE, ZERO_CHUNK_SIZE};
use crate::topology::CpuTopology;

/// Main harness configuration.
///
/// # Example
///
/// ```rust
/// use cinder_common::HarnessConfig;
///
/// let config = HarnessConfig::default();
/// assert_eq!(config.util_workers, 8);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Base directory for pool backing files.
    ///
    /// Created on first `acquire()` if absent. Should live on the PMem
    /// mount for meaningful measurements.
    pub pool_dir: PathBuf,

    /// Size of each created pool in bytes.
    /// Default: 4294967296 (4 GB)
    pub pool_size: u64,

    /// Number of utility workers for prefill and device zeroing.
    ///
    /// Fixed at configuration time; each worker pins to its own topology
    /// index, so this must not exceed the topology size.
    /// Default: 8
    pub util_workers: usize,

    /// CPU topology table workers are pinned against.
    pub topology: CpuTopology,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            pool_dir: PathBuf::from("/mnt/pmem0/cinder"),
            pool_size: DEFAULT_POOL_SIZE,
            util_workers: DEFAULT_UTIL_WORKERS,
            topology: CpuTopology::default(),
        }
    }
}

impl HarnessConfig {
    /// Creates a configuration with the specified pool directory.
    #[must_use]
    pub fn with_pool_dir(pool_dir: impl Into<PathBuf>) -> Self {
        Self {
            pool_dir: pool_dir.into(),
            ..Default::default()
        }
    }

    /// Creates a minimal configuration for testing.
    ///
    /// Uses the system temp directory, the smallest valid pool, four
    /// workers, and a trivial four-core topology so tests run on any
    /// machine.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            pool_dir: std::env::temp_dir().join("cinder_test"),
            pool_size: MIN_POOL_SIZE,
            util_workers: 4,
            topology: CpuTopology::identity(4),
        }
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.util_workers == 0 {
            return Err("util_workers must be at least 1".to_string());
        }

        if self.util_workers > self.topology.len() {
            return Err(format!(
                "util_workers ({}) exceeds topology size ({})",
                self.util_workers,
                self.topology.len()
            ));
        }

        if self.pool_size < MIN_POOL_SIZE {
            return Err(format!("pool_size must be at least {MIN_POOL_SIZE} bytes"));
        }

        if self.pool_size % ZERO_CHUNK_SIZE as u64 != 0 {
            return Err(format!(
                "pool_size must be a multiple of {ZERO_CHUNK_SIZE} bytes"
            ));
        }

        Ok(())
    }
}
