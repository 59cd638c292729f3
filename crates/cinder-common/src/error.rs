//! Error types for the Cinder harness.
//!
//! Errors fall into three classes with different propagation policies:
//!
//! - **Configuration errors** (invalid topology index, bad config values,
//!   directory creation failure): fatal, they indicate harness misuse.
//! - **Resource creation errors** (pool creation, device open/mmap failure):
//!   fatal, the benchmark cannot proceed without the resource.
//! - **Resource teardown errors** (pool removal failure): recoverable,
//!   logged and ignored; an orphaned pool file only affects disk hygiene.
//!
//! Insert/find count mismatches are not errors at all; they are recorded as
//! a metric by the fixture layer.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that can occur in the Cinder harness.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum HarnessError {
    /// Topology index out of range for the configured CPU table.
    #[error("topology index {index} out of range for {len} configured cores")]
    InvalidTopologyIndex { index: usize, len: usize },

    /// Configuration failed validation.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Pool base directory could not be created.
    #[error("could not create pool directory {path}: {source}")]
    DirectoryCreate { path: PathBuf, source: io::Error },

    /// Pool backing file could not be created, sized, or mapped.
    #[error("could not create pool at {path}: {source}")]
    PoolCreate { path: PathBuf, source: io::Error },

    /// Pool backing file could not be removed on teardown.
    #[error("could not remove pool at {path}: {source}")]
    PoolRemove { path: PathBuf, source: io::Error },

    /// Block device could not be opened for zeroing.
    #[error("cannot open device {path}: {source}")]
    DeviceOpen { path: PathBuf, source: io::Error },

    /// Block device could not be memory-mapped.
    #[error("cannot map {len} bytes of {path}: {source}")]
    DeviceMap {
        path: PathBuf,
        len: usize,
        source: io::Error,
    },

    /// Scheduling mask query or update failed.
    #[error("affinity {op} failed: {source}")]
    Affinity { op: &'static str, source: io::Error },

    /// A partitioned worker panicked before completing its range.
    #[error("worker {worker} panicked")]
    WorkerPanic { worker: usize },

    /// The store under test rejected an operation.
    #[error("store operation failed: {message}")]
    Store { message: String },
}

impl HarnessError {
    /// Creates an `InvalidConfig` error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates a `DirectoryCreate` error.
    pub fn directory_create(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            source,
        }
    }

    /// Creates a `PoolCreate` error.
    pub fn pool_create(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::PoolCreate {
            path: path.into(),
            source,
        }
    }

    /// Creates a `PoolRemove` error.
    pub fn pool_remove(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::PoolRemove {
            path: path.into(),
            source,
        }
    }

    /// Creates a `DeviceOpen` error.
    pub fn device_open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::DeviceOpen {
            path: path.into(),
            source,
        }
    }

    /// Creates a `DeviceMap` error.
    pub fn device_map(path: impl Into<PathBuf>, len: usize, source: io::Error) -> Self {
        Self::DeviceMap {
            path: path.into(),
            len,
            source,
        }
    }

    /// Creates an `Affinity` error for the given operation ("get" or "set").
    pub fn affinity(op: &'static str, source: io::Error) -> Self {
        Self::Affinity { op, source }
    }

    /// Creates a `Store` error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Returns true if this error is recoverable (log and continue).
    ///
    /// Only teardown failures qualify; everything else aborts the current
    /// benchmark iteration.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::PoolRemove { .. })
    }

    /// Returns true if this error must abort the benchmark.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::InvalidTopologyIndex { .. }
            | Self::InvalidConfig { .. }
            | Self::DirectoryCreate { .. } => "configuration",
            Self::PoolCreate { .. } | Self::DeviceOpen { .. } | Self::DeviceMap { .. } => {
                "resource-creation"
            }
            Self::PoolRemove { .. } => "resource-teardown",
            Self::Affinity { .. } => "affinity",
            Self::WorkerPanic { .. } | Self::Store { .. } => "workload",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        let err = HarnessError::pool_remove("/tmp/x.pool", io::Error::from(io::ErrorKind::Other));
        assert!(err.is_recoverable());
        assert!(!err.is_fatal());

        let err = HarnessError::pool_create("/tmp/x.pool", io::Error::from(io::ErrorKind::Other));
        assert!(err.is_fatal());

        let err = HarnessError::InvalidTopologyIndex { index: 99, len: 8 };
        assert!(err.is_fatal());
    }

    #[test]
    fn test_categories() {
        let err = HarnessError::invalid_config("workers must be >= 1");
        assert_eq!(err.category(), "configuration");

        let err = HarnessError::device_open("/dev/dax0.0", io::Error::from(io::ErrorKind::Other));
        assert_eq!(err.category(), "resource-creation");

        let err = HarnessError::WorkerPanic { worker: 3 };
        assert_eq!(err.category(), "workload");
    }

    #[test]
    fn test_display_includes_context() {
        let err = HarnessError::InvalidTopologyIndex { index: 72, len: 72 };
        let msg = err.to_string();
        assert!(msg.contains("72"));

        let err = HarnessError::device_map(
            "/dev/dax0.0",
            4096,
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(err.to_string().contains("/dev/dax0.0"));
    }
}
