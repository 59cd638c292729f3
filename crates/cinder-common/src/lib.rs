//! # cinder-common
//!
//! Common types, errors, and configuration for the Cinder benchmark harness.
//!
//! This crate provides the foundational pieces shared across all Cinder
//! components:
//!
//! - **Errors**: Unified error handling with `HarnessError`
//! - **Config**: Harness configuration structures
//! - **Topology**: The NUMA-ordered CPU topology table
//! - **Constants**: System-wide constants and limits
//!
//! ## Example
//!
//! ```rust
//! use cinder_common::{CpuTopology, HarnessConfig, HarnessResult};
//!
//! fn example() -> HarnessResult<()> {
//!     let config = HarnessConfig::for_testing();
//!     let core = config.topology.core(0)?;
//!     assert_eq!(core, 0);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod constants;
pub mod error;
pub mod topology;

// Re-export commonly used items at the crate root
pub use config::HarnessConfig;
pub use constants::*;
pub use error::{HarnessError, HarnessResult};
pub use topology::CpuTopology;
