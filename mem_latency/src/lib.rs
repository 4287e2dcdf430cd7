//! Cycle-accurate memory-hierarchy latency measurement.
//!
//! Two engines share the [`timing_utils::source::TimingSource`] primitives:
//! [`sweep::SizeSweepProfiler`] times cold-cache block copies across
//! power-of-two working-set sizes, and [`row_policy::RowPolicyProbe`] infers
//! the DRAM controller's row-buffer policy from the latency delta between a
//! first and an immediate second access to the same row.

pub mod export;
pub mod row_policy;
pub mod stats;
pub mod sweep;

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Terminal setup failures. There is no retryable category: every failure
/// here is a local resource-acquisition problem that makes the run unusable.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("buffer allocation failed: {0}")]
    Allocation(#[from] timing_utils::alloc::AllocationError),
    #[error("artifact {} could not be written: {source}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no samples recorded: the configured trial count is zero")]
    EmptySeries,
}
