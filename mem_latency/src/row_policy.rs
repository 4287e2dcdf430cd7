//! DRAM row-buffer policy probe.
//!
//! Per iteration: evict row 1 and time a first 8-byte read; immediately time
//! a second read of the same address with no eviction in between; evict
//! row 2 and time a read there as the different-row baseline. The ratio of
//! the first-access mean to the second-access mean tells whether the memory
//! controller left the row open.

use crate::stats::SummaryStatistics;
use crate::HarnessError;
use std::fmt;
use timing_utils::alloc::AlignedBuffer;
use timing_utils::source::TimingSource;

/// Typical DRAM row size.
pub const DEFAULT_ROW_SIZE: usize = 8 * 1024;
pub const DEFAULT_ITERATIONS: usize = 100_000;
/// Calibration constant separating genuine row-hit speedups from cache/TLB
/// noise; a heuristic, so it stays configurable.
pub const DEFAULT_OPEN_ROW_THRESHOLD: f64 = 1.5;

const ROW1_FILL: u8 = 0x5A;
const ROW2_FILL: u8 = 0xA5;

#[derive(Debug, Clone, Copy)]
pub struct RowPolicyConfig {
    pub row_size: usize,
    pub iterations: usize,
    pub open_row_threshold: f64,
}

impl Default for RowPolicyConfig {
    fn default() -> RowPolicyConfig {
        RowPolicyConfig {
            row_size: DEFAULT_ROW_SIZE,
            iterations: DEFAULT_ITERATIONS,
            open_row_threshold: DEFAULT_OPEN_ROW_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPolicy {
    Open,
    Closed,
}

impl fmt::Display for RowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowPolicy::Open => write!(f, "OPEN-ROW"),
            RowPolicy::Closed => write!(f, "CLOSED-ROW"),
        }
    }
}

/// Pure classification over the two means. Strict comparison: a ratio of
/// exactly the threshold stays closed.
pub fn classify(mean_first: f64, mean_second: f64, threshold: f64) -> RowPolicy {
    if mean_first / mean_second > threshold {
        RowPolicy::Open
    } else {
        RowPolicy::Closed
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RowPolicyReport {
    pub first: SummaryStatistics,
    pub second: SummaryStatistics,
    pub different_row: SummaryStatistics,
    pub speedup_ratio: f64,
    pub policy: RowPolicy,
}

impl fmt::Display for RowPolicyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "first access to row:       {}", self.first)?;
        writeln!(f, "second access to same row: {}", self.second)?;
        writeln!(f, "access to different row:   {}", self.different_row)?;
        writeln!(
            f,
            "speedup ratio (first/second): {:.2}x",
            self.speedup_ratio
        )?;
        write!(f, "DRAM uses {} policy", self.policy)
    }
}

pub struct RowPolicyProbe<'a, T: TimingSource> {
    source: &'a mut T,
    config: RowPolicyConfig,
}

impl<'a, T: TimingSource> RowPolicyProbe<'a, T> {
    pub fn new(source: &'a mut T, config: RowPolicyConfig) -> RowPolicyProbe<'a, T> {
        RowPolicyProbe { source, config }
    }

    pub fn run(&mut self) -> Result<RowPolicyReport, HarnessError> {
        let config = self.config;
        let row1 = AlignedBuffer::new(config.row_size, ROW1_FILL)?;
        let row2 = AlignedBuffer::new(config.row_size, ROW2_FILL)?;
        let target1 = row1.ptr() as *const u64;
        let target2 = row2.ptr() as *const u64;

        let mut first: Vec<u64> = Vec::with_capacity(config.iterations);
        let mut second: Vec<u64> = Vec::with_capacity(config.iterations);
        let mut different_row: Vec<u64> = Vec::with_capacity(config.iterations);

        for _ in 0..config.iterations {
            unsafe { self.source.evict_region(row1.ptr(), config.row_size) };

            let start = self.source.counter_start();
            unsafe { self.source.read_once(target1) };
            let end = self.source.counter_end();
            first.push(end - start);

            // No eviction in between: whatever residual state the first
            // access left behind is exactly what this measures.
            let start = self.source.counter_start();
            unsafe { self.source.read_once(target1) };
            let end = self.source.counter_end();
            second.push(end - start);

            unsafe { self.source.evict_region(row2.ptr(), config.row_size) };

            let start = self.source.counter_start();
            unsafe { self.source.read_once(target2) };
            let end = self.source.counter_end();
            different_row.push(end - start);
        }

        let first = SummaryStatistics::from_samples(&first).ok_or(HarnessError::EmptySeries)?;
        let second = SummaryStatistics::from_samples(&second).ok_or(HarnessError::EmptySeries)?;
        let different_row =
            SummaryStatistics::from_samples(&different_row).ok_or(HarnessError::EmptySeries)?;

        let speedup_ratio = first.mean / second.mean;
        let policy = classify(first.mean, second.mean, config.open_row_threshold);

        Ok(RowPolicyReport {
            first,
            second,
            different_row,
            speedup_ratio,
            policy,
        })
    }
}
