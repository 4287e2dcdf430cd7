//! Size-sweep latency profiler.
//!
//! For each power-of-two working-set size, allocates two cache-line-aligned
//! buffers, warms them up, then repeatedly evicts both and times a single
//! full-size block copy under cold-cache conditions. Raw per-trial cycle
//! counts go to a CSV artifact; a summary line goes to stdout.

use crate::export;
use crate::stats::SummaryStatistics;
use crate::HarnessError;
use std::path::PathBuf;
use timing_utils::alloc::AlignedBuffer;
use timing_utils::source::TimingSource;

/// Exponents of the predefined sweep: 64 B up to 64 KiB at every power of
/// two, then 1 MiB and 2 MiB to land well past the last cache level.
pub const SWEEP_EXPONENTS: [u32; 13] = [6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 20, 21];

const WARMUP_COPIES: usize = 5;
const SOURCE_FILL: u8 = 0x5A;
const DESTINATION_FILL: u8 = 0xA5;

/// Trial counts are tiered down as sizes grow, bounding total wall-clock
/// cost while keeping statistical power where copies are cheap.
pub fn default_trials(size: usize) -> usize {
    if size <= 4096 {
        200_000
    } else if size <= 65_536 {
        50_000
    } else if size <= 262_144 {
        20_000
    } else if size <= 1_048_576 {
        8_000
    } else {
        2_000
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeConfiguration {
    pub exponent: u32,
    pub size: usize,
    pub trials: usize,
}

impl SizeConfiguration {
    pub fn new(exponent: u32) -> SizeConfiguration {
        let size = 1usize << exponent;
        SizeConfiguration {
            exponent,
            size,
            trials: default_trials(size),
        }
    }

    pub fn with_trials(exponent: u32, trials: usize) -> SizeConfiguration {
        SizeConfiguration {
            trials,
            ..SizeConfiguration::new(exponent)
        }
    }
}

/// Resolves an optional selector to the configurations to run: a selector
/// matching one of [`SWEEP_EXPONENTS`] restricts the sweep to that single
/// size, anything else (including `None`) runs the full sweep.
pub fn sweep_configurations(selector: Option<u32>) -> Vec<SizeConfiguration> {
    sweep_configurations_with(selector, SizeConfiguration::new)
}

/// Same selection rule with a caller-chosen constructor, so tests can swap
/// in small trial counts without touching the selection logic.
pub fn sweep_configurations_with(
    selector: Option<u32>,
    make: impl Fn(u32) -> SizeConfiguration,
) -> Vec<SizeConfiguration> {
    if let Some(exponent) = selector {
        if SWEEP_EXPONENTS.contains(&exponent) {
            return vec![make(exponent)];
        }
    }
    SWEEP_EXPONENTS.iter().map(|&exponent| make(exponent)).collect()
}

#[derive(Debug)]
pub struct SweepOutcome {
    pub configuration: SizeConfiguration,
    pub statistics: SummaryStatistics,
    pub artifact: PathBuf,
}

pub struct SizeSweepProfiler<'a, T: TimingSource> {
    source: &'a mut T,
    output_dir: PathBuf,
}

impl<'a, T: TimingSource> SizeSweepProfiler<'a, T> {
    pub fn new(source: &'a mut T, output_dir: impl Into<PathBuf>) -> SizeSweepProfiler<'a, T> {
        SizeSweepProfiler {
            source,
            output_dir: output_dir.into(),
        }
    }

    /// Runs every configuration in order. The first terminal failure aborts
    /// the remaining sizes; there is nothing to salvage from a run whose
    /// environment cannot allocate or export.
    pub fn run(
        &mut self,
        configurations: &[SizeConfiguration],
    ) -> Result<Vec<SweepOutcome>, HarnessError> {
        configurations
            .iter()
            .map(|&configuration| self.run_size(configuration))
            .collect()
    }

    fn run_size(&mut self, configuration: SizeConfiguration) -> Result<SweepOutcome, HarnessError> {
        let size = configuration.size;
        println!(
            "=== Testing 2^{} = {} B, trials={} ===",
            configuration.exponent, size, configuration.trials
        );

        let source_buffer = AlignedBuffer::new(size, SOURCE_FILL)?;
        let mut destination_buffer = AlignedBuffer::new(size, DESTINATION_FILL)?;
        let src = source_buffer.ptr();
        let dst = destination_buffer.ptr_mut();

        let mut series: Vec<u64> = Vec::with_capacity(configuration.trials);

        // Untimed warm-up copies settle page faults and allocator cold-start,
        // then one eviction pass leaves both buffers out of cache before the
        // first trial.
        for _ in 0..WARMUP_COPIES {
            unsafe { self.source.copy_block(src, dst, size) };
        }
        unsafe {
            self.source.evict_region(src, size);
            self.source.evict_region(dst as *const u8, size);
        }

        for _ in 0..configuration.trials {
            // Both regions must be fully evicted (fence included) before the
            // window opens; the window contains only the copy.
            unsafe {
                self.source.evict_region(src, size);
                self.source.evict_region(dst as *const u8, size);
            }
            let start = self.source.counter_start();
            unsafe { self.source.copy_block(src, dst, size) };
            let end = self.source.counter_end();
            series.push(end - start);
        }

        let statistics =
            SummaryStatistics::from_samples(&series).ok_or(HarnessError::EmptySeries)?;
        let artifact = export::write_trial_series(&self.output_dir, configuration, &series)?;
        println!("size={} B: {}", size, statistics);

        Ok(SweepOutcome {
            configuration,
            statistics,
            artifact,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use timing_utils::stub::StubTiming;

    fn tiny(exponent: u32) -> SizeConfiguration {
        SizeConfiguration::with_trials(exponent, 3)
    }

    #[test]
    fn selector_in_the_set_restricts_to_one_size() {
        let configurations = sweep_configurations(Some(10));
        assert_eq!(configurations.len(), 1);
        assert_eq!(configurations[0].size, 1024);
        assert_eq!(configurations[0].trials, 200_000);
    }

    #[test]
    fn selector_outside_the_set_runs_the_full_sweep() {
        let configurations = sweep_configurations(Some(99));
        assert_eq!(configurations.len(), 13);
        assert_eq!(configurations[0].size, 64);
        assert_eq!(configurations[12].size, 2 << 20);
    }

    #[test]
    fn trial_tiers_match_the_size_classes() {
        assert_eq!(default_trials(64), 200_000);
        assert_eq!(default_trials(4096), 200_000);
        assert_eq!(default_trials(8192), 50_000);
        assert_eq!(default_trials(1 << 16), 50_000);
        assert_eq!(default_trials(1 << 18), 20_000);
        assert_eq!(default_trials(1 << 20), 8_000);
        assert_eq!(default_trials(2 << 20), 2_000);
    }

    #[test]
    fn selected_size_produces_exactly_one_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let mut stub = StubTiming::new(300, 90);
        let mut profiler = SizeSweepProfiler::new(&mut stub, dir.path());

        let outcomes = profiler
            .run(&sweep_configurations_with(Some(10), tiny))
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        let artifacts: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(artifacts.len(), 1);
        assert!(outcomes[0].artifact.ends_with("memcpy_2pow10_1024b.csv"));
    }

    #[test]
    fn unrecognized_selector_produces_thirteen_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let mut stub = StubTiming::new(300, 90);
        let mut profiler = SizeSweepProfiler::new(&mut stub, dir.path());

        let outcomes = profiler
            .run(&sweep_configurations_with(Some(99), tiny))
            .unwrap();

        assert_eq!(outcomes.len(), 13);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 13);
    }

    #[test]
    fn exported_sample_count_equals_the_trial_count() {
        let dir = tempfile::tempdir().unwrap();
        let mut stub = StubTiming::new(300, 90);
        let mut profiler = SizeSweepProfiler::new(&mut stub, dir.path());

        let configuration = SizeConfiguration::with_trials(8, 7);
        let outcomes = profiler.run(&[configuration]).unwrap();

        let contents = fs::read_to_string(&outcomes[0].artifact).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("rep,cycles"));
        assert_eq!(lines.count(), 7);
    }

    #[test]
    fn cold_cache_trials_on_a_deterministic_source_are_uniform() {
        // Every trial evicts both buffers, so every copied line is cold and
        // all samples come out identical: std must be exactly zero.
        let dir = tempfile::tempdir().unwrap();
        let mut stub = StubTiming::new(300, 90);
        let mut profiler = SizeSweepProfiler::new(&mut stub, dir.path());

        let outcomes = profiler
            .run(&[SizeConfiguration::with_trials(7, 10)])
            .unwrap();

        let statistics = outcomes[0].statistics;
        assert_eq!(statistics.std_dev, 0.0);
        assert_eq!(statistics.min, statistics.max);
        // 128 B is two lines in each of the two buffers, all cold.
        assert_eq!(statistics.min, 4 * 300);
    }

    #[test]
    fn identical_configurations_yield_identical_statistics() {
        let dir = tempfile::tempdir().unwrap();
        let configuration = SizeConfiguration::with_trials(9, 5);

        let mut first = StubTiming::new(250, 40);
        let first_stats = SizeSweepProfiler::new(&mut first, dir.path())
            .run(&[configuration])
            .unwrap()[0]
            .statistics;

        let mut second = StubTiming::new(250, 40);
        let second_stats = SizeSweepProfiler::new(&mut second, dir.path())
            .run(&[configuration])
            .unwrap()[0]
            .statistics;

        assert_eq!(first_stats, second_stats);
    }

    #[test]
    fn zero_trials_is_reported_not_panicked() {
        let dir = tempfile::tempdir().unwrap();
        let mut stub = StubTiming::new(300, 90);
        let mut profiler = SizeSweepProfiler::new(&mut stub, dir.path());

        let result = profiler.run(&[SizeConfiguration::with_trials(6, 0)]);
        assert!(matches!(result, Err(HarnessError::EmptySeries)));
    }
}
