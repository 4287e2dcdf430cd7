//! Summary reduction over a trial series.

use itertools::Itertools;
use itertools::MinMaxResult;
use std::fmt;

/// Pure reduction of one trial series. Recomputable from the raw samples at
/// any time; never mutated once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryStatistics {
    pub mean: f64,
    pub std_dev: f64,
    pub median: u64,
    pub min: u64,
    pub max: u64,
}

impl SummaryStatistics {
    /// Returns `None` for an empty series.
    ///
    /// The mean comes from an exact u128 integer sum, and the variance from a
    /// second pass over deviations, so millions of large cycle counts do not
    /// lose precision to cancellation. Population variance, matching the
    /// per-trial export (the series is the whole population of the run).
    pub fn from_samples(samples: &[u64]) -> Option<SummaryStatistics> {
        let (min, max) = match samples.iter().minmax() {
            MinMaxResult::NoElements => return None,
            MinMaxResult::OneElement(&only) => (only, only),
            MinMaxResult::MinMax(&lo, &hi) => (lo, hi),
        };

        let count = samples.len() as f64;
        let sum: u128 = samples.iter().map(|&sample| sample as u128).sum();
        let mean = sum as f64 / count;

        let squared_deviations: f64 = samples
            .iter()
            .map(|&sample| {
                let deviation = sample as f64 - mean;
                deviation * deviation
            })
            .sum();
        let std_dev = (squared_deviations / count).sqrt();

        let mut sorted = samples.to_vec();
        sorted.sort_unstable();
        let median = sorted[sorted.len() / 2];

        Some(SummaryStatistics {
            mean,
            std_dev,
            median,
            min,
            max,
        })
    }
}

impl fmt::Display for SummaryStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mean={:.2} cycles, median={}, std={:.2}, min={}, max={}",
            self.mean, self.median, self.std_dev, self.min, self.max
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_series_has_no_statistics() {
        assert_eq!(SummaryStatistics::from_samples(&[]), None);
    }

    #[test]
    fn single_sample_series() {
        let stats = SummaryStatistics::from_samples(&[42]).unwrap();
        assert_eq!(stats.min, 42);
        assert_eq!(stats.max, 42);
        assert_eq!(stats.median, 42);
        assert_eq!(stats.mean, 42.0);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn ordering_invariants_hold_for_varied_series() {
        let series: [&[u64]; 4] = [
            &[1, 2, 3, 4, 5],
            &[100, 100, 100, 5000],
            &[7],
            &[9, 1, 8, 2, 7, 3, 6, 4, 5, 1_000_000],
        ];
        for samples in series {
            let stats = SummaryStatistics::from_samples(samples).unwrap();
            assert!(stats.min <= stats.median, "min <= median for {samples:?}");
            assert!(stats.median <= stats.max, "median <= max for {samples:?}");
            assert!(stats.min as f64 <= stats.mean, "min <= mean for {samples:?}");
            assert!(stats.mean <= stats.max as f64, "mean <= max for {samples:?}");
            assert!(stats.std_dev >= 0.0);
        }
    }

    #[test]
    fn std_dev_is_zero_exactly_when_all_samples_are_equal() {
        let constant = vec![317u64; 1000];
        let stats = SummaryStatistics::from_samples(&constant).unwrap();
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.mean, 317.0);

        let mut perturbed = constant;
        perturbed[500] = 318;
        let stats = SummaryStatistics::from_samples(&perturbed).unwrap();
        assert!(stats.std_dev > 0.0);
    }

    #[test]
    fn large_counts_do_not_lose_the_integer_sum() {
        // Two samples near u64::MAX would overflow a u64 accumulator.
        let samples = [u64::MAX - 1, u64::MAX - 3];
        let stats = SummaryStatistics::from_samples(&samples).unwrap();
        assert_eq!(stats.mean, (u64::MAX - 2) as f64);
    }

    #[test]
    fn median_takes_the_upper_middle_sample() {
        let stats = SummaryStatistics::from_samples(&[1, 2, 3, 4]).unwrap();
        assert_eq!(stats.median, 3);
        let stats = SummaryStatistics::from_samples(&[5, 1, 3]).unwrap();
        assert_eq!(stats.median, 3);
    }
}
