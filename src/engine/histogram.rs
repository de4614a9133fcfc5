//! Cumulative bucketed histogram for one sample group

use std::sync::Arc;

/// Fixed-bound histogram
///
/// Each observation lands in the first bucket whose upper bound is `>=` the
/// value. Values above every bound are not counted in any bucket nor in
/// [`Histogram::total`]; they are tracked separately in
/// [`Histogram::overflow`]. The running sum always includes every value.
#[derive(Debug, Clone)]
pub struct Histogram {
    /// Ascending upper bounds, shared by every group of a collection
    bounds: Arc<[f64]>,
    /// Per-bucket (non-cumulative) hit counts, parallel to `bounds`
    counts: Vec<u64>,
    overflow: u64,
    sum: f64,
}

impl Histogram {
    pub fn new(bounds: Arc<[f64]>) -> Self {
        debug_assert!(
            bounds.windows(2).all(|w| w[0] <= w[1]),
            "histogram bounds must be sorted ascending"
        );
        let counts = vec![0; bounds.len()];
        Histogram {
            bounds,
            counts,
            overflow: 0,
            sum: 0.0,
        }
    }

    /// Record one observation
    pub fn add(&mut self, value: f64) {
        match self.bounds.iter().position(|bound| value <= *bound) {
            Some(i) => self.counts[i] = self.counts[i].saturating_add(1),
            None => self.overflow = self.overflow.saturating_add(1),
        }
        self.sum += value;
    }

    /// Cumulative count per bound, in ascending bound order
    ///
    /// The count reported for bound `b` is the number of observations `<= b`.
    pub fn bucket_counts(&self) -> Vec<(f64, u64)> {
        let mut cumulative = 0u64;
        self.bounds
            .iter()
            .zip(&self.counts)
            .map(|(bound, count)| {
                cumulative = cumulative.saturating_add(*count);
                (*bound, cumulative)
            })
            .collect()
    }

    /// Cumulative count for one bound, if it is a bound of this histogram
    pub fn cumulative_count(&self, bound: f64) -> Option<u64> {
        self.bucket_counts()
            .into_iter()
            .find(|(b, _)| *b == bound)
            .map(|(_, count)| count)
    }

    /// Number of observations that fell into a bucket
    pub fn total(&self) -> u64 {
        self.counts.iter().fold(0u64, |acc, c| acc.saturating_add(*c))
    }

    /// Number of observations above the largest bound
    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    /// Running sum of every observation, bucketed or not
    pub fn sum(&self) -> f64 {
        self.sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hundreds() -> Arc<[f64]> {
        (1..=10).map(|i| (i * 100) as f64).collect()
    }

    #[test]
    fn test_one_to_thousand() {
        let mut h = Histogram::new(hundreds());
        for i in 1..=1000 {
            h.add(i as f64);
        }

        assert_eq!(h.cumulative_count(100.0), Some(100));
        assert_eq!(h.cumulative_count(500.0), Some(500));
        assert_eq!(h.cumulative_count(1000.0), Some(1000));
        assert_eq!(h.cumulative_count(150.0), None);
        assert_eq!(h.total(), 1000);
        assert_eq!(h.overflow(), 0);
        assert_eq!(h.sum(), 500_500.0);
    }

    #[test]
    fn test_bucket_counts_are_cumulative() {
        let mut h = Histogram::new(Arc::from(vec![1.0, 5.0, 10.0]));
        for v in [0.5, 1.0, 3.0, 7.0, 7.5, 10.0] {
            h.add(v);
        }
        assert_eq!(h.bucket_counts(), vec![(1.0, 2), (5.0, 3), (10.0, 6)]);

        let counts: Vec<u64> = h.bucket_counts().into_iter().map(|(_, c)| c).collect();
        assert!(counts.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_value_on_bound_goes_to_that_bucket() {
        let mut h = Histogram::new(Arc::from(vec![100.0, 200.0]));
        h.add(100.0);
        assert_eq!(h.bucket_counts(), vec![(100.0, 1), (200.0, 1)]);
    }

    #[test]
    fn test_overflow_values() {
        let mut h = Histogram::new(Arc::from(vec![10.0, 20.0]));
        h.add(5.0);
        h.add(25.0);
        h.add(1000.0);

        assert_eq!(h.total(), 1);
        assert_eq!(h.overflow(), 2);
        assert_eq!(h.cumulative_count(20.0), Some(1));
        assert_eq!(h.sum(), 1030.0);
    }

    #[test]
    fn test_negative_values() {
        let mut h = Histogram::new(Arc::from(vec![-10.0, 0.0, 10.0]));
        h.add(-20.0);
        h.add(-5.0);
        assert_eq!(h.bucket_counts(), vec![(-10.0, 1), (0.0, 2), (10.0, 2)]);
        assert_eq!(h.sum(), -25.0);
    }
}
