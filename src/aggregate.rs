//! Accumulators used by the aggregation library.
//!
//! Scans fold each batch of trips into an accumulator and then merge the per-batch accumulators
//! in batch order. Every accumulator here implements [Merge] so that the serial and parallel
//! scans produce the same result.

use std::hash::Hash;

use hashbrown::HashMap;

/// Combine two partial results.
pub trait Merge {
    /// Merge `other` into `self`.
    fn merge(&mut self, other: Self);
}

/// Round to 2 decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Number of rows.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Count(pub u64);

impl Count {
    pub fn push(&mut self) {
        self.0 += 1;
    }
}

impl Merge for Count {
    fn merge(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Running mean of non-missing values.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Mean {
    sum: f64,
    count: u64,
}

impl Mean {
    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// Push a value if present. Missing values do not contribute.
    pub fn push_opt(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.push(value)
        }
    }

    /// Number of values pushed.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sum rounded to 2 decimal places.
    pub fn sum(&self) -> f64 {
        round2(self.sum)
    }

    /// Mean rounded to 2 decimal places, or `None` if nothing was pushed.
    pub fn value(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(round2(self.sum / self.count as f64))
        }
    }
}

impl Merge for Mean {
    fn merge(&mut self, other: Self) {
        self.sum += other.sum;
        self.count += other.count;
    }
}

/// Count, mean, extremes and variance of a series of values.
///
/// Uses Welford's update and Chan's parallel merge for the variance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Summary {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl Default for Summary {
    fn default() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl Summary {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean rounded to 2 decimal places.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| round2(self.mean))
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    /// Sample standard deviation rounded to 2 decimal places.
    ///
    /// Undefined for fewer than two values.
    pub fn stddev(&self) -> Option<f64> {
        if self.count < 2 {
            return None;
        }
        Some(round2((self.m2 / (self.count - 1) as f64).sqrt()))
    }
}

impl Merge for Summary {
    fn merge(&mut self, other: Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other;
            return;
        }
        let count = self.count + other.count;
        let delta = other.mean - self.mean;
        let mean = self.mean + delta * other.count as f64 / count as f64;
        let m2 = self.m2
            + other.m2
            + delta * delta * self.count as f64 * other.count as f64 / count as f64;
        self.count = count;
        self.mean = mean;
        self.m2 = m2;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }
}

impl<A: Merge, B: Merge> Merge for (A, B) {
    fn merge(&mut self, other: Self) {
        self.0.merge(other.0);
        self.1.merge(other.1);
    }
}

impl<T: Merge, const N: usize> Merge for [T; N] {
    fn merge(&mut self, other: Self) {
        for (this, other) in self.iter_mut().zip(other) {
            this.merge(other);
        }
    }
}

/// Accumulators keyed by a group key, as in a GROUP BY.
#[derive(Clone, Debug)]
pub struct Grouped<K, S> {
    groups: HashMap<K, S>,
}

impl<K, S> Default for Grouped<K, S> {
    fn default() -> Self {
        Self {
            groups: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, S: Default> Grouped<K, S> {
    /// Returns the accumulator of a group, creating it if needed.
    pub fn entry(&mut self, key: K) -> &mut S {
        self.groups.entry(key).or_default()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Consume the groups, returning them ordered by key.
    pub fn into_sorted(self) -> Vec<(K, S)>
    where
        K: Ord,
    {
        let mut groups: Vec<(K, S)> = self.groups.into_iter().collect();
        groups.sort_by(|(a, _), (b, _)| a.cmp(b));
        groups
    }
}

impl<K: Eq + Hash, S: Default + Merge> Merge for Grouped<K, S> {
    fn merge(&mut self, other: Self) {
        for (key, value) in other.groups {
            self.entry(key).merge(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_half_away_from_zero() {
        assert_eq!(1.24, round2(1.235000001));
        assert_eq!(2.5, round2(2.5));
        assert_eq!(-1.24, round2(-1.235000001));
        assert_eq!(3.0, round2(2.999));
    }

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(None, Mean::default().value());
    }

    #[test]
    fn mean_ignores_missing() {
        let mut mean = Mean::default();
        mean.push(10.0);
        mean.push_opt(None);
        mean.push_opt(Some(20.0));
        assert_eq!(2, mean.count());
        assert_eq!(Some(15.0), mean.value());
        assert_eq!(30.0, mean.sum());
    }

    #[test]
    fn mean_merge() {
        let mut a = Mean::default();
        a.push(1.0);
        let mut b = Mean::default();
        b.push(2.0);
        b.push(3.0);
        a.merge(b);
        assert_eq!(Some(2.0), a.value());
    }

    #[test]
    fn summary_single_value() {
        let mut summary = Summary::default();
        summary.push(4.0);
        assert_eq!(1, summary.count());
        assert_eq!(Some(4.0), summary.mean());
        assert_eq!(Some(4.0), summary.min());
        assert_eq!(Some(4.0), summary.max());
        assert_eq!(None, summary.stddev());
    }

    #[test]
    fn summary_empty() {
        let summary = Summary::default();
        assert_eq!(None, summary.mean());
        assert_eq!(None, summary.min());
        assert_eq!(None, summary.max());
        assert_eq!(None, summary.stddev());
    }

    #[test]
    fn summary_sample_stddev() {
        let mut summary = Summary::default();
        for value in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            summary.push(value);
        }
        assert_eq!(Some(5.0), summary.mean());
        // Sample variance is 32 / 7.
        assert_eq!(Some(2.14), summary.stddev());
        assert_eq!(Some(2.0), summary.min());
        assert_eq!(Some(9.0), summary.max());
    }

    #[test]
    fn summary_merge_matches_sequential() {
        let values = [3.5, 10.0, 7.25, 1.0, 22.0, 8.0, 8.0];
        let mut sequential = Summary::default();
        values.iter().for_each(|v| sequential.push(*v));

        let mut left = Summary::default();
        values[..3].iter().for_each(|v| left.push(*v));
        let mut right = Summary::default();
        values[3..].iter().for_each(|v| right.push(*v));
        left.merge(right);

        assert_eq!(sequential.count(), left.count());
        assert_eq!(sequential.mean(), left.mean());
        assert_eq!(sequential.stddev(), left.stddev());
        assert_eq!(sequential.min(), left.min());
        assert_eq!(sequential.max(), left.max());
    }

    #[test]
    fn summary_merge_with_empty() {
        let mut summary = Summary::default();
        summary.push(1.0);
        summary.push(3.0);
        let before = summary;
        summary.merge(Summary::default());
        assert_eq!(before, summary);
        let mut empty = Summary::default();
        empty.merge(before);
        assert_eq!(before, empty);
    }

    #[test]
    fn grouped_merge_and_sort() {
        let mut a: Grouped<(i32, u32), Count> = Grouped::default();
        a.entry((2020, 1)).push();
        a.entry((2019, 5)).push();
        let mut b: Grouped<(i32, u32), Count> = Grouped::default();
        b.entry((2019, 5)).push();
        b.entry((2019, 2)).push();
        a.merge(b);
        assert_eq!(3, a.len());
        let sorted = a.into_sorted();
        assert_eq!(
            vec![
                ((2019, 2), Count(1)),
                ((2019, 5), Count(2)),
                ((2020, 1), Count(1))
            ],
            sorted
        );
    }

    #[test]
    fn array_merge() {
        let mut a = [Mean::default(), Mean::default()];
        a[0].push(1.0);
        let mut b = [Mean::default(), Mean::default()];
        b[0].push(3.0);
        b[1].push(5.0);
        a.merge(b);
        assert_eq!(Some(2.0), a[0].value());
        assert_eq!(Some(5.0), a[1].value());
    }
}
