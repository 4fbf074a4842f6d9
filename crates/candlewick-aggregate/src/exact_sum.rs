//! Exactly rounded floating-point summation.

/// Running sum carried as a non-overlapping expansion of partials.
///
/// The represented value is the exact real sum of every input, so the
/// result of [`ExactSum::value`] is the correctly rounded sum no matter in
/// which order, or in which groups, the inputs were added.
#[derive(Debug, Clone, Default)]
pub struct ExactSum {
    /// Partials in increasing magnitude, pairwise non-overlapping.
    partials: Vec<f64>,
    /// Accumulates infinities and NaNs, which the expansion cannot carry.
    special: f64,
}

impl ExactSum {
    /// Creates an empty sum.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            partials: Vec::new(),
            special: 0.0,
        }
    }

    /// Adds `value` to the sum.
    pub fn add(&mut self, value: f64) {
        if !value.is_finite() {
            self.special += value;
            return;
        }
        let mut x = value;
        let mut kept = 0;
        for j in 0..self.partials.len() {
            let mut y = self.partials[j];
            if x.abs() < y.abs() {
                std::mem::swap(&mut x, &mut y);
            }
            let hi = x + y;
            let lo = y - (hi - x);
            if lo != 0.0 {
                self.partials[kept] = lo;
                kept += 1;
            }
            x = hi;
        }
        self.partials.truncate(kept);
        self.partials.push(x);
    }

    /// Folds another sum into this one.
    pub fn merge(&mut self, other: &Self) {
        self.special += other.special;
        for &partial in &other.partials {
            self.add(partial);
        }
    }

    /// Returns the correctly rounded value of the sum.
    #[must_use]
    pub fn value(&self) -> f64 {
        if self.special != 0.0 {
            return self.special;
        }
        let mut n = self.partials.len();
        if n == 0 {
            return 0.0;
        }
        n -= 1;
        let mut hi = self.partials[n];
        let mut lo = 0.0;
        while n > 0 {
            let x = hi;
            let y = self.partials[n - 1];
            n -= 1;
            hi = x + y;
            lo = y - (hi - x);
            if lo != 0.0 {
                break;
            }
        }
        // half-way case: round using the sign of the next partial
        if n > 0
            && ((lo < 0.0 && self.partials[n - 1] < 0.0) || (lo > 0.0 && self.partials[n - 1] > 0.0))
        {
            let y = lo * 2.0;
            let x = hi + y;
            if y == x - hi {
                hi = x;
            }
        }
        hi
    }
}

impl Extend<f64> for ExactSum {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}

impl FromIterator<f64> for ExactSum {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut sum = Self::new();
        sum.extend(iter);
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(ExactSum::new().value(), 0.0);
    }

    #[test]
    fn test_cancellation_is_exact() {
        let sum: ExactSum = [1e16, 1.0, -1e16].into_iter().collect();
        assert_eq!(sum.value(), 1.0);
    }

    #[test]
    fn test_tenths() {
        let sum: ExactSum = std::iter::repeat_n(0.1, 10).collect();
        assert_eq!(sum.value(), 1.0);
    }

    #[test]
    fn test_special_values_propagate() {
        let mut sum: ExactSum = [1.0, f64::INFINITY].into_iter().collect();
        assert_eq!(sum.value(), f64::INFINITY);
        sum.add(f64::NEG_INFINITY);
        assert!(sum.value().is_nan());
    }

    proptest! {
        #[test]
        fn prop_order_invariant(values in prop::collection::vec(-1e12f64..1e12, 0..64)) {
            let forward: ExactSum = values.iter().copied().collect();
            let backward: ExactSum = values.iter().rev().copied().collect();
            prop_assert_eq!(forward.value().to_bits(), backward.value().to_bits());
        }

        #[test]
        fn prop_merge_matches_single_pass(
            values in prop::collection::vec(-1e9f64..1e9, 0..64),
            split in 0usize..64,
        ) {
            let split = split.min(values.len());
            let whole: ExactSum = values.iter().copied().collect();
            let mut left: ExactSum = values[..split].iter().copied().collect();
            let right: ExactSum = values[split..].iter().copied().collect();
            left.merge(&right);
            prop_assert_eq!(left.value().to_bits(), whole.value().to_bits());
        }
    }
}
