use crate::error::{DbError, Result};
use crate::fields::CompareOp;

// Equi-width histogram over `i32` values in `[min, max]`, used to estimate
// selectivity for integer-column predicates.
#[derive(Debug, Clone)]
pub struct IntHistogram {
    buckets: Vec<u32>,
    min: i32,
    max: i32,
    width: f64,
    total: u64,
}

impl IntHistogram {
    pub fn new(num_buckets: usize, min: i32, max: i32) -> Result<Self> {
        if num_buckets == 0 {
            return Err(DbError::IllegalArgument("a histogram needs at least one bucket".into()));
        }
        if min > max {
            return Err(DbError::IllegalArgument(format!(
                "histogram bounds inverted: min {} > max {}",
                min, max
            )));
        }
        let width = (max - min + 1) as f64 / num_buckets as f64;
        Ok(IntHistogram {
            buckets: vec![0; num_buckets],
            min,
            max,
            width,
            total: 0,
        })
    }

    fn bucket_of(&self, v: i32) -> usize {
        let idx = ((v - self.min) as f64 / self.width).floor() as i64;
        idx.clamp(0, self.buckets.len() as i64 - 1) as usize
    }

    // Bucket `[lo, hi]` range, inclusive, in value space.
    fn bucket_bounds(&self, b: usize) -> (f64, f64) {
        let lo = self.min as f64 + b as f64 * self.width;
        let hi = self.min as f64 + (b as f64 + 1.0) * self.width;
        (lo, hi)
    }

    pub fn add_value(&mut self, v: i32) {
        let b = self.bucket_of(v.clamp(self.min, self.max));
        self.buckets[b] += 1;
        self.total += 1;
    }

    fn eq_selectivity(&self, v: i32) -> f64 {
        if v < self.min || v > self.max || self.total == 0 {
            return 0.0;
        }
        let b = self.bucket_of(v);
        let (lo, hi) = self.bucket_bounds(b);
        let bucket_width = (hi - lo).max(1.0);
        self.buckets[b] as f64 / (bucket_width * self.total as f64)
    }

    fn gt_selectivity(&self, v: i32) -> f64 {
        if v >= self.max {
            return 0.0;
        }
        if v < self.min {
            return 1.0;
        }
        if self.total == 0 {
            return 0.0;
        }
        let b = self.bucket_of(v);
        let (lo, hi) = self.bucket_bounds(b);
        let bucket_width = (hi - lo).max(1.0);
        let within_bucket = (hi - v as f64 - 1.0).max(0.0) * self.buckets[b] as f64 / bucket_width;
        let beyond: u32 = self.buckets[b + 1..].iter().sum();
        within_bucket / self.total as f64 + beyond as f64 / self.total as f64
    }

    fn lt_selectivity(&self, v: i32) -> f64 {
        if v <= self.min {
            return 0.0;
        }
        if v > self.max {
            return 1.0;
        }
        if self.total == 0 {
            return 0.0;
        }
        let b = self.bucket_of(v);
        let (lo, hi) = self.bucket_bounds(b);
        let bucket_width = (hi - lo).max(1.0);
        let within_bucket = (v as f64 - lo).max(0.0) * self.buckets[b] as f64 / bucket_width;
        let before: u32 = self.buckets[..b].iter().sum();
        within_bucket / self.total as f64 + before as f64 / self.total as f64
    }

    // Dispatches `op` to the corresponding selectivity formula. `Like` is
    // treated as equality for ints.
    pub fn estimate(&self, op: CompareOp, v: i32) -> f64 {
        match op {
            CompareOp::Eq | CompareOp::Like => self.eq_selectivity(v),
            CompareOp::Ne => 1.0 - self.eq_selectivity(v),
            CompareOp::Gt => self.gt_selectivity(v),
            CompareOp::Lt => self.lt_selectivity(v),
            CompareOp::Ge => self.eq_selectivity(v) + self.gt_selectivity(v),
            CompareOp::Le => self.eq_selectivity(v) + self.lt_selectivity(v),
        }
    }
}

// String histogram bucketed by the first byte of the value (0..=255),
// reusing `IntHistogram`'s machinery. Ordered comparisons fall back to the
// same bucket estimate as ints, treating first-byte order as a proxy for
// lexicographic order.
#[derive(Debug, Clone)]
pub struct StringHistogram {
    inner: IntHistogram,
}

impl StringHistogram {
    pub fn new() -> Self {
        StringHistogram {
            inner: IntHistogram::new(256, 0, 255).expect("256 buckets over 0..=255 is always valid"),
        }
    }

    fn first_byte(s: &str) -> i32 {
        s.as_bytes().first().copied().unwrap_or(0) as i32
    }

    pub fn add_value(&mut self, s: &str) {
        self.inner.add_value(Self::first_byte(s));
    }

    pub fn estimate(&self, op: CompareOp, s: &str) -> f64 {
        self.inner.estimate(op, Self::first_byte(s))
    }
}

impl Default for StringHistogram {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eq_gt_lt_estimates_are_consistent() {
        let mut h = IntHistogram::new(10, 1, 100).unwrap();
        for v in 1..=100 {
            h.add_value(v);
        }
        assert!((h.estimate(CompareOp::Eq, 42) - 0.01).abs() < 0.005);
        assert!((h.estimate(CompareOp::Lt, 50) - 0.49).abs() < 0.02);
        assert_eq!(h.estimate(CompareOp::Gt, 100), 0.0);
    }

    #[test]
    fn out_of_range_eq_is_zero() {
        let mut h = IntHistogram::new(10, 1, 100).unwrap();
        for v in 1..=100 {
            h.add_value(v);
        }
        assert_eq!(h.estimate(CompareOp::Eq, 0), 0.0);
        assert_eq!(h.estimate(CompareOp::Eq, 101), 0.0);
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let result = IntHistogram::new(10, 100, 1);
        assert!(matches!(result, Err(DbError::IllegalArgument(_))));
    }

    #[test]
    fn string_histogram_estimates_by_first_byte() {
        let mut h = StringHistogram::new();
        for s in ["apple", "avocado", "banana", "cherry"] {
            h.add_value(s);
        }
        assert!(h.estimate(CompareOp::Eq, "apple") > 0.0);
        assert_eq!(h.estimate(CompareOp::Eq, "zebra"), 0.0);
    }
}
