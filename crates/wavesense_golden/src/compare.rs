//! Comparison of captured DUT output against reference output.
//!
//! Integer pipelines are compared for exact equality. Paths that involve a
//! reciprocal, FFT twiddle rounding, or a floating reference are compared
//! with `|actual - expected| <= atol + rtol * |expected|`.
//!
//! Every position is checked; a [`Comparison`] lists all mismatches rather
//! than stopping at the first.

use std::fmt::Debug;

use num_complex::Complex64;

/// Absolute and relative tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    /// Absolute term.
    pub atol: f64,
    /// Relative term, scaled by the expected magnitude.
    pub rtol: f64,
}

impl Tolerance {
    /// Exact match for integer-valued data.
    pub const EXACT: Self = Self { atol: 0.0, rtol: 0.0 };

    /// Creates a tolerance.
    pub fn new(atol: f64, rtol: f64) -> Self {
        Self { atol, rtol }
    }

    /// Returns `true` if `actual` lies within tolerance of `expected`.
    pub fn accepts<T: Approx>(&self, actual: T, expected: T) -> bool {
        actual.distance(expected) <= self.atol + self.rtol * expected.magnitude()
    }
}

/// Values that can be compared with a tolerance.
pub trait Approx: Copy + Debug {
    /// `|self - other|`.
    fn distance(self, other: Self) -> f64;
    /// `|self|`.
    fn magnitude(self) -> f64;
}

impl Approx for f64 {
    fn distance(self, other: Self) -> f64 {
        (self - other).abs()
    }

    fn magnitude(self) -> f64 {
        self.abs()
    }
}

impl Approx for i64 {
    fn distance(self, other: Self) -> f64 {
        self.abs_diff(other) as f64
    }

    fn magnitude(self) -> f64 {
        self.unsigned_abs() as f64
    }
}

impl Approx for Complex64 {
    fn distance(self, other: Self) -> f64 {
        (self - other).norm()
    }

    fn magnitude(self) -> f64 {
        self.norm()
    }
}

/// One differing position.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch<T> {
    /// Position in the compared sequences.
    pub index: usize,
    /// Value captured from the DUT.
    pub actual: T,
    /// Value from the reference model.
    pub expected: T,
}

/// Result of comparing two sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison<T> {
    /// Number of positions checked.
    pub compared: usize,
    /// Length of the captured sequence.
    pub actual_len: usize,
    /// Length of the reference sequence.
    pub expected_len: usize,
    /// Every position outside tolerance, in index order.
    pub mismatches: Vec<Mismatch<T>>,
}

impl<T> Comparison<T> {
    /// `true` when the lengths agree and no position differs.
    pub fn passed(&self) -> bool {
        self.actual_len == self.expected_len && self.mismatches.is_empty()
    }
}

/// Exact comparison over the common prefix of `actual` and `expected`.
pub fn compare_exact<T: PartialEq + Copy>(actual: &[T], expected: &[T]) -> Comparison<T> {
    compare_by(actual, expected, |_| true, |a, e| a == e)
}

/// Tolerance comparison over the common prefix.
pub fn compare_close<T: Approx>(
    actual: &[T],
    expected: &[T],
    tolerance: Tolerance,
) -> Comparison<T> {
    compare_by(actual, expected, |_| true, |a, e| tolerance.accepts(a, e))
}

/// Tolerance comparison restricted to the positions where `include` holds.
pub fn compare_close_masked<T: Approx>(
    actual: &[T],
    expected: &[T],
    tolerance: Tolerance,
    include: impl Fn(usize) -> bool,
) -> Comparison<T> {
    compare_by(actual, expected, include, |a, e| tolerance.accepts(a, e))
}

fn compare_by<T: Copy>(
    actual: &[T],
    expected: &[T],
    include: impl Fn(usize) -> bool,
    matches: impl Fn(T, T) -> bool,
) -> Comparison<T> {
    let mut compared = 0;
    let mut mismatches = Vec::new();
    for (index, (&a, &e)) in actual.iter().zip(expected).enumerate() {
        if !include(index) {
            continue;
        }
        compared += 1;
        if !matches(a, e) {
            mismatches.push(Mismatch {
                index,
                actual: a,
                expected: e,
            });
        }
    }
    Comparison {
        compared,
        actual_len: actual.len(),
        expected_len: expected.len(),
        mismatches,
    }
}
