//! Aggregation of reference comparisons into a single verdict.
//!
//! A scenario usually checks several sequences (each output lane, a spectral
//! summary, a property of the whole capture). Every check runs; the verdict
//! reports the first length disagreement as a count mismatch, otherwise every
//! differing value in one [`Failure::DataMismatch`].

use std::fmt::Display;

use wavesense_golden::{compare_close, compare_exact, Approx, Comparison, Tolerance};

use crate::report::{Failure, MismatchRecord};

/// Accumulates comparisons for one scenario.
#[derive(Debug, Default)]
pub struct Verdict {
    compared: usize,
    count: Option<Failure>,
    mismatches: Vec<MismatchRecord>,
}

impl Verdict {
    /// An empty verdict.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compares `actual` against `expected` for equality.
    pub fn exact<T: PartialEq + Copy + Display>(
        &mut self,
        what: &str,
        actual: &[T],
        expected: &[T],
    ) -> &mut Self {
        self.record(what, compare_exact(actual, expected))
    }

    /// Compares `actual` against `expected` within `tolerance`.
    pub fn close<T: Approx + Display>(
        &mut self,
        what: &str,
        actual: &[T],
        expected: &[T],
        tolerance: Tolerance,
    ) -> &mut Self {
        self.record(what, compare_close(actual, expected, tolerance))
    }

    /// Folds a finished comparison into the verdict.
    pub fn record<T: Display>(&mut self, what: &str, comparison: Comparison<T>) -> &mut Self {
        if comparison.actual_len != comparison.expected_len && self.count.is_none() {
            self.count = Some(Failure::CountMismatch {
                what: format!("{what} length"),
                expected: comparison.expected_len as u64,
                actual: comparison.actual_len as u64,
            });
        }
        self.compared += comparison.compared;
        self.mismatches
            .extend(comparison.mismatches.into_iter().map(|m| MismatchRecord {
                what: what.to_string(),
                index: m.index,
                actual: m.actual.to_string(),
                expected: m.expected.to_string(),
            }));
        self
    }

    /// Records a whole-capture property as one compared value.
    pub fn property(
        &mut self,
        what: &str,
        holds: bool,
        expected: impl Display,
        actual: impl Display,
    ) -> &mut Self {
        self.compared += 1;
        if !holds {
            self.mismatches.push(MismatchRecord {
                what: what.to_string(),
                index: 0,
                actual: actual.to_string(),
                expected: expected.to_string(),
            });
        }
        self
    }

    /// Values compared so far.
    pub fn compared(&self) -> usize {
        self.compared
    }

    /// `Ok` if nothing differed.
    pub fn finish(self) -> Result<(), Failure> {
        if let Some(count) = self.count {
            return Err(count);
        }
        if self.mismatches.is_empty() {
            Ok(())
        } else {
            Err(Failure::DataMismatch {
                compared: self.compared,
                mismatches: self.mismatches,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_mismatches_are_kept() {
        let mut v = Verdict::new();
        v.exact("re", &[1i64, 2, 3, 4], &[1, 0, 3, 0])
            .exact("im", &[5i64, 6], &[5, 7]);
        assert_eq!(v.compared(), 6);
        match v.finish() {
            Err(Failure::DataMismatch { compared, mismatches }) => {
                assert_eq!(compared, 6);
                let at: Vec<(&str, usize)> = mismatches
                    .iter()
                    .map(|m| (m.what.as_str(), m.index))
                    .collect();
                assert_eq!(at, vec![("re", 1), ("re", 3), ("im", 1)]);
                assert_eq!(mismatches[2].to_string(), "im[1]: expected 7, got 6");
            }
            other => panic!("expected data mismatch, got {other:?}"),
        }
    }

    #[test]
    fn length_difference_is_a_count_mismatch() {
        let mut v = Verdict::new();
        v.exact("data", &[1i64, 2], &[1, 2, 3]);
        assert_eq!(
            v.finish(),
            Err(Failure::CountMismatch {
                what: "data length".into(),
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn tolerance_and_properties() {
        let mut v = Verdict::new();
        v.close("mag", &[10.0, 20.5], &[10.2, 20.0], Tolerance::new(0.25, 0.0))
            .property("spacing", true, 64, 64);
        let err = v.finish().unwrap_err();
        assert!(matches!(
            err,
            Failure::DataMismatch { compared: 3, ref mismatches } if mismatches.len() == 1
        ));

        let mut v = Verdict::new();
        v.property("spacing", false, "64 ± 1", 70);
        assert!(v.finish().is_err());
        assert_eq!(Verdict::new().finish(), Ok(()));
    }
}
