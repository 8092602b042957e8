//! Delay-and-correlate preamble detection.
//!
//! The short training field repeats every `L` samples, so correlating a
//! window of `W` samples with the same window `L` samples later and
//! normalizing by the window power gives a metric close to 1 over the whole
//! repetition region and close to 0 on noise or silence.

use num_complex::Complex64;

/// Detector parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlateauDetector {
    /// Correlation window `W`.
    pub window: usize,
    /// Repetition period `L`.
    pub lag: usize,
    /// Metric level that counts as correlated.
    pub threshold: f64,
    /// Consecutive correlated positions required before a detection fires.
    pub min_plateau: usize,
}

impl Default for PlateauDetector {
    fn default() -> Self {
        Self {
            window: 48,
            lag: 16,
            threshold: 0.75,
            min_plateau: 16,
        }
    }
}

impl PlateauDetector {
    /// Samples needed before the first metric value is available.
    pub fn span(&self) -> usize {
        self.window + self.lag
    }

    /// Metric for the window starting at `start`, or `None` if the window
    /// runs past the end of `samples`.
    pub fn metric_at(&self, samples: &[Complex64], start: usize) -> Option<f64> {
        if start + self.span() > samples.len() {
            return None;
        }
        let mut corr = Complex64::new(0.0, 0.0);
        let mut power = 0.0;
        for j in start..start + self.window {
            corr += samples[j] * samples[j + self.lag].conj();
            power += samples[j].norm_sqr();
        }
        Some(if power == 0.0 { 0.0 } else { corr.norm() / power })
    }

    /// Metric for every complete window, `n - W - L + 1` values.
    pub fn metric(&self, samples: &[Complex64]) -> Vec<f64> {
        (0..samples.len())
            .map_while(|i| self.metric_at(samples, i))
            .collect()
    }

    /// Window start positions where a detection fires.
    pub fn detect(&self, samples: &[Complex64]) -> Vec<usize> {
        let mut tracker = PlateauTracker::new(self.threshold, self.min_plateau);
        self.metric(samples)
            .into_iter()
            .enumerate()
            .filter(|&(_, m)| tracker.push(m))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Incremental plateau state: fires once when the metric has stayed at or
/// above the threshold for `min_plateau` consecutive values, and re-arms only
/// after it drops below.
#[derive(Debug, Clone)]
pub struct PlateauTracker {
    threshold: f64,
    min_plateau: usize,
    run: usize,
}

impl PlateauTracker {
    /// Creates an armed tracker.
    pub fn new(threshold: f64, min_plateau: usize) -> Self {
        Self {
            threshold,
            min_plateau: min_plateau.max(1),
            run: 0,
        }
    }

    /// Feeds one metric value; returns `true` when a detection fires.
    pub fn push(&mut self, metric: f64) -> bool {
        if metric >= self.threshold {
            self.run += 1;
            self.run == self.min_plateau
        } else {
            self.run = 0;
            false
        }
    }
}
