//! Golden reference models for baseband pipeline verification.
//!
//! Every model is a pure function of its input samples with no notion of
//! simulation time, so the expected output of a scenario can be computed from
//! the stimulus alone and compared against whatever the DUT produced.
//!
//! # Modules
//!
//! - `compare`: exact and tolerance comparison with full mismatch lists
//! - `pipeline`: delay line and magnitude squared
//! - `autocorr`: delay-and-correlate short preamble detection
//! - `xcorr`: sliding cross-correlation and peak location
//! - `spectrum`: DFT magnitudes, bin frequencies, fixed-point block FFT
//! - `fir`: fixed-point FIR decimation and spectral passband checks
//! - `equalizer`: channel estimation and per-tone equalization
//! - `synth`: tones, ramps, and the 802.11 legacy preamble

#![warn(missing_docs)]

pub mod autocorr;
pub mod compare;
pub mod equalizer;
pub mod error;
pub mod fir;
pub mod pipeline;
pub mod spectrum;
pub mod synth;
pub mod xcorr;

pub use autocorr::{PlateauDetector, PlateauTracker};
pub use compare::{
    compare_close, compare_close_masked, compare_exact, Approx, Comparison, Mismatch, Tolerance,
};
pub use error::GoldenError;
pub use fir::{
    fir_decimate, lowpass_kernel, passband_comparison, quantize_kernel, Decimator, RateRatio,
};
pub use num_complex::Complex64;
pub use pipeline::{delay_line, mag_squared};
pub use spectrum::{fft, fft_fixed, ifft, magnitude_spectrum, Window};
pub use xcorr::{cross_correlate, cross_correlate_fixed, peaks_separated, two_largest_peaks};
