//! Interleaved 16-bit I/Q sample captures.
//!
//! A capture file is a flat sequence of little-endian signed 16-bit values
//! alternating in-phase and quadrature: `I0 Q0 I1 Q1 ...`. Scenarios usually
//! need only a window of a capture (for example skipping the short preamble),
//! so [`SampleFile`] exposes clamped slices and prefixes.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// One complex baseband sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IqSample {
    /// In-phase component.
    pub i: i16,
    /// Quadrature component.
    pub q: i16,
}

impl IqSample {
    /// Creates a sample from its components.
    pub fn new(i: i16, q: i16) -> Self {
        Self { i, q }
    }
}

/// Errors reading a sample capture.
#[derive(Debug, Error)]
pub enum SampleError {
    /// The capture could not be read.
    #[error("failed to read sample file: {0}")]
    Io(#[from] std::io::Error),

    /// The byte count is not a whole number of I/Q pairs.
    #[error("sample data is {len} bytes, not a multiple of 4 (one I/Q pair)")]
    Truncated {
        /// Length of the rejected data in bytes.
        len: usize,
    },
}

/// An in-memory I/Q capture.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SampleFile {
    samples: Vec<IqSample>,
}

impl SampleFile {
    /// Reads a capture from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SampleError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Parses a capture from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SampleError> {
        if bytes.len() % 4 != 0 {
            return Err(SampleError::Truncated { len: bytes.len() });
        }
        let samples = bytes
            .chunks_exact(4)
            .map(|pair| IqSample {
                i: i16::from_le_bytes([pair[0], pair[1]]),
                q: i16::from_le_bytes([pair[2], pair[3]]),
            })
            .collect();
        Ok(Self { samples })
    }

    /// Wraps already-decoded samples.
    pub fn from_samples(samples: Vec<IqSample>) -> Self {
        Self { samples }
    }

    /// Serializes the capture back to interleaved little-endian bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.samples
            .iter()
            .flat_map(|s| {
                let [i0, i1] = s.i.to_le_bytes();
                let [q0, q1] = s.q.to_le_bytes();
                [i0, i1, q0, q1]
            })
            .collect()
    }

    /// Number of complex samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if the capture holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// All samples.
    pub fn samples(&self) -> &[IqSample] {
        &self.samples
    }

    /// Up to `count` samples starting at `offset`; clamped to the capture.
    pub fn slice(&self, offset: usize, count: usize) -> &[IqSample] {
        let start = offset.min(self.samples.len());
        let end = start.saturating_add(count).min(self.samples.len());
        &self.samples[start..end]
    }

    /// The first `count` samples (or fewer if the capture is shorter).
    pub fn prefix(&self, count: usize) -> &[IqSample] {
        self.slice(0, count)
    }

    /// In-phase components.
    pub fn i_lane(&self) -> Vec<i16> {
        self.samples.iter().map(|s| s.i).collect()
    }

    /// Quadrature components.
    pub fn q_lane(&self) -> Vec<i16> {
        self.samples.iter().map(|s| s.q).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn capture() -> SampleFile {
        SampleFile::from_samples((0..10).map(|k| IqSample::new(k, -k)).collect())
    }

    #[test]
    fn parses_interleaved_little_endian() {
        let bytes = [0x01, 0x00, 0xFF, 0xFF, 0x00, 0x80, 0xFF, 0x7F];
        let file = SampleFile::from_bytes(&bytes).unwrap();
        assert_eq!(file.len(), 2);
        assert_eq!(file.samples()[0], IqSample::new(1, -1));
        assert_eq!(file.samples()[1], IqSample::new(i16::MIN, i16::MAX));
    }

    #[test]
    fn rejects_dangling_bytes() {
        let err = SampleFile::from_bytes(&[0, 0, 0]).unwrap_err();
        assert!(matches!(err, SampleError::Truncated { len: 3 }));
        assert_eq!(
            err.to_string(),
            "sample data is 3 bytes, not a multiple of 4 (one I/Q pair)"
        );
        // An I value without its Q partner.
        assert!(SampleFile::from_bytes(&[0, 0, 0, 0, 1, 0]).is_err());
    }

    #[test]
    fn slices_are_clamped() {
        let file = capture();
        assert_eq!(file.slice(2, 3).len(), 3);
        assert_eq!(file.slice(2, 3)[0], IqSample::new(2, -2));
        assert_eq!(file.slice(8, 100).len(), 2);
        assert!(file.slice(50, 4).is_empty());
        assert_eq!(file.slice(3, usize::MAX).len(), 7);
        assert_eq!(file.prefix(4).len(), 4);
        assert_eq!(file.prefix(40).len(), 10);
    }

    #[test]
    fn lanes_split_components() {
        let file = capture();
        assert_eq!(file.i_lane()[..3], [0, 1, 2]);
        assert_eq!(file.q_lane()[..3], [0, -1, -2]);
    }

    #[test]
    fn open_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.dat");
        let written = capture();
        std::fs::File::create(&path)
            .unwrap()
            .write_all(&written.to_bytes())
            .unwrap();
        let loaded = SampleFile::open(&path).unwrap();
        assert_eq!(loaded, written);
    }

    #[test]
    fn open_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SampleFile::open(dir.path().join("missing.dat")).unwrap_err();
        assert!(matches!(err, SampleError::Io(_)));
        assert!(err.to_string().starts_with("failed to read sample file"));
    }
}
