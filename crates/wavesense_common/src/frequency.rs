//! Clock and sample-rate frequencies.
//!
//! Rates are stored as whole Hertz so that rate ratios (for example the
//! 122.88 MHz to 20 MHz decimation) can be evaluated with exact integer
//! arithmetic.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Femtoseconds per second.
const FS_PER_S: u128 = 1_000_000_000_000_000;

/// A positive frequency in whole Hertz.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Frequency(u64);

/// Error returned when a frequency string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid frequency '{input}'")]
pub struct ParseFrequencyError {
    /// The rejected input.
    pub input: String,
}

impl Frequency {
    /// Creates a frequency from Hertz. Returns `None` for zero.
    pub fn from_hz(hz: u64) -> Option<Self> {
        (hz > 0).then_some(Self(hz))
    }

    /// Returns the frequency in Hertz.
    pub fn hz(&self) -> u64 {
        self.0
    }

    /// Returns the period in femtoseconds, rounded to the nearest femtosecond.
    pub fn period_fs(&self) -> u64 {
        let hz = u128::from(self.0);
        ((FS_PER_S + hz / 2) / hz) as u64
    }

    /// Number of output samples produced from `count` input samples when
    /// resampling from `self` to `output`, i.e. `floor(count * output / self)`.
    pub fn resampled_count(&self, output: Frequency, count: u64) -> u64 {
        (u128::from(count) * u128::from(output.0) / u128::from(self.0)) as u64
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({self})")
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [(u64, &str); 3] = [
            (1_000_000_000, "GHz"),
            (1_000_000, "MHz"),
            (1_000, "kHz"),
        ];
        for (scale, unit) in UNITS {
            if self.0 >= scale {
                let whole = self.0 / scale;
                let frac = self.0 % scale;
                if frac == 0 {
                    return write!(f, "{whole}{unit}");
                }
                let digits = scale.ilog10() as usize;
                let frac = format!("{frac:0digits$}");
                return write!(f, "{whole}.{}{unit}", frac.trim_end_matches('0'));
            }
        }
        write!(f, "{}Hz", self.0)
    }
}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseFrequencyError {
            input: s.to_string(),
        };
        let lower = s.trim().to_ascii_lowercase();
        let (number, scale) = [("ghz", 1e9), ("mhz", 1e6), ("khz", 1e3), ("hz", 1.0)]
            .iter()
            .find_map(|(suffix, scale)| lower.strip_suffix(suffix).map(|n| (n, *scale)))
            .unwrap_or((lower.as_str(), 1.0));
        let value: f64 = number.trim().parse().map_err(|_| err())?;
        let hz = (value * scale).round();
        if !hz.is_finite() || hz < 1.0 || hz > u64::MAX as f64 {
            return Err(err());
        }
        Ok(Self(hz as u64))
    }
}

impl TryFrom<String> for Frequency {
    type Error = ParseFrequencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Frequency> for String {
    fn from(value: Frequency) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_units() {
        assert_eq!("100MHz".parse::<Frequency>().unwrap().hz(), 100_000_000);
        assert_eq!("122.88MHz".parse::<Frequency>().unwrap().hz(), 122_880_000);
        assert_eq!("20kHz".parse::<Frequency>().unwrap().hz(), 20_000);
        assert_eq!("1GHz".parse::<Frequency>().unwrap().hz(), 1_000_000_000);
        assert_eq!("48000Hz".parse::<Frequency>().unwrap().hz(), 48_000);
        assert_eq!(" 25000000 ".parse::<Frequency>().unwrap().hz(), 25_000_000);
    }

    #[test]
    fn parse_rejects_garbage_and_zero() {
        assert!("fast".parse::<Frequency>().is_err());
        assert!("0MHz".parse::<Frequency>().is_err());
        assert!("-5Hz".parse::<Frequency>().is_err());
        let err = "abcHz".parse::<Frequency>().unwrap_err();
        assert_eq!(err.to_string(), "invalid frequency 'abcHz'");
    }

    #[test]
    fn display_picks_unit() {
        let f = Frequency::from_hz(122_880_000).unwrap();
        assert_eq!(f.to_string(), "122.88MHz");
        assert_eq!(Frequency::from_hz(20_000).unwrap().to_string(), "20kHz");
        assert_eq!(Frequency::from_hz(999).unwrap().to_string(), "999Hz");
        assert_eq!(Frequency::from_hz(2_000_000_000).unwrap().to_string(), "2GHz");
    }

    #[test]
    fn period_rounding() {
        let f: Frequency = "100MHz".parse().unwrap();
        assert_eq!(f.period_fs(), 10_000_000);
        let f: Frequency = "3Hz".parse().unwrap();
        assert_eq!(f.period_fs(), 333_333_333_333_333);
    }

    #[test]
    fn resampled_count_floors() {
        let fin: Frequency = "122.88MHz".parse().unwrap();
        let fout: Frequency = "20MHz".parse().unwrap();
        assert_eq!(fin.resampled_count(fout, 10_000), 1627);
        assert_eq!(fin.resampled_count(fout, 0), 0);
    }

    #[test]
    fn zero_is_not_a_frequency() {
        assert!(Frequency::from_hz(0).is_none());
    }

    #[test]
    fn serde_as_string() {
        let f: Frequency = serde_json::from_str("\"50MHz\"").unwrap();
        assert_eq!(f.hz(), 50_000_000);
        assert_eq!(serde_json::to_string(&f).unwrap(), "\"50MHz\"");
        assert!(serde_json::from_str::<Frequency>("\"nope\"").is_err());
    }
}
