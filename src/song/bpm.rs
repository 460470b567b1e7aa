//! Song tempo.

use time::Duration;

use super::note::Beat;

/// The tempo of a song, counting the number of [`Beat`]s per minute.
///
/// Note that UltraStar TXT files store a quarter of the actual BPM value. The
/// `Bpm` type always holds the in-memory value, which is four times the
/// number found in a file; the conversion is performed by
/// [`Reader`](crate::txt::Reader) and [`Writer`](crate::txt::Writer).
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bpm(pub f64);

impl Bpm {
    /// Indicates whether this is a valid BPM number. Valid BPM numbers are
    /// finite, positive values.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.0.is_finite() && self.0 > 0.0
    }

    /// Returns the number of beats in the specified duration, rounded towards
    /// zero. The result is unspecified if `self` is not valid.
    #[must_use]
    pub fn beats(self, d: Duration) -> Beat {
        (self.0 * d.as_seconds_f64() / 60.0) as Beat
    }

    /// Returns the time it takes for `beats` beats to pass. Returns a zero
    /// duration if `self` is not valid.
    #[must_use]
    pub fn duration(self, beats: Beat) -> Duration {
        if !self.is_valid() {
            return Duration::ZERO;
        }
        Duration::seconds_f64(beats as f64 / self.0 * 60.0)
    }
}

impl From<f64> for Bpm {
    fn from(value: f64) -> Self {
        Self(value)
    }
}
