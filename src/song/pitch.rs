//! Note pitches.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// The names of the twelve pitch classes. Only sharps are used, so D♭ and C♯
/// both map to `"C#"`.
const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// The pitch of a note.
///
/// A pitch of 0 corresponds to C4, +1 is a half step up (C♯4), +12 is C5.
/// Negative pitches are valid and denote notes below C4.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pitch(pub i32);

impl Pitch {
    /// Returns the human-readable name of the pitch class. The note naming
    /// uses sharps exclusively, so a D flat and a C sharp both return `"C#"`.
    #[must_use]
    pub fn note_name(self) -> &'static str {
        NOTE_NAMES[self.0.rem_euclid(12) as usize]
    }

    /// Returns the [scientific octave] of the pitch.
    ///
    /// [scientific octave]: https://en.wikipedia.org/wiki/Octave#Notation
    #[must_use]
    pub fn octave(self) -> i32 {
        self.0.div_euclid(12) + 4
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.note_name(), self.octave())
    }
}

/// An error parsing a [`Pitch`] from its string representation.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsePitchError {
    /// The first character did not name a pitch.
    #[error("unknown pitch name")]
    UnknownName,
    /// The octave was not a valid integer.
    #[error("invalid octave: {0}")]
    InvalidOctave(String),
}

impl FromStr for Pitch {
    type Err = ParsePitchError;

    /// Parses a pitch from a name such as `"C4"`, `"F#"` or `"Bb2"`.
    ///
    /// The name consists of one of the letters `A` to `G`, an optional
    /// accidental (`#`, `b`, `♯` or `♭`) and an optional octave number. If
    /// the octave is omitted, it defaults to 4.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let base = match chars.next() {
            Some('C') => 0,
            Some('D') => 2,
            Some('E') => 4,
            Some('F') => 5,
            Some('G') => 7,
            Some('A') => 9,
            Some('B') => 11,
            _ => return Err(ParsePitchError::UnknownName),
        };
        let rest = chars.as_str();
        let (accidental, rest) = match rest.chars().next() {
            Some(c @ ('#' | '♯')) => (1, &rest[c.len_utf8()..]),
            Some(c @ ('b' | '♭')) => (-1, &rest[c.len_utf8()..]),
            _ => (0, rest),
        };
        let octave = if rest.is_empty() {
            4
        } else {
            rest.parse::<i32>()
                .map_err(|err| ParsePitchError::InvalidOctave(err.to_string()))?
        };
        Ok(Pitch(base + accidental + (octave - 4) * 12))
    }
}
