//! Notes and their timing.

use std::cmp::Ordering;
use std::fmt;

use super::pitch::Pitch;

/// A position or duration measured in beats.
///
/// A beat is not an absolute measurement of time but must be viewed relative
/// to the [`Bpm`](super::Bpm) value of a song.
pub type Beat = i64;

/// The maximum value of the [`Beat`] type.
pub const MAX_BEAT: Beat = Beat::MAX;

/// The kind of a [`Note`] determines how it is to be sung and rated.
///
/// Each kind corresponds to a single printable byte in the UltraStar TXT
/// format, available through [`NoteKind::as_byte`].
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NoteKind {
    /// The end of a musical phrase, usually a line break in the lyrics.
    /// End-of-phrase markers carry no duration, pitch or text.
    EndOfPhrase,
    /// A normal, sung note.
    Regular,
    /// A sung note that can award bonus points.
    Golden,
    /// A note that is not scored.
    Freestyle,
    /// A rap note whose pitch is irrelevant.
    Rap,
    /// A rap note that can award bonus points.
    GoldenRap,
}

impl NoteKind {
    /// Returns the byte representing this kind in the UltraStar TXT format.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::EndOfPhrase => b'-',
            Self::Regular => b':',
            Self::Golden => b'*',
            Self::Freestyle => b'F',
            Self::Rap => b'R',
            Self::GoldenRap => b'G',
        }
    }

    /// Returns the kind corresponding to a byte in the UltraStar TXT format,
    /// or [`None`] if the byte does not name a note kind.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'-' => Some(Self::EndOfPhrase),
            b':' => Some(Self::Regular),
            b'*' => Some(Self::Golden),
            b'F' => Some(Self::Freestyle),
            b'R' => Some(Self::Rap),
            b'G' => Some(Self::GoldenRap),
            _ => None,
        }
    }

    /// Indicates if a note is a normally sung note (golden or not).
    #[must_use]
    pub const fn is_sung(self) -> bool {
        matches!(self, Self::Regular | Self::Golden)
    }

    /// Indicates if a note is a rap note (golden or not).
    #[must_use]
    pub const fn is_rap(self) -> bool {
        matches!(self, Self::Rap | Self::GoldenRap)
    }

    /// Indicates if a note is a golden note (rap or regular).
    #[must_use]
    pub const fn is_golden(self) -> bool {
        matches!(self, Self::Golden | Self::GoldenRap)
    }

    /// Indicates if a note is a freestyle note.
    #[must_use]
    pub const fn is_freestyle(self) -> bool {
        matches!(self, Self::Freestyle)
    }

    /// Indicates if a note is an end-of-phrase marker.
    #[must_use]
    pub const fn is_end_of_phrase(self) -> bool {
        matches!(self, Self::EndOfPhrase)
    }
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_byte() as char)
    }
}

/// The smallest timed unit of text in a song, usually a single syllable.
///
/// End-of-phrase markers are represented as notes with
/// [`NoteKind::EndOfPhrase`], zero duration, zero pitch and a text of `"\n"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Note {
    /// The kind of the note.
    pub kind: NoteKind,
    /// The absolute start beat.
    pub start: Beat,
    /// The number of beats the note is held.
    pub duration: Beat,
    /// The pitch of the note.
    pub pitch: Pitch,
    /// The lyric of the note, including whitespace.
    pub text: String,
}

impl Note {
    /// Returns the lyrics of the note. This is the note's text, or `"\n"` for
    /// end-of-phrase markers.
    #[must_use]
    pub fn lyrics(&self) -> &str {
        if self.kind.is_end_of_phrase() {
            "\n"
        } else {
            &self.text
        }
    }

    /// Orders notes by their start beat.
    #[must_use]
    pub fn cmp_start(&self, other: &Self) -> Ordering {
        self.start.cmp(&other.start)
    }
}

impl fmt::Display for Note {
    /// Formats the note similar to the UltraStar TXT format. This format
    /// should not be relied upon; use [`Writer`](crate::txt::Writer) for
    /// consistent serialization.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_end_of_phrase() {
            write!(f, "{} {}", self.kind, self.start)
        } else {
            write!(
                f,
                "{} {} {} {} {}",
                self.kind, self.start, self.duration, self.pitch.0, self.text
            )
        }
    }
}
