//! Reading and writing the UltraStar TXT format.
//!
//! The format consists of a header block of `#KEY:VALUE` lines followed by a
//! body of note lines, optionally terminated by a line consisting of a
//! single `E`:
//!
//! ```text
//! #TITLE:All Star
//! #ARTIST:Smash Mouth
//! #BPM:312
//! : 0 4 0 Some
//! : 5 3 0 ~bo
//! : 9 3 0 dy
//! - 14
//! E
//! ```
//!
//! [`Reader`] parses this format into a [`Song`]; [`Writer`] serializes a
//! [`Song`] back. Both are version-aware: the `#VERSION` header selects
//! unit conventions and the set of recognized headers (see
//! [`VersionRules`]), while a [`Dialect`] controls how strictly the reader
//! treats malformed input.
//!
//! The simplest entry points are [`parse_song`], [`read_song`] and
//! [`write_song`]:
//!
//! ```
//! use ultrastar_rs::txt;
//!
//! let song = txt::parse_song("#BPM:12\n: 1 2 0 Some\n: 3 2 0 body\n").unwrap();
//! assert_eq!(song.bpm, ultrastar_rs::song::Bpm(48.0));
//! assert_eq!(song.voices[0].notes.len(), 2);
//! ```

mod dialect;
mod encoding;
mod note_line;
mod reader;
mod scanner;
mod song_header;
mod writer;

use std::fmt;
use std::io::{self, BufRead, Write};

use itertools::Itertools;
use thiserror::Error;

use crate::song::{HeaderValueError, Song, Version, canonical_header_key};

pub use dialect::{BpmChangePolicy, Dialect, VersionRules};
pub use encoding::{EncodingRegistry, transcode_song};
pub use note_line::NoteLineError;
pub use reader::{ReadSongOutput, Reader};
pub use scanner::LineScanner;
pub use writer::Writer;

/// An error at a specific line of the body of a song.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at line {line}: {kind}")]
pub struct SyntaxError {
    /// The 1-based line number that could not be processed.
    pub line: usize,
    /// What went wrong.
    pub kind: SyntaxErrorKind,
}

/// The kinds of syntax errors in the body of a song.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxErrorKind {
    /// An empty line, under a dialect that does not skip them.
    #[error("unexpected empty line")]
    EmptyLine,
    /// A `P` line with a number outside `1..=9`.
    #[error("invalid voice change")]
    InvalidVoiceNumber,
    /// A `P` line in a song whose body did not lead with one.
    #[error("unexpected voice change")]
    UnexpectedVoiceChange,
    /// A malformed note line.
    #[error("invalid note: {0}")]
    InvalidNote(NoteLineError),
    /// A malformed end-of-phrase line.
    #[error("invalid line break: {0}")]
    InvalidLineBreak(NoteLineError),
    /// A malformed legacy `B` tempo-change line.
    #[error("invalid BPM change")]
    InvalidBpmChange,
    /// A legacy `B` tempo-change line, under a dialect that rejects them.
    #[error("BPM changes are not supported")]
    MultiBpm,
    /// An `E` end tag followed by extra text.
    #[error("invalid end tag")]
    InvalidEndTag,
    /// The input ended without an `E` end tag, under a dialect that
    /// requires one.
    #[error("missing end tag")]
    MissingEndTag,
    /// A body line starting with an unrecognized byte.
    #[error("unknown event")]
    UnknownEvent,
}

/// An invalid value for a specific header.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid value for header \"#{key}\": {kind}")]
pub struct HeaderError {
    /// The canonical key of the offending header.
    pub key: String,
    /// What went wrong.
    pub kind: HeaderErrorKind,
}

impl HeaderError {
    /// Creates a header error, canonicalizing the key.
    #[must_use]
    pub fn new(key: &str, kind: HeaderErrorKind) -> Self {
        Self {
            key: canonical_header_key(key),
            kind,
        }
    }

    /// Checks whether this error concerns the given header key. The key is
    /// canonicalized before the comparison; an empty key matches any header
    /// error.
    #[must_use]
    pub fn matches_key(&self, key: &str) -> bool {
        let key = canonical_header_key(key);
        key.is_empty() || self.key == key
    }
}

/// The kinds of header-level errors.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HeaderErrorKind {
    /// A single-valued header contained multiple different values.
    #[error("multiple values")]
    MultipleValues,
    /// A required header had no value.
    #[error("no value")]
    NoValue,
    /// A numeric header value could not be parsed.
    #[error("invalid number: {0}")]
    InvalidNumber(String),
    /// The `VERSION` header could not be parsed.
    #[error("invalid version: {0}")]
    InvalidVersion(String),
    /// The `BPM` header did not hold a finite, positive value.
    #[error("invalid BPM value: {0}")]
    InvalidBpm(f64),
    /// The `ENCODING` header named an encoding missing from the registry.
    #[error("unknown encoding {0:?}")]
    UnknownEncoding(String),
    /// The `RELATIVE` header was set but the dialect forbids relative
    /// songs.
    #[error("relative mode not allowed")]
    RelativeNotAllowed,
    /// A URL header could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<HeaderValueError> for HeaderErrorKind {
    fn from(error: HeaderValueError) -> Self {
        match error {
            HeaderValueError::MultipleValues => Self::MultipleValues,
            HeaderValueError::NoValue => Self::NoValue,
        }
    }
}

/// A collection of [`HeaderError`]s reported together, since one bad header
/// does not prevent the remaining headers from being processed.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderErrors(pub Vec<HeaderError>);

impl HeaderErrors {
    /// Checks whether any of the errors concerns the given header key.
    #[must_use]
    pub fn matches_key(&self, key: &str) -> bool {
        self.0.iter().any(|error| error.matches_key(key))
    }

    /// Iterates over the individual errors.
    pub fn iter(&self) -> impl Iterator<Item = &HeaderError> {
        self.0.iter()
    }
}

impl fmt::Display for HeaderErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().format("; "))
    }
}

impl std::error::Error for HeaderErrors {}

/// Any error that can occur while reading a song.
///
/// The three strata are kept structurally distinct: I/O errors propagate
/// unchanged from the underlying reader, syntax errors carry the offending
/// line number, and header errors carry the offending key.
#[derive(Debug, Error)]
pub enum ReadError {
    /// An error of the underlying reader.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// A malformed body line.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    /// One or more invalid header values.
    #[error(transparent)]
    Header(#[from] HeaderErrors),
}

impl ReadError {
    /// Returns the syntax error, if this is one.
    #[must_use]
    pub fn syntax(&self) -> Option<&SyntaxError> {
        match self {
            Self::Syntax(error) => Some(error),
            _ => None,
        }
    }

    /// Returns the header errors, if this is such an error.
    #[must_use]
    pub fn header(&self) -> Option<&HeaderErrors> {
        match self {
            Self::Header(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Parses a song from a string. This is a convenience wrapper around
/// [`Reader::read_song`] with the default dialect.
pub fn parse_song(s: &str) -> Result<Song, ReadError> {
    read_song(s.as_bytes())
}

/// Reads a song from `rd`. This is a convenience wrapper around
/// [`Reader::read_song`] with the default dialect.
pub fn read_song<R: BufRead>(rd: R) -> Result<Song, ReadError> {
    Reader::new(rd)?.read_song()
}

/// Writes `song` to `wr` in the given format version, including the final
/// end tag. This is a convenience wrapper around [`Writer::write_song`].
pub fn write_song<W: Write>(wr: W, song: &Song, version: Version) -> io::Result<()> {
    Writer::new(wr, version).write_song(song)
}
