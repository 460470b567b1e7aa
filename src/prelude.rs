//! Prelude module for the UltraStar crate.
//!
//! Re-exports all commonly used types for convenient access. Use
//! `use ultrastar_rs::prelude::*;` to import everything at once.

#[cfg(feature = "diagnostics")]
pub use crate::diagnostics::{SimpleSource, ToAriadne, emit_read_errors};

pub use crate::song::{
    Beat, Bpm, Header, HeaderValueError, MAX_BEAT, Note, NoteKind, ParsePitchError,
    ParseVersionError, Phrases, Pitch, Song, Version, Voice, canonical_header_key,
    encode_multi_value, unique_value_as,
};

pub use crate::txt::{
    BpmChangePolicy, Dialect, EncodingRegistry, HeaderError, HeaderErrorKind, HeaderErrors,
    LineScanner, NoteLineError, ReadError, ReadSongOutput, Reader, SyntaxError, SyntaxErrorKind,
    VersionRules, Writer, parse_song, read_song, transcode_song, write_song,
};
