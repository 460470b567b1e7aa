//! Parsing of a single note line.

use std::str::{self, FromStr};

use encoding_rs::Encoding;
use thiserror::Error;

use crate::song::{Beat, Note, NoteKind, Pitch};

use super::encoding::decode_bytes;

/// An error parsing a single note line.
///
/// The error is wrapped into
/// [`SyntaxErrorKind::InvalidNote`](super::SyntaxErrorKind::InvalidNote) or
/// [`SyntaxErrorKind::InvalidLineBreak`](super::SyntaxErrorKind::InvalidLineBreak)
/// by the reader, depending on the kind of the offending line.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoteLineError {
    /// The first byte of the line did not name a note kind.
    #[error("invalid note type")]
    InvalidType,
    /// The start beat was not a valid integer.
    #[error("invalid note start: {0}")]
    InvalidStart(String),
    /// The duration was not a valid integer.
    #[error("invalid note duration: {0}")]
    InvalidDuration(String),
    /// The pitch was not a valid integer.
    #[error("invalid note pitch: {0}")]
    InvalidPitch(String),
    /// The relative offset of an end-of-phrase line was not a valid integer.
    #[error("invalid relative offset: {0}")]
    InvalidRelativeOffset(String),
    /// An end-of-phrase line carried unexpected extra text.
    #[error("extra text")]
    ExtraText,
    /// The pitch was not followed by a whitespace character.
    #[error("missing whitespace after note pitch")]
    MissingWhitespace,
    /// The note text was empty.
    #[error("empty note text")]
    EmptyText,
}

/// Reader state consulted while parsing a note line.
pub(crate) struct NoteLineContext<'a> {
    /// Whether the reader operates in relative mode.
    pub relative: bool,
    /// Whether extra text on end-of-phrase lines is an error.
    pub strict_line_breaks: bool,
    /// The relative offset of the current voice. In relative mode,
    /// end-of-phrase lines advance this offset.
    pub rel: &'a mut Beat,
    /// The encoding of note texts.
    pub encoding: Option<&'static Encoding>,
}

/// Parses a single note line into a [`Note`].
///
/// Regular notes have the shape `X Start Duration Pitch Text` where exactly
/// one whitespace character separates the pitch from the text (which keeps
/// any further whitespace). End-of-phrase lines have the shape `- Start`, or
/// `- Start Offset` in relative mode.
///
/// The relative offset of the current voice is added to the start beat; in
/// absolute mode it is always zero.
pub(crate) fn parse_note_line(
    line: &[u8],
    cx: NoteLineContext<'_>,
) -> Result<Note, NoteLineError> {
    let (&first, rest) = line.split_first().ok_or(NoteLineError::InvalidType)?;
    let kind = NoteKind::from_byte(first).ok_or(NoteLineError::InvalidType)?;
    let mut note = Note {
        kind,
        start: 0,
        duration: 0,
        pitch: Pitch(0),
        text: if kind.is_end_of_phrase() {
            "\n".to_string()
        } else {
            String::new()
        },
    };

    let (field, rest) = next_field(rest);
    note.start = parse_int(field).map_err(NoteLineError::InvalidStart)? + *cx.rel;

    if kind.is_end_of_phrase() && !cx.relative {
        if cx.strict_line_breaks && !rest.trim_ascii().is_empty() {
            return Err(NoteLineError::ExtraText);
        }
        return Ok(note);
    }

    let (field, rest) = next_field(rest);
    if kind.is_end_of_phrase() {
        // Relative mode: the second field advances the phrase offset.
        let offset = parse_int(field).map_err(NoteLineError::InvalidRelativeOffset)?;
        if cx.strict_line_breaks && !rest.trim_ascii().is_empty() {
            return Err(NoteLineError::ExtraText);
        }
        *cx.rel += offset;
        return Ok(note);
    }
    note.duration = parse_int(field).map_err(NoteLineError::InvalidDuration)?;

    // The pitch is read as a greedy integer prefix so that a missing
    // separator before the text is reported as such.
    let (field, rest) = int_prefix(rest.trim_ascii_start());
    note.pitch = Pitch(parse_int(field).map_err(NoteLineError::InvalidPitch)? as i32);

    let text = match first_char(rest) {
        Some((c, len)) if c.is_whitespace() => &rest[len..],
        _ => return Err(NoteLineError::MissingWhitespace),
    };
    if text.is_empty() {
        return Err(NoteLineError::EmptyText);
    }
    note.text = decode_bytes(text, cx.encoding);
    Ok(note)
}

impl FromStr for Note {
    type Err = NoteLineError;

    /// Parses a single absolute-mode note line.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rel = 0;
        parse_note_line(
            s.as_bytes(),
            NoteLineContext {
                relative: false,
                strict_line_breaks: true,
                rel: &mut rel,
                encoding: None,
            },
        )
    }
}

/// Returns the first whitespace-delimited field of `bytes` and the
/// remainder. Leading whitespace is skipped; the remainder may start with a
/// whitespace byte.
pub(crate) fn next_field(bytes: &[u8]) -> (&[u8], &[u8]) {
    let bytes = bytes.trim_ascii_start();
    let end = bytes
        .iter()
        .position(u8::is_ascii_whitespace)
        .unwrap_or(bytes.len());
    bytes.split_at(end)
}

/// Parses a whitespace-delimited field as an integer.
pub(crate) fn parse_int(field: &[u8]) -> Result<Beat, String> {
    str::from_utf8(field)
        .map_err(|err| err.to_string())
        .and_then(|s| s.parse::<Beat>().map_err(|err| err.to_string()))
}

/// Splits `bytes` after a leading optionally-signed run of ASCII digits.
fn int_prefix(bytes: &[u8]) -> (&[u8], &[u8]) {
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    bytes.split_at(end)
}

/// Decodes the first UTF-8 character of `bytes` along with its byte length.
fn first_char(bytes: &[u8]) -> Option<(char, usize)> {
    for len in 1..=bytes.len().min(4) {
        if let Ok(s) = str::from_utf8(&bytes[..len]) {
            return s.chars().next().map(|c| (c, len));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_note() {
        let note: Note = ": 5 2 -3 body".parse().unwrap();
        assert_eq!(note.kind, NoteKind::Regular);
        assert_eq!(note.start, 5);
        assert_eq!(note.duration, 2);
        assert_eq!(note.pitch, Pitch(-3));
        assert_eq!(note.text, "body");
    }

    #[test]
    fn text_keeps_inner_and_trailing_whitespace() {
        let note: Note = "R 2 11 6 once  ".parse().unwrap();
        assert_eq!(note.kind, NoteKind::Rap);
        assert_eq!(note.text, "once  ");

        let note: Note = ": 0 1 0  lean".parse().unwrap();
        assert_eq!(note.text, " lean");

        let note: Note = "* 0 1 0 \tgold en\t".parse().unwrap();
        assert_eq!(note.kind, NoteKind::Golden);
        assert_eq!(note.text, "\tgold en\t");
    }

    #[test]
    fn fields_accept_tabs_and_runs_of_whitespace() {
        let note: Note = "F\t3   1\t\t9 free".parse().unwrap();
        assert_eq!(note.kind, NoteKind::Freestyle);
        assert_eq!((note.start, note.duration, note.pitch.0), (3, 1, 9));
        assert_eq!(note.text, "free");
    }

    #[test]
    fn line_break() {
        let note: Note = "- 3".parse().unwrap();
        assert_eq!(note.kind, NoteKind::EndOfPhrase);
        assert_eq!(note.start, 3);
        assert_eq!(note.duration, 0);
        assert_eq!(note.text, "\n");

        assert_eq!("- 3 extra".parse::<Note>(), Err(NoteLineError::ExtraText));
    }

    #[test]
    fn relative_line_break_advances_offset() {
        let mut rel = 10;
        let note = parse_note_line(
            b"- 3 5",
            NoteLineContext {
                relative: true,
                strict_line_breaks: true,
                rel: &mut rel,
                encoding: None,
            },
        )
        .unwrap();
        assert_eq!(note.start, 13);
        assert_eq!(note.duration, 0);
        assert_eq!(rel, 15);
    }

    #[test]
    fn relative_note_is_shifted() {
        let mut rel = 32;
        let note = parse_note_line(
            b": 1 2 4 Some",
            NoteLineContext {
                relative: true,
                strict_line_breaks: true,
                rel: &mut rel,
                encoding: None,
            },
        )
        .unwrap();
        assert_eq!(note.start, 33);
        assert_eq!(rel, 32);
    }

    #[test]
    fn errors() {
        assert_eq!("".parse::<Note>(), Err(NoteLineError::InvalidType));
        assert_eq!("x 1 2 3 a".parse::<Note>(), Err(NoteLineError::InvalidType));
        assert!(matches!(
            ": x 2 3 a".parse::<Note>(),
            Err(NoteLineError::InvalidStart(_))
        ));
        assert!(matches!(
            ": 1 x 3 a".parse::<Note>(),
            Err(NoteLineError::InvalidDuration(_))
        ));
        assert!(matches!(
            ": 1 2 x a".parse::<Note>(),
            Err(NoteLineError::InvalidPitch(_))
        ));
        assert_eq!(
            ": 5 4 3test".parse::<Note>(),
            Err(NoteLineError::MissingWhitespace)
        );
        assert_eq!(
            ": 5 4 -3test".parse::<Note>(),
            Err(NoteLineError::MissingWhitespace)
        );
        assert_eq!(": 5 4 3 ".parse::<Note>(), Err(NoteLineError::EmptyText));
        assert_eq!(": 5 4 3".parse::<Note>(), Err(NoteLineError::MissingWhitespace));
    }
}
