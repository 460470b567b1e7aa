//! Reading songs from the UltraStar TXT format.

use std::io::{self, BufRead};

use encoding_rs::Encoding;

use crate::song::header::{
    HEADER_ENCODING, HEADER_RELATIVE, HEADER_VERSION, canonical_header_key, unique_value_as,
};
use crate::song::{Beat, Header, Note, Song, Version, Voice};

use super::dialect::{BpmChangePolicy, Dialect, VersionRules};
use super::encoding::{EncodingRegistry, decode_bytes, reinterpret};
use super::note_line::{NoteLineContext, next_field, parse_int, parse_note_line};
use super::song_header::{song_from_header, voices_from_header};
use super::{
    HeaderError, HeaderErrorKind, HeaderErrors, ReadError, SyntaxError, SyntaxErrorKind,
};

/// A raw header line: key bytes and, unless the line was a bare key, value
/// bytes. Bytes are kept until the encoding has been negotiated.
type RawHeaderLine = (Vec<u8>, Option<Vec<u8>>);

/// The result of reading a song in best-effort mode, see
/// [`Reader::read_song_relaxed`].
#[derive(Debug)]
#[must_use]
pub struct ReadSongOutput {
    /// The parsed song, complete up to the reported errors.
    pub song: Song,
    /// All errors encountered while reading.
    pub errors: Vec<ReadError>,
}

/// A parser for the UltraStar TXT format.
///
/// A reader works in two phases:
///
/// 1. Binding it to an input stream (via [`Reader::new`],
///    [`Reader::with_dialect`] or [`Reader::reset`]) eagerly reads the
///    entire file header. The header configures the reader: `#VERSION`
///    selects the format rules, and for old format versions `#RELATIVE`
///    enables relative mode and `#ENCODING` selects a code page. These
///    headers are not passed on to songs created by the reader.
/// 2. The notes of the song are then read via [`Reader::read_note`], or
///    [`Reader::read_song`]/[`Reader::read_song_relaxed`] which drive the
///    note stream to completion.
///
/// Between the two phases the caller may freely inspect or override
/// [`header`](Self::header), [`version`](Self::version),
/// [`relative`](Self::relative) and [`encoding`](Self::encoding).
///
/// A reader is not safe for concurrent use; distinct readers are.
pub struct Reader<R> {
    /// The raw header values of the current file. Keys are canonicalized via
    /// [`canonical_header_key`]. Only valid until the next
    /// [`reset`](Self::reset).
    pub header: Header,
    /// The format version, from the `#VERSION` header. Defaults to
    /// [`Version::V0_3_0`] when the header is absent. Determines
    /// version-dependent parsing behavior; may be overridden before notes
    /// are read.
    pub version: Version,
    /// Whether note times are interpreted relative to the end of the
    /// previous phrase. Set from the `#RELATIVE` header for format versions
    /// before 1.0.0.
    pub relative: bool,
    /// The encoding used to decode note texts; `None` means UTF-8. Set from
    /// the `#ENCODING` header for format versions before 1.0.0. Assigning
    /// the field only affects future reads; [`Reader::use_encoding`] also
    /// reinterprets the collected header.
    pub encoding: Option<&'static Encoding>,

    dialect: Dialect,
    encodings: EncodingRegistry,
    header_errors: Vec<HeaderError>,
    scanner: super::LineScanner<R>,
    done: bool,
    saw_end_tag: bool,
    body_started: bool,
    duet: bool,
    voice: usize,
    rel: [Beat; 9],
}

impl<R: BufRead> Reader<R> {
    /// Creates a reader with the default [`Dialect`] and
    /// [`EncodingRegistry`] and reads the header block from `rd`.
    ///
    /// I/O errors fail construction. Errors about individual header values
    /// are collected instead and surface through
    /// [`header_errors`](Self::header_errors) and the `read_song` methods.
    pub fn new(rd: R) -> io::Result<Self> {
        Self::with_dialect(rd, Dialect::default(), EncodingRegistry::default())
    }

    /// Creates a reader with an explicit dialect and encoding registry and
    /// reads the header block from `rd`.
    pub fn with_dialect(rd: R, dialect: Dialect, encodings: EncodingRegistry) -> io::Result<Self> {
        let mut reader = Self {
            header: Header::new(),
            version: Version::V0_3_0,
            relative: false,
            encoding: None,
            dialect,
            encodings,
            header_errors: Vec::new(),
            scanner: super::LineScanner::new(rd),
            done: false,
            saw_end_tag: false,
            body_started: false,
            duet: false,
            voice: 0,
            rel: [0; 9],
        };
        reader.configure_scanner();
        reader.read_header()?;
        Ok(reader)
    }

    /// Resets the reader to read from `rd`, keeping its dialect and encoding
    /// registry, and reads the new file's header block.
    pub fn reset(&mut self, rd: R) -> io::Result<()> {
        self.scanner = super::LineScanner::new(rd);
        self.configure_scanner();
        self.header = Header::new();
        self.version = Version::V0_3_0;
        self.relative = false;
        self.encoding = None;
        self.header_errors.clear();
        self.done = false;
        self.saw_end_tag = false;
        self.body_started = false;
        self.duet = false;
        self.voice = 0;
        self.rel = [0; 9];
        self.read_header()
    }

    fn configure_scanner(&mut self) {
        self.scanner.trim_leading_whitespace = self.dialect.trim_leading_whitespace;
    }

    /// The dialect this reader was created with.
    #[must_use]
    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Errors about individual header values encountered while reading the
    /// header block, such as an unparsable `#VERSION` or an unknown
    /// `#ENCODING`. These do not abort header reading.
    #[must_use]
    pub fn header_errors(&self) -> &[HeaderError] {
        &self.header_errors
    }

    /// Returns the 1-based number of lines processed so far. After a call to
    /// [`read_note`](Self::read_note) this is the line number of the note.
    #[must_use]
    pub fn line(&self) -> usize {
        self.scanner.line()
    }

    /// Switches the reader to a new text encoding and reinterprets all
    /// collected header keys and values: each string is encoded back using
    /// the previous encoding (with replacement of unsupported characters)
    /// and decoded with the new one. Future note texts are decoded with the
    /// new encoding.
    ///
    /// Reinterpretation is lossy for header strings that were not valid in
    /// the previous encoding. To only change the encoding of future reads,
    /// assign [`encoding`](Self::encoding) directly.
    pub fn use_encoding(&mut self, encoding: Option<&'static Encoding>) {
        if encoding == self.encoding {
            return;
        }
        let previous = self.encoding;
        let entries = std::mem::take(self.header.entries_mut());
        for (key, mut values) in entries {
            for value in &mut values {
                *value = reinterpret(value, previous, encoding);
            }
            let key = reinterpret(&key, previous, encoding);
            self.header
                .entries_mut()
                .entry(key)
                .or_default()
                .extend(values);
        }
        self.encoding = encoding;
    }

    /// Reads the header block and negotiates version, relative mode and
    /// encoding. Raw bytes are kept until the encoding is known, then
    /// decoded exactly once.
    fn read_header(&mut self) -> io::Result<()> {
        let mut raw: Vec<RawHeaderLine> = Vec::new();
        loop {
            if !self.scanner.scan()? {
                break;
            }
            let line = self.scanner.bytes().trim_ascii();
            if line.is_empty() {
                continue;
            }
            if line[0] != b'#' {
                self.scanner.unscan();
                break;
            }
            if line.len() == 1 {
                // A lone # carries no information.
                continue;
            }
            match line.iter().position(|&b| b == b':') {
                Some(i) => raw.push((
                    line[1..i].trim_ascii().to_vec(),
                    Some(line[i + 1..].trim_ascii().to_vec()),
                )),
                None => raw.push((line[1..].trim_ascii().to_vec(), None)),
            }
        }

        match unique_value_as::<Version, HeaderErrorKind, _>(
            &raw_values(&raw, HEADER_VERSION),
            true,
            |v| {
                v.parse()
                    .map_err(|err: crate::song::ParseVersionError| {
                        HeaderErrorKind::InvalidVersion(err.to_string())
                    })
            },
        ) {
            Ok(Some(version)) => self.version = version,
            Ok(None) | Err(HeaderErrorKind::NoValue) => self.version = Version::V0_3_0,
            Err(kind) => self
                .header_errors
                .push(HeaderError::new(HEADER_VERSION, kind)),
        }

        if VersionRules::for_version(self.version).legacy_headers {
            match unique_value_as::<bool, HeaderErrorKind, _>(
                &raw_values(&raw, HEADER_RELATIVE),
                false,
                |v| Ok(v.eq_ignore_ascii_case("yes")),
            ) {
                Ok(Some(true)) if !self.dialect.allow_relative => self.header_errors.push(
                    HeaderError::new(HEADER_RELATIVE, HeaderErrorKind::RelativeNotAllowed),
                ),
                Ok(Some(relative)) => self.relative = relative,
                Ok(None) => {}
                Err(kind) => self
                    .header_errors
                    .push(HeaderError::new(HEADER_RELATIVE, kind)),
            }
            match unique_value_as::<&'static Encoding, HeaderErrorKind, _>(
                &raw_values(&raw, HEADER_ENCODING),
                false,
                |v| {
                    self.encodings
                        .get(v)
                        .ok_or_else(|| HeaderErrorKind::UnknownEncoding(v.to_string()))
                },
            ) {
                Ok(encoding) => self.encoding = encoding,
                Err(kind) => self
                    .header_errors
                    .push(HeaderError::new(HEADER_ENCODING, kind)),
            }
        }

        for (key, value) in raw {
            let key = decode_bytes(&key, self.encoding);
            match value {
                Some(value) => {
                    let value = decode_bytes(&value, self.encoding);
                    self.header.add(&key, value);
                }
                None => {
                    let key = canonical_header_key(&key);
                    if !self.header.has(&key) {
                        self.header.set_values(&key, Vec::<String>::new());
                    }
                }
            }
        }
        Ok(())
    }

    /// Reads the next note line from the input, interpreting any voice
    /// changes preceding it. Returns the note together with the index of the
    /// voice it belongs to, or `None` once the song is complete (end of
    /// input or an `E` end tag).
    ///
    /// Syntax errors report the 1-based line number; I/O errors propagate
    /// unchanged.
    pub fn read_note(&mut self) -> Result<Option<(Note, usize)>, ReadError> {
        if self.done {
            return Ok(None);
        }
        loop {
            if !self.scanner.scan()? {
                if self.dialect.require_end_tag && !self.saw_end_tag {
                    self.done = true;
                    return Err(self.syntax_error(SyntaxErrorKind::MissingEndTag));
                }
                return Ok(None);
            }
            let line = self.scanner.bytes();
            let trimmed = line.trim_ascii();
            if trimmed.is_empty() {
                if self.dialect.skip_empty_lines {
                    continue;
                }
                return Err(self.syntax_error(SyntaxErrorKind::EmptyLine));
            }
            if !self.body_started {
                self.body_started = true;
                // Voice changes are only legal in songs whose body leads
                // with one.
                self.duet = line[0] == b'P';
            }
            match line[0] {
                b'E' => {
                    if trimmed.len() > 1 && self.dialect.strict_end_tag {
                        return Err(self.syntax_error(SyntaxErrorKind::InvalidEndTag));
                    }
                    self.done = true;
                    self.saw_end_tag = true;
                    return Ok(None);
                }
                b'P' => {
                    if !self.duet {
                        return Err(self.syntax_error(SyntaxErrorKind::UnexpectedVoiceChange));
                    }
                    match parse_int(trimmed[1..].trim_ascii()) {
                        Ok(number @ 1..=9) => self.voice = number as usize - 1,
                        _ => {
                            return Err(self.syntax_error(SyntaxErrorKind::InvalidVoiceNumber));
                        }
                    }
                    // Several voice changes in a row collapse into the last.
                    continue;
                }
                b'B' => match self.dialect.bpm_changes {
                    BpmChangePolicy::Reject => {
                        return Err(self.syntax_error(SyntaxErrorKind::MultiBpm));
                    }
                    BpmChangePolicy::Discard => {
                        if self.valid_bpm_change(&trimmed[1..]) {
                            continue;
                        }
                        return Err(self.syntax_error(SyntaxErrorKind::InvalidBpmChange));
                    }
                },
                byte => {
                    if let Some(kind) = crate::song::NoteKind::from_byte(byte) {
                        let context = NoteLineContext {
                            relative: self.relative,
                            strict_line_breaks: self.dialect.strict_line_breaks,
                            rel: &mut self.rel[self.voice],
                            encoding: self.encoding,
                        };
                        return match parse_note_line(line, context) {
                            Ok(note) => Ok(Some((note, self.voice))),
                            Err(err) => {
                                let kind = if kind.is_end_of_phrase() {
                                    SyntaxErrorKind::InvalidLineBreak(err)
                                } else {
                                    SyntaxErrorKind::InvalidNote(err)
                                };
                                Err(self.syntax_error(kind))
                            }
                        };
                    }
                    if self.dialect.allow_unknown_events {
                        continue;
                    }
                    return Err(self.syntax_error(SyntaxErrorKind::UnknownEvent));
                }
            }
        }
    }

    /// Checks the shape of a discarded `B beat rate` line.
    fn valid_bpm_change(&self, rest: &[u8]) -> bool {
        let comma = self.dialect.international_floats
            && VersionRules::for_version(self.version).comma_floats;
        let (beat, rest) = next_field(rest);
        let (rate, rest) = next_field(rest);
        if !rest.trim_ascii().is_empty() || parse_int(beat).is_err() {
            return false;
        }
        let Ok(rate) = std::str::from_utf8(rate) else {
            return false;
        };
        let rate = if comma {
            rate.replacen(',', ".", 1)
        } else {
            rate.to_string()
        };
        rate.parse::<f64>().is_ok()
    }

    /// Creates a [`Song`] from the headers collected by the reader, without
    /// advancing the reader or reading any notes. The voices carry the names
    /// from the `P1`..`P9` headers but no notes.
    ///
    /// Returns the song together with all header-level errors: those
    /// collected while reading the header block and those produced by the
    /// typed-field coercion.
    pub fn song(&self) -> (Song, Vec<HeaderError>) {
        let rules = VersionRules::for_version(self.version);
        let (mut song, coercion_errors) = song_from_header(&self.header, &rules, &self.dialect);
        let mut errors = self.header_errors.clone();
        errors.extend(coercion_errors);
        song.voices = voices_from_header(&self.header, &rules);
        (song, errors)
    }

    /// Parses a complete [`Song`]. If the song ends with an `E` end tag, the
    /// input may not be read to its end.
    ///
    /// This is the strict mode: header-level errors abort before any notes
    /// are read, and the first body error aborts the note stream. Use
    /// [`Reader::read_song_relaxed`] for best-effort parsing.
    pub fn read_song(&mut self) -> Result<Song, ReadError> {
        let (mut song, header_errors) = self.song();
        if !header_errors.is_empty() {
            return Err(HeaderErrors(header_errors).into());
        }
        song.voices.resize_with(9, Voice::default);
        while let Some((note, voice)) = self.read_note()? {
            song.voices[voice].append_notes([note]);
        }
        normalize_voices(&mut song);
        if let Some(error) = missing_bpm(&song) {
            return Err(HeaderErrors(vec![error]).into());
        }
        Ok(song)
    }

    /// Parses as much of a [`Song`] as possible, collecting errors instead
    /// of aborting. Syntax errors skip the offending line; only I/O errors
    /// stop the note stream. The returned song is complete up to the
    /// reported errors.
    pub fn read_song_relaxed(&mut self) -> ReadSongOutput {
        let (mut song, header_errors) = self.song();
        let mut errors: Vec<ReadError> = Vec::new();
        if !header_errors.is_empty() {
            errors.push(HeaderErrors(header_errors).into());
        }
        song.voices.resize_with(9, Voice::default);
        loop {
            match self.read_note() {
                Ok(Some((note, voice))) => song.voices[voice].append_notes([note]),
                Ok(None) => break,
                Err(error @ ReadError::Syntax(_)) => errors.push(error),
                Err(error) => {
                    errors.push(error);
                    break;
                }
            }
        }
        normalize_voices(&mut song);
        if let Some(error) = missing_bpm(&song) {
            errors.push(HeaderErrors(vec![error]).into());
        }
        ReadSongOutput { song, errors }
    }

    fn syntax_error(&self, kind: SyntaxErrorKind) -> ReadError {
        ReadError::Syntax(SyntaxError {
            line: self.scanner.line(),
            kind,
        })
    }
}

/// Collects the lossily decoded values of a canonical key from the raw
/// header lines. Used to negotiate version and encoding, whose values are
/// ASCII in any relevant code page.
fn raw_values(raw: &[RawHeaderLine], key: &str) -> Vec<String> {
    raw.iter()
        .filter(|(k, _)| canonical_header_key(&String::from_utf8_lossy(k)) == key)
        .filter_map(|(_, v)| v.as_ref())
        .map(|v| String::from_utf8_lossy(v).into_owned())
        .collect()
}

/// Drops trailing voices that have neither a name nor meaningful notes and
/// restores the sort invariant of the remaining voices.
fn normalize_voices(song: &mut Song) {
    while song
        .voices
        .last()
        .is_some_and(|v| v.name.is_empty() && v.is_empty())
    {
        song.voices.pop();
    }
    for voice in &mut song.voices {
        voice.sort_notes();
    }
}

/// A song that contains notes must have a tempo.
fn missing_bpm(song: &Song) -> Option<HeaderError> {
    let has_notes = song.voices.iter().any(|v| !v.notes.is_empty());
    (has_notes && song.bpm == crate::song::Bpm::default())
        .then(|| HeaderError::new(crate::song::header::HEADER_BPM, HeaderErrorKind::NoValue))
}
