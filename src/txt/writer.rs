//! Writing songs in the UltraStar TXT format.

use std::io::{self, Write};

use crate::song::header::{
    HEADER_ARTIST, HEADER_AUDIO, HEADER_BACKGROUND, HEADER_BPM, HEADER_CALC_MEDLEY,
    HEADER_COMMENT, HEADER_COVER, HEADER_CREATOR, HEADER_EDITION, HEADER_ENCODING, HEADER_END,
    HEADER_GAP, HEADER_GENRE, HEADER_INSTRUMENTAL, HEADER_LANGUAGE, HEADER_MEDLEY_END_BEAT,
    HEADER_MEDLEY_START_BEAT, HEADER_MP3, HEADER_PREVIEW_START, HEADER_PROVIDED_BY,
    HEADER_RELATIVE, HEADER_START, HEADER_TAGS, HEADER_TITLE, HEADER_VERSION, HEADER_VIDEO,
    HEADER_VIDEOGAP, HEADER_VOCALS, HEADER_YEAR,
};
use crate::song::{Beat, Header, Note, Song, Version};

use super::dialect::VersionRules;
use super::song_header::header_from_song;

/// The standard headers of format versions before 0.2.0, in emission order.
const HEADERS_010: &[&str] = &[
    HEADER_VERSION,
    HEADER_TITLE,
    HEADER_ARTIST,
    HEADER_MP3,
    HEADER_BPM,
];

/// The standard headers of format versions 0.2.0 up to 1.0.0.
const HEADERS_020: &[&str] = &[
    HEADER_VERSION,
    HEADER_ENCODING,
    HEADER_TITLE,
    HEADER_ARTIST,
    HEADER_MP3,
    HEADER_BPM,
    HEADER_GAP,
    HEADER_COVER,
    HEADER_BACKGROUND,
    HEADER_VIDEO,
    HEADER_VIDEOGAP,
    HEADER_GENRE,
    HEADER_EDITION,
    HEADER_CREATOR,
    HEADER_LANGUAGE,
    HEADER_YEAR,
    HEADER_START,
    HEADER_END,
    HEADER_PREVIEW_START,
    HEADER_MEDLEY_START_BEAT,
    HEADER_MEDLEY_END_BEAT,
    HEADER_CALC_MEDLEY,
    HEADER_COMMENT,
    HEADER_RELATIVE,
];

/// The standard headers of format versions 1.0.0 up to 1.1.0, which dropped
/// `ENCODING` and `RELATIVE`.
const HEADERS_100: &[&str] = &[
    HEADER_VERSION,
    HEADER_TITLE,
    HEADER_ARTIST,
    HEADER_MP3,
    HEADER_BPM,
    HEADER_GAP,
    HEADER_COVER,
    HEADER_BACKGROUND,
    HEADER_VIDEO,
    HEADER_VIDEOGAP,
    HEADER_GENRE,
    HEADER_EDITION,
    HEADER_CREATOR,
    HEADER_LANGUAGE,
    HEADER_YEAR,
    HEADER_START,
    HEADER_END,
    HEADER_PREVIEW_START,
    HEADER_MEDLEY_START_BEAT,
    HEADER_MEDLEY_END_BEAT,
    HEADER_CALC_MEDLEY,
    HEADER_COMMENT,
];

/// The standard headers of format versions 1.1.0 and above.
const HEADERS_110: &[&str] = &[
    HEADER_VERSION,
    HEADER_TITLE,
    HEADER_ARTIST,
    HEADER_MP3,
    HEADER_AUDIO,
    HEADER_VOCALS,
    HEADER_INSTRUMENTAL,
    HEADER_BPM,
    HEADER_GAP,
    HEADER_COVER,
    HEADER_BACKGROUND,
    HEADER_VIDEO,
    HEADER_VIDEOGAP,
    HEADER_GENRE,
    HEADER_EDITION,
    HEADER_TAGS,
    HEADER_CREATOR,
    HEADER_LANGUAGE,
    HEADER_YEAR,
    HEADER_START,
    HEADER_END,
    HEADER_PREVIEW_START,
    HEADER_MEDLEY_START_BEAT,
    HEADER_MEDLEY_END_BEAT,
    HEADER_CALC_MEDLEY,
    HEADER_COMMENT,
    HEADER_PROVIDED_BY,
];

fn standard_headers(version: Version) -> &'static [&'static str] {
    if version < Version::V0_2_0 {
        HEADERS_010
    } else if version < Version::V1_0_0 {
        HEADERS_020
    } else if version < Version::V1_1_0 {
        HEADERS_100
    } else {
        HEADERS_110
    }
}

/// A serializer for the UltraStar TXT format.
///
/// A writer is bound to a sink and a format [`Version`]. The version
/// controls which headers are derived from a [`Song`] and in which order
/// they are emitted. The default settings aim to be compatible with most
/// karaoke games.
///
/// A writer is not safe for concurrent use; distinct writers are.
pub struct Writer<W> {
    /// The format version to write.
    pub version: Version,
    /// Write notes in relative mode. This is a legacy format that is not
    /// recommended anymore.
    pub relative: bool,
    /// Use a comma as the decimal separator of floating point header
    /// values.
    pub comma_float: bool,
    /// The character separating the fields of a note line. This should only
    /// be a space or a tab; other characters will most likely produce
    /// invalid songs.
    pub field_separator: char,

    wr: W,
    rel: [Beat; 9],
    voice: Option<usize>,
}

impl<W: Write> Writer<W> {
    /// Creates a writer for the given sink and format version.
    pub fn new(wr: W, version: Version) -> Self {
        Self {
            version,
            relative: false,
            comma_float: false,
            field_separator: ' ',
            wr,
            rel: [0; 9],
            voice: Some(0),
        }
    }

    /// Configures the writer to be reused, writing to `wr`. The writer's
    /// configuration is kept.
    pub fn reset(&mut self, wr: W) {
        self.wr = wr;
        self.rel = [0; 9];
        self.voice = Some(0);
    }

    /// Returns the underlying sink.
    pub fn into_inner(self) -> W {
        self.wr
    }

    /// Writes `song` in the UltraStar TXT format, including the final end
    /// tag.
    ///
    /// The header is derived from the typed fields of the song overlaid on
    /// its free-form headers; see [`Writer::write_header`] for the emission
    /// order. For duets, the first voice is introduced with an explicit `P1`
    /// line.
    pub fn write_song(&mut self, song: &Song) -> io::Result<()> {
        if self.version.is_zero() {
            self.version = Version::V0_3_0;
        }
        let rules = VersionRules::for_version(self.version);
        let mut header = header_from_song(song, &rules, self.comma_float);
        header.set(HEADER_VERSION, &self.version.to_string());
        if self.relative {
            header.set(HEADER_RELATIVE, "YES");
        } else {
            header.del(HEADER_RELATIVE);
        }
        self.write_header(&header)?;
        if song.is_duet() {
            self.voice_change();
        }
        for (voice, v) in song.voices.iter().enumerate() {
            for note in &v.notes {
                self.write_note(note, voice)?;
            }
        }
        self.close()
    }

    /// Writes all headers of `header`, ordered by the standard header table
    /// of the writer's version: standard headers first, in table order, then
    /// all remaining headers alphabetically. Multi-valued keys repeat the
    /// key on consecutive lines.
    ///
    /// Neither keys nor values are validated; use
    /// [`Header::clean`](crate::song::Header::clean) beforehand if the
    /// header may contain empty or invalid entries.
    pub fn write_header(&mut self, header: &Header) -> io::Result<()> {
        let standard = standard_headers(self.version);
        let mut entries: Vec<(&str, Option<usize>, &[String])> = header
            .iter()
            .map(|(key, values)| (key, standard.iter().position(|&s| s == key), values))
            .collect();
        entries.sort_by(|(key1, index1, _), (key2, index2, _)| match (index1, index2) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => key1.cmp(key2),
        });
        for (key, _, values) in entries {
            for value in values {
                self.write_header_line(key, value)?;
            }
        }
        Ok(())
    }

    /// Writes a single `#KEY:value` line. Neither the key nor the value are
    /// validated or normalized.
    pub fn write_header_line(&mut self, key: &str, value: &str) -> io::Result<()> {
        writeln!(self.wr, "#{key}:{value}")
    }

    /// Registers a voice change: the next note will be preceded by a `P`
    /// line even if its voice matches the previous note's.
    pub fn voice_change(&mut self) {
        self.voice = None;
    }

    /// Writes a note for the given voice. If the voice differs from the
    /// voice of the previous note, a `P` line is inserted. In relative mode
    /// the note start is adjusted by the voice's running offset.
    ///
    /// # Panics
    ///
    /// Panics if `voice` is 9 or greater.
    pub fn write_note(&mut self, note: &Note, voice: usize) -> io::Result<()> {
        assert!(voice < 9, "voice index out of range");
        if self.voice != Some(voice) {
            writeln!(self.wr, "P{}", voice + 1)?;
            self.voice = Some(voice);
        }
        let sep = self.field_separator;
        let mut start = note.start;
        if self.relative {
            start -= self.rel[voice];
        }
        if note.kind.is_end_of_phrase() {
            if self.relative {
                writeln!(self.wr, "-{sep}{start}{sep}{start}")?;
                self.rel[voice] += start;
            } else {
                writeln!(self.wr, "-{sep}{start}")?;
            }
        } else {
            writeln!(
                self.wr,
                "{}{sep}{start}{sep}{}{sep}{}{sep}{}",
                note.kind, note.duration, note.pitch.0, note.text
            )?;
        }
        Ok(())
    }

    /// Writes the final `E` line of the song. Programs reading the song
    /// ignore anything written afterwards.
    ///
    /// This does not flush or close the underlying sink.
    pub fn close(&mut self) -> io::Result<()> {
        self.wr.write_all(b"E\n")
    }
}
