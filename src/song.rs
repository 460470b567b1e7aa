//! The UltraStar song model.
//!
//! This module contains the owned data model of a song: value types for
//! timing and pitches, the per-singer [`Voice`] sequences, the free-form
//! [`Header`] map and the [`Song`] aggregate that ties them together.
//!
//! Everything in this module uses absolute timestamps and normalized Rust
//! types; details of the TXT format such as relative mode, quarter-BPM
//! storage or version-dependent units are handled by [`crate::txt`].

pub mod bpm;
pub mod header;
pub mod note;
pub mod pitch;
pub mod version;
pub mod voice;

use time::Duration;
use url::Url;

pub use bpm::Bpm;
pub use header::{
    Header, HeaderValueError, canonical_header_key, encode_multi_value, unique_value_as,
};
pub use note::{Beat, MAX_BEAT, Note, NoteKind};
pub use pitch::{ParsePitchError, Pitch};
pub use version::{ParseVersionError, Version};
pub use voice::{Phrases, Voice};

/// An UltraStar song.
///
/// Known headers are normalized to typed fields, so working with a song does
/// not require knowledge of the specifics of `#GAP`, `#VIDEOGAP` and
/// friends. Headers without a typed counterpart are kept verbatim in
/// [`Song::header`].
///
/// A `Song` does not parse or serialize itself; see [`crate::txt`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Song {
    /// Reference to the audio file (`#MP3`/`#AUDIO`).
    pub audio: String,
    /// URL of the audio file.
    pub audio_url: Option<Url>,
    /// Reference to the vocals-only audio file.
    pub vocals: String,
    /// URL of the vocals-only audio file.
    pub vocals_url: Option<Url>,
    /// Reference to the instrumental audio file.
    pub instrumental: String,
    /// URL of the instrumental audio file.
    pub instrumental_url: Option<Url>,
    /// Reference to the video file.
    pub video: String,
    /// URL of the video file.
    pub video_url: Option<Url>,
    /// Reference to the cover artwork.
    pub cover: String,
    /// URL of the cover artwork.
    pub cover_url: Option<Url>,
    /// Reference to the background image.
    pub background: String,
    /// URL of the background image.
    pub background_url: Option<Url>,

    /// The tempo of the song.
    pub bpm: Bpm,
    /// Delay until beat 0.
    pub gap: Duration,
    /// Delay until the video starts.
    pub video_gap: Duration,
    /// Playback starts this far into the song.
    pub start: Duration,
    /// Playback stops at this time, if non-zero.
    pub end: Duration,
    /// The preview starts at this time.
    pub preview_start: Duration,
    /// In medley mode, singing starts at this time.
    pub medley_start: Duration,
    /// In medley mode, singing ends at this time.
    pub medley_end: Duration,

    /// The song title.
    pub title: String,
    /// The performing artists.
    pub artists: Vec<String>,
    /// Distinguishes different renditions of the same song.
    pub rendition: String,
    /// The year the song was released.
    pub year: i32,
    /// The genres of the song.
    pub genres: Vec<String>,
    /// The languages the song is sung in.
    pub languages: Vec<String>,
    /// The editions (song collections) this song belongs to.
    pub editions: Vec<String>,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// The creators of the song file.
    pub creators: Vec<String>,
    /// Who provided the song file.
    pub provided_by: String,
    /// A free-form comment.
    pub comment: String,

    /// Headers that have no typed counterpart on this struct.
    pub header: Header,
    /// The voices of the song, up to 9 (`P1` through `P9`).
    pub voices: Vec<Voice>,
}

impl Default for Song {
    fn default() -> Self {
        Self {
            audio: String::new(),
            audio_url: None,
            vocals: String::new(),
            vocals_url: None,
            instrumental: String::new(),
            instrumental_url: None,
            video: String::new(),
            video_url: None,
            cover: String::new(),
            cover_url: None,
            background: String::new(),
            background_url: None,
            bpm: Bpm::default(),
            gap: Duration::ZERO,
            video_gap: Duration::ZERO,
            start: Duration::ZERO,
            end: Duration::ZERO,
            preview_start: Duration::ZERO,
            medley_start: Duration::ZERO,
            medley_end: Duration::ZERO,
            title: String::new(),
            artists: Vec::new(),
            rendition: String::new(),
            year: 0,
            genres: Vec::new(),
            languages: Vec::new(),
            editions: Vec::new(),
            tags: Vec::new(),
            creators: Vec::new(),
            provided_by: String::new(),
            comment: String::new(),
            header: Header::new(),
            voices: Vec::new(),
        }
    }
}

impl Song {
    /// Creates an empty single-voice song.
    #[must_use]
    pub fn new() -> Self {
        Self {
            voices: vec![Voice::default()],
            ..Self::default()
        }
    }

    /// Indicates whether the song is a duet, that is whether it has more
    /// than one voice.
    #[must_use]
    pub fn is_duet(&self) -> bool {
        self.voices.len() > 1
    }

    /// Calculates the singing duration of the song: the time from the
    /// beginning of the audio until the end of the last sung note of any
    /// voice.
    #[must_use]
    pub fn duration(&self) -> Duration {
        let longest = self
            .voices
            .iter()
            .map(|v| v.duration(self.bpm))
            .max()
            .unwrap_or(Duration::ZERO);
        longest + self.gap
    }
}
