//! Parser strictness profiles and version-dependent format rules.

use crate::song::Version;

/// How the reader treats legacy `B beat rate` tempo-change lines in the body
/// of a song.
///
/// The current song model carries a single tempo, so tempo changes can never
/// be represented; the policy decides between rejecting and dropping them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BpmChangePolicy {
    /// Reject tempo changes with [`SyntaxErrorKind::MultiBpm`](crate::txt::SyntaxErrorKind::MultiBpm).
    #[default]
    Reject,
    /// Validate the shape of the line and silently discard it.
    Discard,
}

/// The set of reader options controlling strictness.
///
/// A dialect configures how forgiving the [`Reader`](crate::txt::Reader) is
/// about conditions that are invalid but non-destructive, such as empty
/// lines between notes or text after the end tag. The default dialect is
/// strict; [`Dialect::tolerant`] accepts most real-world sloppiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    /// Silently skip body lines consisting only of whitespace. When unset,
    /// such lines are an error.
    pub skip_empty_lines: bool,
    /// Strip leading whitespace from every line before interpreting it.
    pub trim_leading_whitespace: bool,
    /// Reject end-of-phrase lines that carry extra text.
    pub strict_line_breaks: bool,
    /// Reject end tag lines that carry extra text. When unset, such lines
    /// still terminate the song.
    pub strict_end_tag: bool,
    /// Require the song to be terminated by an `E` line.
    pub require_end_tag: bool,
    /// Accept the legacy `RELATIVE` header. When unset, relative songs are
    /// rejected.
    pub allow_relative: bool,
    /// Accept `,` as a decimal separator in floating point values, for
    /// format versions that historically allowed it.
    pub international_floats: bool,
    /// How to treat legacy `B` tempo-change lines.
    pub bpm_changes: BpmChangePolicy,
    /// Silently skip body lines starting with an unknown byte. When unset,
    /// such lines are an error.
    pub allow_unknown_events: bool,
}

impl Default for Dialect {
    /// The strict profile: suitable for validating songs.
    fn default() -> Self {
        Self {
            skip_empty_lines: true,
            trim_leading_whitespace: false,
            strict_line_breaks: true,
            strict_end_tag: true,
            require_end_tag: false,
            allow_relative: true,
            international_floats: true,
            bpm_changes: BpmChangePolicy::Reject,
            allow_unknown_events: false,
        }
    }
}

impl Dialect {
    /// A forgiving profile that accepts most songs found in the wild:
    /// leading whitespace, text after line breaks and end tags, unknown
    /// events and tempo changes are all tolerated.
    #[must_use]
    pub fn tolerant() -> Self {
        Self {
            skip_empty_lines: true,
            trim_leading_whitespace: true,
            strict_line_breaks: false,
            strict_end_tag: false,
            require_end_tag: false,
            allow_relative: true,
            international_floats: true,
            bpm_changes: BpmChangePolicy::Discard,
            allow_unknown_events: true,
        }
    }
}

/// Version-dependent behavior of the file format, computed once from a
/// [`Version`].
///
/// Reader and writer consult this table instead of comparing versions at
/// every use site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRules {
    /// `,` is accepted as a decimal separator (versions before 2.0.0).
    pub comma_floats: bool,
    /// `VIDEOGAP`, `START`, `PREVIEWSTART` and the medley bounds are integer
    /// milliseconds instead of decimal seconds (2.0.0 and above).
    pub millisecond_durations: bool,
    /// The medley bounds are carried by the beat-valued `MEDLEYSTARTBEAT`
    /// and `MEDLEYENDBEAT` headers (versions before 2.0.0).
    pub medley_beats: bool,
    /// `RELATIVE` and `ENCODING` are consumed by the reader and
    /// `DUETSINGERP1`/`DUETSINGERP2` name voices (versions before 1.0.0).
    pub legacy_headers: bool,
    /// The `AUDIO` header and the `…URL` headers are part of the format
    /// (1.1.0 and above).
    pub multi_audio: bool,
}

impl VersionRules {
    /// Computes the rules for a format version.
    #[must_use]
    pub fn for_version(version: Version) -> Self {
        Self {
            comma_floats: version.major < 2,
            millisecond_durations: version.major >= 2,
            medley_beats: version.major < 2,
            legacy_headers: version.major < 1,
            multi_audio: version >= Version::V1_1_0,
        }
    }
}
