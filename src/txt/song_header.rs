//! The mapping between the raw [`Header`] map and the typed [`Song`] fields.
//!
//! Reading and writing are exact mirrors of each other: the reader promotes
//! known headers into typed fields ([`song_from_header`]), the writer
//! re-derives them ([`header_from_song`]). Both are gated on the
//! [`VersionRules`] of the file format version in use.

use time::Duration;
use url::Url;

use crate::song::header::*;
use crate::song::{Bpm, Song, Voice};

use super::dialect::{Dialect, VersionRules};
use super::{HeaderError, HeaderErrorKind};

/// Builds a [`Song`] from a header map. Headers without a typed field are
/// copied verbatim into [`Song::header`]. A failed conversion yields a
/// [`HeaderError`] for the offending key but does not prevent the remaining
/// headers from being processed.
pub(crate) fn song_from_header(
    header: &crate::song::Header,
    rules: &VersionRules,
    dialect: &Dialect,
) -> (Song, Vec<HeaderError>) {
    let mut song = Song::default();
    let mut errors = Vec::new();
    let comma = rules.comma_floats && dialect.international_floats;

    // BPM and GAP first: the beat-valued medley headers depend on both.
    for key in [HEADER_BPM, HEADER_GAP] {
        if let Err(kind) = set_song_field(&mut song, key, header.values(key), rules, comma) {
            errors.push(HeaderError::new(key, kind));
        }
    }
    for (key, values) in header.iter() {
        if key == HEADER_BPM || key == HEADER_GAP {
            continue;
        }
        if let Err(kind) = set_song_field(&mut song, key, values, rules, comma) {
            errors.push(HeaderError::new(key, kind));
        }
    }
    (song, errors)
}

/// Promotes the values of a single header into the corresponding typed
/// field of `song`, or copies them into [`Song::header`] if the key has no
/// special meaning under the given version rules.
fn set_song_field(
    song: &mut Song,
    key: &str,
    values: &[String],
    rules: &VersionRules,
    comma: bool,
) -> Result<(), HeaderErrorKind> {
    match key {
        // Consumed by the reader, never passed on to the song.
        HEADER_VERSION | HEADER_P1 | HEADER_P2 | HEADER_P3 | HEADER_P4 | HEADER_P5
        | HEADER_P6 | HEADER_P7 | HEADER_P8 | HEADER_P9 => {}
        HEADER_ENCODING | HEADER_RELATIVE | HEADER_DUET_SINGER_P1 | HEADER_DUET_SINGER_P2 => {
            if !rules.legacy_headers {
                song.header.set_values(key, values.to_vec());
            }
        }

        HEADER_TITLE => song.title = first_value(values).to_string(),
        HEADER_ARTIST => song.artists = decode_multi_valued(values),
        HEADER_RENDITION => song.rendition = first_value(values).to_string(),
        HEADER_YEAR => {
            song.year = unique_value_as(values, false, |v| {
                v.parse::<i32>()
                    .map_err(|err| HeaderErrorKind::InvalidNumber(err.to_string()))
            })?
            .unwrap_or(0);
        }
        HEADER_GENRE => song.genres = decode_multi_valued(values),
        HEADER_LANGUAGE => song.languages = decode_multi_valued(values),
        HEADER_EDITION => song.editions = decode_multi_valued(values),
        HEADER_TAGS => song.tags = decode_multi_valued(values),
        HEADER_CREATOR => song.creators = decode_multi_valued(values),
        HEADER_AUTHOR | HEADER_AUTOR => {
            if song.creators.is_empty() {
                song.creators = decode_multi_valued(values);
            }
        }
        HEADER_PROVIDED_BY => song.provided_by = first_value(values).to_string(),
        HEADER_COMMENT => song.comment = first_value(values).to_string(),

        HEADER_BPM => {
            let bpm = unique_value_as(values, false, |v| {
                let bpm = Bpm(parse_float(v, comma)? * 4.0);
                if !bpm.is_valid() {
                    return Err(HeaderErrorKind::InvalidBpm(bpm.0));
                }
                Ok(bpm)
            })?;
            song.bpm = bpm.unwrap_or_default();
        }
        HEADER_GAP => {
            let gap = if rules.millisecond_durations {
                unique_milliseconds(values)?
            } else {
                unique_value_as(values, false, |v| {
                    duration_from_seconds(parse_float(v, comma)? / 1000.0)
                })?
            };
            song.gap = gap.unwrap_or(Duration::ZERO);
        }
        HEADER_VIDEOGAP => song.video_gap = unique_duration(values, rules, comma)?,
        HEADER_START => song.start = unique_duration(values, rules, comma)?,
        HEADER_PREVIEW_START => song.preview_start = unique_duration(values, rules, comma)?,
        HEADER_END => {
            let end = if rules.millisecond_durations {
                unique_milliseconds(values)?
            } else {
                unique_value_as(values, false, |v| {
                    duration_from_seconds(parse_float(v, comma)? / 1000.0)
                })?
            };
            song.end = end.unwrap_or(Duration::ZERO);
        }
        HEADER_MEDLEY_START => {
            if rules.medley_beats {
                song.header.set_values(key, values.to_vec());
            } else {
                song.medley_start = unique_milliseconds(values)?.unwrap_or(Duration::ZERO);
            }
        }
        HEADER_MEDLEY_END => {
            if rules.medley_beats {
                song.header.set_values(key, values.to_vec());
            } else {
                song.medley_end = unique_milliseconds(values)?.unwrap_or(Duration::ZERO);
            }
        }
        HEADER_MEDLEY_START_BEAT => {
            if rules.medley_beats {
                if let Some(beat) = unique_beat(values)? {
                    song.medley_start = song.bpm.duration(beat) + song.gap;
                }
            } else {
                song.header.set_values(key, values.to_vec());
            }
        }
        HEADER_MEDLEY_END_BEAT => {
            if rules.medley_beats {
                if let Some(beat) = unique_beat(values)? {
                    song.medley_end = song.bpm.duration(beat) + song.gap;
                }
            } else {
                song.header.set_values(key, values.to_vec());
            }
        }

        HEADER_MP3 | HEADER_AUDIO => song.audio = first_value(values).to_string(),
        HEADER_AUDIO_URL => song.audio_url = parse_url(values)?,
        HEADER_VOCALS => song.vocals = first_value(values).to_string(),
        HEADER_VOCALS_URL => song.vocals_url = parse_url(values)?,
        HEADER_INSTRUMENTAL => song.instrumental = first_value(values).to_string(),
        HEADER_INSTRUMENTAL_URL => song.instrumental_url = parse_url(values)?,
        HEADER_VIDEO => song.video = first_value(values).to_string(),
        HEADER_VIDEO_URL => song.video_url = parse_url(values)?,
        HEADER_COVER => song.cover = first_value(values).to_string(),
        HEADER_COVER_URL => song.cover_url = parse_url(values)?,
        HEADER_BACKGROUND => song.background = first_value(values).to_string(),
        HEADER_BACKGROUND_URL => song.background_url = parse_url(values)?,

        _ => song.header.set_values(key, values.to_vec()),
    }
    Ok(())
}

/// Derives the header map for `song`: the free-form headers overlaid with
/// the values of every typed field, formatted for the given version rules.
/// Zero and empty fields do not produce headers.
pub(crate) fn header_from_song(
    song: &Song,
    rules: &VersionRules,
    comma_float: bool,
) -> crate::song::Header {
    let mut header = song.header.clone();

    header.set(HEADER_MP3, &song.audio);
    if rules.multi_audio {
        header.set(HEADER_AUDIO, &song.audio);
        set_url(&mut header, HEADER_AUDIO_URL, song.audio_url.as_ref());
        set_url(&mut header, HEADER_VOCALS_URL, song.vocals_url.as_ref());
        set_url(
            &mut header,
            HEADER_INSTRUMENTAL_URL,
            song.instrumental_url.as_ref(),
        );
        set_url(&mut header, HEADER_VIDEO_URL, song.video_url.as_ref());
        set_url(&mut header, HEADER_COVER_URL, song.cover_url.as_ref());
        set_url(
            &mut header,
            HEADER_BACKGROUND_URL,
            song.background_url.as_ref(),
        );
    }
    header.set(HEADER_VOCALS, &song.vocals);
    header.set(HEADER_INSTRUMENTAL, &song.instrumental);
    header.set(HEADER_VIDEO, &song.video);
    header.set(HEADER_COVER, &song.cover);
    header.set(HEADER_BACKGROUND, &song.background);

    header.set_float_comma(HEADER_BPM, song.bpm.0 / 4.0, comma_float);
    if !song.gap.is_zero() {
        header.set_int(HEADER_GAP, song.gap.whole_milliseconds() as i64);
    }
    set_duration(&mut header, HEADER_VIDEOGAP, song.video_gap, rules, comma_float);
    set_duration(&mut header, HEADER_START, song.start, rules, comma_float);
    set_duration(
        &mut header,
        HEADER_PREVIEW_START,
        song.preview_start,
        rules,
        comma_float,
    );
    if !song.end.is_zero() {
        header.set_int(HEADER_END, song.end.whole_milliseconds() as i64);
    }
    if !song.medley_start.is_zero() {
        if rules.medley_beats {
            header.set_int(
                HEADER_MEDLEY_START_BEAT,
                song.bpm.beats(song.medley_start - song.gap),
            );
        } else {
            header.set_int(
                HEADER_MEDLEY_START,
                song.medley_start.whole_milliseconds() as i64,
            );
        }
    }
    if !song.medley_end.is_zero() {
        if rules.medley_beats {
            header.set_int(
                HEADER_MEDLEY_END_BEAT,
                song.bpm.beats(song.medley_end - song.gap),
            );
        } else {
            header.set_int(
                HEADER_MEDLEY_END,
                song.medley_end.whole_milliseconds() as i64,
            );
        }
    }

    header.set(HEADER_TITLE, &song.title);
    header.set_multi_valued(HEADER_ARTIST, &song.artists);
    header.set(HEADER_RENDITION, &song.rendition);
    header.set_int(HEADER_YEAR, song.year.into());
    header.set_multi_valued(HEADER_GENRE, &song.genres);
    header.set_multi_valued(HEADER_LANGUAGE, &song.languages);
    header.set_multi_valued(HEADER_EDITION, &song.editions);
    header.set_multi_valued(HEADER_TAGS, &song.tags);
    header.set_multi_valued(HEADER_CREATOR, &song.creators);
    header.set(HEADER_PROVIDED_BY, &song.provided_by);
    header.set(HEADER_COMMENT, &song.comment);

    for (i, voice) in song.voices.iter().enumerate().take(9) {
        if !voice.name.is_empty() {
            header.set(&format!("P{}", i + 1), &voice.name);
        }
    }
    header
}

/// Builds the voices of a song from the `P1`..`P9` headers, falling back to
/// the legacy `DUETSINGERP1`/`DUETSINGERP2` names for old format versions.
/// Trailing unnamed voices are dropped.
pub(crate) fn voices_from_header(
    header: &crate::song::Header,
    rules: &VersionRules,
) -> Vec<Voice> {
    let mut voices: Vec<Voice> = (1..=9)
        .map(|i| {
            let mut name = header.get(&format!("P{i}"));
            if name.is_empty() && rules.legacy_headers {
                name = header.get(&format!("DUETSINGERP{i}"));
            }
            Voice::named(name)
        })
        .collect();
    let keep = voices
        .iter()
        .rposition(|v| !v.name.is_empty())
        .map_or(0, |i| i + 1);
    voices.truncate(keep);
    voices
}

fn set_url(header: &mut crate::song::Header, key: &str, url: Option<&Url>) {
    if let Some(url) = url {
        header.set(key, url.as_str());
    }
}

/// Emits a duration header in the unit the format version uses: integer
/// milliseconds for 2.0.0 and above, decimal seconds before.
fn set_duration(
    header: &mut crate::song::Header,
    key: &str,
    value: Duration,
    rules: &VersionRules,
    comma_float: bool,
) {
    if value.is_zero() {
        return;
    }
    if rules.millisecond_durations {
        header.set_int(key, value.whole_milliseconds() as i64);
    } else {
        header.set_float_comma(key, value.as_seconds_f64(), comma_float);
    }
}

/// Parses a duration header in the unit the format version uses.
fn unique_duration(
    values: &[String],
    rules: &VersionRules,
    comma: bool,
) -> Result<Duration, HeaderErrorKind> {
    let duration = if rules.millisecond_durations {
        unique_milliseconds(values)?
    } else {
        unique_value_as(values, false, |v| {
            duration_from_seconds(parse_float(v, comma)?)
        })?
    };
    Ok(duration.unwrap_or(Duration::ZERO))
}

fn unique_milliseconds(values: &[String]) -> Result<Option<Duration>, HeaderErrorKind> {
    unique_value_as(values, false, |v| {
        v.parse::<i64>()
            .map(Duration::milliseconds)
            .map_err(|err| HeaderErrorKind::InvalidNumber(err.to_string()))
    })
}

fn unique_beat(values: &[String]) -> Result<Option<i64>, HeaderErrorKind> {
    unique_value_as(values, false, |v| {
        v.parse::<i64>()
            .map_err(|err| HeaderErrorKind::InvalidNumber(err.to_string()))
    })
}

fn parse_url(values: &[String]) -> Result<Option<Url>, HeaderErrorKind> {
    let value = first_value(values);
    if value.is_empty() {
        return Ok(None);
    }
    Url::parse(value)
        .map(Some)
        .map_err(|err| HeaderErrorKind::InvalidUrl(err.to_string()))
}

/// Parses a floating point value. If `comma` is set, one comma is accepted
/// as the decimal separator.
fn parse_float(value: &str, comma: bool) -> Result<f64, HeaderErrorKind> {
    let value = if comma {
        value.replacen(',', ".", 1)
    } else {
        value.to_string()
    };
    value
        .parse::<f64>()
        .map_err(|err| HeaderErrorKind::InvalidNumber(err.to_string()))
}

fn duration_from_seconds(seconds: f64) -> Result<Duration, HeaderErrorKind> {
    if !seconds.is_finite() {
        return Err(HeaderErrorKind::InvalidNumber(format!(
            "{seconds} is not a valid duration"
        )));
    }
    Ok(Duration::seconds_f64(seconds))
}
