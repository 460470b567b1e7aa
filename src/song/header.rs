//! The key-value header block of an UltraStar file.

use std::collections::HashMap;

use itertools::Itertools;
use thiserror::Error;

/// The `#VERSION` header.
pub const HEADER_VERSION: &str = "VERSION";
/// The `#ENCODING` header, a legacy tag naming the code page of a file.
pub const HEADER_ENCODING: &str = "ENCODING";
/// The `#RELATIVE` header, a legacy tag enabling relative mode.
pub const HEADER_RELATIVE: &str = "RELATIVE";

/// The `#BPM` header. The stored value is a quarter of the actual tempo.
pub const HEADER_BPM: &str = "BPM";
/// The `#GAP` header, the delay until beat 0 in milliseconds.
pub const HEADER_GAP: &str = "GAP";
/// The `#VIDEOGAP` header, the delay until the video starts.
pub const HEADER_VIDEOGAP: &str = "VIDEOGAP";

/// The `#PREVIEWSTART` header.
pub const HEADER_PREVIEW_START: &str = "PREVIEWSTART";
/// The `#MEDLEYSTART` header (milliseconds, format version 2 and above).
pub const HEADER_MEDLEY_START: &str = "MEDLEYSTART";
/// The `#MEDLEYEND` header (milliseconds, format version 2 and above).
pub const HEADER_MEDLEY_END: &str = "MEDLEYEND";
/// The `#MEDLEYSTARTBEAT` header (beats, format versions before 2).
pub const HEADER_MEDLEY_START_BEAT: &str = "MEDLEYSTARTBEAT";
/// The `#MEDLEYENDBEAT` header (beats, format versions before 2).
pub const HEADER_MEDLEY_END_BEAT: &str = "MEDLEYENDBEAT";
/// The `#CALCMEDLEY` header.
pub const HEADER_CALC_MEDLEY: &str = "CALCMEDLEY";

/// The `#START` header.
pub const HEADER_START: &str = "START";
/// The `#END` header.
pub const HEADER_END: &str = "END";

/// The `#MP3` header, the legacy name of the audio file reference.
pub const HEADER_MP3: &str = "MP3";
/// The `#AUDIO` header, the modern name of the audio file reference.
pub const HEADER_AUDIO: &str = "AUDIO";
/// The `#AUDIOURL` header.
pub const HEADER_AUDIO_URL: &str = "AUDIOURL";
/// The `#VOCALS` header.
pub const HEADER_VOCALS: &str = "VOCALS";
/// The `#VOCALSURL` header.
pub const HEADER_VOCALS_URL: &str = "VOCALSURL";
/// The `#INSTRUMENTAL` header.
pub const HEADER_INSTRUMENTAL: &str = "INSTRUMENTAL";
/// The `#INSTRUMENTALURL` header.
pub const HEADER_INSTRUMENTAL_URL: &str = "INSTRUMENTALURL";
/// The `#VIDEO` header.
pub const HEADER_VIDEO: &str = "VIDEO";
/// The `#VIDEOURL` header.
pub const HEADER_VIDEO_URL: &str = "VIDEOURL";
/// The `#COVER` header.
pub const HEADER_COVER: &str = "COVER";
/// The `#COVERURL` header.
pub const HEADER_COVER_URL: &str = "COVERURL";
/// The `#BACKGROUND` header.
pub const HEADER_BACKGROUND: &str = "BACKGROUND";
/// The `#BACKGROUNDURL` header.
pub const HEADER_BACKGROUND_URL: &str = "BACKGROUNDURL";

/// The `#TITLE` header.
pub const HEADER_TITLE: &str = "TITLE";
/// The `#ARTIST` header, a multi-valued header.
pub const HEADER_ARTIST: &str = "ARTIST";
/// The `#RENDITION` header.
pub const HEADER_RENDITION: &str = "RENDITION";
/// The `#YEAR` header.
pub const HEADER_YEAR: &str = "YEAR";
/// The `#GENRE` header, a multi-valued header.
pub const HEADER_GENRE: &str = "GENRE";
/// The `#EDITION` header, a multi-valued header.
pub const HEADER_EDITION: &str = "EDITION";
/// The `#LANGUAGE` header, a multi-valued header.
pub const HEADER_LANGUAGE: &str = "LANGUAGE";
/// The `#TAGS` header, a multi-valued header.
pub const HEADER_TAGS: &str = "TAGS";
/// The `#CREATOR` header, a multi-valued header.
pub const HEADER_CREATOR: &str = "CREATOR";
/// The `#AUTHOR` header, a legacy alias of [`HEADER_CREATOR`].
pub const HEADER_AUTHOR: &str = "AUTHOR";
/// The `#AUTOR` header, a legacy alias of [`HEADER_CREATOR`].
pub const HEADER_AUTOR: &str = "AUTOR";
/// The `#PROVIDEDBY` header.
pub const HEADER_PROVIDED_BY: &str = "PROVIDEDBY";
/// The `#COMMENT` header.
pub const HEADER_COMMENT: &str = "COMMENT";

/// The `#P1` header, the name of the first voice.
pub const HEADER_P1: &str = "P1";
/// The `#P2` header, the name of the second voice.
pub const HEADER_P2: &str = "P2";
/// The `#P3` header, the name of the third voice.
pub const HEADER_P3: &str = "P3";
/// The `#P4` header, the name of the fourth voice.
pub const HEADER_P4: &str = "P4";
/// The `#P5` header, the name of the fifth voice.
pub const HEADER_P5: &str = "P5";
/// The `#P6` header, the name of the sixth voice.
pub const HEADER_P6: &str = "P6";
/// The `#P7` header, the name of the seventh voice.
pub const HEADER_P7: &str = "P7";
/// The `#P8` header, the name of the eighth voice.
pub const HEADER_P8: &str = "P8";
/// The `#P9` header, the name of the ninth voice.
pub const HEADER_P9: &str = "P9";
/// The `#DUETSINGERP1` header, a legacy alias of [`HEADER_P1`].
pub const HEADER_DUET_SINGER_P1: &str = "DUETSINGERP1";
/// The `#DUETSINGERP2` header, a legacy alias of [`HEADER_P2`].
pub const HEADER_DUET_SINGER_P2: &str = "DUETSINGERP2";

/// The `#RESOLUTION` header, application-specific and treated as a custom
/// header by this crate.
pub const HEADER_RESOLUTION: &str = "RESOLUTION";
/// The `#NOTESGAP` header, application-specific and treated as a custom
/// header by this crate.
pub const HEADER_NOTES_GAP: &str = "NOTESGAP";

/// An error produced by the single-valued [`Header`] accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeaderValueError {
    /// A single-valued header contained multiple different values.
    #[error("multiple values")]
    MultipleValues,
    /// A required header did not have a value.
    #[error("no value")]
    NoValue,
}

/// Returns the canonical version of a header key: upper-cased and trimmed.
/// If no canonical version of the key exists (because it contains a `:`), an
/// empty string is returned.
#[must_use]
pub fn canonical_header_key(key: &str) -> String {
    if key.contains(':') {
        return String::new();
    }
    key.trim().to_uppercase()
}

/// The key-value pairs of an UltraStar file header.
///
/// A single header key can have multiple values. Values of multi-valued
/// headers are not necessarily normalized. An empty value list and an absent
/// key are semantically equivalent. Keys are canonicalized via
/// [`canonical_header_key`] by every accessor.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Header(HashMap<String, Vec<String>>);

impl Header {
    /// Creates an empty header.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys in the header.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the header contains no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over all keys and their raw values, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Adds a key-value pair to the header, appending to any existing values
    /// associated with the key.
    pub fn add(&mut self, key: &str, value: impl Into<String>) {
        self.0
            .entry(canonical_header_key(key))
            .or_default()
            .push(value.into());
    }

    /// Sets the values associated with `key` to the single element `value`,
    /// replacing any existing values. An empty value deletes the key.
    pub fn set(&mut self, key: &str, value: &str) {
        if value.is_empty() {
            self.del(key);
        } else {
            self.0
                .insert(canonical_header_key(key), vec![value.to_string()]);
        }
    }

    /// Sets the values associated with `key` to the decimal representation of
    /// `value`, replacing any existing values. A zero value deletes the key.
    pub fn set_int(&mut self, key: &str, value: i64) {
        if value == 0 {
            self.del(key);
        } else {
            self.set(key, &value.to_string());
        }
    }

    /// Sets the values associated with `key` to the shortest representation
    /// of `value`, replacing any existing values. A zero value deletes the
    /// key.
    pub fn set_float(&mut self, key: &str, value: f64) {
        self.set_float_comma(key, value, false);
    }

    /// Like [`Header::set_float`], but replaces the decimal point with a
    /// comma when `comma` is set.
    pub(crate) fn set_float_comma(&mut self, key: &str, value: f64, comma: bool) {
        if value == 0.0 {
            self.del(key);
            return;
        }
        let mut s = value.to_string();
        if comma {
            s = s.replacen('.', ",", 1);
        }
        self.set(key, &s);
    }

    /// Sets the values associated with `key` to a single value encoding the
    /// given list as a multi-valued header, replacing any existing values.
    /// An empty list deletes the key.
    pub fn set_multi_valued<I, S>(&mut self, key: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set(key, &encode_multi_value(values));
    }

    /// Replaces all values associated with `key` with the given values,
    /// dropping empty elements. If no non-empty values remain, the key stays
    /// present without values.
    pub fn set_values<I, S>(&mut self, key: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values
            .into_iter()
            .map(Into::into)
            .filter(|v| !v.is_empty())
            .collect();
        self.0.insert(canonical_header_key(key), values);
    }

    /// Returns the first non-empty value associated with `key`, or `""`.
    ///
    /// If a key has multiple values, it is unspecified which value is
    /// returned; use [`Header::get_unique`] or [`Header::values`] to handle
    /// multiple values deliberately.
    #[must_use]
    pub fn get(&self, key: &str) -> &str {
        first_value(self.values(key))
    }

    /// Returns all raw values associated with `key`. The returned slice is
    /// empty if the key is absent.
    #[must_use]
    pub fn values(&self, key: &str) -> &[String] {
        self.0
            .get(&canonical_header_key(key))
            .map_or(&[], Vec::as_slice)
    }

    /// Returns true if the header contains a non-empty value for `key`.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.values(key).iter().any(|v| !v.is_empty())
    }

    /// Returns the unique value associated with `key`. If there are multiple
    /// different non-empty values, [`HeaderValueError::MultipleValues`] is
    /// returned. If there is no value, an empty string is returned.
    pub fn get_unique(&self, key: &str) -> Result<String, HeaderValueError> {
        let value = unique_value_as::<String, HeaderValueError, _>(self.values(key), false, |v| {
            Ok(v.to_string())
        })?;
        Ok(value.unwrap_or_default())
    }

    /// Parses the values associated with `key` as a multi-valued header and
    /// lazily yields the individual values. See [`encode_multi_value`] for
    /// the encoding rules.
    pub fn get_multi_valued(&self, key: &str) -> impl Iterator<Item = String> + '_ {
        self.values(key).iter().flat_map(|v| split_multi_value(v))
    }

    /// Deletes all values associated with `key`.
    pub fn del(&mut self, key: &str) {
        self.0.remove(&canonical_header_key(key));
    }

    /// Removes values that are empty or consist only of whitespace, drops
    /// keys without a canonical form, and re-canonicalizes all keys,
    /// potentially merging values. Keys without any remaining values are
    /// removed entirely.
    pub fn clean(&mut self) {
        let entries = std::mem::take(&mut self.0);
        for (key, values) in entries {
            let values: Vec<String> = values
                .into_iter()
                .filter(|v| !v.trim().is_empty())
                .collect();
            if values.is_empty() {
                continue;
            }
            let key = canonical_header_key(&key);
            if key.is_empty() {
                continue;
            }
            self.0.entry(key).or_default().extend(values);
        }
    }

    /// Grants raw access to the underlying map. Only used when header keys
    /// are rewritten wholesale, such as when reinterpreting the encoding.
    pub(crate) fn entries_mut(&mut self) -> &mut HashMap<String, Vec<String>> {
        &mut self.0
    }
}

/// Returns the first non-empty value of a raw value slice, or `""`.
pub(crate) fn first_value(values: &[String]) -> &str {
    values
        .iter()
        .find(|v| !v.is_empty())
        .map_or("", String::as_str)
}

/// Returns the unique non-empty value of `values`, transformed by `conv`.
///
/// If the transformed values disagree, [`HeaderValueError::MultipleValues`]
/// is returned. If no non-empty value exists, `Ok(None)` is returned, or
/// [`HeaderValueError::NoValue`] when `required` is set. Errors from `conv`
/// are returned directly.
pub fn unique_value_as<T, E, F>(
    values: &[String],
    required: bool,
    mut conv: F,
) -> Result<Option<T>, E>
where
    T: PartialEq,
    E: From<HeaderValueError>,
    F: FnMut(&str) -> Result<T, E>,
{
    let mut found: Option<T> = None;
    for value in values {
        if value.is_empty() {
            continue;
        }
        let converted = conv(value)?;
        match &found {
            Some(prev) if *prev != converted => {
                return Err(HeaderValueError::MultipleValues.into());
            }
            _ => found = Some(converted),
        }
    }
    if required && found.is_none() {
        return Err(HeaderValueError::NoValue.into());
    }
    Ok(found)
}

/// Encodes a list of values for use in a multi-valued header.
///
/// Each value is trimmed; empty values are dropped. Literal commas are
/// escaped as `,,` and the values are joined with single commas.
#[must_use]
pub fn encode_multi_value<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| v.as_ref().trim().replace(',', ",,"))
        .filter(|v| !v.is_empty())
        .join(",")
}

/// Splits a single raw header value into its multi-valued parts.
///
/// Scanning left to right, a comma immediately followed by another comma is
/// an escaped literal comma; any other comma terminates the current value.
/// Values are trimmed and empty values are dropped. For adjacent escapes
/// this means that `"a,,,b"` decodes to `["a,", "b"]`: the first two commas
/// are an escape, the third is a separator.
fn split_multi_value(raw: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut rest = raw;
    loop {
        match rest.find(',') {
            None => {
                current.push_str(rest);
                break;
            }
            Some(i) => {
                current.push_str(&rest[..i]);
                if rest[i + 1..].starts_with(',') {
                    current.push(',');
                    rest = &rest[i + 2..];
                } else {
                    push_trimmed(&mut values, &current);
                    current.clear();
                    rest = &rest[i + 1..];
                }
            }
        }
    }
    push_trimmed(&mut values, &current);
    values
}

fn push_trimmed(values: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        values.push(value.to_string());
    }
}

/// Decodes raw header values as a multi-valued header.
pub(crate) fn decode_multi_valued(values: &[String]) -> Vec<String> {
    values.iter().flat_map(|v| split_multi_value(v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalization() {
        assert_eq!(canonical_header_key(" title "), "TITLE");
        assert_eq!(canonical_header_key("VideoGap"), "VIDEOGAP");
        assert_eq!(canonical_header_key("a:b"), "");

        let mut header = Header::new();
        header.set("Title", "Never Gonna Give You Up");
        assert_eq!(header.get("TITLE"), "Never Gonna Give You Up");
        assert_eq!(header.get(" title"), "Never Gonna Give You Up");
    }

    #[test]
    fn add_and_set() {
        let mut header = Header::new();
        header.add("GENRE", "Rock");
        header.add("genre", "Pop");
        assert_eq!(header.values("GENRE"), ["Rock", "Pop"]);

        header.set("GENRE", "Soul");
        assert_eq!(header.values("GENRE"), ["Soul"]);

        header.set("GENRE", "");
        assert!(!header.has("GENRE"));
        assert_eq!(header.values("GENRE"), Vec::<String>::new().as_slice());
    }

    #[test]
    fn numeric_setters() {
        let mut header = Header::new();
        header.set_int("YEAR", 1999);
        assert_eq!(header.get("YEAR"), "1999");
        header.set_int("YEAR", 0);
        assert!(!header.has("YEAR"));

        header.set_float("BPM", 312.5);
        assert_eq!(header.get("BPM"), "312.5");
        header.set_float("BPM", 312.0);
        assert_eq!(header.get("BPM"), "312");
        header.set_float_comma("BPM", 312.5, true);
        assert_eq!(header.get("BPM"), "312,5");
        header.set_float("BPM", 0.0);
        assert!(!header.has("BPM"));
    }

    #[test]
    fn get_unique() {
        let mut header = Header::new();
        assert_eq!(header.get_unique("ARTIST"), Ok(String::new()));

        header.add("ARTIST", "");
        header.add("ARTIST", "Queen");
        header.add("ARTIST", "Queen");
        assert_eq!(header.get_unique("ARTIST"), Ok("Queen".to_string()));

        header.add("ARTIST", "Bowie");
        assert_eq!(
            header.get_unique("ARTIST"),
            Err(HeaderValueError::MultipleValues)
        );
    }

    #[test]
    fn multi_value_round_trip() {
        let values = ["Rock", "Pop,Soul", "R&B"];
        let encoded = encode_multi_value(values);
        assert_eq!(encoded, "Rock,Pop,,Soul,R&B");
        assert_eq!(split_multi_value(&encoded), values);
    }

    #[test]
    fn multi_value_decoding() {
        assert_eq!(split_multi_value("a, b ,c"), ["a", "b", "c"]);
        assert_eq!(split_multi_value("a,,b"), ["a,b"]);
        assert_eq!(split_multi_value(",a,,"), ["a,"]);
        assert_eq!(split_multi_value(" , ,"), Vec::<String>::new());
    }

    // Pins the documented interpretation of adjacent escaped commas: `,,`
    // escapes exactly one comma, any remaining comma separates.
    #[test]
    fn multi_value_adjacent_commas() {
        assert_eq!(split_multi_value("Rock,Pop,,Soul,,,"), ["Rock", "Pop,Soul,"]);
        assert_eq!(split_multi_value("foo,,,bar,"), ["foo,", "bar"]);
    }

    #[test]
    fn set_multi_valued() {
        let mut header = Header::new();
        header.set_multi_valued("EDITION", ["SingStar", " ", "Rock, hard"]);
        assert_eq!(header.get("EDITION"), "SingStar,Rock,, hard");
        let decoded: Vec<String> = header.get_multi_valued("EDITION").collect();
        assert_eq!(decoded, ["SingStar", "Rock, hard"]);
    }

    #[test]
    fn set_values_keeps_empty_keys_present() {
        let mut header = Header::new();
        header.set_values("CALCMEDLEY", Vec::<String>::new());
        assert_eq!(header.len(), 1);
        assert!(!header.has("CALCMEDLEY"));

        header.set_values("LANGUAGE", ["English", "", "German"]);
        assert_eq!(header.values("LANGUAGE"), ["English", "German"]);
    }

    #[test]
    fn clean_merges_and_drops() {
        let mut header = Header::new();
        header.entries_mut().insert("Title".to_string(), vec!["A".to_string()]);
        header
            .entries_mut()
            .insert("TITLE".to_string(), vec!["B".to_string()]);
        header
            .entries_mut()
            .insert("BAD:KEY".to_string(), vec!["x".to_string()]);
        header
            .entries_mut()
            .insert("EMPTY".to_string(), vec!["  ".to_string()]);
        header.clean();

        assert_eq!(header.len(), 1);
        let mut values = header.values("TITLE").to_vec();
        values.sort();
        assert_eq!(values, ["A", "B"]);
    }

    #[test]
    fn clone_is_deep() {
        let mut header = Header::new();
        header.add("TITLE", "original");
        let copy = header.clone();
        header.set("TITLE", "changed");
        assert_eq!(copy.get("TITLE"), "original");
    }
}
