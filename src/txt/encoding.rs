//! Legacy code page support.
//!
//! UltraStar predates the universal use of UTF-8; old files name their code
//! page in an `#ENCODING` header. The [`EncodingRegistry`] maps the values
//! of that header to [`encoding_rs`] encodings and is passed explicitly to
//! the [`Reader`](crate::txt::Reader), so programs can extend or restrict
//! the recognized set.
//!
//! Throughout this crate, an encoding of `None` stands for UTF-8.

use std::collections::HashMap;

use encoding_rs::{Encoding, WINDOWS_1250, WINDOWS_1252};

use crate::song::Song;

/// A registry of known text encodings, keyed by the (case-insensitive)
/// values of the `#ENCODING` header.
#[derive(Debug, Clone)]
pub struct EncodingRegistry {
    encodings: HashMap<String, &'static Encoding>,
}

impl Default for EncodingRegistry {
    /// The default registry recognizes the spellings of CP-1250 and CP-1252
    /// used by UltraStar and Vocaluxe.
    fn default() -> Self {
        let mut registry = Self::empty();
        for name in ["cp1250", "cp-1250", "windows1250", "windows-1250"] {
            registry.register(name, WINDOWS_1250);
        }
        for name in ["cp1252", "cp-1252", "windows1252", "windows-1252"] {
            registry.register(name, WINDOWS_1252);
        }
        registry
    }
}

impl EncodingRegistry {
    /// Creates a registry without any known encodings.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            encodings: HashMap::new(),
        }
    }

    /// Registers an encoding under the given name. The name is matched
    /// case-insensitively.
    pub fn register(&mut self, name: &str, encoding: &'static Encoding) {
        self.encodings.insert(name.to_lowercase(), encoding);
    }

    /// Looks up an encoding by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'static Encoding> {
        self.encodings.get(&name.to_lowercase()).copied()
    }
}

/// Decodes raw bytes with the given encoding, or as UTF-8 (lossily) when no
/// encoding is set.
pub(crate) fn decode_bytes(bytes: &[u8], encoding: Option<&'static Encoding>) -> String {
    match encoding {
        Some(encoding) => encoding.decode_without_bom_handling(bytes).0.into_owned(),
        None => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Reinterprets a string under a different code page: the string is encoded
/// back using `from` (with replacement of unsupported characters) and the
/// resulting bytes are decoded using `to`.
pub(crate) fn reinterpret(
    s: &str,
    from: Option<&'static Encoding>,
    to: Option<&'static Encoding>,
) -> String {
    if from == to {
        return s.to_string();
    }
    let bytes = match from {
        Some(encoding) => encoding.encode(s).0,
        None => s.as_bytes().into(),
    };
    decode_bytes(&bytes, to)
}

/// Reinterprets every string of a parsed song under a different code page.
///
/// Each string is encoded back using `from` (with replacement of
/// unsupported characters) and decoded with `to`. The pass covers all typed
/// string fields, the free-form header (keys and values), voice names and
/// note texts. It is useful to rectify a song that was read with the wrong
/// encoding. The pass is lossy for strings that were not representable in
/// `from`; URL fields are already parsed and left untouched.
pub fn transcode_song(song: &mut Song, from: Option<&'static Encoding>, to: Option<&'static Encoding>) {
    if from == to {
        return;
    }
    let fix = |s: &mut String| *s = reinterpret(s, from, to);

    fix(&mut song.audio);
    fix(&mut song.vocals);
    fix(&mut song.instrumental);
    fix(&mut song.video);
    fix(&mut song.cover);
    fix(&mut song.background);
    fix(&mut song.title);
    fix(&mut song.rendition);
    fix(&mut song.provided_by);
    fix(&mut song.comment);
    for list in [
        &mut song.artists,
        &mut song.genres,
        &mut song.languages,
        &mut song.editions,
        &mut song.tags,
        &mut song.creators,
    ] {
        for value in list {
            fix(value);
        }
    }

    let entries = std::mem::take(song.header.entries_mut());
    for (key, mut values) in entries {
        for value in &mut values {
            fix(value);
        }
        let key = reinterpret(&key, from, to);
        song.header.entries_mut().entry(key).or_default().extend(values);
    }

    for voice in &mut song.voices {
        fix(&mut voice.name);
        for note in &mut voice.notes {
            if !note.kind.is_end_of_phrase() {
                fix(&mut note.text);
            }
        }
    }
}
