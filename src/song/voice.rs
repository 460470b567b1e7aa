//! Voices, the per-singer note sequences of a song.

use std::collections::HashSet;

use time::Duration;

use super::bpm::Bpm;
use super::note::{Beat, Note, NoteKind};

/// A single voice of an UltraStar song: a name and a sequence of notes.
///
/// A voice only ever uses absolute timestamps; [`Reader`](crate::txt::Reader)
/// and [`Writer`](crate::txt::Writer) convert from and to relative mode. The
/// methods of this type expect `notes` to be sorted in ascending order by
/// start beat. Violating this invariant may produce unexpected results.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Voice {
    /// The name of the voice, usually the original singer. Serialized as the
    /// `P1`, `P2`, ... headers.
    pub name: String,
    /// The notes of the voice, sorted in ascending order by start beat.
    pub notes: Vec<Note>,
}

impl Voice {
    /// Creates an empty voice with the given name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            notes: Vec::new(),
        }
    }

    /// Inserts `note` while maintaining the sort invariant. The note is
    /// inserted before any existing notes starting on the same beat.
    pub fn add_note(&mut self, note: Note) {
        let i = self.notes.partition_point(|n| n.start < note.start);
        self.notes.insert(i, note);
    }

    /// Appends notes at the end of the voice. This method does not maintain
    /// the sort invariant; callers either append in order or restore the
    /// invariant via [`Voice::sort_notes`].
    pub fn append_notes(&mut self, notes: impl IntoIterator<Item = Note>) {
        self.notes.extend(notes);
    }

    /// Restores the sort invariant using a stable sort, so that notes on the
    /// same beat keep their current relative order.
    pub fn sort_notes(&mut self) {
        self.notes.sort_by(Note::cmp_start);
    }

    /// Returns the last note that is not an end-of-phrase marker, if any.
    #[must_use]
    pub fn last_note(&self) -> Option<&Note> {
        self.notes.iter().rfind(|n| !n.kind.is_end_of_phrase())
    }

    /// Returns the last meaningful beat, that is the end of the last note
    /// that is not an end-of-phrase marker, or 0.
    #[must_use]
    pub fn last_beat(&self) -> Beat {
        self.last_note().map_or(0, |n| n.start + n.duration)
    }

    /// Calculates the absolute duration of the voice at the given tempo,
    /// ignoring any trailing end-of-phrase markers.
    #[must_use]
    pub fn duration(&self, bpm: Bpm) -> Duration {
        bpm.duration(self.last_beat())
    }

    /// Determines if the voice contains no notes other than end-of-phrase
    /// markers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.iter().all(|n| n.kind.is_end_of_phrase())
    }

    /// Ensures that no note text ends with a space by moving trailing spaces
    /// onto the following note. Spaces are not moved across end-of-phrase
    /// markers; notes before such markers and the last note simply have their
    /// trailing spaces removed. Only the space character counts as
    /// whitespace.
    pub fn convert_to_leading_spaces(&mut self) {
        for i in 0..self.notes.len().saturating_sub(1) {
            while self.notes[i].text.ends_with(' ') {
                self.notes[i].text.pop();
                if !self.notes[i + 1].kind.is_end_of_phrase() {
                    self.notes[i + 1].text.insert(0, ' ');
                }
            }
        }
    }

    /// Ensures that no note text starts with a space by moving leading spaces
    /// onto the preceding note. The mirror image of
    /// [`Voice::convert_to_leading_spaces`].
    pub fn convert_to_trailing_spaces(&mut self) {
        for i in 1..self.notes.len() {
            while self.notes[i].text.starts_with(' ') {
                self.notes[i].text.remove(0);
                if !self.notes[i - 1].kind.is_end_of_phrase() {
                    self.notes[i - 1].text.push(' ');
                }
            }
        }
    }

    /// Shifts all notes by the specified number of beats.
    pub fn offset(&mut self, offset: Beat) {
        for note in &mut self.notes {
            note.start += offset;
        }
    }

    /// Shifts all notes by the given number of half steps. This corresponds
    /// to a musical transposition from the key C into the key specified by
    /// `delta`.
    pub fn transpose(&mut self, delta: i32) {
        for note in &mut self.notes {
            note.pitch.0 += delta;
        }
    }

    /// Replaces note texts that exactly match one of `texts` by the given
    /// substitute. This can be useful to normalize the text of holding notes.
    pub fn substitute(&mut self, substitute: &str, texts: &[&str]) {
        let texts: HashSet<&str> = texts.iter().copied().collect();
        for note in &mut self.notes {
            if texts.contains(note.text.as_str()) {
                note.text = substitute.to_string();
            }
        }
    }

    /// Rescales all note starts and durations by the given factor, rounding
    /// to the nearest beat.
    pub fn scale(&mut self, factor: f64) {
        for note in &mut self.notes {
            note.start = (note.start as f64 * factor).round() as Beat;
            note.duration = (note.duration as f64 * factor).round() as Beat;
        }
    }

    /// Recalculates note starts and durations to fit the target tempo. After
    /// this method returns, `self.duration(to)` is approximately equal to
    /// what `self.duration(from)` was before the call.
    pub fn scale_bpm(&mut self, from: Bpm, to: Bpm) {
        self.scale(to.0 / from.0);
    }

    /// Returns an iterator over the phrases of the voice. Each item is a
    /// slice of notes up to but not including the next end-of-phrase marker,
    /// together with the beat on which the phrase ends. If the voice does not
    /// end with an end-of-phrase marker, the final phrase ends on
    /// [`Voice::last_beat`].
    #[must_use]
    pub fn phrases(&self) -> Phrases<'_> {
        Phrases {
            voice: self,
            pos: 0,
        }
    }

    /// Generates the full lyrics of the voice by concatenating the
    /// [`Note::lyrics`] of every note.
    #[must_use]
    pub fn lyrics(&self) -> String {
        self.notes.iter().map(Note::lyrics).collect()
    }
}

/// Iterator over the phrases of a [`Voice`], created by [`Voice::phrases`].
#[derive(Debug, Clone)]
pub struct Phrases<'a> {
    voice: &'a Voice,
    pos: usize,
}

impl<'a> Iterator for Phrases<'a> {
    type Item = (&'a [Note], Beat);

    fn next(&mut self) -> Option<Self::Item> {
        let notes = &self.voice.notes;
        if self.pos >= notes.len() {
            return None;
        }
        match notes[self.pos..]
            .iter()
            .position(|n| n.kind.is_end_of_phrase())
        {
            Some(i) => {
                let end = self.pos + i;
                let item = (&notes[self.pos..end], notes[end].start);
                self.pos = end + 1;
                Some(item)
            }
            None => {
                let item = (&notes[self.pos..], self.voice.last_beat());
                self.pos = notes.len();
                Some(item)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::pitch::Pitch;

    fn note(start: Beat, duration: Beat, text: &str) -> Note {
        Note {
            kind: NoteKind::Regular,
            start,
            duration,
            pitch: Pitch(0),
            text: text.to_string(),
        }
    }

    fn line_break(start: Beat) -> Note {
        Note {
            kind: NoteKind::EndOfPhrase,
            start,
            duration: 0,
            pitch: Pitch(0),
            text: "\n".to_string(),
        }
    }

    #[test]
    fn add_note_keeps_order() {
        let mut voice = Voice::default();
        voice.add_note(note(4, 1, "b"));
        voice.add_note(note(1, 1, "a"));
        voice.add_note(note(8, 1, "c"));
        voice.add_note(note(4, 1, "d"));
        let starts: Vec<Beat> = voice.notes.iter().map(|n| n.start).collect();
        assert_eq!(starts, vec![1, 4, 4, 8]);

        // A stable sort must not change anything afterwards.
        let before = voice.notes.clone();
        voice.sort_notes();
        assert_eq!(voice.notes, before);
    }

    #[test]
    fn last_beat_ignores_line_breaks() {
        let mut voice = Voice::default();
        assert_eq!(voice.last_beat(), 0);
        voice.append_notes([note(0, 4, "so"), note(5, 3, "me"), line_break(10)]);
        assert_eq!(voice.last_beat(), 8);
        assert!(!voice.is_empty());

        let breaks_only = Voice {
            name: String::new(),
            notes: vec![line_break(4)],
        };
        assert!(breaks_only.is_empty());
        assert_eq!(breaks_only.last_beat(), 0);
    }

    #[test]
    fn leading_spaces() {
        let mut voice = Voice::default();
        voice.append_notes([note(0, 1, "some  "), note(2, 1, "body"), note(4, 1, "once ")]);
        voice.convert_to_leading_spaces();
        let texts: Vec<&str> = voice.notes.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, vec!["some", "  body", "once "]);
    }

    #[test]
    fn leading_spaces_stop_at_line_break() {
        let mut voice = Voice::default();
        voice.append_notes([note(0, 1, "some "), line_break(2), note(3, 1, "body")]);
        voice.convert_to_leading_spaces();
        let texts: Vec<&str> = voice.notes.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, vec!["some", "\n", "body"]);
    }

    #[test]
    fn trailing_spaces() {
        let mut voice = Voice::default();
        voice.append_notes([note(0, 1, "some"), note(2, 1, "  body"), note(4, 1, " once")]);
        voice.convert_to_trailing_spaces();
        let texts: Vec<&str> = voice.notes.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, vec!["some  ", "body ", "once"]);
    }

    #[test]
    fn offset_and_transpose() {
        let mut voice = Voice::default();
        voice.append_notes([note(0, 4, "a"), note(5, 3, "b")]);
        voice.offset(10);
        voice.transpose(-2);
        assert_eq!(voice.notes[0].start, 10);
        assert_eq!(voice.notes[1].start, 15);
        assert_eq!(voice.notes[0].pitch, Pitch(-2));
    }

    #[test]
    fn substitute_replaces_exact_matches() {
        let mut voice = Voice::default();
        voice.append_notes([note(0, 1, "~"), note(2, 1, "hey"), note(4, 1, "-")]);
        voice.substitute("_", &["~", "-"]);
        let texts: Vec<&str> = voice.notes.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, vec!["_", "hey", "_"]);
    }

    #[test]
    fn scale_rounds_to_nearest_beat() {
        let mut voice = Voice::default();
        voice.append_notes([note(1, 1, "a"), note(3, 2, "b")]);
        voice.scale(1.5);
        assert_eq!(voice.notes[0].start, 2);
        assert_eq!(voice.notes[0].duration, 2);
        assert_eq!(voice.notes[1].start, 5);
        assert_eq!(voice.notes[1].duration, 3);
    }

    #[test]
    fn scale_bpm_preserves_duration() {
        let mut voice = Voice::default();
        voice.append_notes([note(0, 4, "a"), note(8, 4, "b")]);
        let before = voice.duration(Bpm(100.0));
        voice.scale_bpm(Bpm(100.0), Bpm(200.0));
        let after = voice.duration(Bpm(200.0));
        assert_eq!(before, after);
    }

    #[test]
    fn phrases_split_on_line_breaks() {
        let mut voice = Voice::default();
        voice.append_notes([
            note(0, 2, "some"),
            note(3, 2, "body"),
            line_break(6),
            note(7, 2, "once"),
        ]);
        let phrases: Vec<(usize, Beat)> = voice
            .phrases()
            .map(|(notes, end)| (notes.len(), end))
            .collect();
        assert_eq!(phrases, vec![(2, 6), (1, 9)]);
    }

    #[test]
    fn phrases_with_trailing_line_break() {
        let mut voice = Voice::default();
        voice.append_notes([note(0, 2, "some"), line_break(4)]);
        let phrases: Vec<(usize, Beat)> = voice
            .phrases()
            .map(|(notes, end)| (notes.len(), end))
            .collect();
        assert_eq!(phrases, vec![(1, 4)]);
    }

    #[test]
    fn lyrics_concatenate_notes() {
        let mut voice = Voice::default();
        voice.append_notes([
            note(0, 2, "Some"),
            note(3, 2, "body"),
            line_break(6),
            note(7, 2, "once"),
        ]);
        assert_eq!(voice.lyrics(), "Somebody\nonce");
    }
}
