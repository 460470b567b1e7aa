use pretty_assertions::assert_eq;
use time::Duration;
use ultrastar_rs::prelude::*;

fn flat(voice: &Voice) -> Vec<(NoteKind, Beat, Beat, i32, &str)> {
    voice
        .notes
        .iter()
        .map(|n| (n.kind, n.start, n.duration, n.pitch.0, n.text.as_str()))
        .collect()
}

#[test]
fn notes() {
    let song = parse_song("#BPM:12\n: 1 2 0 Some\n: 3 2 0 body\n").unwrap();
    assert!(!song.is_duet());
    assert_eq!(song.bpm, Bpm(48.0));
    assert_eq!(song.voices.len(), 1);
    assert_eq!(
        flat(&song.voices[0]),
        vec![
            (NoteKind::Regular, 1, 2, 0, "Some"),
            (NoteKind::Regular, 3, 2, 0, "body"),
        ]
    );
}

#[test]
fn line_breaks() {
    let song = parse_song("#BPM:4\n: 1 2 4 Some\n- 3\n: 4 1 3 body").unwrap();
    assert_eq!(
        flat(&song.voices[0]),
        vec![
            (NoteKind::Regular, 1, 2, 4, "Some"),
            (NoteKind::EndOfPhrase, 3, 0, 0, "\n"),
            (NoteKind::Regular, 4, 1, 3, "body"),
        ]
    );
}

#[test]
fn duet() {
    let song = parse_song("#BPM:2\nP1\n: 1 2 4 Some\nP 2\n: 3 4 5 body").unwrap();
    assert!(song.is_duet());
    assert_eq!(song.voices.len(), 2);
    assert_eq!(flat(&song.voices[0]), vec![(NoteKind::Regular, 1, 2, 4, "Some")]);
    assert_eq!(flat(&song.voices[1]), vec![(NoteKind::Regular, 3, 4, 5, "body")]);
}

#[test]
fn unexpected_voice_change() {
    // A voice change is only legal when the body leads with one.
    let err = parse_song("#BPM:20\n: 1 2 4 Some\nP2\n: 3 4 5 body").unwrap_err();
    let syntax = err.syntax().expect("expected a syntax error");
    assert_eq!(syntax.line, 3);
    assert_eq!(syntax.kind, SyntaxErrorKind::UnexpectedVoiceChange);
}

#[test]
fn invalid_voice_number() {
    let err = parse_song("#BPM:10\nP-1\n: 1 2 4 Some").unwrap_err();
    let syntax = err.syntax().expect("expected a syntax error");
    assert_eq!(syntax.line, 2);
    assert_eq!(syntax.kind, SyntaxErrorKind::InvalidVoiceNumber);

    let err = parse_song("#BPM:10\nP10\n: 1 2 4 Some").unwrap_err();
    assert_eq!(
        err.syntax().unwrap().kind,
        SyntaxErrorKind::InvalidVoiceNumber
    );
}

#[test]
fn stuff_after_end_tag_is_ignored() {
    let song = parse_song(
        "#BPM: 42\n: 1 2 4 Some\n* 3 4 5 body\nE\nThis can be anything\nwith multiple lines.",
    )
    .unwrap();
    assert_eq!(song.voices[0].notes.len(), 2);
    assert_eq!(song.voices[0].notes[1].kind, NoteKind::Golden);
}

#[test]
fn invalid_end_tag() {
    let err = parse_song("#BPM:42\n: 1 2 4 Some\nEnd\n").unwrap_err();
    assert_eq!(err.syntax().unwrap().kind, SyntaxErrorKind::InvalidEndTag);

    let mut reader = Reader::with_dialect(
        &b"#BPM:42\n: 1 2 4 Some\nEnd\n"[..],
        Dialect {
            strict_end_tag: false,
            ..Dialect::default()
        },
        EncodingRegistry::default(),
    )
    .unwrap();
    let song = reader.read_song().unwrap();
    assert_eq!(song.voices[0].notes.len(), 1);
}

#[test]
fn empty_lines_between_notes() {
    let song = parse_song("#TITLE:ABC\n#BPM:12\n\n: 1 2 4 Some\n\n: 8 2 4 body").unwrap();
    assert_eq!(song.voices[0].notes.len(), 2);

    let mut reader = Reader::with_dialect(
        &b"#BPM:12\n: 1 2 4 Some\n\n: 8 2 4 body"[..],
        Dialect {
            skip_empty_lines: false,
            ..Dialect::default()
        },
        EncodingRegistry::default(),
    )
    .unwrap();
    let err = reader.read_song().unwrap_err();
    let syntax = err.syntax().expect("expected a syntax error");
    assert_eq!(syntax.line, 3);
    assert_eq!(syntax.kind, SyntaxErrorKind::EmptyLine);
}

#[test]
fn no_notes() {
    let song = parse_song("#Title:ABC\n#BPM: 23").unwrap();
    assert_eq!(song.bpm, Bpm(92.0));
    assert_eq!(song.voices.len(), 0);
}

#[test]
fn missing_bpm() {
    let err = parse_song(": 1 2 3 some\n: 4 5 6 body\n* 7 8 9 once").unwrap_err();
    let errors = err.header().expect("expected header errors");
    assert!(errors.matches_key("BPM"));
    assert!(!errors.matches_key("TITLE"));
}

#[test]
fn leading_whitespace_is_an_unknown_event() {
    let err = parse_song("#BPM:12\n: 1 2 0 Some\n : 3 2 0 body\n").unwrap_err();
    let syntax = err.syntax().expect("expected a syntax error");
    assert_eq!(syntax.line, 3);
    assert_eq!(syntax.kind, SyntaxErrorKind::UnknownEvent);

    let mut reader = Reader::with_dialect(
        &b"#BPM:12\n: 1 2 0 Some\n : 3 2 0 body\n"[..],
        Dialect {
            trim_leading_whitespace: true,
            ..Dialect::default()
        },
        EncodingRegistry::default(),
    )
    .unwrap();
    let song = reader.read_song().unwrap();
    assert_eq!(song.voices[0].notes.len(), 2);
}

#[test]
fn bom_is_stripped() {
    let source = b"\xEF\xBB\xBF#TITLE:A\n#BPM:4\n: 0 1 0 x\n";
    let song = read_song(&source[..]).unwrap();
    assert_eq!(song.title, "A");
    assert_eq!(song.voices[0].notes.len(), 1);
}

#[test]
fn notes_are_sorted_by_start() {
    let song = parse_song("#BPM:4\n: 9 2 0 later\n: 1 2 0 sooner\n- 5\n").unwrap();
    let starts: Vec<Beat> = song.voices[0].notes.iter().map(|n| n.start).collect();
    assert_eq!(starts, vec![1, 5, 9]);
}

#[test]
fn relative_mode() {
    let song = parse_song("#BPM:10\n#RELATIVE:yes\n: 1 2 0 a\n- 3 5\n: 1 2 0 b\n").unwrap();
    assert_eq!(
        flat(&song.voices[0]),
        vec![
            (NoteKind::Regular, 1, 2, 0, "a"),
            (NoteKind::EndOfPhrase, 3, 0, 0, "\n"),
            (NoteKind::Regular, 6, 2, 0, "b"),
        ]
    );
}

#[test]
fn relative_mode_tracks_voices_separately() {
    let song = parse_song(
        "#BPM:10\n#RELATIVE:YES\nP1\n: 0 1 0 a\n- 2 4\nP 2\n: 1 1 0 c\nP 1\n: 0 1 0 b\n",
    )
    .unwrap();
    assert_eq!(
        flat(&song.voices[0]),
        vec![
            (NoteKind::Regular, 0, 1, 0, "a"),
            (NoteKind::EndOfPhrase, 2, 0, 0, "\n"),
            (NoteKind::Regular, 4, 1, 0, "b"),
        ]
    );
    assert_eq!(flat(&song.voices[1]), vec![(NoteKind::Regular, 1, 1, 0, "c")]);
}

#[test]
fn relative_header_is_not_special_in_modern_versions() {
    let song =
        parse_song("#VERSION:1.0.0\n#RELATIVE:YES\n#BPM:10\n: 1 2 0 a\n- 3\n: 4 2 0 b\n").unwrap();
    assert_eq!(song.header.get("RELATIVE"), "YES");
    // Notes are absolute: the line break carries no offset.
    assert_eq!(song.voices[0].notes[2].start, 4);
}

#[test]
fn bpm_change_lines() {
    let source = "#BPM:4\n: 1 2 4 Some\nB 5 12,3\n: 10 8 1 body\n";
    let err = parse_song(source).unwrap_err();
    let syntax = err.syntax().expect("expected a syntax error");
    assert_eq!(syntax.line, 3);
    assert_eq!(syntax.kind, SyntaxErrorKind::MultiBpm);

    let mut reader = Reader::with_dialect(
        source.as_bytes(),
        Dialect {
            bpm_changes: BpmChangePolicy::Discard,
            ..Dialect::default()
        },
        EncodingRegistry::default(),
    )
    .unwrap();
    let song = reader.read_song().unwrap();
    assert_eq!(song.voices[0].notes.len(), 2);

    let mut reader = Reader::with_dialect(
        &b"#BPM:4\nB five x\n: 1 2 4 Some\n"[..],
        Dialect {
            bpm_changes: BpmChangePolicy::Discard,
            ..Dialect::default()
        },
        EncodingRegistry::default(),
    )
    .unwrap();
    let err = reader.read_song().unwrap_err();
    assert_eq!(
        err.syntax().unwrap().kind,
        SyntaxErrorKind::InvalidBpmChange
    );
}

#[test]
fn unknown_events() {
    let err = parse_song("#BPM:4\nX 1 2 3\n: 1 2 4 Some\n").unwrap_err();
    assert_eq!(err.syntax().unwrap().kind, SyntaxErrorKind::UnknownEvent);

    let mut reader = Reader::with_dialect(
        &b"#BPM:4\nX 1 2 3\n: 1 2 4 Some\n"[..],
        Dialect::tolerant(),
        EncodingRegistry::default(),
    )
    .unwrap();
    let song = reader.read_song().unwrap();
    assert_eq!(song.voices[0].notes.len(), 1);
}

#[test]
fn required_end_tag() {
    let mut reader = Reader::with_dialect(
        &b"#BPM:4\n: 1 2 4 Some\n"[..],
        Dialect {
            require_end_tag: true,
            ..Dialect::default()
        },
        EncodingRegistry::default(),
    )
    .unwrap();
    let err = reader.read_song().unwrap_err();
    assert_eq!(err.syntax().unwrap().kind, SyntaxErrorKind::MissingEndTag);
}

#[test]
fn header_collection() {
    let reader = Reader::new(
        &b"#TITLE: Spaced \n#\n#CUSTOM\n#X-COUNT:1\n#x-count:2\n: 1 2 3 x\n"[..],
    )
    .unwrap();
    assert_eq!(reader.header.get("TITLE"), "Spaced");
    assert!(!reader.header.has("CUSTOM"));
    assert_eq!(reader.header.len(), 3);
    assert_eq!(reader.header.values("X-COUNT"), ["1", "2"]);
}

#[test]
fn version_negotiation() {
    let reader = Reader::new(&b"#BPM:4\n"[..]).unwrap();
    assert_eq!(reader.version, Version::V0_3_0);

    let reader = Reader::new(&b"#VERSION:1.2.0\n#BPM:4\n"[..]).unwrap();
    assert_eq!(reader.version, Version::V1_2_0);
    assert!(reader.header_errors().is_empty());

    let reader = Reader::new(&b"#VERSION:bogus\n#BPM:4\n"[..]).unwrap();
    assert_eq!(reader.version, Version::V0_3_0);
    assert!(reader.header_errors()[0].matches_key("VERSION"));
}

#[test]
fn unknown_encoding() {
    let reader = Reader::new(&b"#ENCODING:utf16\n#BPM:4\n"[..]).unwrap();
    assert!(reader.header_errors()[0].matches_key("ENCODING"));
    assert!(matches!(
        reader.header_errors()[0].kind,
        HeaderErrorKind::UnknownEncoding(_)
    ));
}

#[test]
fn legacy_encoding_applies_to_header_and_notes() {
    // 0xF8 is "ø" in CP-1252.
    let source = b"#TITLE:M\xF8\n#ENCODING:CP1252\n#BPM:4\n: 0 1 0 s\xF8ng\n";
    let song = read_song(&source[..]).unwrap();
    assert_eq!(song.title, "Mø");
    assert_eq!(song.voices[0].notes[0].text, "søng");
    // The reader consumes ENCODING for old format versions.
    assert!(!song.header.has("ENCODING"));
}

#[test]
fn use_encoding_reinterprets_the_header() {
    // The file claims CP-1250 but its bytes are CP-1252: byte 0xF8 decodes
    // as "ř" instead of "ø".
    let source = b"#TITLE:M\xF8\n#ENCODING:CP1250\n#BPM:4\n: 0 1 0 x\n";
    let registry = EncodingRegistry::default();
    let mut reader = Reader::new(&source[..]).unwrap();
    assert_eq!(reader.header.get("TITLE"), "Mř");

    reader.use_encoding(registry.get("cp1252"));
    assert_eq!(reader.header.get("TITLE"), "Mø");
    let song = reader.read_song().unwrap();
    assert_eq!(song.title, "Mø");
}

#[test]
fn voice_names() {
    let song = parse_song("#BPM:4\n#P1:Alice\n#P2:Bob\nP1\n: 0 1 0 a\nP2\n: 2 1 0 b\n").unwrap();
    assert_eq!(song.voices.len(), 2);
    assert_eq!(song.voices[0].name, "Alice");
    assert_eq!(song.voices[1].name, "Bob");
    // The P headers are consumed by the reader.
    assert!(!song.header.has("P1"));
}

#[test]
fn duet_singer_names_are_legacy() {
    let song = parse_song("#BPM:4\n#DUETSINGERP1:Ann\n: 0 1 0 x\n").unwrap();
    assert_eq!(song.voices[0].name, "Ann");
    assert!(!song.header.has("DUETSINGERP1"));

    let song = parse_song("#VERSION:1.0.0\n#BPM:4\n#DUETSINGERP1:Ann\n: 0 1 0 x\n").unwrap();
    assert_eq!(song.voices[0].name, "");
    assert_eq!(song.header.get("DUETSINGERP1"), "Ann");
}

#[test]
fn typed_metadata_fields() {
    let song = parse_song(
        "#TITLE:All Star\n#ARTIST:Smash Mouth\n#YEAR:1999\n#GENRE:Rock,Pop\n#CREATOR:a,b\n\
         #COMMENT:hi\n#MP3:song.mp3\n#COVER:c.jpg\n#AUDIOURL:https://example.com/a.mp3\n\
         #BPM:312\n: 0 1 0 x\n",
    )
    .unwrap();
    assert_eq!(song.title, "All Star");
    assert_eq!(song.artists, ["Smash Mouth"]);
    assert_eq!(song.year, 1999);
    assert_eq!(song.genres, ["Rock", "Pop"]);
    assert_eq!(song.creators, ["a", "b"]);
    assert_eq!(song.comment, "hi");
    assert_eq!(song.audio, "song.mp3");
    assert_eq!(song.cover, "c.jpg");
    assert_eq!(
        song.audio_url.as_ref().map(|u| u.as_str()),
        Some("https://example.com/a.mp3")
    );
    assert_eq!(song.bpm, Bpm(1248.0));
}

#[test]
fn author_is_a_creator_alias() {
    let song = parse_song("#BPM:4\n#AUTHOR:alice\n: 0 1 0 x\n").unwrap();
    assert_eq!(song.creators, ["alice"]);

    // An explicit CREATOR wins over the alias.
    let song = parse_song("#BPM:4\n#CREATOR:carol\n#AUTOR:alice\n: 0 1 0 x\n").unwrap();
    assert_eq!(song.creators, ["carol"]);
}

#[test]
fn durations_before_version_2() {
    let song = parse_song("#BPM:4\n#GAP:1000,5\n#VIDEOGAP:2.5\n#START:12\n: 0 1 0 x\n").unwrap();
    assert_eq!(song.gap, Duration::seconds_f64(1.0005));
    assert_eq!(song.video_gap, Duration::seconds_f64(2.5));
    assert_eq!(song.start, Duration::seconds(12));
}

#[test]
fn durations_in_version_2() {
    let song = parse_song(
        "#VERSION:2.0.0\n#BPM:100\n#GAP:5000\n#VIDEOGAP:1500\n#START:20000\n\
         #MEDLEYSTART:30000\n#MEDLEYEND:50000\n: 0 1 0 x\n",
    )
    .unwrap();
    assert_eq!(song.gap, Duration::seconds(5));
    assert_eq!(song.video_gap, Duration::milliseconds(1500));
    assert_eq!(song.start, Duration::seconds(20));
    assert_eq!(song.medley_start, Duration::seconds(30));
    assert_eq!(song.medley_end, Duration::seconds(50));

    let err = parse_song("#VERSION:2.0.0\n#BPM:100\n#GAP:1,5\n: 0 1 0 x\n").unwrap_err();
    assert!(err.header().unwrap().matches_key("GAP"));
}

#[test]
fn medley_beats_before_version_2() {
    let song =
        parse_song("#BPM:15\n#GAP:1000\n#MEDLEYSTARTBEAT:60\n#MEDLEYENDBEAT:120\n: 0 1 0 x\n")
            .unwrap();
    // 60 beats at 60 BPM are one minute, offset by the gap.
    assert_eq!(song.medley_start, Duration::seconds(61));
    assert_eq!(song.medley_end, Duration::seconds(121));

    // MEDLEYSTART has no meaning before 2.0.0 and stays in the header.
    let song = parse_song("#BPM:15\n#MEDLEYSTART:30000\n: 0 1 0 x\n").unwrap();
    assert_eq!(song.medley_start, Duration::ZERO);
    assert_eq!(song.header.get("MEDLEYSTART"), "30000");
}

#[test]
fn conflicting_headers() {
    let err = parse_song("#BPM:4\n#BPM:5\n: 0 1 0 x\n").unwrap_err();
    let errors = err.header().expect("expected header errors");
    assert!(errors.matches_key("BPM"));
    assert_eq!(
        errors.iter().next().unwrap().kind,
        HeaderErrorKind::MultipleValues
    );

    // Repeating the same value is fine.
    let song = parse_song("#BPM:4\n#BPM:4\n: 0 1 0 x\n").unwrap();
    assert_eq!(song.bpm, Bpm(16.0));
}

#[test]
fn unknown_headers_are_kept() {
    let song = parse_song("#BPM:4\n#X-CUSTOM:hello\n#RESOLUTION:4\n: 0 1 0 x\n").unwrap();
    assert_eq!(song.header.get("X-CUSTOM"), "hello");
    assert_eq!(song.header.get("RESOLUTION"), "4");
}

#[test]
fn relaxed_mode_collects_errors() {
    let mut reader = Reader::new(
        &b"#BPM:4\n: 1 2 4 Some\nnonsense\n: 5 4 3test\n* 10 2 0 ok\n"[..],
    )
    .unwrap();
    let ReadSongOutput { song, errors } = reader.read_song_relaxed();
    assert_eq!(song.voices[0].notes.len(), 2);
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].syntax().unwrap().line, 3);
    assert_eq!(errors[1].syntax().unwrap().line, 4);
    assert_eq!(
        errors[1].syntax().unwrap().kind,
        SyntaxErrorKind::InvalidNote(NoteLineError::MissingWhitespace)
    );
}

#[test]
fn relaxed_mode_reports_header_errors_but_keeps_parsing() {
    let mut reader = Reader::new(&b"#BPM:nope\n: 1 2 4 Some\n"[..]).unwrap();
    let ReadSongOutput { song, errors } = reader.read_song_relaxed();
    assert_eq!(song.voices[0].notes.len(), 1);
    assert!(errors.iter().any(|e| e
        .header()
        .is_some_and(|errors| errors.matches_key("BPM"))));
}

#[test]
fn reader_can_be_reset() {
    let mut reader = Reader::new(&b"#BPM:4\n: 0 1 0 a\nE\n"[..]).unwrap();
    let first = reader.read_song().unwrap();
    assert_eq!(first.voices[0].notes[0].text, "a");

    reader.reset(&b"#BPM:8\n: 0 1 0 b\nE\n"[..]).unwrap();
    let second = reader.read_song().unwrap();
    assert_eq!(second.bpm, Bpm(32.0));
    assert_eq!(second.voices[0].notes[0].text, "b");
}

#[test]
fn crlf_and_cr_line_endings() {
    let song = parse_song("#BPM:4\r\n: 1 2 0 a\r: 3 2 0 b\r\nE\r\n").unwrap();
    assert_eq!(song.voices[0].notes.len(), 2);
}
