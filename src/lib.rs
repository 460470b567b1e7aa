//! The UltraStar TXT format parser and writer.
//!
//! UltraStar TXT is the plain text file format used by UltraStar-style
//! karaoke games to describe a song: a header block of `#KEY:VALUE`
//! metadata lines followed by the timed, pitched syllables of up to nine
//! voices. This crate parses such files into a structured [`song::Song`]
//! model and serializes the model back into the format.
//!
//! # Usage
//!
//! For most use cases the [`txt::parse_song`] and [`txt::write_song`]
//! functions are all that is needed:
//!
//! ```
//! use ultrastar_rs::txt;
//!
//! let source = "#TITLE:Example\n#BPM:100\n: 0 4 0 Sing\n: 5 4 2 me\nE\n";
//! let song = txt::parse_song(source).unwrap();
//! assert_eq!(song.title, "Example");
//! assert_eq!(song.voices[0].lyrics(), "Singme");
//!
//! let mut out = Vec::new();
//! txt::write_song(&mut out, &song, ultrastar_rs::song::Version::V1_2_0).unwrap();
//! ```
//!
//! ## Advanced usage
//!
//! [`txt::Reader`] gives access to the individual phases: it reads the
//! header block eagerly and lets you inspect or override the negotiated
//! format [`song::Version`], relative mode and text encoding before
//! streaming the notes:
//!
//! ```
//! use ultrastar_rs::txt::Reader;
//!
//! let source = "#BPM:25\n: 0 4 0 Sing\n";
//! let mut reader = Reader::new(source.as_bytes()).unwrap();
//! assert_eq!(reader.header.get("BPM"), "25");
//! while let Some((note, voice)) = reader.read_note().unwrap() {
//!     println!("P{}: {}", voice + 1, note);
//! }
//! ```
//!
//! # About the format
//!
//! ```text
//! #TITLE:All Star
//! #ARTIST:Smash Mouth
//! #BPM:312
//! #GAP:8000
//! P1
//! : 0 4 0 Some
//! : 5 3 0 ~bo
//! : 9 3 0 dy
//! - 14
//! P2
//! : 15 3 5 once
//! E
//! ```
//!
//! Header keys are case-insensitive. Note lines carry a type byte
//! (`:` regular, `*` golden, `F` freestyle, `R` rap, `G` golden rap), a
//! start beat, a duration, a pitch and the syllable text; `-` lines mark
//! the ends of phrases and `P` lines switch between the voices of a duet.
//! The stored `#BPM` value is a quarter of the in-memory tempo.
//!
//! Old files may carry an `#ENCODING` header naming a legacy code page;
//! see [`txt::EncodingRegistry`].

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

#[cfg(feature = "diagnostics")]
pub mod diagnostics;
pub mod prelude;
pub mod song;
pub mod txt;

pub use song::{Song, Voice};
pub use txt::{Reader, Writer, parse_song, read_song, write_song};
