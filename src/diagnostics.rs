//! Fancy diagnostics support using `ariadne`.
//!
//! The error types of [`crate::txt`] carry line numbers and header keys but
//! no byte positions. This module maps them back onto the source text and
//! renders them as [`ariadne::Report`]s, without changing the error types
//! themselves.
//!
//! # Usage Example
//!
//! ```rust
//! use ultrastar_rs::diagnostics::emit_read_errors;
//! use ultrastar_rs::txt;
//!
//! let source = "#BPM:12\n: 1 2 0 Some\nnot a note\n";
//! if let Err(error) = txt::parse_song(source) {
//!     emit_read_errors("song.txt", source, [&error]);
//! }
//! ```

use ariadne::{Color, Label, Report, ReportKind, Source};

use crate::txt::{HeaderError, HeaderErrors, ReadError, SyntaxError};

/// Simple source mapping that supports locating 1-based lines and header
/// keys in the source text.
pub struct SimpleSource<'a> {
    name: &'a str,
    text: &'a str,
    /// Starting byte offset of each line, with a final element of
    /// `text.len()`.
    line_starts: Vec<usize>,
}

impl<'a> SimpleSource<'a> {
    /// Creates a new source mapping for a named source text.
    #[must_use]
    pub fn new(name: &'a str, text: &'a str) -> Self {
        let mut line_starts = vec![0];
        let mut acc = 0;
        for line in text.split_inclusive('\n') {
            acc += line.len();
            line_starts.push(acc);
        }
        if *line_starts.last().unwrap_or(&0) != text.len() {
            line_starts.push(text.len());
        }
        Self {
            name,
            text,
            line_starts,
        }
    }

    /// The name of the source file.
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// The complete source text.
    #[must_use]
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// The byte range of a 1-based line, clamped to the source text.
    #[must_use]
    pub fn line_span(&self, line: usize) -> std::ops::Range<usize> {
        let start_index = line
            .saturating_sub(1)
            .min(self.line_starts.len().saturating_sub(2));
        let end_index = line.min(self.line_starts.len().saturating_sub(1));
        let start = self.line_starts[start_index];
        let end = self.line_starts[end_index];
        // Exclude the line terminator from the span.
        let end = self.text[start..end].trim_end_matches(['\r', '\n']).len() + start;
        start..end
    }

    /// The byte range of the header line with the given canonical key, if
    /// one exists.
    #[must_use]
    pub fn header_span(&self, key: &str) -> Option<std::ops::Range<usize>> {
        for line in 1..self.line_starts.len() {
            let span = self.line_span(line);
            let text = self.text[span.clone()].trim_start();
            let Some(rest) = text.strip_prefix('#') else {
                continue;
            };
            let name = rest.split(':').next().unwrap_or(rest);
            if crate::song::canonical_header_key(name) == key {
                return Some(span);
            }
        }
        None
    }
}

/// Trait for converting the errors of this crate to [`ariadne::Report`]s.
pub trait ToAriadne {
    /// Converts the error to an ariadne report over `src`.
    fn to_report<'a>(&self, src: &SimpleSource<'a>)
    -> Report<'a, (String, std::ops::Range<usize>)>;
}

impl ToAriadne for SyntaxError {
    fn to_report<'a>(
        &self,
        src: &SimpleSource<'a>,
    ) -> Report<'a, (String, std::ops::Range<usize>)> {
        let span = src.line_span(self.line);
        let name = src.name().to_string();
        Report::build(ReportKind::Error, (name.clone(), span.clone()))
            .with_message(self.kind.to_string())
            .with_label(
                Label::new((name, span))
                    .with_message(format!("line {}", self.line))
                    .with_color(Color::Red),
            )
            .finish()
    }
}

impl ToAriadne for HeaderError {
    fn to_report<'a>(
        &self,
        src: &SimpleSource<'a>,
    ) -> Report<'a, (String, std::ops::Range<usize>)> {
        let span = src.header_span(&self.key).unwrap_or(0..0);
        let name = src.name().to_string();
        Report::build(ReportKind::Error, (name.clone(), span.clone()))
            .with_message(format!("invalid header value: {}", self.kind))
            .with_label(
                Label::new((name, span))
                    .with_message(format!("#{}", self.key))
                    .with_color(Color::Yellow),
            )
            .finish()
    }
}

impl ToAriadne for ReadError {
    fn to_report<'a>(
        &self,
        src: &SimpleSource<'a>,
    ) -> Report<'a, (String, std::ops::Range<usize>)> {
        match self {
            Self::Syntax(error) => error.to_report(src),
            Self::Header(HeaderErrors(errors)) => match errors.first() {
                Some(error) => error.to_report(src),
                None => {
                    let name = src.name().to_string();
                    Report::build(ReportKind::Error, (name.clone(), 0..0))
                        .with_message("invalid header")
                        .with_label(Label::new((name, 0..0)))
                        .finish()
                }
            },
            Self::Io(error) => {
                let name = src.name().to_string();
                Report::build(ReportKind::Error, (name.clone(), 0..0))
                    .with_message(format!("read error: {error}"))
                    .with_label(Label::new((name, 0..0)))
                    .finish()
            }
        }
    }
}

/// Convenience function: renders a list of read errors to standard output.
pub fn emit_read_errors<'a>(
    name: &'a str,
    source: &'a str,
    errors: impl IntoIterator<Item = &'a ReadError>,
) {
    let simple = SimpleSource::new(name, source);
    let ariadne_source = Source::from(source);
    for error in errors {
        let report = error.to_report(&simple);
        let _ = report.print((name.to_string(), ariadne_source.clone()));
    }
}
