//! Line scanning with one line of lookahead.

use std::io::{self, BufRead};

const BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// A scanner over an input byte stream yielding logical lines.
///
/// Lines are terminated by `\n`, `\r` or `\r\n`; the terminator is not part
/// of the line. A single leading UTF-8 byte order mark is dropped
/// transparently. The scanner supports undoing a single [`scan`](Self::scan)
/// via [`unscan`](Self::unscan), repeating the line last read.
///
/// The scanner yields raw bytes rather than strings because the encoding of
/// a file may only be known after part of it has been read.
#[derive(Debug)]
pub struct LineScanner<R> {
    rd: R,
    line: Vec<u8>,
    lineno: usize,
    rescan: bool,
    bom_checked: bool,
    pending: Vec<u8>,

    /// Skips lines consisting only of whitespace.
    pub skip_empty_lines: bool,
    /// Strips leading spaces and tabs from every line.
    pub trim_leading_whitespace: bool,
}

impl<R: BufRead> LineScanner<R> {
    /// Creates a scanner reading from `rd`.
    pub fn new(rd: R) -> Self {
        Self {
            rd,
            line: Vec::new(),
            lineno: 0,
            rescan: false,
            bom_checked: false,
            pending: Vec::new(),
            skip_empty_lines: false,
            trim_leading_whitespace: false,
        }
    }

    /// Advances the scanner to the next line. Returns false when the input
    /// is exhausted. If the previous call to `scan` was undone via
    /// [`unscan`](Self::unscan), no new data is read.
    pub fn scan(&mut self) -> io::Result<bool> {
        if self.rescan {
            self.rescan = false;
            self.lineno += 1;
            return Ok(true);
        }
        if !self.bom_checked {
            self.bom_checked = true;
            self.skip_bom()?;
        }
        loop {
            if !self.read_line()? {
                return Ok(false);
            }
            self.lineno += 1;
            if self.skip_empty_lines && self.line.trim_ascii().is_empty() {
                continue;
            }
            return Ok(true);
        }
    }

    /// Reverts the last call to [`scan`](Self::scan): the next `scan` will
    /// repeat the current line instead of reading new data. This implements
    /// a lookahead of one line.
    ///
    /// # Panics
    ///
    /// Panics if called before the first `scan` or twice without a `scan` in
    /// between.
    pub fn unscan(&mut self) {
        if self.lineno == 0 {
            panic!("unscan called before scan");
        }
        if self.rescan {
            panic!("unscan called twice without scan");
        }
        self.lineno -= 1;
        self.rescan = true;
    }

    /// Returns the bytes of the current line, with leading whitespace
    /// stripped if [`trim_leading_whitespace`](Self::trim_leading_whitespace)
    /// is set.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        if self.trim_leading_whitespace {
            let start = self
                .line
                .iter()
                .position(|&b| b != b' ' && b != b'\t')
                .unwrap_or(self.line.len());
            &self.line[start..]
        } else {
            &self.line
        }
    }

    /// Returns the 1-based number of the current line. Lines skipped because
    /// of [`skip_empty_lines`](Self::skip_empty_lines) are counted.
    #[must_use]
    pub fn line(&self) -> usize {
        self.lineno
    }

    /// Reads one line into `self.line`. Returns false at a clean end of
    /// input.
    fn read_line(&mut self) -> io::Result<bool> {
        self.line.clear();
        let mut have = !self.pending.is_empty();
        self.line.append(&mut self.pending);
        loop {
            let buf = self.rd.fill_buf()?;
            if buf.is_empty() {
                return Ok(have);
            }
            have = true;
            let (used, terminator) =
                match buf.iter().position(|&b| b == b'\n' || b == b'\r') {
                    Some(i) => {
                        self.line.extend_from_slice(&buf[..i]);
                        (i + 1, Some(buf[i]))
                    }
                    None => {
                        self.line.extend_from_slice(buf);
                        (buf.len(), None)
                    }
                };
            self.rd.consume(used);
            match terminator {
                Some(b'\r') => {
                    // A \r\n pair counts as a single terminator.
                    let buf = self.rd.fill_buf()?;
                    if buf.first() == Some(&b'\n') {
                        self.rd.consume(1);
                    }
                    return Ok(true);
                }
                Some(_) => return Ok(true),
                None => {}
            }
        }
    }

    /// Consumes a leading UTF-8 byte order mark if present. Bytes of a
    /// partial match belong to the first line and are kept in `pending`.
    fn skip_bom(&mut self) -> io::Result<()> {
        let mut matched = 0;
        while matched < BOM.len() {
            let next = self.rd.fill_buf()?.first().copied();
            match next {
                Some(b) if b == BOM[matched] => {
                    self.rd.consume(1);
                    matched += 1;
                }
                _ => {
                    self.pending.extend_from_slice(&BOM[..matched]);
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

#[test]
fn terminators() {
    let mut scanner = LineScanner::new(&b"a\nb\rc\r\nd"[..]);
    let mut lines = Vec::new();
    while scanner.scan().unwrap() {
        lines.push(String::from_utf8(scanner.bytes().to_vec()).unwrap());
    }
    assert_eq!(lines, ["a", "b", "c", "d"]);
    assert_eq!(scanner.line(), 4);
}

#[test]
fn empty_lines() {
    let mut scanner = LineScanner::new(&b"a\n\n  \nb\n"[..]);
    assert!(scanner.scan().unwrap());
    assert_eq!(scanner.bytes(), b"a");
    assert!(scanner.scan().unwrap());
    assert_eq!(scanner.bytes(), b"");
    assert_eq!(scanner.line(), 2);

    let mut scanner = LineScanner::new(&b"a\n\n  \nb\n"[..]);
    scanner.skip_empty_lines = true;
    assert!(scanner.scan().unwrap());
    assert_eq!(scanner.bytes(), b"a");
    assert!(scanner.scan().unwrap());
    assert_eq!(scanner.bytes(), b"b");
    // Skipped lines still count.
    assert_eq!(scanner.line(), 4);
    assert!(!scanner.scan().unwrap());
}

#[test]
fn unscan_repeats_line() {
    let mut scanner = LineScanner::new(&b"one\ntwo\n"[..]);
    assert!(scanner.scan().unwrap());
    assert_eq!(scanner.bytes(), b"one");
    assert_eq!(scanner.line(), 1);
    scanner.unscan();
    assert_eq!(scanner.line(), 0);
    assert!(scanner.scan().unwrap());
    assert_eq!(scanner.bytes(), b"one");
    assert_eq!(scanner.line(), 1);
    assert!(scanner.scan().unwrap());
    assert_eq!(scanner.bytes(), b"two");
    assert_eq!(scanner.line(), 2);
}

#[test]
#[should_panic = "unscan called before scan"]
fn unscan_before_scan() {
    let mut scanner = LineScanner::new(&b"x"[..]);
    scanner.unscan();
}

#[test]
fn bom_is_dropped() {
    let mut scanner = LineScanner::new(&b"\xEF\xBB\xBF#TITLE:A\n"[..]);
    assert!(scanner.scan().unwrap());
    assert_eq!(scanner.bytes(), b"#TITLE:A");
}

#[test]
fn partial_bom_belongs_to_first_line() {
    let mut scanner = LineScanner::new(&b"\xEF\xBBx\n"[..]);
    assert!(scanner.scan().unwrap());
    assert_eq!(scanner.bytes(), b"\xEF\xBBx");
}

#[test]
fn trim_leading_whitespace() {
    let mut scanner = LineScanner::new(&b"  \t: 1 2 3 x\n"[..]);
    scanner.trim_leading_whitespace = true;
    assert!(scanner.scan().unwrap());
    assert_eq!(scanner.bytes(), b": 1 2 3 x");
}

#[test]
fn no_trailing_newline() {
    let mut scanner = LineScanner::new(&b"a\nb"[..]);
    assert!(scanner.scan().unwrap());
    assert!(scanner.scan().unwrap());
    assert_eq!(scanner.bytes(), b"b");
    assert!(!scanner.scan().unwrap());
}
