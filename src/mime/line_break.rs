//-
// Copyright (c) 2026, Jason Lingle
//
// This file is part of Mimetree.
//
// Mimetree is free software: you can  redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mimetree is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Mimetree. If not, see <http://www.gnu.org/licenses/>.

use std::fmt;

/// The line terminator used by a header or multipart container.
///
/// Whatever terminator was found on input is remembered and used again on
/// output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LineBreak {
    /// `\r\n`, the only terminator RFC 5322 actually allows.
    Crlf,
    /// `\n`, as produced by UNIX tooling.
    Lf,
    /// `\r`, as produced by classic Mac OS.
    Cr,
    /// `\n\r`, which shows up from broken conversions now and then.
    Lfcr,
    /// No terminator at all.
    Empty,
}

impl Default for LineBreak {
    fn default() -> Self {
        LineBreak::Crlf
    }
}

/// The order in which terminators are tried when more than one could match.
///
/// The two-byte forms must come before their one-byte prefixes.
const DETECTION_ORDER: [LineBreak; 4] =
    [LineBreak::Crlf, LineBreak::Lfcr, LineBreak::Lf, LineBreak::Cr];

impl LineBreak {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            LineBreak::Crlf => b"\r\n",
            LineBreak::Lf => b"\n",
            LineBreak::Cr => b"\r",
            LineBreak::Lfcr => b"\n\r",
            LineBreak::Empty => b"",
        }
    }

    pub fn len(self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(self) -> bool {
        LineBreak::Empty == self
    }

    /// The sequence marking the end of a header block, i.e., this terminator
    /// doubled.
    pub fn doubled(self) -> &'static [u8] {
        match self {
            LineBreak::Crlf => b"\r\n\r\n",
            LineBreak::Lf => b"\n\n",
            LineBreak::Cr => b"\r\r",
            LineBreak::Lfcr => b"\n\r\n\r",
            LineBreak::Empty => b"",
        }
    }

    /// Finds the earliest double line break in `data`, at or after `from`.
    ///
    /// Returns the terminator and the offset at which the double break
    /// starts. When two forms match at the same offset, the one earlier in
    /// the order CRLF, LFCR, LF, CR wins.
    pub fn find_double(data: &[u8], from: usize) -> Option<(LineBreak, usize)> {
        let haystack = data.get(from..)?;
        let mut best: Option<(LineBreak, usize)> = None;

        for &lb in &DETECTION_ORDER {
            let limit = best.map_or(haystack.len(), |(_, pos)| {
                // Only a strictly earlier match can beat the current one
                (pos + lb.doubled().len()).min(haystack.len())
            });
            if let Some(pos) = find(&haystack[..limit], lb.doubled()) {
                if best.map_or(true, |(_, best_pos)| pos < best_pos) {
                    best = Some((lb, pos));
                }
            }
        }

        best.map(|(lb, pos)| (lb, pos + from))
    }

    /// Guesses the terminator of text which has no double line break.
    ///
    /// The forms are tried in the order CRLF, LFCR, LF, CR and the first one
    /// present anywhere wins. Text with no line break at all is taken to use
    /// CR.
    pub fn detect_single(data: &[u8]) -> LineBreak {
        DETECTION_ORDER
            .iter()
            .copied()
            .find(|lb| find(data, lb.as_bytes()).is_some())
            .unwrap_or(LineBreak::Cr)
    }

    /// If `data` starts with a line break, returns which one.
    pub fn leading(data: &[u8]) -> Option<LineBreak> {
        DETECTION_ORDER
            .iter()
            .copied()
            .find(|lb| data.starts_with(lb.as_bytes()))
    }
}

impl fmt::Display for LineBreak {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            LineBreak::Crlf => "CRLF",
            LineBreak::Lf => "LF",
            LineBreak::Cr => "CR",
            LineBreak::Lfcr => "LFCR",
            LineBreak::Empty => "empty",
        };
        f.write_str(name)
    }
}

/// Returns the offset of the first occurrence of `needle` in `haystack`.
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }

    let first = needle[0];
    let mut base = 0;
    while let Some(ix) = memchr::memchr(first, &haystack[base..]) {
        let start = base + ix;
        if haystack[start..].starts_with(needle) {
            return Some(start);
        }
        base = start + 1;
    }

    None
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_find() {
        assert_eq!(Some(0), find(b"abc", b""));
        assert_eq!(Some(2), find(b"xxabc", b"ab"));
        assert_eq!(None, find(b"xxabc", b"ac"));
        assert_eq!(Some(3), find(b"aababc", b"abc"));
    }

    #[test]
    fn double_break_detection() {
        assert_eq!(
            Some((LineBreak::Crlf, 4)),
            LineBreak::find_double(b"A: b\r\n\r\nbody", 0)
        );
        assert_eq!(
            Some((LineBreak::Lf, 4)),
            LineBreak::find_double(b"A: b\n\nbody\r\n\r\n", 0)
        );
        assert_eq!(
            Some((LineBreak::Cr, 4)),
            LineBreak::find_double(b"A: b\r\rbody", 0)
        );
        assert_eq!(
            Some((LineBreak::Lfcr, 4)),
            LineBreak::find_double(b"A: b\n\r\n\rbody", 0)
        );
        assert_eq!(None, LineBreak::find_double(b"A: b\r\nC: d\r\n", 0));
        assert_eq!(
            Some((LineBreak::Lf, 6)),
            LineBreak::find_double(b"\n\nA: b\n\n", 2)
        );
        assert_eq!(None, LineBreak::find_double(b"abc", 10));
    }

    #[test]
    fn single_break_detection() {
        assert_eq!(LineBreak::Crlf, LineBreak::detect_single(b"a\nb\r\nc"));
        assert_eq!(LineBreak::Lfcr, LineBreak::detect_single(b"a\n\rb"));
        assert_eq!(LineBreak::Lf, LineBreak::detect_single(b"a\nb"));
        assert_eq!(LineBreak::Cr, LineBreak::detect_single(b"a\rb"));
        assert_eq!(LineBreak::Cr, LineBreak::detect_single(b"ab"));
    }

    #[test]
    fn leading_break() {
        assert_eq!(Some(LineBreak::Crlf), LineBreak::leading(b"\r\nfoo"));
        assert_eq!(Some(LineBreak::Lf), LineBreak::leading(b"\nfoo"));
        assert_eq!(None, LineBreak::leading(b"foo\n"));
    }
}
