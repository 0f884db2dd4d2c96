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

//! Splitting of multipart bodies into their parts.

use std::io::{self, Cursor, Read};
use std::mem;

use log::warn;

use super::body::Body;
use super::line_break::{self, LineBreak};
use crate::support::error::Error;

/// The boundary delimiters for one multipart body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tokens {
    /// `--boundary LB`, which opens a body that has no preamble.
    pub start: Vec<u8>,
    /// `LB --boundary LB`, which separates parts.
    pub middle: Vec<u8>,
    /// `LB --boundary--`, which closes the last part.
    pub end: Vec<u8>,
}

impl Tokens {
    pub fn new(boundary: &str, line_break: LineBreak) -> Self {
        let lb = line_break.as_bytes();

        let mut dash_boundary = b"--".to_vec();
        dash_boundary.extend_from_slice(boundary.as_bytes());

        let mut start = dash_boundary.clone();
        start.extend_from_slice(lb);

        let mut middle = lb.to_vec();
        middle.extend_from_slice(&start);

        let mut end = lb.to_vec();
        end.extend_from_slice(&dash_boundary);
        end.extend_from_slice(b"--");

        Tokens { start, middle, end }
    }

    fn longest(&self) -> usize {
        self.middle.len().max(self.end.len())
    }
}

/// The pieces of a multipart body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scanned {
    /// Everything before the first boundary, including the line break that
    /// belongs to that boundary. `None` if no boundary was ever found.
    pub prefix: Option<Vec<u8>>,
    pub parts: Vec<Vec<u8>>,
    /// Everything after the closing boundary. `None` if there was no closing
    /// boundary.
    pub suffix: Option<Vec<u8>>,
}

impl Scanned {
    /// Puts the pieces back together, reproducing the scanned body.
    pub fn reassemble(&self, tokens: &Tokens) -> Vec<u8> {
        let mut out = Vec::new();
        if let Some(ref prefix) = self.prefix {
            out.extend_from_slice(prefix);
            out.extend_from_slice(&tokens.start);
        }

        for (ix, part) in self.parts.iter().enumerate() {
            if ix > 0 {
                out.extend_from_slice(&tokens.middle);
            }
            out.extend_from_slice(part);
        }

        if let Some(ref suffix) = self.suffix {
            out.extend_from_slice(&tokens.end);
            out.extend_from_slice(suffix);
        }

        out
    }
}

#[derive(Debug)]
pub enum ScanOutcome {
    Complete(Scanned),
    /// Scanning could not finish. `body` reproduces the original body in
    /// full.
    Failed { body: Body, error: Error },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Token {
    Middle,
    End,
}

struct Scanner<'a> {
    tokens: &'a Tokens,
    reader: Body,
    buf: Vec<u8>,
    eof: bool,
    chunk_size: usize,
    max_part_length: usize,
    prefix: Option<Vec<u8>>,
    parts: Vec<Vec<u8>>,
}

impl<'a> Scanner<'a> {
    /// Reads one more chunk into `buf`. Returns false at EOF.
    fn fill(&mut self) -> io::Result<bool> {
        if self.eof {
            return Ok(false);
        }

        let nread = (&mut self.reader)
            .take(self.chunk_size as u64)
            .read_to_end(&mut self.buf)?;
        if 0 == nread {
            self.eof = true;
        }
        Ok(0 != nread)
    }

    /// Finds the earliest boundary in `buf` at or after `from`. The closing
    /// boundary is only recognised once the first boundary has been seen.
    fn find(&self, from: usize) -> Option<(usize, Token)> {
        let haystack = &self.buf[from..];
        let middle = line_break::find(haystack, &self.tokens.middle)
            .map(|ix| (ix + from, Token::Middle));
        if self.prefix.is_none() {
            return middle;
        }

        let end = line_break::find(haystack, &self.tokens.end)
            .map(|ix| (ix + from, Token::End));
        match (middle, end) {
            (Some(m), Some(e)) => Some(if m.0 < e.0 { m } else { e }),
            (m, e) => m.or(e),
        }
    }

    /// Removes and returns `buf[..len]`, discarding a further `skip` bytes.
    fn take_front(&mut self, len: usize, skip: usize) -> Vec<u8> {
        let rest = self.buf.split_off(len + skip);
        let mut front = mem::replace(&mut self.buf, rest);
        front.truncate(len);
        front
    }

    /// Rebuilds the original body from what has been consumed so far, with
    /// `closing` being the token that followed the last part.
    fn reconstitute(self, closing: &[u8], error: Error) -> ScanOutcome {
        let mut out = Vec::new();
        if let Some(prefix) = self.prefix {
            out.extend_from_slice(&prefix);
            out.extend_from_slice(&self.tokens.start);
        }

        let nparts = self.parts.len();
        for (ix, part) in self.parts.into_iter().enumerate() {
            out.extend_from_slice(&part);
            if ix + 1 == nparts {
                out.extend_from_slice(closing);
            } else {
                out.extend_from_slice(&self.tokens.middle);
            }
        }

        out.extend_from_slice(&self.buf);
        ScanOutcome::Failed {
            body: Body::new(Cursor::new(out).chain(self.reader)),
            error,
        }
    }

    fn run(mut self) -> io::Result<ScanOutcome> {
        while self.buf.len() < self.tokens.start.len() && self.fill()? {}
        if self.buf.starts_with(&self.tokens.start) {
            self.prefix = Some(Vec::new());
            self.take_front(0, self.tokens.start.len());
        }

        let mut search_from = 0;
        loop {
            match self.find(search_from) {
                Some((ix, _)) if ix > self.max_part_length => {
                    return Ok(self.too_large());
                },

                Some((ix, Token::Middle)) => {
                    search_from = 0;
                    if self.prefix.is_none() {
                        // The line break before the boundary belongs to it,
                        // but is kept with the prefix so the start token can
                        // be used for the rest.
                        let lb_len =
                            self.tokens.middle.len() - self.tokens.start.len();
                        let prefix = self.take_front(
                            ix + lb_len,
                            self.tokens.start.len(),
                        );
                        self.prefix = Some(prefix);
                    } else {
                        let part =
                            self.take_front(ix, self.tokens.middle.len());
                        self.parts.push(part);
                    }
                },

                Some((ix, Token::End)) => {
                    let part = self.take_front(ix, self.tokens.end.len());
                    self.parts.push(part);
                    return self.finish_suffix();
                },

                None => {
                    if self.buf.len()
                        > self.max_part_length + self.tokens.longest()
                    {
                        return Ok(self.too_large());
                    }

                    search_from = self
                        .buf
                        .len()
                        .saturating_sub(self.tokens.longest() - 1);
                    if !self.fill()? {
                        if self.buf.len() > self.max_part_length {
                            return Ok(self.too_large());
                        }

                        // No closing boundary; the last part runs to the end
                        let rest = mem::replace(&mut self.buf, Vec::new());
                        self.parts.push(rest);
                        return Ok(ScanOutcome::Complete(Scanned {
                            prefix: self.prefix,
                            parts: self.parts,
                            suffix: None,
                        }));
                    }
                },
            }
        }
    }

    /// Gives up on a part which is still in `buf` and exceeds the limit.
    fn too_large(self) -> ScanOutcome {
        warn!(
            "Multipart part exceeds limit of {} bytes",
            self.max_part_length
        );
        // Only a middle boundary can have ended the previous part
        let middle = self.tokens.middle.clone();
        self.reconstitute(&middle, Error::LargePart)
    }

    fn finish_suffix(mut self) -> io::Result<ScanOutcome> {
        loop {
            if self.buf.len() > self.max_part_length {
                warn!(
                    "Multipart epilogue exceeds limit of {} bytes",
                    self.max_part_length
                );
                let end = self.tokens.end.clone();
                return Ok(self.reconstitute(&end, Error::LargePart));
            }

            if !self.fill()? {
                return Ok(ScanOutcome::Complete(Scanned {
                    prefix: self.prefix,
                    parts: self.parts,
                    suffix: Some(self.buf),
                }));
            }
        }
    }
}

/// Splits `body` on the boundaries in `tokens`.
///
/// If no boundary is found at all, the whole body comes back as a single
/// part with neither prefix nor suffix, so that it is written back without
/// any boundaries added.
pub fn scan(
    body: Body,
    tokens: &Tokens,
    max_part_length: usize,
    chunk_size: usize,
) -> io::Result<ScanOutcome> {
    Scanner {
        tokens,
        reader: body,
        buf: Vec::new(),
        eof: false,
        chunk_size: chunk_size.max(1),
        max_part_length,
        prefix: None,
        parts: Vec::new(),
    }
    .run()
}
