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

use std::borrow::Cow;
use std::io::{self, Read, Write};
use std::mem;
use std::str;

/// Decodes quoted-printable encoding, as described by RFC 2045.
///
/// Encoded bytes and soft line endings are both handled, the latter by
/// discarding. UNIX line endings are handled as well as DOS line endings.
///
/// This never fails. Invalid sequences are passed through untransformed.
/// Certain restrictions, such as not having trailing whitespace on a line, are
/// not enforced, and are passed through. 8-bit characters are passed through,
/// including invalid UTF-8.
///
/// Returns the decoded text, as well as a possible "dangling" slice, which
/// represents a QP escape sequence that is not yet complete.
pub fn qp_decode(s: &[u8]) -> (Cow<[u8]>, &[u8]) {
    let mut transformed = Vec::new();
    let mut dangling: Option<&[u8]> = None;

    let mut split = s.split(|&b| b'=' == b);
    let mut prefix = split.next();

    for element in split {
        if let Some(prefix) = prefix.take() {
            transformed.extend_from_slice(prefix);
        }

        if let Some(dangling) = dangling.take() {
            transformed.push(b'=');
            transformed.extend_from_slice(dangling);
        }

        if element.is_empty() {
            dangling = Some(element);
            continue;
        }

        if b'\n' == element[0] {
            // Soft line break with UNIX ending, discard
            transformed.extend_from_slice(&element[1..]);
            continue;
        }

        // All other = sequences are two bytes long
        if element.len() < 2 {
            dangling = Some(element);
            continue;
        }

        let encoded = &element[..2];
        let tail = &element[2..];
        if b"\r\n" == encoded {
            // Soft line break with DOS ending, discard
            transformed.extend_from_slice(tail);
            continue;
        }

        if let Some(ch) = str::from_utf8(encoded)
            .ok()
            .and_then(|e| u8::from_str_radix(e, 16).ok())
        {
            // Valid encoded byte
            transformed.push(ch);
            transformed.extend_from_slice(tail);
        } else {
            // Invalid encoding, just push the whole string verbatim
            transformed.push(b'=');
            transformed.extend_from_slice(element);
        }
    }

    if transformed.is_empty() {
        (Cow::Borrowed(s), &[])
    } else {
        (
            Cow::Owned(transformed),
            dangling.map(|d| &s[s.len() - d.len() - 1..]).unwrap_or(&[]),
        )
    }
}

/// Streaming quoted-printable decoder for message bodies.
///
/// Decoding works a line at a time. Hard line breaks (CRLF or a bare LF) come
/// out as a single LF, soft line breaks are removed, and whitespace at the
/// end of an encoded line is dropped as RFC 2045 requires. Invalid escapes
/// are passed through verbatim.
#[derive(Debug)]
pub struct QpDecoder<R> {
    inner: R,
    input: Vec<u8>,
    output: Vec<u8>,
    output_pos: usize,
    eof: bool,
}

impl<R: Read> QpDecoder<R> {
    pub fn new(inner: R) -> Self {
        QpDecoder {
            inner,
            input: Vec::new(),
            output: Vec::new(),
            output_pos: 0,
            eof: false,
        }
    }

    fn decode_line(&mut self, line: &[u8], hard_break: bool) {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let trimmed_len = line
            .iter()
            .rposition(|&b| b' ' != b && b'\t' != b)
            .map_or(0, |ix| ix + 1);
        let mut line = &line[..trimmed_len];

        let soft_break = line.ends_with(b"=");
        if soft_break {
            line = &line[..line.len() - 1];
        }

        let (decoded, dangling) = qp_decode(line);
        self.output.extend_from_slice(&decoded);
        self.output.extend_from_slice(dangling);
        if hard_break && !soft_break {
            self.output.push(b'\n');
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; 4096];
        while self.output_pos >= self.output.len() && !self.eof {
            self.output.clear();
            self.output_pos = 0;

            let nread = self.inner.read(&mut chunk)?;
            if 0 == nread {
                self.eof = true;
                let rest = mem::replace(&mut self.input, Vec::new());
                if !rest.is_empty() {
                    self.decode_line(&rest, false);
                }
                break;
            }

            self.input.extend_from_slice(&chunk[..nread]);
            let input = mem::replace(&mut self.input, Vec::new());
            let mut start = 0;
            while let Some(lf) = memchr::memchr(b'\n', &input[start..]) {
                self.decode_line(&input[start..start + lf], true);
                start += lf + 1;
            }
            self.input = input[start..].to_vec();
        }

        Ok(())
    }
}

impl<R: Read> Read for QpDecoder<R> {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        self.fill()?;
        let avail = &self.output[self.output_pos..];
        let n = avail.len().min(dst.len());
        dst[..n].copy_from_slice(&avail[..n]);
        self.output_pos += n;
        Ok(n)
    }
}

const QP_LINE_LENGTH: usize = 76;

/// Streaming quoted-printable encoder.
///
/// LF in the input becomes a CRLF hard break; every other control byte,
/// including a CR, is escaped, so decoding the output with `QpDecoder` gives
/// back exactly what was written. Lines are kept within 76 columns with soft
/// breaks.
///
/// `finish()` must be called to flush the last line.
#[derive(Debug)]
pub struct QpEncoder<W: Write> {
    inner: W,
    line: Vec<u8>,
}

impl<W: Write> QpEncoder<W> {
    pub fn new(inner: W) -> Self {
        QpEncoder {
            inner,
            line: Vec::new(),
        }
    }

    fn encode_line(&mut self, hard_break: bool) -> io::Result<()> {
        let mut out = Vec::with_capacity(self.line.len() * 3 / 2 + 3);
        let mut column = 0;
        let last = self.line.len().saturating_sub(1);

        for (ix, &b) in self.line.iter().enumerate() {
            let literal = match b {
                b'=' => false,
                b'!'..=b'~' => true,
                b' ' | b'\t' => ix != last,
                _ => false,
            };
            let width = if literal { 1 } else { 3 };

            // Leave room for the '=' of a soft break
            if column + width > QP_LINE_LENGTH - 1 {
                out.extend_from_slice(b"=\r\n");
                column = 0;
            }

            if literal {
                out.push(b);
            } else {
                write!(out, "={:02X}", b)?;
            }
            column += width;
        }

        if hard_break {
            out.extend_from_slice(b"\r\n");
        }

        self.line.clear();
        self.inner.write_all(&out)
    }

    /// Writes out anything buffered and returns the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        if !self.line.is_empty() {
            self.encode_line(false)?;
        }
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for QpEncoder<W> {
    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        let mut rest = src;
        while let Some(lf) = memchr::memchr(b'\n', rest) {
            self.line.extend_from_slice(&rest[..lf]);
            self.encode_line(true)?;
            rest = &rest[lf + 1..];
        }
        self.line.extend_from_slice(rest);
        Ok(src.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
