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

//! Transfer encodings for leaf bodies.

use std::fmt;
use std::io::{self, Read, Write};
use std::mem;

use log::warn;

use super::body::Body;
use super::quoted_printable::{QpDecoder, QpEncoder};

/// The value of a `Content-Transfer-Encoding` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferEncoding {
    SevenBit,
    EightBit,
    Binary,
    Base64,
    QuotedPrintable,
}

impl Default for TransferEncoding {
    fn default() -> Self {
        TransferEncoding::SevenBit
    }
}

impl TransferEncoding {
    /// Interprets a `Content-Transfer-Encoding` value.
    ///
    /// Returns `None` if the encoding is not one RFC 2045 defines.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "7bit" => Some(TransferEncoding::SevenBit),
            "8bit" => Some(TransferEncoding::EightBit),
            "binary" => Some(TransferEncoding::Binary),
            "base64" => Some(TransferEncoding::Base64),
            "quoted-printable" => Some(TransferEncoding::QuotedPrintable),
            _ => None,
        }
    }

    /// Like `from_label()`, but falls back to the identity encoding (with a
    /// warning) for unknown values. An absent field is `None`.
    pub(crate) fn for_codec(label: Option<&str>) -> Self {
        match label {
            None => TransferEncoding::default(),
            Some(label) => Self::from_label(label).unwrap_or_else(|| {
                warn!(
                    "Unknown Content-Transfer-Encoding {:?}, \
                     treating as identity",
                    label
                );
                TransferEncoding::default()
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransferEncoding::SevenBit => "7bit",
            TransferEncoding::EightBit => "8bit",
            TransferEncoding::Binary => "binary",
            TransferEncoding::Base64 => "base64",
            TransferEncoding::QuotedPrintable => "quoted-printable",
        }
    }

    /// Wraps `body` in a reader that yields the decoded content.
    pub fn decoder(self, body: Body) -> Body {
        match self {
            TransferEncoding::Base64 => Body::new(Base64Decoder::new(body)),
            TransferEncoding::QuotedPrintable => {
                Body::new(QpDecoder::new(body))
            },
            _ => body,
        }
    }

    /// Wraps `inner` in a writer which applies this encoding.
    pub fn encoder<W: Write>(self, inner: W) -> TransferEncoder<W> {
        match self {
            TransferEncoding::Base64 => {
                TransferEncoder::Base64(Base64Encoder::new(inner))
            },
            TransferEncoding::QuotedPrintable => {
                TransferEncoder::QuotedPrintable(QpEncoder::new(inner))
            },
            _ => TransferEncoder::Identity(inner),
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Streaming base64 decoder.
///
/// Bytes outside the base64 alphabet (line breaks in particular) are
/// ignored. Content is decoded in groups of four characters; a trailing
/// partial group is dropped.
#[derive(Debug)]
pub struct Base64Decoder<R> {
    inner: R,
    input: Vec<u8>,
    output: Vec<u8>,
    output_pos: usize,
    eof: bool,
}

impl<R: Read> Base64Decoder<R> {
    pub fn new(inner: R) -> Self {
        Base64Decoder {
            inner,
            input: Vec::new(),
            output: Vec::new(),
            output_pos: 0,
            eof: false,
        }
    }

    fn decode_base64(&mut self, data: &[u8]) {
        let mut pushed_any = false;
        for &byte in data {
            match byte {
                b'0'..=b'9'
                | b'a'..=b'z'
                | b'A'..=b'Z'
                | b'+'
                | b'/'
                | b'=' => {
                    self.input.push(byte);
                    pushed_any = true;
                },
                _ => (),
            }
        }

        if pushed_any {
            let usable_length = self.input.len() / 4 * 4;
            let _ = base64::decode_config_buf(
                &self.input[..usable_length],
                base64::STANDARD,
                &mut self.output,
            );

            self.input.copy_within(usable_length.., 0);
            self.input.truncate(self.input.len() - usable_length);
        }
    }
}

impl<R: Read> Read for Base64Decoder<R> {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        let mut chunk = [0u8; 4096];
        while self.output_pos >= self.output.len() && !self.eof {
            self.output.clear();
            self.output_pos = 0;

            let nread = self.inner.read(&mut chunk)?;
            if 0 == nread {
                self.eof = true;
            } else {
                self.decode_base64(&chunk[..nread]);
            }
        }

        let avail = &self.output[self.output_pos..];
        let n = avail.len().min(dst.len());
        dst[..n].copy_from_slice(&avail[..n]);
        self.output_pos += n;
        Ok(n)
    }
}

// 57 input bytes make one 76-character line
const BASE64_LINE_INPUT: usize = 57;

/// Streaming base64 encoder producing 76-column lines with CRLF endings.
///
/// `finish()` must be called to write the final (possibly padded) line.
#[derive(Debug)]
pub struct Base64Encoder<W: Write> {
    inner: W,
    pending: Vec<u8>,
}

impl<W: Write> Base64Encoder<W> {
    pub fn new(inner: W) -> Self {
        Base64Encoder {
            inner,
            pending: Vec::with_capacity(BASE64_LINE_INPUT),
        }
    }

    fn write_line(&mut self) -> io::Result<()> {
        let mut line = base64::encode(&self.pending);
        line.push_str("\r\n");
        self.pending.clear();
        self.inner.write_all(line.as_bytes())
    }

    pub fn finish(mut self) -> io::Result<W> {
        if !self.pending.is_empty() {
            self.write_line()?;
        }
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for Base64Encoder<W> {
    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        let mut rest = src;
        while !rest.is_empty() {
            let take = (BASE64_LINE_INPUT - self.pending.len()).min(rest.len());
            self.pending.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if BASE64_LINE_INPUT == self.pending.len() {
                self.write_line()?;
            }
        }
        Ok(src.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A writer applying one of the transfer encodings.
#[derive(Debug)]
pub enum TransferEncoder<W: Write> {
    Identity(W),
    Base64(Base64Encoder<W>),
    QuotedPrintable(QpEncoder<W>),
}

impl<W: Write> TransferEncoder<W> {
    /// Flushes any partial line and returns the inner writer.
    pub fn finish(self) -> io::Result<W> {
        match self {
            TransferEncoder::Identity(mut w) => {
                w.flush()?;
                Ok(w)
            },
            TransferEncoder::Base64(e) => e.finish(),
            TransferEncoder::QuotedPrintable(e) => e.finish(),
        }
    }
}

impl<W: Write> Write for TransferEncoder<W> {
    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        match *self {
            TransferEncoder::Identity(ref mut w) => w.write(src),
            TransferEncoder::Base64(ref mut e) => e.write(src),
            TransferEncoder::QuotedPrintable(ref mut e) => e.write(src),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match *self {
            TransferEncoder::Identity(ref mut w) => w.flush(),
            TransferEncoder::Base64(ref mut e) => e.flush(),
            TransferEncoder::QuotedPrintable(ref mut e) => e.flush(),
        }
    }
}

/// Copies `src` into `dst` through the encoder for `encoding`.
pub(crate) fn copy_encoded<R: Read + ?Sized, W: Write>(
    encoding: TransferEncoding,
    src: &mut R,
    dst: W,
) -> io::Result<u64> {
    let mut encoder = encoding.encoder(dst);
    let n = io::copy(src, &mut encoder)?;
    mem::drop(encoder.finish()?);
    Ok(n)
}
