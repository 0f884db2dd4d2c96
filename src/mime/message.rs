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

//! The message tree: opaque leaves and decomposed multiparts.

use std::io::{self, Read, Write};
use std::mem;

use super::body::Body;
use super::content_encoding::{copy_encoded, TransferEncoding};
use super::header::Header;
use super::line_break::LineBreak;
use super::multipart::Tokens;
use super::params::ParameterizedValue;
use crate::support::error::Error;

/// The operations shared by every node of a message tree.
pub trait Part {
    fn is_multipart(&self) -> bool;
    /// Whether the body still carries the transfer encoding declared in the
    /// header. Always true for multiparts.
    fn is_encoded(&self) -> bool;
    fn header(&self) -> &Header;
    fn header_mut(&mut self) -> &mut Header;
    /// The body of a leaf. `None` for multiparts.
    fn reader(&mut self) -> Option<&mut Body>;
    /// The children of a multipart. `None` for leaves.
    fn parts(&self) -> Option<&[Message]>;
    fn parts_mut(&mut self) -> Option<&mut Vec<Message>>;
    /// Writes the part out in full, returning the number of bytes written.
    ///
    /// Bodies are consumed by this call; writing the same part a second time
    /// produces the header only.
    fn write_to(&mut self, w: &mut dyn Write) -> io::Result<u64>;

    fn to_bytes(&mut self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }
}

/// Tracks how many bytes pass through to the inner writer.
struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        CountingWriter { inner, count: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(data)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A part whose body is kept as an undivided byte stream.
#[derive(Debug)]
pub struct Opaque {
    pub header: Header,
    pub body: Body,
    /// If false, `body` yields decoded content and the encoding named by
    /// `Content-Transfer-Encoding` is applied when the part is written.
    pub encoded: bool,
}

impl Opaque {
    pub fn new(header: Header, body: impl Into<Body>) -> Self {
        Opaque {
            header,
            body: body.into(),
            encoded: true,
        }
    }

    /// Like `new()`, but `body` holds decoded content.
    pub fn decoded(header: Header, body: impl Into<Body>) -> Self {
        Opaque {
            header,
            body: body.into(),
            encoded: false,
        }
    }

    /// The encoding to apply to the body on output.
    fn output_encoding(&self) -> TransferEncoding {
        if self.encoded {
            TransferEncoding::Binary
        } else {
            self.header.transfer_encoding()
        }
    }
}

impl Part for Opaque {
    fn is_multipart(&self) -> bool {
        false
    }

    fn is_encoded(&self) -> bool {
        self.encoded
    }

    fn header(&self) -> &Header {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    fn reader(&mut self) -> Option<&mut Body> {
        Some(&mut self.body)
    }

    fn parts(&self) -> Option<&[Message]> {
        None
    }

    fn parts_mut(&mut self) -> Option<&mut Vec<Message>> {
        None
    }

    fn write_to(&mut self, w: &mut dyn Write) -> io::Result<u64> {
        let mut w = CountingWriter::new(w);
        self.header.write_to(&mut w)?;

        // Taking the body out drops the source once it is exhausted
        let mut body = mem::take(&mut self.body);
        copy_encoded(self.output_encoding(), &mut body, &mut w)?;
        Ok(w.count)
    }
}

/// A part whose body has been split into children.
#[derive(Debug)]
pub struct Multipart {
    pub header: Header,
    pub line_break: LineBreak,
    /// The preamble, including the line break that starts the first
    /// boundary. If `None`, no opening boundary is written.
    pub prefix: Option<Vec<u8>>,
    pub parts: Vec<Message>,
    /// The epilogue, starting right after the closing boundary. If `None`,
    /// no closing boundary is written.
    pub suffix: Option<Vec<u8>>,
}

impl Multipart {
    /// Creates an empty multipart with no preamble or epilogue.
    ///
    /// Without either, no opening or closing boundary is written, so an
    /// empty multipart writes nothing after its header. Use
    /// `with_empty_markers()` to get both boundaries.
    ///
    /// The header must have, or be given before writing, a `Content-Type`
    /// with a `boundary` parameter.
    pub fn new(header: Header) -> Self {
        Multipart {
            line_break: header.line_break(),
            header,
            prefix: None,
            parts: Vec::new(),
            suffix: None,
        }
    }

    /// Sets an empty preamble and epilogue, so that the opening and closing
    /// boundaries are written with nothing around them.
    pub fn with_empty_markers(mut self) -> Self {
        self.prefix = Some(Vec::new());
        self.suffix = Some(Vec::new());
        self
    }

    /// The boundary tokens for this multipart.
    pub fn tokens(&mut self) -> Result<Tokens, Error> {
        let boundary = self.header.boundary().map_err(|e| match e {
            Error::NoSuchField(_) | Error::NoSuchFieldParameter(..) => {
                Error::NoBoundary
            },
            e => e,
        })?;
        if boundary.is_empty() {
            return Err(Error::NoBoundary);
        }

        Ok(Tokens::new(&boundary, self.line_break))
    }
}

impl Part for Multipart {
    fn is_multipart(&self) -> bool {
        true
    }

    fn is_encoded(&self) -> bool {
        true
    }

    fn header(&self) -> &Header {
        &self.header
    }

    fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    fn reader(&mut self) -> Option<&mut Body> {
        None
    }

    fn parts(&self) -> Option<&[Message]> {
        Some(&self.parts)
    }

    fn parts_mut(&mut self) -> Option<&mut Vec<Message>> {
        Some(&mut self.parts)
    }

    fn write_to(&mut self, w: &mut dyn Write) -> io::Result<u64> {
        let tokens = self.tokens().map_err(Error::into_io)?;
        let mut w = CountingWriter::new(w);
        self.header.write_to(&mut w)?;

        if let Some(ref prefix) = self.prefix {
            w.write_all(prefix)?;
            w.write_all(&tokens.start)?;
        }

        for (ix, part) in self.parts.iter_mut().enumerate() {
            if ix > 0 {
                w.write_all(&tokens.middle)?;
            }
            part.write_to(&mut w)?;
        }

        if let Some(ref suffix) = self.suffix {
            w.write_all(&tokens.end)?;
            w.write_all(suffix)?;
        }

        Ok(w.count)
    }
}

/// A node in a message tree.
#[derive(Debug)]
pub enum Message {
    Opaque(Opaque),
    Multipart(Multipart),
}

impl From<Opaque> for Message {
    fn from(o: Opaque) -> Self {
        Message::Opaque(o)
    }
}

impl From<Multipart> for Message {
    fn from(m: Multipart) -> Self {
        Message::Multipart(m)
    }
}

impl Message {
    fn part(&self) -> &dyn Part {
        match *self {
            Message::Opaque(ref o) => o,
            Message::Multipart(ref m) => m,
        }
    }

    fn part_mut(&mut self) -> &mut dyn Part {
        match *self {
            Message::Opaque(ref mut o) => o,
            Message::Multipart(ref mut m) => m,
        }
    }

    pub fn as_opaque(&mut self) -> Option<&mut Opaque> {
        match *self {
            Message::Opaque(ref mut o) => Some(o),
            Message::Multipart(_) => None,
        }
    }

    pub fn as_multipart(&mut self) -> Option<&mut Multipart> {
        match *self {
            Message::Multipart(ref mut m) => Some(m),
            Message::Opaque(_) => None,
        }
    }

    /// Reads the whole body of a leaf. Returns an empty vector for
    /// multiparts, and for leaves that were already consumed.
    pub fn read_body(&mut self) -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        if let Some(body) = self.reader() {
            body.read_to_end(&mut data)?;
        }
        Ok(data)
    }

    pub fn content_type(&mut self) -> Result<ParameterizedValue, Error> {
        self.header_mut().content_type()
    }

    pub fn media_type(&mut self) -> Result<String, Error> {
        self.header_mut().media_type()
    }

    pub fn charset(&mut self) -> Result<String, Error> {
        self.header_mut().charset()
    }

    pub fn content_disposition(
        &mut self,
    ) -> Result<ParameterizedValue, Error> {
        self.header_mut().content_disposition()
    }

    pub fn filename(&mut self) -> Result<String, Error> {
        self.header_mut().filename()
    }

    pub fn subject(&self) -> Result<String, Error> {
        self.header().subject()
    }
}

impl Part for Message {
    fn is_multipart(&self) -> bool {
        self.part().is_multipart()
    }

    fn is_encoded(&self) -> bool {
        self.part().is_encoded()
    }

    fn header(&self) -> &Header {
        self.part().header()
    }

    fn header_mut(&mut self) -> &mut Header {
        self.part_mut().header_mut()
    }

    fn reader(&mut self) -> Option<&mut Body> {
        self.part_mut().reader()
    }

    fn parts(&self) -> Option<&[Message]> {
        self.part().parts()
    }

    fn parts_mut(&mut self) -> Option<&mut Vec<Message>> {
        self.part_mut().parts_mut()
    }

    fn write_to(&mut self, w: &mut dyn Write) -> io::Result<u64> {
        self.part_mut().write_to(w)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn leaf(field: &str, body: &'static str) -> Message {
        let mut header = Header::new(LineBreak::Lf);
        let (name, value) = field.split_at(field.find(':').unwrap());
        header.append(name, value[1..].trim()).unwrap();
        Opaque::new(header, body).into()
    }

    fn text(part: &mut dyn Part) -> String {
        String::from_utf8(part.to_bytes().unwrap()).unwrap()
    }

    #[test]
    fn write_opaque() {
        let mut m = leaf("Subject: hi", "Body\n");
        assert_eq!("Subject: hi\n\nBody\n", text(&mut m));
        // The body is single-shot
        assert_eq!("Subject: hi\n\n", text(&mut m));
    }

    #[test]
    fn write_opaque_reencodes() {
        let mut header = Header::new(LineBreak::Crlf);
        header
            .set_transfer_encoding(TransferEncoding::Base64)
            .unwrap();
        let mut o = Opaque::decoded(header, "hello");
        assert!(!o.is_encoded());
        let mut out = Vec::new();
        let n = o.write_to(&mut out).unwrap();
        assert_eq!(
            &b"Content-Transfer-Encoding: base64\r\n\r\naGVsbG8=\r\n"[..],
            &out[..]
        );
        assert_eq!(out.len() as u64, n);
    }

    #[test]
    fn write_multipart() {
        let mut header = Header::new(LineBreak::Lf);
        header.set_media_type("multipart/mixed").unwrap();
        header.set_boundary("b").unwrap();
        let mut m = Multipart::new(header).with_empty_markers();
        m.parts.push(leaf("X: 1", "one"));
        m.parts.push(leaf("X: 2", "two"));

        assert_eq!(
            "Content-Type: multipart/mixed; boundary=b\n\n\
             --b\nX: 1\n\none\n--b\nX: 2\n\ntwo\n--b--",
            text(&mut m)
        );
    }

    #[test]
    fn write_multipart_without_markers() {
        let mut header = Header::new(LineBreak::Lf);
        header.set_media_type("multipart/mixed").unwrap();
        header.set_boundary("b").unwrap();
        let mut m = Multipart::new(header);
        assert_eq!(None, m.prefix);
        assert_eq!(None, m.suffix);
        assert_eq!(
            "Content-Type: multipart/mixed; boundary=b\n\n",
            text(&mut m)
        );

        m.prefix = Some(b"preamble\n".to_vec());
        m.suffix = Some(b"\nepilogue".to_vec());
        m.parts.push(leaf("X: 1", "one"));
        assert_eq!(
            "Content-Type: multipart/mixed; boundary=b\n\n\
             preamble\n--b\nX: 1\n\none\n--b--\nepilogue",
            text(&mut m)
        );
    }

    #[test]
    fn write_multipart_requires_boundary() {
        let mut header = Header::new(LineBreak::Lf);
        header.set_media_type("multipart/mixed").unwrap();
        let mut m: Message = Multipart::new(header).into();
        let e = m.to_bytes().unwrap_err();
        assert_matches!(Error::NoBoundary, Error::from_io(e));
    }

    #[test]
    fn message_forwards() {
        let mut m = leaf(
            "Content-Disposition: attachment; filename=\"a b.txt\"",
            "",
        );
        assert_eq!("a b.txt", m.filename().unwrap());
        assert!(!m.is_multipart());
        assert!(m.parts().is_none());
        assert!(m.reader().is_some());
    }
}
