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

//! Construction of new messages.

use std::io::{self, Write};
use std::mem;

use log::debug;
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};

use super::header::Header;
use super::line_break;
use super::message::{Message, Multipart, Opaque, Part};
use super::multipart::Tokens;
use super::parse;
use crate::support::error::Error;
use crate::support::parse_options::ParseOptions;

const BOUNDARY_LENGTH: usize = 30;
const DEFAULT_MULTIPART_TYPE: &str = "multipart/mixed";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Unset,
    Opaque,
    Multipart,
}

/// Builds a message either from raw body bytes or from a list of parts.
///
/// Writing bytes (through `std::io::Write`) puts the buffer into opaque mode;
/// adding a part puts it into multipart mode. Once chosen, the mode is fixed,
/// and attempts to use the buffer the other way fail with `PartsBuffer` or
/// `OpaqueBuffer`.
///
/// The buffer is finished with `opaque()` or `multipart()`, after which it is
/// empty again, with a fresh header.
#[derive(Debug)]
pub struct Buffer {
    header: Header,
    mode: Mode,
    bytes: Vec<u8>,
    parts: Vec<Message>,
    encoded: bool,
}

impl Default for Buffer {
    fn default() -> Self {
        Buffer::new(Header::default())
    }
}

impl Buffer {
    pub fn new(header: Header) -> Self {
        Buffer {
            header,
            mode: Mode::Unset,
            bytes: Vec::new(),
            parts: Vec::new(),
            encoded: false,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    pub fn is_opaque(&self) -> bool {
        Mode::Opaque == self.mode
    }

    pub fn is_multipart(&self) -> bool {
        Mode::Multipart == self.mode
    }

    /// Whether the bytes written already carry the transfer encoding named
    /// by the header. Defaults to false, so that the encoding is applied when
    /// the result is written.
    pub fn is_encoded(&self) -> bool {
        self.encoded
    }

    pub fn set_encoded(&mut self, encoded: bool) {
        self.encoded = encoded;
    }

    /// Puts the buffer into opaque mode without writing anything.
    pub fn set_opaque(&mut self) -> Result<(), Error> {
        match self.mode {
            Mode::Multipart => Err(Error::PartsBuffer),
            _ => {
                self.mode = Mode::Opaque;
                Ok(())
            },
        }
    }

    /// Puts the buffer into multipart mode without adding anything,
    /// reserving space for `capacity` parts.
    pub fn set_multipart(&mut self, capacity: usize) -> Result<(), Error> {
        match self.mode {
            Mode::Opaque => Err(Error::OpaqueBuffer),
            _ => {
                self.mode = Mode::Multipart;
                self.parts.reserve(capacity);
                Ok(())
            },
        }
    }

    /// Appends a part, putting the buffer into multipart mode.
    pub fn add(&mut self, part: impl Into<Message>) -> Result<(), Error> {
        self.set_multipart(0)?;
        self.parts.push(part.into());
        Ok(())
    }

    /// Finishes the buffer as an opaque part.
    ///
    /// In multipart mode, the parts are written out between boundaries. The
    /// `Content-Type` defaults to `multipart/mixed`, and if it has no
    /// boundary, one is generated which does not occur in any part.
    pub fn opaque(&mut self) -> Result<Opaque, Error> {
        match self.mode {
            Mode::Unset => Err(Error::ModeUnset),

            Mode::Opaque => {
                let (header, bytes) = self.take();
                Ok(Opaque {
                    header,
                    body: bytes.into(),
                    encoded: mem::replace(&mut self.encoded, false),
                })
            },

            Mode::Multipart => {
                // Rendering drains the part bodies, so anything that could
                // make it fail is ruled out first
                for part in &mut self.parts {
                    check_writable(part)?;
                }
                self.ensure_multipart_type()?;

                let mut rendered = Vec::with_capacity(self.parts.len());
                for part in &mut self.parts {
                    rendered.push(part.to_bytes().map_err(Error::from_io)?);
                }

                if self.header.boundary().is_err() {
                    let boundary = loop {
                        let candidate = random_boundary();
                        if !rendered
                            .iter()
                            .any(|r| {
                                line_break::find(r, candidate.as_bytes())
                                    .is_some()
                            })
                        {
                            break candidate;
                        }
                        debug!("Boundary {} collides, trying again", candidate);
                    };
                    self.header.set_boundary(&boundary)?;
                }

                let boundary = self.header.boundary()?;
                let tokens = Tokens::new(&boundary, self.header.line_break());
                let mut body = tokens.start.clone();
                for (ix, part) in rendered.iter().enumerate() {
                    if ix > 0 {
                        body.extend_from_slice(&tokens.middle);
                    }
                    body.extend_from_slice(part);
                }
                body.extend_from_slice(&tokens.end);

                let (header, _) = self.take();
                Ok(Opaque::new(header, body))
            },
        }
    }

    /// Finishes the buffer as a multipart.
    ///
    /// In opaque mode, the header and bytes are parsed one level deep; this
    /// fails with `ParsesAsNotMultipart` if that does not yield a multipart.
    pub fn multipart(&mut self) -> Result<Multipart, Error> {
        match self.mode {
            Mode::Unset => Err(Error::ModeUnset),

            Mode::Opaque => {
                let mut data = self.header.to_bytes();
                data.extend_from_slice(&self.bytes);

                let options = ParseOptions::default().with_max_depth(1);
                match parse::parse_bytes(data, &options) {
                    Ok(Message::Multipart(multipart)) => {
                        self.take();
                        Ok(multipart)
                    },
                    _ => Err(Error::ParsesAsNotMultipart),
                }
            },

            Mode::Multipart => {
                self.ensure_multipart_type()?;
                if self.header.boundary().is_err() {
                    self.header.set_boundary(&random_boundary())?;
                }

                let parts = mem::replace(&mut self.parts, Vec::new());
                let (header, _) = self.take();
                let mut multipart = Multipart::new(header).with_empty_markers();
                multipart.parts = parts;
                Ok(multipart)
            },
        }
    }

    fn ensure_multipart_type(&mut self) -> Result<(), Error> {
        match self.header.media_type() {
            Ok(ref media_type) if media_type.starts_with("multipart/") => {
                Ok(())
            },
            _ => self.header.set_media_type(DEFAULT_MULTIPART_TYPE),
        }
    }

    /// Empties the buffer, returning its header and bytes.
    fn take(&mut self) -> (Header, Vec<u8>) {
        let fresh = Header::new(self.header.line_break());
        self.mode = Mode::Unset;
        self.parts.clear();
        (
            mem::replace(&mut self.header, fresh),
            mem::replace(&mut self.bytes, Vec::new()),
        )
    }
}

impl Write for Buffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.set_opaque().map_err(Error::into_io)?;
        self.bytes.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn random_boundary() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(BOUNDARY_LENGTH)
        .collect()
}

/// Fails if `message` or anything below it could not be written.
fn check_writable(message: &mut Message) -> Result<(), Error> {
    if let Message::Multipart(ref mut multipart) = *message {
        multipart.tokens()?;
        for part in &mut multipart.parts {
            check_writable(part)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mime::content_encoding::TransferEncoding;
    use crate::mime::line_break::LineBreak;
    use crate::test_data::*;

    fn html_part() -> Opaque {
        let mut child = Buffer::default();
        child
            .header_mut()
            .append("Content-type", "text/html")
            .unwrap();
        child.write_all(b"Test message.").unwrap();
        child.opaque().unwrap()
    }

    #[test]
    fn build_multipart_message() {
        let mut buffer = Buffer::default();
        buffer.header_mut().set_subject("test multipart").unwrap();
        buffer
            .header_mut()
            .set_media_type("multipart/alternative")
            .unwrap();
        buffer.header_mut().set_boundary("testing").unwrap();
        buffer.add(html_part()).unwrap();

        let mut opaque = buffer.opaque().unwrap();
        assert_eq!(SIMPLE_MULTIPART, &opaque.to_bytes().unwrap()[..]);
        assert!(!buffer.is_multipart());
    }

    #[test]
    fn build_as_multipart() {
        let mut buffer = Buffer::default();
        buffer.header_mut().set_subject("test multipart").unwrap();
        buffer
            .header_mut()
            .set_media_type("multipart/alternative")
            .unwrap();
        buffer.header_mut().set_boundary("testing").unwrap();
        buffer.add(html_part()).unwrap();

        let mut multipart = buffer.multipart().unwrap();
        assert_eq!(1, multipart.parts.len());
        assert_eq!(SIMPLE_MULTIPART, &multipart.to_bytes().unwrap()[..]);
    }

    #[test]
    fn generated_boundary() {
        let mut buffer = Buffer::default();
        buffer.add(html_part()).unwrap();
        buffer.add(html_part()).unwrap();

        let mut opaque = buffer.opaque().unwrap();
        assert_eq!("multipart/mixed", opaque.header.media_type().unwrap());
        let boundary = opaque.header.boundary().unwrap();
        assert_eq!(BOUNDARY_LENGTH, boundary.len());
        assert!(boundary.chars().all(|c| c.is_ascii_alphanumeric()));

        let bytes = opaque.to_bytes().unwrap();
        let mut parsed = parse::parse_bytes(bytes, &ParseOptions::default())
            .unwrap();
        assert_eq!(2, parsed.parts().unwrap().len());
        assert_eq!(
            "text/html",
            parsed.parts_mut().unwrap()[1].media_type().unwrap()
        );
    }

    #[test]
    fn mode_lock() {
        let mut buffer = Buffer::default();
        buffer.write_all(b"hello").unwrap();
        assert_matches!(Err(Error::OpaqueBuffer), buffer.add(html_part()));
        assert_matches!(Err(Error::OpaqueBuffer), buffer.set_multipart(1));

        let mut buffer = Buffer::default();
        buffer.add(html_part()).unwrap();
        let e = buffer.write_all(b"hello").unwrap_err();
        assert_matches!(Error::PartsBuffer, Error::from_io(e));
        assert_matches!(Err(Error::PartsBuffer), buffer.set_opaque());
        // The failed write left the parts alone
        assert_eq!(1, buffer.multipart().unwrap().parts.len());
    }

    #[test]
    fn failed_finalization_keeps_parts() {
        let mut first = Buffer::new(Header::new(LineBreak::Lf));
        first.header_mut().append("X", "1").unwrap();
        first.write_all(b"first body").unwrap();

        let mut nested_header = Header::new(LineBreak::Lf);
        nested_header.set_media_type("multipart/mixed").unwrap();

        let mut buffer = Buffer::default();
        buffer.add(first.opaque().unwrap()).unwrap();
        buffer.add(Multipart::new(nested_header)).unwrap();

        assert_matches!(Err(Error::NoBoundary), buffer.opaque());
        assert!(buffer.is_multipart());
        assert!(!buffer.header().contains("Content-Type"));

        let mut multipart = buffer.multipart().unwrap();
        assert_eq!(2, multipart.parts.len());
        assert_eq!(
            b"first body",
            &multipart.parts[0].read_body().unwrap()[..]
        );
    }

    #[test]
    fn mode_unset() {
        let mut buffer = Buffer::default();
        assert_matches!(Err(Error::ModeUnset), buffer.opaque());
        assert_matches!(Err(Error::ModeUnset), buffer.multipart());

        buffer.set_opaque().unwrap();
        let mut opaque = buffer.opaque().unwrap();
        assert_eq!(b"\r\n", &opaque.to_bytes().unwrap()[..]);
    }

    #[test]
    fn opaque_to_multipart() {
        let mut buffer = Buffer::default();
        buffer
            .header_mut()
            .set_media_type("multipart/mixed")
            .unwrap();
        buffer.header_mut().set_boundary("b").unwrap();
        buffer
            .write_all(b"--b\r\n\r\none\r\n--b\r\n\r\ntwo\r\n--b--\r\n")
            .unwrap();
        let multipart = buffer.multipart().unwrap();
        assert_eq!(2, multipart.parts.len());

        let mut buffer = Buffer::default();
        buffer.write_all(b"not multipart").unwrap();
        assert_matches!(
            Err(Error::ParsesAsNotMultipart),
            buffer.multipart()
        );
        // Still usable as opaque
        let mut opaque = buffer.opaque().unwrap();
        assert_eq!(b"\r\nnot multipart", &opaque.to_bytes().unwrap()[..]);
    }

    #[test]
    fn opaque_encodes_on_output() {
        let mut buffer = Buffer::new(Header::new(LineBreak::Lf));
        buffer
            .header_mut()
            .set_transfer_encoding(TransferEncoding::Base64)
            .unwrap();
        buffer.write_all(b"hello").unwrap();
        let mut opaque = buffer.opaque().unwrap();
        assert!(!opaque.is_encoded());
        assert_eq!(
            &b"Content-Transfer-Encoding: base64\n\naGVsbG8=\r\n"[..],
            &opaque.to_bytes().unwrap()[..]
        );

        let mut buffer = Buffer::new(Header::new(LineBreak::Lf));
        buffer
            .header_mut()
            .set_transfer_encoding(TransferEncoding::Base64)
            .unwrap();
        buffer.set_encoded(true);
        buffer.write_all(b"aGVsbG8=").unwrap();
        let mut opaque = buffer.opaque().unwrap();
        assert!(opaque.is_encoded());
        assert_eq!(
            &b"Content-Transfer-Encoding: base64\n\naGVsbG8="[..],
            &opaque.to_bytes().unwrap()[..]
        );
    }
}
