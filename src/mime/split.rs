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

//! Separation of the header block from the body.

use std::io::{self, Cursor, Read};

use log::warn;

use super::body::Body;
use super::line_break::LineBreak;
use crate::support::shared_bytes::SharedBytes;

/// A header block separated from its body.
#[derive(Debug)]
pub struct Split {
    /// The header block, up to and including the line break that ends the
    /// last field, but not the blank line after it.
    pub header: Vec<u8>,
    pub line_break: LineBreak,
    /// Whether a blank line separated the header from the body. When false,
    /// the input ended inside the header and the body is empty.
    pub separated: bool,
    pub body: Body,
}

#[derive(Debug)]
pub enum SplitOutcome {
    Split(Split),
    /// The header is longer than the limit. The body carries every byte of
    /// the input, unparsed.
    TooLarge(Body),
}

/// Splits a streamed message into header and body.
///
/// The stream is read `chunk_size` bytes at a time until the first double
/// line break is found. Bytes read past it are replayed at the start of the
/// body, which then continues with the rest of the stream.
pub fn split_stream<R: Read + Send + 'static>(
    mut reader: R,
    chunk_size: usize,
    max_header_length: usize,
) -> io::Result<SplitOutcome> {
    let mut buf = Vec::with_capacity(chunk_size.min(max_header_length));

    loop {
        // The double break may straddle the previous chunk boundary
        let search_from = buf.len().saturating_sub(3);
        let nread = (&mut reader)
            .take(chunk_size.max(1) as u64)
            .read_to_end(&mut buf)?;

        if let Some((lb, pos)) = LineBreak::find_double(&buf, search_from) {
            let header_end = pos + lb.len();
            if header_end > max_header_length {
                warn!(
                    "Header of {} bytes exceeds limit of {}",
                    header_end, max_header_length
                );
                return Ok(SplitOutcome::TooLarge(Body::new(
                    Cursor::new(buf).chain(reader),
                )));
            }

            let rest = buf.split_off(pos + lb.doubled().len());
            buf.truncate(header_end);
            return Ok(SplitOutcome::Split(Split {
                header: buf,
                line_break: lb,
                separated: true,
                body: Body::new(Cursor::new(rest).chain(reader)),
            }));
        }

        if buf.len() > max_header_length {
            warn!(
                "Header exceeds limit of {} bytes without ending",
                max_header_length
            );
            return Ok(SplitOutcome::TooLarge(Body::new(
                Cursor::new(buf).chain(reader),
            )));
        }

        if 0 == nread {
            // EOF with no blank line; it's all header
            let line_break = LineBreak::detect_single(&buf);
            return Ok(SplitOutcome::Split(Split {
                header: buf,
                line_break,
                separated: false,
                body: Body::empty(),
            }));
        }
    }
}

/// Splits an in-memory message into header and body.
///
/// The body is a window into `data` rather than a copy.
///
/// If `sub_part` is true, a line break at the very start of the data is
/// taken to mean there is no header at all, which is how multipart parts
/// without headers look.
pub fn split_shared(
    data: SharedBytes,
    max_header_length: usize,
    sub_part: bool,
) -> SplitOutcome {
    if sub_part {
        if let Some(lb) = LineBreak::leading(data.as_slice()) {
            let body = data.slice(lb.len()..data.len());
            return SplitOutcome::Split(Split {
                header: Vec::new(),
                line_break: lb,
                separated: true,
                body: Body::from_shared(body),
            });
        }
    }

    match LineBreak::find_double(data.as_slice(), 0) {
        Some((lb, pos)) if pos + lb.len() <= max_header_length => {
            let header = data.as_slice()[..pos + lb.len()].to_vec();
            let body = data.slice(pos + lb.doubled().len()..data.len());
            SplitOutcome::Split(Split {
                header,
                line_break: lb,
                separated: true,
                body: Body::from_shared(body),
            })
        },

        None if data.len() <= max_header_length => {
            let line_break = LineBreak::detect_single(data.as_slice());
            SplitOutcome::Split(Split {
                header: data.as_slice().to_vec(),
                line_break,
                separated: false,
                body: Body::empty(),
            })
        },

        _ => {
            warn!(
                "Part header exceeds limit of {} bytes",
                max_header_length
            );
            SplitOutcome::TooLarge(Body::from_shared(data))
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn stream(
        data: &'static [u8],
        chunk_size: usize,
        max: usize,
    ) -> (Vec<u8>, LineBreak, bool, Vec<u8>) {
        match split_stream(data, chunk_size, max).unwrap() {
            SplitOutcome::Split(mut s) => {
                let body = s.body.read_all().unwrap();
                (s.header, s.line_break, s.separated, body)
            },
            SplitOutcome::TooLarge(_) => panic!("unexpected TooLarge"),
        }
    }

    #[test]
    fn split_simple() {
        let (h, lb, sep, body) =
            stream(b"Subject: test\n\nBody\n", 16384, 65536);
        assert_eq!(b"Subject: test\n", &h[..]);
        assert_eq!(LineBreak::Lf, lb);
        assert!(sep);
        assert_eq!(b"Body\n", &body[..]);
    }

    #[test]
    fn split_across_chunks() {
        let data: &[u8] = b"A: 1\r\nB: 2\r\n\r\nthe body\r\nmore\r\n";
        for chunk in 1..data.len() + 2 {
            let (h, lb, sep, body) = stream(data, chunk, 65536);
            assert_eq!(b"A: 1\r\nB: 2\r\n", &h[..], "chunk size {}", chunk);
            assert_eq!(LineBreak::Crlf, lb);
            assert!(sep);
            assert_eq!(b"the body\r\nmore\r\n", &body[..]);
        }
    }

    #[test]
    fn split_without_blank_line() {
        let (h, lb, sep, body) = stream(b"A: 1\nB: 2", 4, 65536);
        assert_eq!(b"A: 1\nB: 2", &h[..]);
        assert_eq!(LineBreak::Lf, lb);
        assert!(!sep);
        assert!(body.is_empty());

        let (_, lb, _, _) = stream(b"A: 1", 4, 65536);
        assert_eq!(LineBreak::Cr, lb);
    }

    #[test]
    fn split_too_large_keeps_everything() {
        let data: &[u8] = b"A: 0123456789\nB: 0123456789\n\nbody";
        match split_stream(data, 4, 10).unwrap() {
            SplitOutcome::TooLarge(mut body) => {
                assert_eq!(data, &body.read_all().unwrap()[..]);
            },
            SplitOutcome::Split(_) => panic!("unexpected Split"),
        }

        match split_shared(SharedBytes::new(data.to_vec()), 10, false) {
            SplitOutcome::TooLarge(mut body) => {
                assert_eq!(data, &body.read_all().unwrap()[..]);
            },
            SplitOutcome::Split(_) => panic!("unexpected Split"),
        }
    }

    #[test]
    fn split_shared_sub_part() {
        let data = SharedBytes::new(b"\nbody\n\nmore".to_vec());
        match split_shared(data.clone(), 65536, true) {
            SplitOutcome::Split(mut s) => {
                assert!(s.header.is_empty());
                assert!(s.separated);
                assert_eq!(LineBreak::Lf, s.line_break);
                assert_eq!(b"body\n\nmore", &s.body.read_all().unwrap()[..]);
            },
            SplitOutcome::TooLarge(_) => panic!("unexpected TooLarge"),
        }

        // Outside of sub-part mode, the leading break is just a bad header
        // line.
        match split_shared(data, 65536, false) {
            SplitOutcome::Split(mut s) => {
                assert_eq!(b"\nbody\n", &s.header[..]);
                assert_eq!(b"more", &s.body.read_all().unwrap()[..]);
            },
            SplitOutcome::TooLarge(_) => panic!("unexpected TooLarge"),
        }
    }
}
