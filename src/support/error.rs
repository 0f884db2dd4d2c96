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
use std::io;

use thiserror::Error;

use crate::mime::message::Message;

#[derive(Error, Debug)]
pub enum Error {
    /// The header block started with lines that do not belong to any field.
    ///
    /// The skipped bytes (including their line breaks) are attached. Parsing
    /// carries on with the fields after them.
    #[error("header starts with {} bytes of non-header data", .0.len())]
    BadStart(Vec<u8>),
    /// One or more problems were found while parsing a header block.
    #[error("{}", join_errors(.0))]
    HeaderParse(Vec<Error>),
    #[error("multipart Content-Type has no boundary parameter")]
    NoBoundary,
    #[error("header exceeds the maximum header length")]
    LargeHeader,
    #[error("multipart part exceeds the maximum part length")]
    LargePart,
    #[error("buffered content does not parse as a multipart message")]
    ParsesAsNotMultipart,
    #[error("buffer is in opaque mode; parts cannot be added")]
    OpaqueBuffer,
    #[error("buffer is in multipart mode; bytes cannot be written")]
    PartsBuffer,
    #[error("buffer has neither bytes nor parts")]
    ModeUnset,
    #[error("no such header field: {0}")]
    NoSuchField(String),
    #[error("header field {0} has no parameter {1}")]
    NoSuchFieldParameter(String, String),
    #[error("header field {0} occurs more than once")]
    ManyFields(String),
    #[error("address value is not acceptable for this field")]
    WrongAddressType,
    #[error("header field index {0} is out of range")]
    IndexOutOfRange(isize),
    #[error("unknown charset: {0}")]
    UnknownCharset(String),
    #[error("malformed encoded word: {0}")]
    BadEncodedWord(String),
    #[error("unparseable date: {0}")]
    BadDate(String),
    #[error("unparseable media type: {0}")]
    BadMediaType(String),
    #[error("invalid fold encoding: {0}")]
    BadFoldEncoding(String),
    #[error("invalid header field name: {0:?}")]
    BadFieldName(String),
    #[error(transparent)]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn join_errors(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Wraps this error in an `io::Error`, for reporting through the
    /// `std::io` traits.
    pub fn into_io(self) -> io::Error {
        match self {
            Error::Io(e) => e,
            e => io::Error::new(io::ErrorKind::Other, e),
        }
    }

    /// Recovers a crate error that was passed through `into_io()`.
    pub fn from_io(e: io::Error) -> Self {
        if !e.get_ref().map_or(false, |inner| inner.is::<Error>()) {
            return Error::Io(e);
        }

        match e.into_inner().map(|inner| inner.downcast::<Error>()) {
            Some(Ok(inner)) => *inner,
            Some(Err(other)) => {
                Error::Io(io::Error::new(io::ErrorKind::Other, other))
            },
            None => Error::Io(io::ErrorKind::Other.into()),
        }
    }
}

/// The failure result of `parse()`.
///
/// Parsing never throws away work: `message` holds whatever could be
/// recovered, which is either the full tree (when the only problems were
/// recoverable header errors) or an opaque reconstruction of the original
/// bytes. It is only `None` when reading the input itself failed.
#[derive(Error)]
#[error("{}", join_errors(.errors))]
pub struct ParseError {
    pub message: Option<Message>,
    /// All errors encountered, first error first.
    pub errors: Vec<Error>,
}

impl ParseError {
    pub(crate) fn new(message: Option<Message>, error: Error) -> Self {
        ParseError {
            message,
            errors: vec![error],
        }
    }

    /// The first error encountered.
    pub fn first(&self) -> Option<&Error> {
        self.errors.first()
    }
}

impl fmt::Debug for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ParseError")
            .field("message", &self.message)
            .field("errors", &self.errors)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn io_wrapping_recovers_crate_error() {
        let e = Error::PartsBuffer.into_io();
        assert_matches!(Error::PartsBuffer, Error::from_io(e));

        let e = Error::from_io(io::Error::new(io::ErrorKind::Other, "boom"));
        assert_matches!(Error::Io(_), e);
    }

    #[test]
    fn header_parse_error_lists_all() {
        let e = Error::HeaderParse(vec![
            Error::BadStart(b"xx\n".to_vec()),
            Error::NoBoundary,
        ]);
        assert_eq!(
            "header starts with 3 bytes of non-header data; \
             multipart Content-Type has no boundary parameter",
            e.to_string()
        );
    }
}
