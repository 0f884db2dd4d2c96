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

use encoding_rs::Encoding;

use crate::support::error::Error;

/// Converts text in a named character set to UTF-8.
///
/// A resolver is consulted whenever an encoded word or an RFC 2231 parameter
/// names a charset. Implementations must be shareable, since every header
/// parsed with the same options holds a reference to the same resolver.
pub trait CharsetResolver: fmt::Debug + Send + Sync {
    /// Decodes `data`, which is in `charset`, to a string.
    ///
    /// Returns `Error::UnknownCharset` if `charset` is not supported.
    fn decode(&self, charset: &str, data: &[u8]) -> Result<String, Error>;
}

/// Resolver supporting only the charsets every agent must understand:
/// US-ASCII, ISO-8859-1 and UTF-8.
///
/// Malformed input is decoded lossily rather than rejected.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultCharsets;

impl CharsetResolver for DefaultCharsets {
    fn decode(&self, charset: &str, data: &[u8]) -> Result<String, Error> {
        match charset.to_ascii_lowercase().as_str() {
            "us-ascii" | "ascii" | "ansi_x3.4-1968" => Ok(data
                .iter()
                .map(|&b| {
                    if b < 0x80 {
                        char::from(b)
                    } else {
                        char::REPLACEMENT_CHARACTER
                    }
                })
                .collect()),
            "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin1" | "l1" => {
                Ok(data.iter().copied().map(char::from).collect())
            },
            "utf-8" | "utf8" => Ok(String::from_utf8_lossy(data).into_owned()),
            _ => Err(Error::UnknownCharset(charset.to_owned())),
        }
    }
}

/// Resolver supporting everything in the WHATWG Encoding Standard, which is
/// more or less everything found in real mail.
///
/// Note that, per that standard, `ISO-8859-1` is treated as `windows-1252`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExtendedCharsets;

impl CharsetResolver for ExtendedCharsets {
    fn decode(&self, charset: &str, data: &[u8]) -> Result<String, Error> {
        let encoding = Encoding::for_label_no_replacement(charset.as_bytes())
            .ok_or_else(|| Error::UnknownCharset(charset.to_owned()))?;
        Ok(encoding.decode_with_bom_removal(data).0.into_owned())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_charsets() {
        let r = DefaultCharsets;
        assert_eq!("Andr\u{e9}", r.decode("ISO-8859-1", b"Andr\xe9").unwrap());
        assert_eq!("Andr\u{e9}", r.decode("utf-8", b"Andr\xc3\xa9").unwrap());
        assert_eq!("Andr\u{fffd}", r.decode("US-ASCII", b"Andr\xe9").unwrap());
        assert_matches!(
            Err(Error::UnknownCharset(_)),
            r.decode("koi8-r", b"foo")
        );
    }

    #[test]
    fn extended_charsets() {
        let r = ExtendedCharsets;
        assert_eq!(
            "\u{41f}\u{440}\u{438}\u{432}\u{435}\u{442}",
            r.decode("koi8-r", b"\xf0\xd2\xc9\xd7\xc5\xd4").unwrap()
        );
        assert_eq!("Andr\u{e9}", r.decode("latin1", b"Andr\xe9").unwrap());
        assert_matches!(
            Err(Error::UnknownCharset(_)),
            r.decode("x-no-such-thing", b"foo")
        );
    }
}
