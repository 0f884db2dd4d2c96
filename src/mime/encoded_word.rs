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

//! RFC 2047 "encoded words" in unstructured header text.

use lazy_static::lazy_static;
use regex::Regex;

use super::charset::CharsetResolver;
use super::quoted_printable::qp_decode;
use crate::support::error::Error;

lazy_static! {
    static ref ENCODED_WORD: Regex =
        Regex::new(r"=\?([!->@-~]+)\?([!->@-~]+)\?([!->@-~]*)\?=").unwrap();
}

/// Decodes every encoded word in `text`.
///
/// Whitespace separating two adjacent encoded words is deleted; all other
/// text is left alone. An unknown charset or corrupt content fails the
/// whole decode.
///
/// RFC 2047 limits encoded words to 75 characters, but there are agents that
/// produce longer ones and other readers accept them, so no limit is applied
/// here.
pub fn decode_words(
    text: &str,
    resolver: &dyn CharsetResolver,
) -> Result<String, Error> {
    let mut out = String::with_capacity(text.len());
    let mut last_end = 0;
    let mut after_word = false;

    for captures in ENCODED_WORD.captures_iter(text) {
        let whole = match captures.get(0) {
            Some(m) => m,
            None => continue,
        };
        let between = &text[last_end..whole.start()];
        if !after_word
            || !between.chars().all(|c| c.is_ascii_whitespace())
        {
            out.push_str(between);
        }

        let group = |ix| captures.get(ix).map_or("", |m| m.as_str());
        out.push_str(&decode_word(group(1), group(2), group(3), resolver)?);
        last_end = whole.end();
        after_word = true;
    }

    out.push_str(&text[last_end..]);
    Ok(out)
}

fn decode_word(
    charset: &str,
    transfer_encoding: &str,
    content: &str,
    resolver: &dyn CharsetResolver,
) -> Result<String, Error> {
    // RFC 2231 allows a language tag after the charset
    let charset = charset.split('*').next().unwrap_or(charset);

    let content = match transfer_encoding {
        "q" | "Q" => {
            // _ in the content (before transfer decoding) stands for ASCII
            // space regardless of charset
            let content = content.replace('_', " ");
            let (decoded, dangling) = qp_decode(content.as_bytes());
            let mut decoded = decoded.into_owned();
            decoded.extend_from_slice(dangling);
            decoded
        },
        "b" | "B" => base64::decode(content).map_err(|e| {
            Error::BadEncodedWord(format!("{}: {}", content, e))
        })?,
        _ => {
            return Err(Error::BadEncodedWord(format!(
                "unknown encoding {:?}",
                transfer_encoding
            )))
        },
    };

    resolver.decode(charset, &content)
}

/// Returns whether `text` must be written as an encoded word, which is the
/// case whenever it has anything but printable ASCII and tabs.
///
/// Line breaks are not counted, since those are fold points.
pub fn needs_encoding(text: &[u8]) -> bool {
    text.iter().any(|&b| match b {
        b' '..=b'~' | b'\t' | b'\r' | b'\n' => false,
        _ => true,
    })
}

/// Encodes `text` as a single UTF-8, base64 encoded word.
pub fn encode_word(text: &str) -> String {
    format!("=?utf-8?b?{}?=", base64::encode(text))
}
