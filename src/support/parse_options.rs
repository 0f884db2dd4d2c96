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

use serde::{Deserialize, Serialize};

use super::error::Error;

/// Options controlling how `parse()` decomposes a message.
///
/// This can be built in code with the `with_*` methods, or loaded from a
/// TOML table using the kebab-case field names, e.g.
///
/// ```toml
/// max-depth = 3
/// decode-transfer-encoding = true
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ParseOptions {
    /// The number of bytes read at a time while looking for the end of the
    /// header.
    pub chunk_size: usize,
    /// Header blocks longer than this fail with `LargeHeader`.
    pub max_header_length: usize,
    /// Multipart parts (and preambles) longer than this fail with
    /// `LargePart`.
    pub max_part_length: usize,
    /// How many levels of multipart nesting to decompose.
    ///
    /// -1 means no limit. 0 means the top-level message is always opaque. 1
    /// decomposes the top-level message, but all its parts are opaque; and so
    /// on.
    pub max_depth: i32,
    /// If true, leaf bodies are read with their `Content-Transfer-Encoding`
    /// removed, and re-encoded when written.
    pub decode_transfer_encoding: bool,
    /// If true, header encoded words may use any charset known to
    /// `encoding_rs` instead of only US-ASCII, ISO-8859-1 and UTF-8.
    pub extended_charsets: bool,
}

pub const DEFAULT_CHUNK_SIZE: usize = 16384;
pub const DEFAULT_MAX_HEADER_LENGTH: usize = 65536;
pub const DEFAULT_MAX_PART_LENGTH: usize = 65536;
pub const DEFAULT_MAX_DEPTH: i32 = 10;

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_header_length: DEFAULT_MAX_HEADER_LENGTH,
            max_part_length: DEFAULT_MAX_PART_LENGTH,
            max_depth: DEFAULT_MAX_DEPTH,
            decode_transfer_encoding: false,
            extended_charsets: false,
        }
    }
}

impl ParseOptions {
    pub fn from_toml(text: &str) -> Result<Self, Error> {
        Ok(toml::from_str(text)?)
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        // A zero chunk size would never make progress
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_max_header_length(mut self, len: usize) -> Self {
        self.max_header_length = len;
        self
    }

    pub fn with_max_part_length(mut self, len: usize) -> Self {
        self.max_part_length = len;
        self
    }

    pub fn with_max_depth(mut self, depth: i32) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_unlimited_depth(self) -> Self {
        self.with_max_depth(-1)
    }

    pub fn with_decode_transfer_encoding(mut self, decode: bool) -> Self {
        self.decode_transfer_encoding = decode;
        self
    }

    pub fn with_extended_charsets(mut self, extended: bool) -> Self {
        self.extended_charsets = extended;
        self
    }

    /// Whether a message at this level may be decomposed.
    pub(crate) fn may_descend(&self) -> bool {
        0 != self.max_depth
    }

    /// The options to use for the children of a decomposed message.
    pub(crate) fn descend(&self) -> Self {
        let mut child = self.clone();
        if child.max_depth > 0 {
            child.max_depth -= 1;
        }
        child
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let o = ParseOptions::default();
        assert_eq!(16384, o.chunk_size);
        assert_eq!(65536, o.max_header_length);
        assert_eq!(65536, o.max_part_length);
        assert_eq!(10, o.max_depth);
        assert!(!o.decode_transfer_encoding);
    }

    #[test]
    fn load_from_toml() {
        let o = ParseOptions::from_toml(
            "max-depth = -1\n\
             decode-transfer-encoding = true\n\
             chunk-size = 80\n",
        )
        .unwrap();
        assert_eq!(
            ParseOptions::default()
                .with_unlimited_depth()
                .with_decode_transfer_encoding(true)
                .with_chunk_size(80),
            o
        );

        assert_matches!(
            Err(Error::Config(_)),
            ParseOptions::from_toml("max-depth = \"deep\"")
        );
    }

    #[test]
    fn depth_counts_down() {
        let o = ParseOptions::default().with_max_depth(1);
        assert!(o.may_descend());
        assert!(!o.descend().may_descend());

        let o = ParseOptions::default().with_unlimited_depth();
        assert!(o.descend().descend().may_descend());
        assert_eq!(-1, o.descend().max_depth);
    }
}
