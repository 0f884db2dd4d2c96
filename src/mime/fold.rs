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

use serde::{Deserialize, Serialize};

use super::line_break::LineBreak;
use crate::support::error::Error;

pub const DEFAULT_PREFERRED_FOLD_LENGTH: usize = 80;
pub const DEFAULT_FORCED_FOLD_LENGTH: usize = 1000;

/// Controls how header fields are folded when written.
///
/// Fields that came from a parsed message are written back exactly as they
/// were; only new or modified fields are folded.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FoldEncoding {
    indent: String,
    preferred_length: usize,
    forced_length: usize,
}

impl Default for FoldEncoding {
    fn default() -> Self {
        FoldEncoding {
            indent: " ".to_owned(),
            preferred_length: DEFAULT_PREFERRED_FOLD_LENGTH,
            forced_length: DEFAULT_FORCED_FOLD_LENGTH,
        }
    }
}

impl FoldEncoding {
    /// Creates a fold encoding.
    ///
    /// `indent` must be one or more spaces or tabs. Both lengths must leave
    /// room for the line break, and `forced_length` may not be less than
    /// `preferred_length`.
    pub fn new(
        indent: impl Into<String>,
        preferred_length: usize,
        forced_length: usize,
    ) -> Result<Self, Error> {
        let indent = indent.into();
        if indent.is_empty() || !indent.bytes().all(|b| b' ' == b || b'\t' == b)
        {
            return Err(Error::BadFoldEncoding(format!(
                "indent {:?} is not entirely spaces and tabs",
                indent
            )));
        }

        if preferred_length <= indent.len() + 2 {
            return Err(Error::BadFoldEncoding(format!(
                "preferred length {} is too short",
                preferred_length
            )));
        }

        if forced_length < preferred_length {
            return Err(Error::BadFoldEncoding(format!(
                "forced length {} is less than preferred length {}",
                forced_length, preferred_length
            )));
        }

        Ok(FoldEncoding {
            indent,
            preferred_length,
            forced_length,
        })
    }

    pub fn indent(&self) -> &str {
        &self.indent
    }

    pub fn preferred_length(&self) -> usize {
        self.preferred_length
    }

    pub fn forced_length(&self) -> usize {
        self.forced_length
    }

    /// Folds one logical header line (`Name: value`, without a line
    /// ending).
    ///
    /// Line breaks already present in `line` are kept as fold points, but
    /// the whitespace after them is replaced with this encoding's indent.
    pub fn fold(&self, line: &[u8], line_break: LineBreak) -> Vec<u8> {
        let lb = line_break.as_bytes();
        let mut out = Vec::with_capacity(line.len() + line.len() / 32);

        let mut first = true;
        for segment in line.split(|&b| b'\r' == b || b'\n' == b) {
            let segment: Cow<[u8]> = if first {
                Cow::Borrowed(segment)
            } else {
                let trimmed = trim_leading_ws(segment);
                if trimmed.is_empty() {
                    continue;
                }
                let mut indented = self.indent.as_bytes().to_vec();
                indented.extend_from_slice(trimmed);
                Cow::Owned(indented)
            };

            if !first {
                out.extend_from_slice(lb);
            }
            first = false;
            self.fold_segment(&segment, lb, &mut out);
        }

        out
    }

    fn fold_segment(&self, segment: &[u8], lb: &[u8], out: &mut Vec<u8>) {
        let preferred = self.preferred_length.saturating_sub(2).max(1);
        let forced = self.forced_length.saturating_sub(2);
        let mut rest = segment;

        loop {
            if rest.len() <= preferred {
                out.extend_from_slice(rest);
                return;
            }

            let is_ws = |b: &u8| b' ' == *b || b'\t' == *b;
            let cut = rest[1..=preferred]
                .iter()
                .rposition(is_ws)
                .map(|ix| ix + 1)
                .or_else(|| {
                    let end = forced.min(rest.len() - 1);
                    if end <= preferred {
                        None
                    } else {
                        rest[preferred + 1..=end]
                            .iter()
                            .position(is_ws)
                            .map(|ix| ix + preferred + 1)
                    }
                })
                .or_else(|| {
                    if rest.len() > forced {
                        Some(preferred)
                    } else {
                        None
                    }
                });

            let cut = match cut {
                Some(cut) => cut,
                None => {
                    out.extend_from_slice(rest);
                    return;
                },
            };

            out.extend_from_slice(&rest[..cut]);
            out.extend_from_slice(lb);
            rest = &rest[cut..];
            if !rest.first().map_or(false, is_ws) {
                out.extend_from_slice(self.indent.as_bytes());
            }
        }
    }
}

fn trim_leading_ws(s: &[u8]) -> &[u8] {
    let start = s
        .iter()
        .position(|&b| b' ' != b && b'\t' != b)
        .unwrap_or(s.len());
    &s[start..]
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    fn fold(enc: &FoldEncoding, line: &str) -> String {
        String::from_utf8(enc.fold(line.as_bytes(), LineBreak::Lf)).unwrap()
    }

    #[test]
    fn construction() {
        assert!(FoldEncoding::new(" \t", 20, 40).is_ok());
        assert_matches!(
            Err(Error::BadFoldEncoding(_)),
            FoldEncoding::new("", 80, 1000)
        );
        assert_matches!(
            Err(Error::BadFoldEncoding(_)),
            FoldEncoding::new("x", 80, 1000)
        );
        assert_matches!(
            Err(Error::BadFoldEncoding(_)),
            FoldEncoding::new(" ", 3, 1000)
        );
        assert_matches!(
            Err(Error::BadFoldEncoding(_)),
            FoldEncoding::new(" ", 80, 79)
        );
    }

    #[test]
    fn short_lines_untouched() {
        let enc = FoldEncoding::default();
        assert_eq!("Subject: test", fold(&enc, "Subject: test"));
    }

    #[test]
    fn folds_at_last_space() {
        let enc = FoldEncoding::new(" ", 20, 40).unwrap();
        assert_eq!(
            "Subject: one two\n three four five\n six",
            fold(&enc, "Subject: one two three four five six")
        );
    }

    #[test]
    fn folds_at_first_space_beyond_preferred() {
        let enc = FoldEncoding::new(" ", 12, 40).unwrap();
        assert_eq!(
            "X:abcdefghijklmn\n op",
            fold(&enc, "X:abcdefghijklmn op")
        );
    }

    #[test]
    fn forced_break_without_spaces() {
        let enc = FoldEncoding::new("\t", 12, 20).unwrap();
        assert_eq!(
            "X:abcdefgh\n\tijklmnopqrstuvwxyz",
            fold(&enc, "X:abcdefghijklmnopqrstuvwxyz")
        );
        // Between preferred and forced with no space: left whole
        assert_eq!("X:abcdefghijklm", fold(&enc, "X:abcdefghijklm"));
    }

    #[test]
    fn refolds_existing_breaks() {
        let enc = FoldEncoding::new("  ", 80, 1000).unwrap();
        assert_eq!(
            "References: <a@b>\n  <c@d>\n  <e@f>",
            fold(&enc, "References: <a@b>\r\n\t<c@d>\n <e@f>")
        );
    }

    proptest! {
        #[test]
        fn folding_only_inserts_breaks_and_indents(
            line in "[a-z]{1,10}: [a-z ]{0,300}",
            preferred in 10usize..100,
        ) {
            let enc = FoldEncoding::new(" ", preferred, preferred * 2)
                .unwrap();
            let folded = fold(&enc, &line);

            let mut rebuilt = String::new();
            for (ix, segment) in folded.split('\n').enumerate() {
                prop_assert!(
                    segment.len() < preferred * 2,
                    "segment too long: {:?}", segment
                );
                if ix > 0 && !line[rebuilt.len()..].starts_with(' ') {
                    rebuilt.push_str(&segment[1..]);
                } else {
                    rebuilt.push_str(segment);
                }
            }
            prop_assert_eq!(line, rebuilt);
        }
    }
}
