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
use std::fmt;
use std::ops::Range;

use chrono::prelude::*;

use super::address::AddressList;
use super::charset::CharsetResolver;
use super::encoded_word;
use super::fold::FoldEncoding;
use super::line_break::{self, LineBreak};
use super::params::ParameterizedValue;
use super::syntax;
use crate::support::error::Error;

/// Decoded forms of a field body, filled in as the typed accessors are used.
#[derive(Clone, Debug, Default)]
pub(crate) struct FieldCache {
    pub time: Option<DateTime<FixedOffset>>,
    pub addresses: Option<AddressList>,
    pub params: Option<ParameterizedValue>,
    pub keywords: Option<Vec<String>>,
}

/// A single header field.
///
/// A field read from a message remembers its exact original bytes, which
/// are what gets written back out until the field is modified.
#[derive(Clone)]
pub struct Field {
    name: String,
    body: Vec<u8>,
    raw: Option<Vec<u8>>,
    pub(crate) cache: FieldCache,
}

/// Checks that `name` is acceptable as a field name: non-empty, and printable
/// ASCII other than the colon.
pub(crate) fn check_name(name: &str) -> Result<(), Error> {
    if name.is_empty()
        || !name.bytes().all(|b| b > b' ' && b < 0x7f && b':' != b)
    {
        Err(Error::BadFieldName(name.to_owned()))
    } else {
        Ok(())
    }
}

impl Field {
    /// Creates a new field with the given name and unencoded value.
    ///
    /// The value is stored as-is and is encoded and folded only when the
    /// field is written.
    pub fn new(name: &str, value: &str) -> Result<Self, Error> {
        check_name(name)?;
        Ok(Field {
            name: name.to_owned(),
            body: value.as_bytes().to_vec(),
            raw: None,
            cache: FieldCache::default(),
        })
    }

    /// Reconstructs a field from its raw bytes, which should not include
    /// the final line break.
    ///
    /// The text before the first colon is the name. Without a colon, the
    /// whole thing is the name and the body is empty.
    pub fn parse(raw: &[u8]) -> Self {
        let (name, body) = match memchr::memchr(b':', raw) {
            Some(colon) => (&raw[..colon], &raw[colon + 1..]),
            None => (raw, &[][..]),
        };

        Field {
            name: String::from_utf8_lossy(name).into_owned(),
            body: body.to_vec(),
            raw: Some(raw.to_vec()),
            cache: FieldCache::default(),
        }
    }

    /// The name, without any whitespace that preceded the colon.
    pub fn name(&self) -> &str {
        self.name.trim_end()
    }

    /// Whether this field is called `name`, ignoring case.
    pub fn is_named(&self, name: &str) -> bool {
        self.name().eq_ignore_ascii_case(name)
    }

    /// The body exactly as stored, including any folding.
    pub fn raw_body(&self) -> &[u8] {
        &self.body
    }

    /// The original bytes of a field that has not been modified since it
    /// was parsed.
    pub fn raw(&self) -> Option<&[u8]> {
        self.raw.as_ref().map(|r| &r[..])
    }

    /// The body with all CR and LF bytes removed.
    pub fn unfolded(&self) -> Vec<u8> {
        self.body
            .iter()
            .copied()
            .filter(|&b| b'\r' != b && b'\n' != b)
            .collect()
    }

    /// The unfolded body with encoded words decoded and surrounding
    /// whitespace removed.
    pub fn text(
        &self,
        resolver: &dyn CharsetResolver,
    ) -> Result<String, Error> {
        let unfolded = self.unfolded();
        let text = String::from_utf8_lossy(&unfolded);
        encoded_word::decode_words(text.trim(), resolver)
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), Error> {
        check_name(name)?;
        self.name = name.to_owned();
        self.raw = None;
        Ok(())
    }

    /// Replaces the body, discarding the original bytes and cached values.
    pub fn set_body(&mut self, value: &str) {
        self.set_raw_body(value.as_bytes().to_vec());
    }

    /// Replaces the body with bytes which are written without any further
    /// encoding, but which will still be folded.
    pub fn set_raw_body(&mut self, body: Vec<u8>) {
        self.body = body;
        self.raw = None;
        self.clear_cache();
    }

    pub fn clear_cache(&mut self) {
        self.cache = FieldCache::default();
    }

    /// Produces the bytes of this field, without the final line break.
    pub fn render(
        &self,
        line_break: LineBreak,
        fold: &FoldEncoding,
    ) -> Cow<[u8]> {
        if let Some(ref raw) = self.raw {
            return Cow::Borrowed(raw);
        }

        let mut line =
            Vec::with_capacity(self.name.len() + self.body.len() + 2);
        line.extend_from_slice(self.name.as_bytes());
        line.push(b':');
        if encoded_word::needs_encoding(&self.body) {
            let unfolded = self.unfolded();
            let text = String::from_utf8_lossy(&unfolded);
            line.push(b' ');
            line.extend_from_slice(
                encoded_word::encode_word(text.trim()).as_bytes(),
            );
        } else {
            if !self.body.starts_with(b" ") && !self.body.starts_with(b"\t") {
                line.push(b' ');
            }
            line.extend_from_slice(&self.body);
        }

        Cow::Owned(fold.fold(&line, line_break))
    }

    pub(crate) fn time(&mut self) -> Result<DateTime<FixedOffset>, Error> {
        if let Some(time) = self.cache.time {
            return Ok(time);
        }

        let unfolded = self.unfolded();
        let time = parse_date(&unfolded).ok_or_else(|| {
            Error::BadDate(String::from_utf8_lossy(&unfolded).into_owned())
        })?;
        self.cache.time = Some(time);
        Ok(time)
    }

    pub(crate) fn addresses(
        &mut self,
        resolver: &dyn CharsetResolver,
    ) -> &AddressList {
        if self.cache.addresses.is_none() {
            let unfolded = self.unfolded();
            let list = if unfolded.iter().all(u8::is_ascii_whitespace) {
                AddressList::default()
            } else {
                AddressList::parse(&unfolded, resolver)
            };
            self.cache.addresses = Some(list);
        }

        self.cache.addresses.get_or_insert_with(AddressList::default)
    }

    pub(crate) fn params(
        &mut self,
        resolver: &dyn CharsetResolver,
    ) -> Result<&ParameterizedValue, Error> {
        let params = match self.cache.params.take() {
            Some(params) => params,
            None => ParameterizedValue::parse(&self.body, resolver)?,
        };
        Ok(self.cache.params.get_or_insert(params))
    }

    pub(crate) fn keywords(
        &mut self,
        resolver: &dyn CharsetResolver,
    ) -> Result<&[String], Error> {
        let keywords = match self.cache.keywords.take() {
            Some(keywords) => keywords,
            None => self
                .text(resolver)?
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_owned)
                .collect(),
        };
        Ok(self.cache.keywords.get_or_insert(keywords))
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("body", &String::from_utf8_lossy(&self.body))
            .field("modified", &self.raw.is_none())
            .finish()
    }
}

/// Parses a date the way RFC 5322 says to, falling back to a few formats
/// seen in the wild.
pub fn parse_date(value: &[u8]) -> Option<DateTime<FixedOffset>> {
    if let Some(dt) = syntax::parse_datetime(value) {
        return Some(dt);
    }

    let text = String::from_utf8_lossy(value);
    let text = text.trim();
    DateTime::parse_from_rfc2822(text)
        .or_else(|_| DateTime::parse_from_rfc3339(text))
        .or_else(|_| DateTime::parse_from_str(text, "%a %b %e %H:%M:%S %z %Y"))
        .or_else(|_| DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S %z"))
        .ok()
}

/// Formats a date for a header field.
pub fn format_date(dt: &DateTime<FixedOffset>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S %z").to_string()
}

/// The result of splitting a header block into fields.
#[derive(Debug)]
pub(crate) struct ParsedFields {
    /// Bytes before the first field, including their line breaks.
    pub bad_start: Option<Vec<u8>>,
    pub fields: Vec<Field>,
    /// Whether the block ended with a line break.
    pub terminated: bool,
}

fn is_continuation(line: &[u8]) -> bool {
    line.starts_with(b" ")
        || line.starts_with(b"\t")
        || memchr::memchr(b':', line).is_none()
}

/// Splits a header block into fields.
///
/// Lines starting with whitespace, as well as lines with no colon at all,
/// continue the previous field. Continuation lines before the first field
/// are returned as `bad_start`.
pub(crate) fn parse_fields(
    block: &[u8],
    line_break: LineBreak,
) -> ParsedFields {
    let lb = line_break.as_bytes();
    let terminated = !lb.is_empty() && block.ends_with(lb);
    let content = if terminated {
        &block[..block.len() - lb.len()]
    } else {
        block
    };

    let mut lines: Vec<Range<usize>> = Vec::new();
    if !block.is_empty() {
        let mut start = 0;
        loop {
            let next = if lb.is_empty() {
                None
            } else {
                line_break::find(&content[start..], lb)
            };

            match next {
                Some(ix) => {
                    lines.push(start..start + ix);
                    start += ix + lb.len();
                },
                None => {
                    lines.push(start..content.len());
                    break;
                },
            }
        }
    }

    let mut field_ranges: Vec<Range<usize>> = Vec::new();
    for line in lines {
        if is_continuation(&content[line.clone()]) {
            if let Some(last) = field_ranges.last_mut() {
                last.end = line.end;
            }
        } else {
            field_ranges.push(line);
        }
    }

    let bad_start = match field_ranges.first() {
        None if block.is_empty() => None,
        None => Some(block.to_vec()),
        Some(first) if first.start > 0 => Some(block[..first.start].to_vec()),
        Some(_) => None,
    };

    ParsedFields {
        bad_start,
        fields: field_ranges
            .into_iter()
            .map(|range| Field::parse(&content[range]))
            .collect(),
        terminated,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mime::charset::DefaultCharsets;

    #[test]
    fn field_parsing() {
        let f = Field::parse(b"Subject : hello\r\n world");
        assert_eq!("Subject", f.name());
        assert!(f.is_named("SUBJECT"));
        assert_eq!(b" hello\r\n world", f.raw_body());
        assert_eq!(b" hello world".to_vec(), f.unfolded());
        assert_eq!("hello world", f.text(&DefaultCharsets).unwrap());

        let f = Field::parse(b"no colon here");
        assert_eq!("no colon here", f.name());
        assert!(f.raw_body().is_empty());
    }

    #[test]
    fn names_are_validated() {
        assert!(Field::new("X-Ok", "v").is_ok());
        assert_matches!(Err(Error::BadFieldName(_)), Field::new("", "v"));
        assert_matches!(Err(Error::BadFieldName(_)), Field::new("A:B", "v"));
        assert_matches!(Err(Error::BadFieldName(_)), Field::new("A B", "v"));
    }

    #[test]
    fn rendering() {
        let fold = FoldEncoding::default();
        let f = Field::parse(b"Subject:   exactly  as  was");
        assert_eq!(
            &b"Subject:   exactly  as  was"[..],
            &f.render(LineBreak::Crlf, &fold)[..]
        );

        let mut f = Field::new("Subject", "test").unwrap();
        assert_eq!(&b"Subject: test"[..], &f.render(LineBreak::Lf, &fold)[..]);

        f.set_body("caf\u{e9}");
        assert_eq!(
            &b"Subject: =?utf-8?b?Y2Fmw6k=?="[..],
            &f.render(LineBreak::Lf, &fold)[..]
        );

        let mut f = Field::parse(b"To: a@b.c,\r\n d@e.f");
        f.set_name("Cc").unwrap();
        assert_eq!(
            &b"Cc: a@b.c,\n d@e.f"[..],
            &f.render(LineBreak::Lf, &fold)[..]
        );
    }

    #[test]
    fn typed_values_are_cached() {
        let mut f = Field::parse(b"Date: Fri, 21 Nov 1997 09:55:06 -0600");
        let t = f.time().unwrap();
        assert_eq!("1997-11-21T09:55:06-06:00", t.to_rfc3339());
        assert!(f.cache.time.is_some());
        f.set_body("garbage");
        assert!(f.cache.time.is_none());
        assert_matches!(Err(Error::BadDate(_)), f.time());

        let mut f = Field::parse(b"Keywords: a, b ,, c");
        assert_eq!(
            vec!["a".to_owned(), "b".to_owned(), "c".to_owned()],
            f.keywords(&DefaultCharsets).unwrap().to_vec()
        );

        let mut f = Field::parse(b"To:   ");
        assert!(f.addresses(&DefaultCharsets).is_empty());
    }

    #[test]
    fn date_fallbacks() {
        assert!(parse_date(b"2020-01-02T03:04:05+01:00").is_some());
        assert!(parse_date(b"not a date").is_none());
        assert_eq!(
            "Fri, 21 Nov 1997 09:55:06 -0600",
            format_date(&parse_date(b"21 Nov 1997 09:55:06 -0600").unwrap())
        );
    }

    #[test]
    fn block_splitting() {
        let parsed = parse_fields(
            b"A: 1\nB: 2\n continued\nno colon\nC: 3\n",
            LineBreak::Lf,
        );
        assert!(parsed.bad_start.is_none());
        assert!(parsed.terminated);
        assert_eq!(3, parsed.fields.len());
        assert_eq!(
            Some(&b"B: 2\n continued\nno colon"[..]),
            parsed.fields[1].raw()
        );

        let parsed = parse_fields(b" junk\nmore junk\nA: 1", LineBreak::Lf);
        assert_eq!(Some(b" junk\nmore junk\n".to_vec()), parsed.bad_start);
        assert!(!parsed.terminated);
        assert_eq!(1, parsed.fields.len());

        let parsed = parse_fields(b"\r\n", LineBreak::Crlf);
        assert_eq!(Some(b"\r\n".to_vec()), parsed.bad_start);
        assert!(parsed.fields.is_empty());

        let parsed = parse_fields(b"", LineBreak::Crlf);
        assert!(parsed.bad_start.is_none());
        assert!(parsed.fields.is_empty());
        assert!(!parsed.terminated);
    }
}
