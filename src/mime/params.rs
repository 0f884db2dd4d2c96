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

use log::debug;

use super::charset::CharsetResolver;
use super::encoded_word;
use super::syntax;
use crate::support::error::Error;

/// A header value with `;`-separated parameters, as used by `Content-Type`
/// and `Content-Disposition`.
///
/// RFC 2231 continuations and charset-tagged parameters are merged and
/// decoded on parse, so each parameter appears once with its full text.
/// Parameter order is preserved. Values are immutable; the `with_*`
/// methods return modified copies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParameterizedValue {
    value: String,
    params: Vec<(String, String)>,
}

enum RawParam {
    Plain(String, String),
    // (index, extended, raw value)
    Sections(String, Vec<(u32, bool, Vec<u8>)>),
}

impl ParameterizedValue {
    pub fn new(value: impl Into<String>) -> Self {
        ParameterizedValue {
            value: value.into(),
            params: Vec::new(),
        }
    }

    /// Parses the body of a parameterised header field.
    pub fn parse(
        text: &[u8],
        resolver: &dyn CharsetResolver,
    ) -> Result<Self, Error> {
        let (value, raw_params) = syntax::parse_parameterized(text)
            .ok_or_else(|| {
                Error::BadMediaType(String::from_utf8_lossy(text).into_owned())
            })?;

        let mut merged: Vec<RawParam> = Vec::new();
        for (name, value) in raw_params {
            let name = String::from_utf8_lossy(&name).into_owned();
            let (base, section) = match name.find('*') {
                None => {
                    merged.push(RawParam::Plain(
                        name,
                        String::from_utf8_lossy(&value).into_owned(),
                    ));
                    continue;
                },
                Some(star) => (name[..star].to_owned(), &name[star + 1..]),
            };

            let extended = section.ends_with('*') || section.is_empty();
            let index = section.trim_end_matches('*');
            let index = if index.is_empty() {
                0
            } else if let Ok(ix) = index.parse::<u32>() {
                ix
            } else {
                debug!("Ignoring malformed RFC 2231 parameter {:?}", name);
                continue;
            };

            let existing = merged.iter_mut().find_map(|p| match *p {
                RawParam::Sections(ref b, ref mut sections)
                    if b.eq_ignore_ascii_case(&base) =>
                {
                    Some(sections)
                },
                _ => None,
            });
            match existing {
                Some(sections) => sections.push((index, extended, value)),
                None => merged.push(RawParam::Sections(
                    base,
                    vec![(index, extended, value)],
                )),
            }
        }

        // RFC 2231 section 4.1: the extended form takes precedence over a
        // plain parameter of the same name.
        let has_sections = |name: &str| {
            merged.iter().any(|p| match *p {
                RawParam::Sections(ref b, _) => b.eq_ignore_ascii_case(name),
                _ => false,
            })
        };
        let keep: Vec<bool> = merged
            .iter()
            .map(|p| match *p {
                RawParam::Plain(ref name, _) => !has_sections(name),
                _ => true,
            })
            .collect();

        let mut params = Vec::with_capacity(merged.len());
        for (param, keep) in merged.into_iter().zip(keep) {
            if !keep {
                continue;
            }

            match param {
                RawParam::Plain(name, value) => params.push((name, value)),
                RawParam::Sections(name, mut sections) => {
                    sections.sort_by_key(|&(ix, _, _)| ix);
                    let value = join_sections(sections, resolver);
                    params.push((name, value));
                },
            }
        }

        Ok(ParameterizedValue {
            value: String::from_utf8_lossy(&value).into_owned(),
            params,
        })
    }

    /// The primary value, e.g. `text/plain`, as it appeared.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// All parameters, in order.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Looks up a parameter by case-insensitive name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|&&(ref n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, ref v)| v.as_str())
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Returns a copy with `name` set to `value`, replacing any parameter
    /// of the same name in place.
    pub fn with_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let value = value.into();
        match self
            .params
            .iter_mut()
            .find(|&&mut (ref n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(existing) => existing.1 = value,
            None => self.params.push((name, value)),
        }
        self
    }

    pub fn without_parameter(mut self, name: &str) -> Self {
        self.params.retain(|&(ref n, _)| !n.eq_ignore_ascii_case(name));
        self
    }
}

fn join_sections(
    sections: Vec<(u32, bool, Vec<u8>)>,
    resolver: &dyn CharsetResolver,
) -> String {
    let mut charset = None;
    let mut bytes = Vec::new();
    for (ix, (_, extended, value)) in sections.into_iter().enumerate() {
        if !extended {
            bytes.extend_from_slice(&value);
            continue;
        }

        let mut value = &value[..];
        // Only the first section carries charset'language'
        if 0 == ix {
            let mut split = value.splitn(3, |&b| b'\'' == b);
            if let (Some(cs), Some(_lang), Some(rest)) =
                (split.next(), split.next(), split.next())
            {
                if !cs.is_empty() {
                    charset = Some(String::from_utf8_lossy(cs).into_owned());
                }
                value = rest;
            }
        }
        percent_decode(value, &mut bytes);
    }

    match charset {
        Some(charset) => {
            resolver.decode(&charset, &bytes).unwrap_or_else(|e| {
                debug!("Decoding RFC 2231 parameter failed: {}", e);
                String::from_utf8_lossy(&bytes).into_owned()
            })
        },
        None => String::from_utf8_lossy(&bytes).into_owned(),
    }
}

fn percent_decode(src: &[u8], dst: &mut Vec<u8>) {
    let hex = |b: u8| char::from(b).to_digit(16);
    let mut ix = 0;
    while ix < src.len() {
        if b'%' == src[ix] {
            if let (Some(hi), Some(lo)) = (
                src.get(ix + 1).and_then(|&b| hex(b)),
                src.get(ix + 2).and_then(|&b| hex(b)),
            ) {
                dst.push((hi * 16 + lo) as u8);
                ix += 3;
                continue;
            }
        }
        dst.push(src[ix]);
        ix += 1;
    }
}

fn is_token_char(b: u8) -> bool {
    b > b' ' && b < 0x7f && !b"()<>@,;:\\\"/[]?=".contains(&b)
}

fn is_attr_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&b)
}

fn write_parameter(
    f: &mut fmt::Formatter,
    name: &str,
    value: &str,
) -> fmt::Result {
    if encoded_word::needs_encoding(value.as_bytes())
        || value.contains(|c: char| '\r' == c || '\n' == c)
    {
        write!(f, "; {}*=utf-8''", name)?;
        for &b in value.as_bytes() {
            if is_attr_char(b) {
                write!(f, "{}", char::from(b))?;
            } else {
                write!(f, "%{:02X}", b)?;
            }
        }
        Ok(())
    } else if !value.is_empty() && value.bytes().all(is_token_char) {
        write!(f, "; {}={}", name, value)
    } else {
        write!(f, "; {}=\"", name)?;
        for c in value.chars() {
            if '"' == c || '\\' == c {
                write!(f, "\\")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, "\"")
    }
}

impl fmt::Display for ParameterizedValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.value)?;
        for &(ref name, ref value) in &self.params {
            write_parameter(f, name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mime::charset::{DefaultCharsets, ExtendedCharsets};

    fn parse(text: &str) -> ParameterizedValue {
        ParameterizedValue::parse(text.as_bytes(), &ExtendedCharsets).unwrap()
    }

    #[test]
    fn simple_parameters() {
        let pv = parse("text/plain; Charset=\"UTF-8\"; format=flowed");
        assert_eq!("text/plain", pv.value());
        assert_eq!(Some("UTF-8"), pv.get("charset"));
        assert_eq!(Some("flowed"), pv.get("FORMAT"));
        assert_eq!(None, pv.get("delsp"));
        assert_eq!(2, pv.params().len());
    }

    #[test]
    fn rfc2231_parameters() {
        let pv = parse(
            "attachment; filename*0*=us-ascii'en'This%20is%20even%20more%20;\r\n \
             filename*1*=%2A%2A%2Afun%2A%2A%2A%20; filename*2=\"isn't it!\"",
        );
        assert_eq!(
            Some("This is even more ***fun*** isn't it!"),
            pv.get("filename")
        );

        let pv = parse(
            "attachment; filename=\"fallback.txt\"; \
             filename*=iso-8859-1''caf%E9.txt",
        );
        assert_eq!(Some("caf\u{e9}.txt"), pv.get("filename"));
        assert_eq!(1, pv.params().len());

        // Out of order sections are reassembled
        let pv = parse("x/y; a*1=b; a*0=a");
        assert_eq!(Some("ab"), pv.get("a"));
    }

    #[test]
    fn unknown_parameter_charset_falls_back() {
        let pv = ParameterizedValue::parse(
            b"x/y; a*=x-nope''%41%42",
            &DefaultCharsets,
        )
        .unwrap();
        assert_eq!(Some("AB"), pv.get("a"));
    }

    #[test]
    fn bad_media_type() {
        assert_matches!(
            Err(Error::BadMediaType(_)),
            ParameterizedValue::parse(b"", &DefaultCharsets)
        );
    }

    #[test]
    fn modification_and_rendering() {
        let pv = ParameterizedValue::new("multipart/mixed")
            .with_parameter("boundary", "simple")
            .with_parameter("note", "two words")
            .with_parameter("name", "caf\u{e9}");
        assert_eq!(
            "multipart/mixed; boundary=simple; note=\"two words\"; \
             name*=utf-8''caf%C3%A9",
            pv.to_string()
        );

        let pv = pv
            .with_parameter("BOUNDARY", "other")
            .without_parameter("note")
            .with_value("multipart/alternative");
        assert_eq!(
            "multipart/alternative; boundary=other; name*=utf-8''caf%C3%A9",
            pv.to_string()
        );

        assert_eq!(pv, parse(&pv.to_string()));
    }
}
