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

//! The address model used by `From`, `To` and friends.

use std::fmt;
use std::mem;

use log::debug;

use super::charset::CharsetResolver;
use super::encoded_word;
use super::syntax::{self, RawAddress, RawMailbox};
use crate::support::error::Error;

/// A single mailbox, e.g. `"John Smith" <jsmith@example.com> (work)`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mailbox {
    pub display_name: Option<String>,
    pub address: String,
    /// A trailing comment. Only the lenient parser retains these.
    pub comment: Option<String>,
}

/// A named group of mailboxes, e.g. `Friends: a@b.com, c@d.com;`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub members: Vec<Mailbox>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Address {
    Mailbox(Mailbox),
    Group(Group),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddressList(pub Vec<Address>);

/// Anything which can be stored in an address field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddressValue {
    Mailbox(Mailbox),
    Address(Address),
    List(AddressList),
    /// Text to be parsed as an address list.
    Text(String),
}

impl Mailbox {
    pub fn new(address: impl Into<String>) -> Self {
        Mailbox {
            display_name: None,
            address: address.into(),
            comment: None,
        }
    }

    pub fn with_name(
        display_name: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Mailbox {
            display_name: Some(display_name.into()),
            address: address.into(),
            comment: None,
        }
    }

    fn from_raw(raw: RawMailbox, resolver: &dyn CharsetResolver) -> Self {
        let display_name = if raw.name.is_empty() {
            None
        } else {
            Some(decode_phrase(&raw.name, resolver))
        };

        let local = raw
            .local
            .iter()
            .map(|word| {
                let word = String::from_utf8_lossy(word);
                if word.bytes().all(is_atext) {
                    word.into_owned()
                } else {
                    quote(&word)
                }
            })
            .collect::<Vec<_>>()
            .join(".");
        let domain = raw
            .domain
            .iter()
            .map(|part| String::from_utf8_lossy(part).into_owned())
            .collect::<Vec<_>>()
            .join(".");

        Mailbox {
            display_name,
            address: format!("{}@{}", local, domain),
            comment: None,
        }
    }
}

impl Group {
    pub fn new(name: impl Into<String>, members: Vec<Mailbox>) -> Self {
        Group {
            name: name.into(),
            members,
        }
    }
}

impl AddressList {
    /// Parses the body of an address field.
    ///
    /// The RFC 5322 grammar is tried first. If the text does not conform, a
    /// lenient comma-separated interpretation is used instead, which never
    /// fails.
    pub fn parse(text: &[u8], resolver: &dyn CharsetResolver) -> Self {
        if let Some(raw) = syntax::parse_address_list(text) {
            return AddressList(
                raw.into_iter()
                    .map(|a| match a {
                        RawAddress::Mailbox(m) => {
                            Address::Mailbox(Mailbox::from_raw(m, resolver))
                        },
                        RawAddress::Group(g) => Address::Group(Group {
                            name: decode_phrase(&g.name, resolver),
                            members: g
                                .boxes
                                .into_iter()
                                .map(|m| Mailbox::from_raw(m, resolver))
                                .collect(),
                        }),
                    })
                    .collect(),
            );
        }

        let text = String::from_utf8_lossy(text);
        debug!("Falling back to lenient address parsing for {:?}", text);
        AddressList(
            split_top_level(&text)
                .into_iter()
                .filter_map(|item| parse_lenient_mailbox(item, resolver))
                .map(Address::Mailbox)
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// All mailboxes in the list, with groups flattened.
    pub fn mailboxes(&self) -> Vec<&Mailbox> {
        let mut out = Vec::new();
        for address in &self.0 {
            match *address {
                Address::Mailbox(ref m) => out.push(m),
                Address::Group(ref g) => out.extend(g.members.iter()),
            }
        }
        out
    }
}

impl AddressValue {
    pub(crate) fn into_list(
        self,
        resolver: &dyn CharsetResolver,
    ) -> AddressList {
        match self {
            AddressValue::Mailbox(m) => AddressList(vec![Address::Mailbox(m)]),
            AddressValue::Address(a) => AddressList(vec![a]),
            AddressValue::List(l) => l,
            AddressValue::Text(t) => {
                AddressList::parse(t.as_bytes(), resolver)
            },
        }
    }
}

impl From<Mailbox> for AddressValue {
    fn from(m: Mailbox) -> Self {
        AddressValue::Mailbox(m)
    }
}

impl From<Address> for AddressValue {
    fn from(a: Address) -> Self {
        AddressValue::Address(a)
    }
}

impl From<Group> for AddressValue {
    fn from(g: Group) -> Self {
        AddressValue::Address(Address::Group(g))
    }
}

impl From<AddressList> for AddressValue {
    fn from(l: AddressList) -> Self {
        AddressValue::List(l)
    }
}

impl From<Vec<Mailbox>> for AddressValue {
    fn from(l: Vec<Mailbox>) -> Self {
        AddressValue::List(AddressList(
            l.into_iter().map(Address::Mailbox).collect(),
        ))
    }
}

impl From<String> for AddressValue {
    fn from(s: String) -> Self {
        AddressValue::Text(s)
    }
}

impl<'a> From<&'a str> for AddressValue {
    fn from(s: &'a str) -> Self {
        AddressValue::Text(s.to_owned())
    }
}

fn decode_phrase(
    words: &[Vec<u8>],
    resolver: &dyn CharsetResolver,
) -> String {
    let mut joined = String::new();
    for word in words {
        // Obsolete-syntax dots are separate words, but belong to the
        // preceding word for display purposes
        if b"." != &word[..] && !joined.is_empty() {
            joined.push(' ');
        }
        joined.push_str(&String::from_utf8_lossy(word));
    }
    encoded_word::decode_words(&joined, resolver).unwrap_or(joined)
}

fn is_atext(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-/=?^_`{|}~".contains(&b)
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if '"' == c || '\\' == c {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Renders a display name or group name so that it parses back to itself.
fn render_phrase(name: &str) -> String {
    if encoded_word::needs_encoding(name.as_bytes()) {
        encoded_word::encode_word(name)
    } else if !name.is_empty()
        && name.split(' ').all(|w| !w.is_empty() && w.bytes().all(is_atext))
        && !name.contains("=?")
    {
        name.to_owned()
    } else {
        quote(name)
    }
}

// Splits `text` on commas which are not inside quotes or comments.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0u32;
    let mut in_quote = false;
    let mut escaped = false;
    let mut start = 0;

    for (ix, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }

        match c {
            '\\' if in_quote || depth > 0 => escaped = true,
            '"' if 0 == depth => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote && depth > 0 => depth -= 1,
            ',' if !in_quote && 0 == depth => {
                out.push(&text[start..ix]);
                start = ix + 1;
            },
            _ => (),
        }
    }

    out.push(&text[start..]);
    out
}

// Removes (possibly nested) comments from `text`, returning the remaining
// text and the content of the comments.
fn extract_comments(text: &str) -> (String, Option<String>) {
    let mut rest = String::with_capacity(text.len());
    let mut comments: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut depth = 0u32;
    let mut in_quote = false;
    let mut escaped = false;

    for c in text.chars() {
        if escaped {
            escaped = false;
            if depth > 0 {
                current.push(c);
            } else {
                rest.push(c);
            }
            continue;
        }

        match c {
            '\\' if in_quote || depth > 0 => {
                escaped = true;
                if 0 == depth {
                    rest.push(c);
                }
            },
            '"' if 0 == depth => {
                in_quote = !in_quote;
                rest.push(c);
            },
            '(' if !in_quote => {
                if depth > 0 {
                    current.push(c);
                }
                depth += 1;
            },
            ')' if !in_quote && depth > 0 => {
                depth -= 1;
                if 0 == depth {
                    comments.push(mem::replace(&mut current, String::new()));
                } else {
                    current.push(c);
                }
            },
            c if depth > 0 => current.push(c),
            c => rest.push(c),
        }
    }

    // An unclosed comment runs to the end of the text
    if depth > 0 {
        comments.push(current);
    }

    let comment = if comments.is_empty() {
        None
    } else {
        Some(comments.join(" "))
    };
    (rest, comment)
}

fn unquote(s: &str) -> String {
    let s = s.trim();
    let s = if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    };

    let mut out = String::with_capacity(s.len());
    let mut escaped = false;
    for c in s.chars() {
        if !escaped && '\\' == c {
            escaped = true;
        } else {
            out.push(c);
            escaped = false;
        }
    }
    out
}

fn parse_lenient_mailbox(
    item: &str,
    resolver: &dyn CharsetResolver,
) -> Option<Mailbox> {
    let (rest, comment) = extract_comments(item);
    let rest = rest.replace(|c: char| '\r' == c || '\n' == c, "");
    let rest = rest.trim();
    if rest.is_empty() && comment.is_none() {
        return None;
    }

    let decode = |s: String| -> String {
        encoded_word::decode_words(&s, resolver).unwrap_or(s)
    };

    let (name, address) = if let (Some(open), Some(close)) =
        (rest.rfind('<'), rest.rfind('>'))
    {
        if open < close {
            (
                unquote(&rest[..open]),
                rest[open + 1..close].trim().to_owned(),
            )
        } else {
            (String::new(), rest.to_owned())
        }
    } else {
        let mut words: Vec<&str> = rest.split_whitespace().collect();
        let address = words.pop().unwrap_or("").to_owned();
        (unquote(&words.join(" ")), address)
    };

    let display_name = if name.is_empty() {
        None
    } else {
        Some(decode(name))
    };

    Some(Mailbox {
        display_name,
        address,
        comment,
    })
}

/// Fails with `WrongAddressType` unless `list` is exactly one mailbox.
pub(crate) fn single_mailbox(list: AddressList) -> Result<Mailbox, Error> {
    let mut addresses = list.0;
    match (addresses.pop(), addresses.is_empty()) {
        (Some(Address::Mailbox(m)), true) => Ok(m),
        _ => Err(Error::WrongAddressType),
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.display_name {
            Some(ref name) if !name.is_empty() => {
                write!(f, "{} <{}>", render_phrase(name), self.address)?
            },
            _ => f.write_str(&self.address)?,
        }

        if let Some(ref comment) = self.comment {
            write!(f, " (")?;
            for c in comment.chars() {
                if '(' == c || ')' == c || '\\' == c {
                    write!(f, "\\")?;
                }
                write!(f, "{}", c)?;
            }
            write!(f, ")")?;
        }

        Ok(())
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:", render_phrase(&self.name))?;
        for (ix, member) in self.members.iter().enumerate() {
            if ix > 0 {
                write!(f, ",")?;
            }
            write!(f, " {}", member)?;
        }
        write!(f, ";")
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Address::Mailbox(ref m) => fmt::Display::fmt(m, f),
            Address::Group(ref g) => fmt::Display::fmt(g, f),
        }
    }
}

impl fmt::Display for AddressList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (ix, address) in self.0.iter().enumerate() {
            if ix > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", address)?;
        }
        Ok(())
    }
}
