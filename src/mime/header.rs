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
use std::io::{self, Write};
use std::sync::Arc;

use chrono::prelude::*;

use super::address::{self, AddressList, AddressValue, Mailbox};
use super::charset::{CharsetResolver, DefaultCharsets};
use super::content_encoding::TransferEncoding;
use super::encoded_word;
use super::field::{self, Field};
use super::fold::FoldEncoding;
use super::line_break::LineBreak;
use super::params::ParameterizedValue;
use crate::support::error::Error;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_DISPOSITION: &str = "Content-Disposition";
pub const CONTENT_TRANSFER_ENCODING: &str = "Content-Transfer-Encoding";

/// How a header block ended in the original message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderEnd {
    /// A blank line separated the header from the body. This is the normal
    /// case and the default for new headers.
    Separated,
    /// The input ended right after the line break of the last field.
    Terminated,
    /// The input ended in the middle of the last field.
    Unterminated,
}

impl Default for HeaderEnd {
    fn default() -> Self {
        HeaderEnd::Separated
    }
}

/// The header of a message or part: an ordered list of fields.
///
/// Field names are matched case-insensitively but written with their
/// original case. Fields which have not been modified are written back
/// byte-for-byte.
#[derive(Clone)]
pub struct Header {
    line_break: LineBreak,
    fold: FoldEncoding,
    bad_start: Option<Vec<u8>>,
    fields: Vec<Field>,
    end: HeaderEnd,
    resolver: Arc<dyn CharsetResolver>,
}

impl Default for Header {
    fn default() -> Self {
        Header::new(LineBreak::default())
    }
}

impl Header {
    /// Creates an empty header using the given line break.
    pub fn new(line_break: LineBreak) -> Self {
        Header {
            line_break,
            fold: FoldEncoding::default(),
            bad_start: None,
            fields: Vec::new(),
            end: HeaderEnd::default(),
            resolver: Arc::new(DefaultCharsets),
        }
    }

    /// Parses a header block as produced by the splitter.
    ///
    /// A header is always produced. Problems are reported as a
    /// `HeaderParse` error alongside it.
    pub(crate) fn parse(
        block: &[u8],
        line_break: LineBreak,
        separated: bool,
        resolver: Arc<dyn CharsetResolver>,
    ) -> (Self, Option<Error>) {
        let parsed = field::parse_fields(block, line_break);
        let end = if separated {
            HeaderEnd::Separated
        } else if parsed.terminated {
            HeaderEnd::Terminated
        } else {
            HeaderEnd::Unterminated
        };

        let error = parsed
            .bad_start
            .as_ref()
            .map(|bad| Error::HeaderParse(vec![Error::BadStart(bad.clone())]));

        (
            Header {
                line_break,
                fold: FoldEncoding::default(),
                bad_start: parsed.bad_start,
                fields: parsed.fields,
                end,
                resolver,
            },
            error,
        )
    }

    /// A header which writes nothing at all and has no blank line after
    /// it. Used for content that could not be parsed.
    pub(crate) fn passthrough(line_break: LineBreak) -> Self {
        Header {
            end: HeaderEnd::Unterminated,
            ..Header::new(line_break)
        }
    }

    pub fn line_break(&self) -> LineBreak {
        self.line_break
    }

    pub fn set_line_break(&mut self, line_break: LineBreak) {
        self.line_break = line_break;
    }

    pub fn fold_encoding(&self) -> &FoldEncoding {
        &self.fold
    }

    pub fn set_fold_encoding(&mut self, fold: FoldEncoding) {
        self.fold = fold;
    }

    pub fn end(&self) -> HeaderEnd {
        self.end
    }

    pub fn set_end(&mut self, end: HeaderEnd) {
        self.end = end;
    }

    /// The non-header bytes which preceded the first field, if any.
    pub fn bad_start(&self) -> Option<&[u8]> {
        self.bad_start.as_ref().map(|b| &b[..])
    }

    pub fn take_bad_start(&mut self) -> Option<Vec<u8>> {
        self.bad_start.take()
    }

    pub fn resolver(&self) -> &Arc<dyn CharsetResolver> {
        &self.resolver
    }

    /// Changes the charset resolver, discarding anything decoded with the
    /// old one.
    pub fn set_resolver(&mut self, resolver: Arc<dyn CharsetResolver>) {
        self.resolver = resolver;
        self.clear_cache();
    }

    pub fn clear_cache(&mut self) {
        for field in &mut self.fields {
            field.clear_cache();
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Result<&Field, Error> {
        self.fields
            .get(index)
            .ok_or(Error::IndexOutOfRange(index as isize))
    }

    pub fn field_mut(&mut self, index: usize) -> Result<&mut Field, Error> {
        self.fields
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange(index as isize))
    }

    /// The positions of all fields called `name`.
    pub fn indexes_named(&self, name: &str) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|&(_, f)| f.is_named(name))
            .map(|(ix, _)| ix)
            .collect()
    }

    /// The position of the only field called `name`.
    fn unique_index(&self, name: &str) -> Result<usize, Error> {
        let mut indexes = self.indexes_named(name).into_iter();
        match (indexes.next(), indexes.next()) {
            (None, _) => Err(Error::NoSuchField(name.to_owned())),
            (Some(ix), None) => Ok(ix),
            (Some(_), Some(_)) => Err(Error::ManyFields(name.to_owned())),
        }
    }

    /// The position of the `n`th field called `name`. Negative `n` counts
    /// from the end, so -1 is the last.
    fn nth_index(&self, name: &str, n: isize) -> Result<usize, Error> {
        let indexes = self.indexes_named(name);
        let ix = if n < 0 {
            indexes.len().checked_sub(n.unsigned_abs())
        } else {
            Some(n as usize)
        };

        ix.and_then(|ix| indexes.get(ix).copied())
            .ok_or_else(|| Error::NoSuchField(name.to_owned()))
    }

    /// The decoded value of the first field called `name`.
    pub fn get(&self, name: &str) -> Result<String, Error> {
        self.get_n(name, 0)
    }

    /// The decoded value of the only field called `name`.
    ///
    /// Fails with `ManyFields` if the field occurs more than once.
    pub fn get_unique(&self, name: &str) -> Result<String, Error> {
        let ix = self.unique_index(name)?;
        self.fields[ix].text(&*self.resolver)
    }

    /// The decoded value of the `n`th field called `name`, with negative
    /// `n` counting from the end.
    pub fn get_n(&self, name: &str, n: isize) -> Result<String, Error> {
        let ix = self.nth_index(name, n)?;
        self.fields[ix].text(&*self.resolver)
    }

    /// The decoded values of every field called `name`, in order.
    ///
    /// Fails with `NoSuchField` if there are none.
    pub fn get_all(&self, name: &str) -> Result<Vec<String>, Error> {
        let indexes = self.indexes_named(name);
        if indexes.is_empty() {
            return Err(Error::NoSuchField(name.to_owned()));
        }

        indexes
            .into_iter()
            .map(|ix| self.fields[ix].text(&*self.resolver))
            .collect()
    }

    /// Whether any field is called `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.is_named(name))
    }

    /// Sets the value of the field called `name`.
    ///
    /// If there is more than one such field, all but the first are deleted.
    /// If there are none, the field is appended.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), Error> {
        let ix = self.set_index(name)?;
        self.fields[ix].set_body(value);
        Ok(())
    }

    /// Finds the field `set()` would modify, creating an empty one if
    /// needed.
    fn set_index(&mut self, name: &str) -> Result<usize, Error> {
        match self.collapse(name) {
            Some(first) => Ok(first),
            None => {
                self.fields.push(Field::new(name, "")?);
                Ok(self.fields.len() - 1)
            },
        }
    }

    /// Deletes all but the first field called `name`, returning the
    /// position of that one.
    fn collapse(&mut self, name: &str) -> Option<usize> {
        let indexes = self.indexes_named(name);
        for &ix in indexes.iter().skip(1).rev() {
            self.fields.remove(ix);
        }
        indexes.first().copied()
    }

    /// Adds a field at the end, regardless of what is already present.
    pub fn append(&mut self, name: &str, value: &str) -> Result<(), Error> {
        self.fields.push(Field::new(name, value)?);
        Ok(())
    }

    /// Inserts a new field so that it ends up at position `index`.
    ///
    /// `index` may be equal to `len()`, which appends.
    pub fn insert_before(
        &mut self,
        index: usize,
        name: &str,
        value: &str,
    ) -> Result<(), Error> {
        if index > self.fields.len() {
            return Err(Error::IndexOutOfRange(index as isize));
        }

        self.fields.insert(index, Field::new(name, value)?);
        Ok(())
    }

    /// Removes the field at `index`, returning it.
    pub fn remove(&mut self, index: usize) -> Result<Field, Error> {
        if index >= self.fields.len() {
            return Err(Error::IndexOutOfRange(index as isize));
        }

        Ok(self.fields.remove(index))
    }

    /// Deletes the only field called `name`.
    pub fn delete_field(&mut self, name: &str) -> Result<(), Error> {
        let ix = self.unique_index(name)?;
        self.fields.remove(ix);
        Ok(())
    }

    /// Deletes the `n`th field called `name`, with negative `n` counting
    /// from the end.
    pub fn delete_n(&mut self, name: &str, n: isize) -> Result<(), Error> {
        let ix = self.nth_index(name, n)?;
        self.fields.remove(ix);
        Ok(())
    }

    /// Deletes every field called `name`, returning how many there were.
    pub fn delete_all(&mut self, name: &str) -> usize {
        let before = self.fields.len();
        self.fields.retain(|f| !f.is_named(name));
        before - self.fields.len()
    }

    /// Renames every field called `from` to `to`, returning how many were
    /// renamed.
    pub fn rename_field(
        &mut self,
        from: &str,
        to: &str,
    ) -> Result<usize, Error> {
        field::check_name(to)?;

        let mut count = 0;
        for field in &mut self.fields {
            if field.is_named(from) {
                field.set_name(to)?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// The parsed `Date` field.
    pub fn date(&mut self) -> Result<DateTime<FixedOffset>, Error> {
        let ix = self.unique_index("Date")?;
        self.fields[ix].time()
    }

    pub fn set_date(
        &mut self,
        date: &DateTime<FixedOffset>,
    ) -> Result<(), Error> {
        self.set("Date", &field::format_date(date))
    }

    /// Parses the only field called `name` as a time.
    pub fn time(
        &mut self,
        name: &str,
    ) -> Result<DateTime<FixedOffset>, Error> {
        let ix = self.unique_index(name)?;
        self.fields[ix].time()
    }

    /// Parses the only field called `name` as an address list.
    pub fn address_list(&mut self, name: &str) -> Result<AddressList, Error> {
        let ix = self.unique_index(name)?;
        let resolver = &*self.resolver;
        Ok(self.fields[ix].addresses(resolver).clone())
    }

    /// Sets `name` to an address list.
    pub fn set_address_list(
        &mut self,
        name: &str,
        value: impl Into<AddressValue>,
    ) -> Result<(), Error> {
        let list = value.into().into_list(&*self.resolver);
        self.set(name, &list.to_string())
    }

    pub fn from(&mut self) -> Result<AddressList, Error> {
        self.address_list("From")
    }

    pub fn set_from(
        &mut self,
        value: impl Into<AddressValue>,
    ) -> Result<(), Error> {
        self.set_address_list("From", value)
    }

    pub fn to(&mut self) -> Result<AddressList, Error> {
        self.address_list("To")
    }

    pub fn set_to(
        &mut self,
        value: impl Into<AddressValue>,
    ) -> Result<(), Error> {
        self.set_address_list("To", value)
    }

    pub fn cc(&mut self) -> Result<AddressList, Error> {
        self.address_list("Cc")
    }

    pub fn set_cc(
        &mut self,
        value: impl Into<AddressValue>,
    ) -> Result<(), Error> {
        self.set_address_list("Cc", value)
    }

    pub fn bcc(&mut self) -> Result<AddressList, Error> {
        self.address_list("Bcc")
    }

    pub fn set_bcc(
        &mut self,
        value: impl Into<AddressValue>,
    ) -> Result<(), Error> {
        self.set_address_list("Bcc", value)
    }

    pub fn reply_to(&mut self) -> Result<AddressList, Error> {
        self.address_list("Reply-To")
    }

    pub fn set_reply_to(
        &mut self,
        value: impl Into<AddressValue>,
    ) -> Result<(), Error> {
        self.set_address_list("Reply-To", value)
    }

    pub fn delivered_to(&mut self) -> Result<AddressList, Error> {
        self.address_list("Delivered-To")
    }

    pub fn set_delivered_to(
        &mut self,
        value: impl Into<AddressValue>,
    ) -> Result<(), Error> {
        self.set_address_list("Delivered-To", value)
    }

    /// The `Sender` field, which must be a single mailbox.
    pub fn sender(&mut self) -> Result<Mailbox, Error> {
        address::single_mailbox(self.address_list("Sender")?)
    }

    /// Sets the `Sender` field. Groups and lists of more than one address
    /// are rejected with `WrongAddressType`.
    pub fn set_sender(
        &mut self,
        value: impl Into<AddressValue>,
    ) -> Result<(), Error> {
        let mailbox =
            address::single_mailbox(value.into().into_list(&*self.resolver))?;
        self.set("Sender", &mailbox.to_string())
    }

    fn params(&mut self, name: &str) -> Result<ParameterizedValue, Error> {
        let ix = self.unique_index(name)?;
        let resolver = &*self.resolver;
        self.fields[ix].params(resolver).map(Clone::clone)
    }

    fn param(&mut self, name: &str, param: &str) -> Result<String, Error> {
        self.params(name)?
            .get(param)
            .map(str::to_owned)
            .ok_or_else(|| {
                Error::NoSuchFieldParameter(name.to_owned(), param.to_owned())
            })
    }

    /// Sets a parameterised field's primary value.
    ///
    /// If the value changes, the parameters named by `dependent` are
    /// removed since they would no longer make sense.
    fn set_primary_value(
        &mut self,
        name: &str,
        value: &str,
        dependent: &[&str],
    ) -> Result<(), Error> {
        self.collapse(name);
        let existing = match self.params(name) {
            Ok(existing) => Some(existing),
            Err(Error::NoSuchField(_)) | Err(Error::BadMediaType(_)) => None,
            Err(e) => return Err(e),
        };

        let updated = match existing {
            Some(existing) if existing.value().eq_ignore_ascii_case(value) => {
                existing.with_value(value)
            },
            Some(existing) => dependent
                .iter()
                .fold(existing, |pv, p| pv.without_parameter(p))
                .with_value(value),
            None => ParameterizedValue::new(value),
        };

        self.set(name, &updated.to_string())
    }

    /// Sets one parameter of an existing parameterised field.
    fn set_param(
        &mut self,
        name: &str,
        param: &str,
        value: &str,
    ) -> Result<(), Error> {
        self.collapse(name);
        let updated = self.params(name)?.with_parameter(param, value);
        self.set(name, &updated.to_string())
    }

    /// The full parsed `Content-Type`.
    pub fn content_type(&mut self) -> Result<ParameterizedValue, Error> {
        self.params(CONTENT_TYPE)
    }

    pub fn set_content_type(
        &mut self,
        value: &ParameterizedValue,
    ) -> Result<(), Error> {
        self.set(CONTENT_TYPE, &value.to_string())
    }

    /// The media type, e.g. `text/plain`, in lower case.
    pub fn media_type(&mut self) -> Result<String, Error> {
        Ok(self.content_type()?.value().to_ascii_lowercase())
    }

    /// Sets the media type.
    ///
    /// `charset` and `boundary` are dropped if the media type changes.
    pub fn set_media_type(&mut self, media_type: &str) -> Result<(), Error> {
        self.set_primary_value(
            CONTENT_TYPE,
            media_type,
            &["charset", "boundary"],
        )
    }

    pub fn charset(&mut self) -> Result<String, Error> {
        self.param(CONTENT_TYPE, "charset")
    }

    /// Sets the `charset` parameter. `Content-Type` must already exist.
    pub fn set_charset(&mut self, charset: &str) -> Result<(), Error> {
        self.set_param(CONTENT_TYPE, "charset", charset)
    }

    pub fn boundary(&mut self) -> Result<String, Error> {
        self.param(CONTENT_TYPE, "boundary")
    }

    /// Sets the `boundary` parameter. `Content-Type` must already exist.
    pub fn set_boundary(&mut self, boundary: &str) -> Result<(), Error> {
        self.set_param(CONTENT_TYPE, "boundary", boundary)
    }

    /// The full parsed `Content-Disposition`.
    pub fn content_disposition(
        &mut self,
    ) -> Result<ParameterizedValue, Error> {
        self.params(CONTENT_DISPOSITION)
    }

    pub fn set_content_disposition(
        &mut self,
        value: &ParameterizedValue,
    ) -> Result<(), Error> {
        self.set(CONTENT_DISPOSITION, &value.to_string())
    }

    /// The disposition, e.g. `inline` or `attachment`, in lower case.
    pub fn presentation(&mut self) -> Result<String, Error> {
        Ok(self.content_disposition()?.value().to_ascii_lowercase())
    }

    /// Sets the disposition. `filename` is dropped if it changes.
    pub fn set_presentation(
        &mut self,
        presentation: &str,
    ) -> Result<(), Error> {
        self.set_primary_value(
            CONTENT_DISPOSITION,
            presentation,
            &["filename"],
        )
    }

    /// The `filename` parameter of `Content-Disposition`.
    ///
    /// Encoded words are decoded even though they are not permitted here,
    /// since many agents use them anyway.
    pub fn filename(&mut self) -> Result<String, Error> {
        let raw = self.param(CONTENT_DISPOSITION, "filename")?;
        Ok(encoded_word::decode_words(&raw, &*self.resolver).unwrap_or(raw))
    }

    /// Sets the `filename` parameter. `Content-Disposition` must already
    /// exist.
    pub fn set_filename(&mut self, filename: &str) -> Result<(), Error> {
        self.set_param(CONTENT_DISPOSITION, "filename", filename)
    }

    pub fn subject(&self) -> Result<String, Error> {
        self.get_unique("Subject")
    }

    pub fn set_subject(&mut self, subject: &str) -> Result<(), Error> {
        self.set("Subject", subject)
    }

    /// The comma-separated `Keywords` field.
    pub fn keywords(&mut self) -> Result<Vec<String>, Error> {
        let ix = self.unique_index("Keywords")?;
        let resolver = &*self.resolver;
        self.fields[ix].keywords(resolver).map(<[String]>::to_vec)
    }

    pub fn set_keywords<S: AsRef<str>>(
        &mut self,
        keywords: &[S],
    ) -> Result<(), Error> {
        let joined = keywords
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
            .join(", ");
        self.set("Keywords", &joined)
    }

    /// The `Message-ID`, without angle brackets.
    pub fn message_id(&self) -> Result<String, Error> {
        let value = self.get_unique("Message-ID")?;
        Ok(message_ids(&value)
            .into_iter()
            .next()
            .unwrap_or_else(|| value.trim().to_owned()))
    }

    /// Sets the `Message-ID`. Angle brackets are added.
    pub fn set_message_id(&mut self, id: &str) -> Result<(), Error> {
        self.set(
            "Message-ID",
            &format!("<{}>", id.trim_start_matches('<').trim_end_matches('>')),
        )
    }

    /// The message IDs in `In-Reply-To`, without angle brackets.
    pub fn in_reply_to(&self) -> Result<Vec<String>, Error> {
        Ok(message_ids(&self.get("In-Reply-To")?))
    }

    /// The message IDs in `References`, without angle brackets.
    pub fn references(&self) -> Result<Vec<String>, Error> {
        Ok(message_ids(&self.get("References")?))
    }

    /// The `Content-Transfer-Encoding`. Absent and unknown encodings are
    /// both reported as `7bit`.
    pub fn transfer_encoding(&self) -> TransferEncoding {
        TransferEncoding::for_codec(
            self.get(CONTENT_TRANSFER_ENCODING).ok().as_deref(),
        )
    }

    pub fn set_transfer_encoding(
        &mut self,
        encoding: TransferEncoding,
    ) -> Result<(), Error> {
        self.set(CONTENT_TRANSFER_ENCODING, encoding.as_str())
    }

    pub fn mime_version(&self) -> Result<String, Error> {
        self.get_unique("MIME-Version")
    }

    /// Writes the header, including the blank line after it if the header
    /// has one.
    pub fn write_to(&self, w: &mut dyn Write) -> io::Result<u64> {
        let lb = self.line_break.as_bytes();
        let mut written = 0u64;
        let mut emit = |data: &[u8]| -> io::Result<()> {
            w.write_all(data)?;
            written += data.len() as u64;
            Ok(())
        };

        if let Some(ref bad_start) = self.bad_start {
            emit(bad_start)?;
            if !self.fields.is_empty() && !bad_start.ends_with(lb) {
                emit(lb)?;
            }
        }

        for (ix, field) in self.fields.iter().enumerate() {
            emit(&field.render(self.line_break, &self.fold))?;
            if HeaderEnd::Unterminated != self.end
                || ix + 1 != self.fields.len()
            {
                emit(lb)?;
            }
        }

        if HeaderEnd::Separated == self.end {
            emit(lb)?;
        }

        Ok(written)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        // Writing to a Vec cannot fail
        let _ = self.write_to(&mut out);
        out
    }
}

/// Extracts every `<...>` token from `value`, without the brackets.
fn message_ids(value: &str) -> Vec<String> {
    value
        .split('<')
        .skip(1)
        .filter_map(|s| s.split('>').next())
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect()
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Header")
            .field("line_break", &self.line_break)
            .field("fold", &self.fold)
            .field("bad_start", &self.bad_start.as_ref().map(|b| b.len()))
            .field("fields", &self.fields)
            .field("end", &self.end)
            .field("resolver", &self.resolver)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mime::address::{Address, Group};
    use crate::mime::charset::ExtendedCharsets;

    fn parse(block: &str) -> Header {
        let (header, error) = Header::parse(
            block.as_bytes(),
            LineBreak::Lf,
            true,
            Arc::new(DefaultCharsets),
        );
        assert!(error.is_none(), "unexpected error: {:?}", error);
        header
    }

    fn text(header: &Header) -> String {
        String::from_utf8(header.to_bytes()).unwrap()
    }

    #[test]
    fn repeated_fields() {
        let h = parse("Foo: 1\nFoo: 2\nFoo: 3\nBar: 3\nBaz: 1\n");
        assert_eq!("1", h.get("foo").unwrap());
        assert_matches!(Err(Error::ManyFields(_)), h.get_unique("foo"));
        assert_eq!("3", h.get_unique("bar").unwrap());
        assert_eq!(
            vec!["1".to_owned(), "2".to_owned(), "3".to_owned()],
            h.get_all("Foo").unwrap()
        );
        assert_eq!("1", h.get_n("foo", 0).unwrap());
        assert_eq!("3", h.get_n("foo", -1).unwrap());
        assert_eq!("1", h.get_n("foo", -3).unwrap());
        assert_matches!(Err(Error::NoSuchField(_)), h.get_n("foo", 3));
        assert_matches!(Err(Error::NoSuchField(_)), h.get_n("foo", -4));
        assert_matches!(Err(Error::NoSuchField(_)), h.get_all("quux"));
        assert_eq!("3", h.get("BAR").unwrap());
        assert_eq!(vec![0, 1, 2], h.indexes_named("FOO"));
    }

    #[test]
    fn case_insensitive_access() {
        let h = parse("Content-Type: text/plain\n");
        assert_eq!("text/plain", h.get("content-type").unwrap());
        assert_eq!("text/plain", h.get("Content-Type").unwrap());
        assert_eq!("text/plain", h.get("CONTENT-TYPE").unwrap());
    }

    #[test]
    fn set_collapses_duplicates() {
        let mut h = parse("Foo: 1\nBar: x\nFoo: 2\nFoo: 3\n");
        h.set("foo", "new").unwrap();
        assert_eq!("Foo: new\nBar: x\n\n", text(&h));

        h.set("Baz", "appended").unwrap();
        assert_eq!("Foo: new\nBar: x\nBaz: appended\n\n", text(&h));
    }

    #[test]
    fn positional_edits() {
        let mut h = parse("A: 1\nB: 2\nA: 3\n");
        h.insert_before(1, "X", "x").unwrap();
        h.insert_before(4, "Y", "y").unwrap();
        assert_matches!(
            Err(Error::IndexOutOfRange(9)),
            h.insert_before(9, "Z", "z")
        );
        assert_eq!("A: 1\nX: x\nB: 2\nA: 3\nY: y\n\n", text(&h));

        h.delete_n("a", -1).unwrap();
        assert_matches!(Err(Error::NoSuchField(_)), h.delete_field("Q"));
        h.delete_field("x").unwrap();
        assert_eq!(1, h.delete_all("y"));
        assert_eq!(0, h.delete_all("y"));
        assert_eq!(1, h.rename_field("b", "Bee").unwrap());
        assert_eq!("A: 1\nBee: 2\n\n", text(&h));
        assert_matches!(
            Err(Error::BadFieldName(_)),
            h.rename_field("a", "bad name")
        );
        assert_matches!(Err(Error::IndexOutOfRange(5)), h.remove(5));
    }

    #[test]
    fn unmodified_fields_round_trip() {
        let block = "Received: from a\n\tby b;\n  Fri, 1 Jan 2021\nX:y\n";
        let h = parse(block);
        assert_eq!(format!("{}\n", block), text(&h));
    }

    #[test]
    fn header_ends() {
        let (mut h, _) = Header::parse(
            b"A: 1\r\nB: 2",
            LineBreak::Crlf,
            false,
            Arc::new(DefaultCharsets),
        );
        assert_eq!(HeaderEnd::Unterminated, h.end());
        assert_eq!(b"A: 1\r\nB: 2".to_vec(), h.to_bytes());

        h.set_end(HeaderEnd::Terminated);
        assert_eq!(b"A: 1\r\nB: 2\r\n".to_vec(), h.to_bytes());

        let (h, error) = Header::parse(
            b"junk\r\nA: 1\r\n",
            LineBreak::Crlf,
            false,
            Arc::new(DefaultCharsets),
        );
        assert_eq!(HeaderEnd::Terminated, h.end());
        assert_eq!(Some(&b"junk\r\n"[..]), h.bad_start());
        match error {
            Some(Error::HeaderParse(errors)) => {
                assert_matches!(&Error::BadStart(_), &errors[0]);
            },
            e => panic!("unexpected error: {:?}", e),
        }
        assert_eq!(b"junk\r\nA: 1\r\n".to_vec(), h.to_bytes());
    }

    #[test]
    fn new_header_uses_crlf() {
        let mut h = Header::default();
        h.set_subject("hello").unwrap();
        h.set("X-Long", &"word ".repeat(30)).unwrap();
        let bytes = h.to_bytes();
        assert!(bytes.starts_with(b"Subject: hello\r\nX-Long: word"));
        assert!(bytes.ends_with(b"\r\n\r\n"));
        for line in bytes.split(|&b| b'\n' == b) {
            assert!(line.len() <= 80);
        }
    }

    #[test]
    fn encoded_words() {
        let mut h = parse("Subject: =?iso-8859-1?q?caf=E9?= time\n");
        assert_eq!("caf\u{e9} time", h.subject().unwrap());

        h.set_subject("na\u{ef}ve").unwrap();
        assert_eq!("Subject: =?utf-8?b?bmHDr3Zl?=\n\n", text(&h));
        assert_eq!("na\u{ef}ve", h.subject().unwrap());

        let mut h = parse("Subject: =?koi8-r?b?8NLJ18XU?=\n");
        assert_matches!(Err(Error::UnknownCharset(_)), h.subject());
        h.set_resolver(Arc::new(ExtendedCharsets));
        assert_eq!(
            "\u{41f}\u{440}\u{438}\u{432}\u{435}\u{442}",
            h.subject().unwrap()
        );
    }

    #[test]
    fn dates() {
        let mut h = parse("Date: Fri, 21 Nov 1997 09:55:06 -0600\n");
        let date = h.date().unwrap();
        assert_eq!(1997, date.year());

        let later = date + chrono::Duration::days(1);
        h.set_date(&later).unwrap();
        assert_eq!("Sat, 22 Nov 1997 09:55:06 -0600", h.get("date").unwrap());
        assert_eq!(later, h.date().unwrap());
    }

    #[test]
    fn addresses() {
        let mut h = parse(
            "From: \"Smith, John\" <js@example.com>\n\
             To: a@b.c, Team: x@y.z;\n\
             Sender: a@b.c, d@e.f\n",
        );
        assert_eq!(
            Some("Smith, John".to_owned()),
            h.from().unwrap().mailboxes()[0].display_name
        );
        assert_eq!(2, h.to().unwrap().len());
        assert_matches!(Err(Error::WrongAddressType), h.sender());
        assert_matches!(Err(Error::NoSuchField(_)), h.cc());

        h.set_cc(Mailbox::with_name("Q", "q@r.s")).unwrap();
        assert_eq!("Q <q@r.s>", h.get("Cc").unwrap());
        h.set_cc("a@b.c, d@e.f").unwrap();
        assert_eq!(2, h.cc().unwrap().len());

        assert_matches!(
            Err(Error::WrongAddressType),
            h.set_sender(Address::Group(Group::new("G", vec![])))
        );
        assert_matches!(
            Err(Error::WrongAddressType),
            h.set_sender("a@b.c, d@e.f")
        );
        h.set_sender(Mailbox::new("s@t.u")).unwrap();
        assert_eq!(Mailbox::new("s@t.u"), h.sender().unwrap());
    }

    #[test]
    fn content_type_accessors() {
        let mut h = parse(
            "Content-Type: text/plain; charset=us-ascii; format=flowed\n",
        );
        assert_eq!("text/plain", h.media_type().unwrap());
        assert_eq!("us-ascii", h.charset().unwrap());
        assert_matches!(
            Err(Error::NoSuchFieldParameter(_, _)),
            h.boundary()
        );

        h.set_media_type("TEXT/PLAIN").unwrap();
        assert_eq!("us-ascii", h.charset().unwrap());

        h.set_charset("utf-8").unwrap();
        assert_eq!("utf-8", h.charset().unwrap());

        h.set_media_type("multipart/mixed").unwrap();
        assert_matches!(Err(Error::NoSuchFieldParameter(_, _)), h.charset());
        assert_eq!(
            "multipart/mixed; format=flowed",
            h.get("Content-Type").unwrap()
        );

        h.set_boundary("abc").unwrap();
        assert_eq!("abc", h.boundary().unwrap());

        let mut h = Header::default();
        assert_matches!(Err(Error::NoSuchField(_)), h.set_charset("utf-8"));
        assert_matches!(Err(Error::NoSuchField(_)), h.set_boundary("x"));
        h.set_media_type("text/html").unwrap();
        h.set_charset("utf-8").unwrap();
        assert_eq!(
            "text/html; charset=utf-8",
            h.get("content-type").unwrap()
        );
    }

    #[test]
    fn structured_sets_collapse_duplicates() {
        let mut h = parse(
            "Content-Type: text/plain\n\
             X: 1\n\
             Content-Type: text/html\n",
        );
        h.set_media_type("text/enriched").unwrap();
        assert_eq!(
            "Content-Type: text/enriched\nX: 1\n\n",
            text(&h)
        );

        let mut h = parse(
            "Content-Type: text/plain; charset=us-ascii\n\
             Content-Type: text/html\n",
        );
        h.set_charset("utf-8").unwrap();
        assert_eq!(vec![0], h.indexes_named("content-type"));
        assert_eq!("text/plain", h.media_type().unwrap());
        assert_eq!("utf-8", h.charset().unwrap());

        let mut h = parse(
            "Content-Disposition: inline\n\
             Content-Disposition: attachment\n",
        );
        h.set_filename("a.txt").unwrap();
        assert_eq!("inline", h.presentation().unwrap());
        assert_eq!("a.txt", h.filename().unwrap());
    }

    #[test]
    fn disposition_accessors() {
        let mut h = parse(
            "Content-Disposition: attachment;\n \
             filename=\"=?utf-8?q?r=C3=A9sum=C3=A9?=.pdf\"\n",
        );
        assert_eq!("attachment", h.presentation().unwrap());
        assert_eq!("r\u{e9}sum\u{e9}.pdf", h.filename().unwrap());

        h.set_presentation("inline").unwrap();
        assert_matches!(
            Err(Error::NoSuchFieldParameter(_, _)),
            h.filename()
        );

        let mut h = Header::default();
        assert_matches!(Err(Error::NoSuchField(_)), h.set_filename("x"));
        h.set_presentation("attachment").unwrap();
        h.set_filename("a b.txt").unwrap();
        assert_eq!("a b.txt", h.filename().unwrap());
        assert_eq!(
            "attachment; filename=\"a b.txt\"",
            h.get("Content-Disposition").unwrap()
        );
    }

    #[test]
    fn misc_accessors() {
        let mut h = parse(
            "Message-ID: <abc@example.com>\n\
             In-Reply-To: <x@y>\n\
             References: <a@b>\n <c@d> <x@y>\n\
             Keywords: foo, bar\n\
             MIME-Version: 1.0 (generated)\n\
             Content-Transfer-Encoding: Base64\n",
        );
        assert_eq!("abc@example.com", h.message_id().unwrap());
        assert_eq!(vec!["x@y".to_owned()], h.in_reply_to().unwrap());
        assert_eq!(3, h.references().unwrap().len());
        assert_eq!(
            vec!["foo".to_owned(), "bar".to_owned()],
            h.keywords().unwrap()
        );
        assert_eq!("1.0 (generated)", h.mime_version().unwrap());
        assert_eq!(TransferEncoding::Base64, h.transfer_encoding());

        h.set_message_id("new@example.com").unwrap();
        assert_eq!("<new@example.com>", h.get("message-id").unwrap());
        h.set_keywords(&["x", "y"]).unwrap();
        assert_eq!(vec!["x".to_owned(), "y".to_owned()], h.keywords().unwrap());
        h.set_transfer_encoding(TransferEncoding::QuotedPrintable)
            .unwrap();
        assert_eq!(TransferEncoding::QuotedPrintable, h.transfer_encoding());

        assert_eq!(
            TransferEncoding::SevenBit,
            Header::default().transfer_encoding()
        );
    }
}
