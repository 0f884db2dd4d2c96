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

//! RFC 5322 and RFC 2045 grammar for the structured header fields.
//!
//! Everything here is tolerant of the "obsolete" syntax RFC 5322 section 4
//! describes, since that is what real agents produce. Unfolding is handled by
//! simply treating line-ending characters as whitespace.

use chrono::prelude::*;
use nom::{
    branch::alt,
    bytes::complete::{is_a, is_not, tag_no_case, take_while1, take_while_m_n},
    character::complete::char,
    combinator::{all_consuming, map, opt},
    multi::{
        fold_many0, many0, many0_count, many1_count, separated_nonempty_list,
    },
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

/// A mailbox as the grammar sees it, before any decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawMailbox {
    /// The words of the display name. Each is an atom or the content of a
    /// quoted string.
    pub name: Vec<Vec<u8>>,
    pub local: Vec<Vec<u8>>,
    pub domain: Vec<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawGroup {
    pub name: Vec<Vec<u8>>,
    pub boxes: Vec<RawMailbox>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawAddress {
    Mailbox(RawMailbox),
    Group(RawGroup),
}

fn ascii_digit(b: u8) -> bool {
    b.is_ascii_digit()
}

// RFC 5322 3.2.1 "quoted-pair", including the 8-bit clean obsolete form.
fn quoted_pair(i: &[u8]) -> IResult<&[u8], &[u8]> {
    preceded(char('\\'), take_while_m_n(1, 1, |_| true))(i)
}

// RFC 5322 3.2.2 "Folding white space". Line endings are just whitespace
// here since the field has not been unfolded.
fn fws(i: &[u8]) -> IResult<&[u8], &[u8]> {
    is_a(" \t\r\n")(i)
}

// RFC 5322 3.2.2 "Comment text".
fn ctext(i: &[u8]) -> IResult<&[u8], &[u8]> {
    is_not("()\\ \t\r\n")(i)
}

// RFC 5322 3.2.2 "Comment content". FWS is folded in here rather than
// being part of the comment rule itself.
fn ccontent(i: &[u8]) -> IResult<&[u8], ()> {
    alt((
        map(ctext, |_| ()),
        map(quoted_pair, |_| ()),
        map(fws, |_| ()),
        comment,
    ))(i)
}

// RFC 5322 3.2.2 "Comment". Note it is recursive.
fn comment(i: &[u8]) -> IResult<&[u8], ()> {
    map(
        delimited(char('('), many0_count(ccontent), char(')')),
        |_| (),
    )(i)
}

// RFC 5322 3.2.2 "Comment or folding white space". This never fails.
fn cfws(i: &[u8]) -> IResult<&[u8], ()> {
    map(many0_count(alt((map(fws, |_| ()), comment))), |_| ())(i)
}

fn is_atext(ch: u8) -> bool {
    ch.is_ascii_alphanumeric()
        || b"!#$%&'*+-/=?^_`{|}~".contains(&ch)
        // RFC 6532 Unicode
        || ch >= 0x80
}

// RFC 5322 3.2.3 "Atom text"
fn atext(i: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(is_atext)(i)
}

// RFC 5322 3.2.3 "Atom"
fn atom(i: &[u8]) -> IResult<&[u8], &[u8]> {
    delimited(cfws, atext, cfws)(i)
}

// RFC 5322 3.2.4 "Quoted [string] text", amended by RFC 6532.
fn qtext(i: &[u8]) -> IResult<&[u8], &[u8]> {
    is_not(" \t\r\n\\\"")(i)
}

// RFC 5322 3.2.4 "Quoted [string] content". As with comments, the FWS is
// moved in here. It is kept verbatim and line endings are removed by the
// caller.
fn qcontent(i: &[u8]) -> IResult<&[u8], &[u8]> {
    alt((qtext, quoted_pair, fws))(i)
}

// RFC 5322 3.2.4 "Quoted string"
fn quoted_string(i: &[u8]) -> IResult<&[u8], Vec<u8>> {
    delimited(
        pair(cfws, char('"')),
        fold_many0(qcontent, Vec::new(), |mut acc: Vec<u8>, item: &[u8]| {
            acc.extend(
                item.iter().copied().filter(|&b| b'\r' != b && b'\n' != b),
            );
            acc
        }),
        pair(char('"'), cfws),
    )(i)
}

// RFC 5322 3.2.5 "word"
fn word(i: &[u8]) -> IResult<&[u8], Vec<u8>> {
    alt((map(atom, |a: &[u8]| a.to_vec()), quoted_string))(i)
}

// Part of the `obs-phrase` grammar: the unquoted '.' that many agents put in
// display names.
fn obs_dot(i: &[u8]) -> IResult<&[u8], Vec<u8>> {
    terminated(map(char('.'), |_| b".".to_vec()), cfws)(i)
}

// RFC 5322 3.2.5 "phrase", plus "obsolete phrase" syntax
fn phrase(i: &[u8]) -> IResult<&[u8], Vec<Vec<u8>>> {
    map(pair(word, many0(alt((word, obs_dot)))), |(head, mut tail)| {
        tail.insert(0, head);
        tail
    })(i)
}

// RFC 5322 3.4.1 local part. `obs-local-part` covers both other forms.
fn local_part(i: &[u8]) -> IResult<&[u8], Vec<Vec<u8>>> {
    separated_nonempty_list(char('.'), word)(i)
}

// RFC 5322 4.4 obsolete domain format, which encompasses dot-atom
fn obs_domain(i: &[u8]) -> IResult<&[u8], Vec<Vec<u8>>> {
    separated_nonempty_list(char('.'), map(atom, |a: &[u8]| a.to_vec()))(i)
}

// RFC 5322 3.4.1 domain name text, amended by RFC 6532
fn dtext(i: &[u8]) -> IResult<&[u8], &[u8]> {
    is_not("[]\\ \t\r\n")(i)
}

// RFC 5322 3.4.1 domain literal
fn domain_literal(i: &[u8]) -> IResult<&[u8], Vec<u8>> {
    map(
        delimited(
            pair(cfws, char('[')),
            fold_many0(
                alt((dtext, quoted_pair, fws)),
                vec![b'['],
                |mut acc: Vec<u8>, item: &[u8]| {
                    acc.extend_from_slice(item);
                    acc
                },
            ),
            pair(char(']'), cfws),
        ),
        |mut res| {
            res.push(b']');
            res
        },
    )(i)
}

// RFC 5322 3.4.1 domain
fn domain(i: &[u8]) -> IResult<&[u8], Vec<Vec<u8>>> {
    alt((obs_domain, map(domain_literal, |v| vec![v])))(i)
}

// RFC 5322 3.4.1 address specification
fn addr_spec(i: &[u8]) -> IResult<&[u8], (Vec<Vec<u8>>, Vec<Vec<u8>>)> {
    pair(local_part, preceded(char('@'), domain))(i)
}

// RFC 5322 4.4 obsolete routing information, which is discarded
fn obs_route(i: &[u8]) -> IResult<&[u8], ()> {
    map(
        tuple((
            many0_count(alt((map(char(','), |_| ()), map(fws, |_| ())))),
            char('@'),
            domain,
            many0_count(tuple((
                many1_count(tuple((cfws, char(','), cfws))),
                char('@'),
                domain,
            ))),
            char(':'),
        )),
        |_| (),
    )(i)
}

// RFC 5322 3.4 angle-delimited address, including obsolete routing
fn angle_addr(i: &[u8]) -> IResult<&[u8], (Vec<Vec<u8>>, Vec<Vec<u8>>)> {
    delimited(
        tuple((cfws, char('<'), opt(obs_route))),
        addr_spec,
        pair(char('>'), cfws),
    )(i)
}

// RFC 5322 3.4 mailbox
fn mailbox(i: &[u8]) -> IResult<&[u8], RawMailbox> {
    map(
        alt((
            pair(opt(phrase), angle_addr),
            map(addr_spec, |a| (None, a)),
        )),
        |(name, (local, domain))| RawMailbox {
            name: name.unwrap_or_default(),
            local,
            domain,
        },
    )(i)
}

// The obsolete list syntax allows empty list elements
fn list_delim(i: &[u8]) -> IResult<&[u8], ()> {
    map(many1_count(tuple((cfws, char(','), cfws))), |_| ())(i)
}

// RFC 5322 3.4 mailbox list, including obsolete syntax
fn mailbox_list(i: &[u8]) -> IResult<&[u8], Vec<RawMailbox>> {
    delimited(
        opt(list_delim),
        separated_nonempty_list(list_delim, mailbox),
        opt(list_delim),
    )(i)
}

// RFC 5322 3.4 group
fn group(i: &[u8]) -> IResult<&[u8], RawGroup> {
    map(
        pair(
            terminated(phrase, char(':')),
            terminated(opt(mailbox_list), tuple((cfws, char(';'), cfws))),
        ),
        |(name, boxes)| RawGroup {
            name,
            boxes: boxes.unwrap_or_default(),
        },
    )(i)
}

// RFC 5322 3.4 address
fn address(i: &[u8]) -> IResult<&[u8], RawAddress> {
    alt((
        map(mailbox, RawAddress::Mailbox),
        map(group, RawAddress::Group),
    ))(i)
}

// RFC 5322 3.4 address list, including obsolete syntax
fn address_list(i: &[u8]) -> IResult<&[u8], Vec<RawAddress>> {
    delimited(
        opt(list_delim),
        separated_nonempty_list(list_delim, address),
        pair(opt(list_delim), cfws),
    )(i)
}

/// Strictly parses an address list.
///
/// Returns `None` unless the whole of `value` conforms.
pub fn parse_address_list(value: &[u8]) -> Option<Vec<RawAddress>> {
    all_consuming(address_list)(value).ok().map(|(_, list)| list)
}

// RFC 5322 3.3 date/time syntax, including obsolete forms. The obsolete
// forms allow CFWS between all terms, so it is simply allowed everywhere.

fn two_digit(i: &[u8]) -> IResult<&[u8], u32> {
    map(take_while_m_n(1, 2, ascii_digit), |s: &[u8]| {
        s.iter().fold(0u32, |n, &d| n * 10 + u32::from(d - b'0'))
    })(i)
}

fn year(i: &[u8]) -> IResult<&[u8], i32> {
    map(take_while_m_n(2, 4, ascii_digit), |s: &[u8]| {
        let mut y = s
            .iter()
            .fold(0i32, |n, &d| n * 10 + i32::from(d - b'0'));
        // Y2K workarounds described by RFC 5322 4.3
        if s.len() == 2 && y < 50 {
            y += 2000;
        } else if s.len() < 4 {
            y += 1900;
        }
        y
    })(i)
}

fn month(i: &[u8]) -> IResult<&[u8], u32> {
    alt((
        map(tag_no_case("jan"), |_| 1),
        map(tag_no_case("feb"), |_| 2),
        map(tag_no_case("mar"), |_| 3),
        map(tag_no_case("apr"), |_| 4),
        map(tag_no_case("may"), |_| 5),
        map(tag_no_case("jun"), |_| 6),
        map(tag_no_case("jul"), |_| 7),
        map(tag_no_case("aug"), |_| 8),
        map(tag_no_case("sep"), |_| 9),
        map(tag_no_case("oct"), |_| 10),
        map(tag_no_case("nov"), |_| 11),
        map(tag_no_case("dec"), |_| 12),
    ))(i)
}

fn day_of_week(i: &[u8]) -> IResult<&[u8], ()> {
    map(
        tuple((
            cfws,
            take_while1(|b: u8| b.is_ascii_alphabetic()),
            cfws,
            char(','),
        )),
        |_| (),
    )(i)
}

fn date(i: &[u8]) -> IResult<&[u8], (i32, u32, u32)> {
    map(
        tuple((
            preceded(cfws, terminated(two_digit, cfws)),
            terminated(month, cfws),
            terminated(year, cfws),
        )),
        |(d, m, y)| (y, m, d),
    )(i)
}

fn time_of_day(i: &[u8]) -> IResult<&[u8], (u32, u32, u32)> {
    map(
        tuple((
            terminated(two_digit, tuple((cfws, char(':'), cfws))),
            two_digit,
            opt(preceded(tuple((cfws, char(':'), cfws)), two_digit)),
            cfws,
        )),
        |(h, m, s, _)| (h, m, s.unwrap_or(0)),
    )(i)
}

fn numeric_zone(i: &[u8]) -> IResult<&[u8], i32> {
    map(
        pair(alt((char('+'), char('-'))), take_while_m_n(4, 4, ascii_digit)),
        |(sign, s): (char, &[u8])| {
            let digit = |ix: usize| i32::from(s[ix] - b'0');
            let secs = (digit(0) * 10 + digit(1)) * 3600
                + (digit(2) * 10 + digit(3)) * 60;
            if '-' == sign {
                -secs
            } else {
                secs
            }
        },
    )(i)
}

fn zone(i: &[u8]) -> IResult<&[u8], i32> {
    const HOUR: i32 = 3600;
    alt((
        numeric_zone,
        map(atext, |name: &[u8]| {
            match name.to_ascii_lowercase().as_slice() {
                b"edt" => -4 * HOUR,
                b"est" | b"cdt" => -5 * HOUR,
                b"cst" | b"mdt" => -6 * HOUR,
                b"mst" | b"pdt" => -7 * HOUR,
                b"pst" => -8 * HOUR,
                // UT, GMT, military and unrecognised zones are all treated
                // as +0000 per RFC 5322 4.3.
                _ => 0,
            }
        }),
    ))(i)
}

fn date_time(i: &[u8]) -> IResult<&[u8], Option<DateTime<FixedOffset>>> {
    map(
        tuple((opt(day_of_week), date, time_of_day, zone, cfws)),
        |(_, (year, month, day), (hour, minute, second), zone, _)| {
            let offset = FixedOffset::east_opt(zone)?;
            let naive = NaiveDate::from_ymd_opt(year, month, day)?
                .and_hms_opt(hour, minute, second)?;
            offset.from_local_datetime(&naive).single()
        },
    )(i)
}

/// Parses an RFC 5322 date-time, including the obsolete forms.
pub fn parse_datetime(value: &[u8]) -> Option<DateTime<FixedOffset>> {
    all_consuming(date_time)(value).ok().and_then(|(_, dt)| dt)
}

// RFC 2045 5.1 "token", used by media types and their parameters
fn is_token(ch: u8) -> bool {
    ch > b' ' && ch < 0x7f && !b"()<>@,;:\\\"/[]?=".contains(&ch)
}

fn token(i: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(is_token)(i)
}

fn ows(i: &[u8]) -> IResult<&[u8], ()> {
    map(opt(fws), |_| ())(i)
}

// type "/" subtype. A lone type is tolerated since some agents send e.g.
// "Content-Type: text".
fn media_value(i: &[u8]) -> IResult<&[u8], Vec<u8>> {
    map(
        pair(token, opt(preceded(char('/'), token))),
        |(typ, sub): (&[u8], Option<&[u8]>)| {
            let mut v = typ.to_vec();
            if let Some(sub) = sub {
                v.push(b'/');
                v.extend_from_slice(sub);
            }
            v
        },
    )(i)
}

// Parameter values are supposed to be tokens, but anything up to the next
// delimiter is accepted.
fn loose_value(i: &[u8]) -> IResult<&[u8], Vec<u8>> {
    map(is_not("; \t\r\n\""), |v: &[u8]| v.to_vec())(i)
}

fn parameter(i: &[u8]) -> IResult<&[u8], (Vec<u8>, Vec<u8>)> {
    map(
        tuple((
            token,
            ows,
            char('='),
            ows,
            alt((quoted_string, loose_value)),
        )),
        |(name, _, _, _, value)| (name.to_vec(), value),
    )(i)
}

fn parameters(i: &[u8]) -> IResult<&[u8], Vec<(Vec<u8>, Vec<u8>)>> {
    terminated(
        many0(preceded(tuple((ows, char(';'), ows)), parameter)),
        // Trailing semicolons are common
        many0_count(tuple((ows, char(';')))),
    )(i)
}

/// Parses a parameterised value such as a `Content-Type`.
///
/// Returns the value and the raw parameters. Parameters are not decoded in
/// any way here, so RFC 2231 sections are returned separately. Anything
/// trailing the last intelligible parameter is dropped.
pub fn parse_parameterized(
    value: &[u8],
) -> Option<(Vec<u8>, Vec<(Vec<u8>, Vec<u8>)>)> {
    let (rest, (_, value, params, _)) =
        tuple((cfws, media_value, parameters, cfws))(value).ok()?;
    if !rest.is_empty() {
        log::debug!(
            "Ignoring trailing junk in parameterised value: {:?}",
            String::from_utf8_lossy(rest)
        );
    }
    Some((value, params))
}
