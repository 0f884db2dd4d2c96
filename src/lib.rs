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

//! Parsing, modification and serialisation of Internet mail messages.
//!
//! A parsed message written back out without changes reproduces the input
//! byte-for-byte. Changing one header field or one part leaves every other
//! byte as it was.
//!
//! ```
//! use mimetree::{parse, ParseOptions, Part};
//!
//! let input: &[u8] = b"Subject: test\n\nBody\n";
//! let mut message = parse(input, &ParseOptions::default()).unwrap();
//! assert_eq!("test", message.header().get("subject").unwrap());
//!
//! message.header_mut().set("Subject", "changed").unwrap();
//! let output = message.to_bytes().unwrap();
//! assert_eq!(&b"Subject: changed\n\nBody\n"[..], &output[..]);
//! ```

#[cfg(test)]
macro_rules! assert_matches {
    ($expected:pat, $actual:expr) => {
        match $actual {
            $expected => (),
            unexpected => panic!(
                "Expected {} matches {}, got {:?}",
                stringify!($expected),
                stringify!($actual),
                unexpected
            ),
        }
    };
}

pub mod mime;
pub mod support;

#[cfg(test)]
mod test_data;

pub use crate::mime::{
    parse, parse_bytes, walk_leaves, walk_parts, Body, Buffer, Header,
    LineBreak, Message, Multipart, Opaque, Part,
};
pub use crate::support::error::{Error, ParseError};
pub use crate::support::parse_options::ParseOptions;
