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
use std::io::{self, Cursor, Read};

use crate::support::shared_bytes::SharedBytes;

/// A single-shot byte stream holding the body of a leaf part.
///
/// A body may be consumed exactly once, whether by reading it directly or by
/// writing the part out. Afterwards it reads as empty. Whatever resource the
/// stream owns is released when the `Body` is dropped.
pub struct Body {
    inner: Box<dyn Read + Send>,
}

impl Body {
    pub fn new(inner: impl Read + Send + 'static) -> Self {
        Body {
            inner: Box::new(inner),
        }
    }

    pub fn empty() -> Self {
        Body::new(io::empty())
    }

    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Body::new(Cursor::new(data.into()))
    }

    pub fn from_shared(data: SharedBytes) -> Self {
        Body::new(data)
    }

    /// Reads the whole remaining body into memory.
    pub fn read_all(&mut self) -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        self.inner.read_to_end(&mut data)?;
        Ok(data)
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::empty()
    }
}

impl Read for Body {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        self.inner.read(dst)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Body(<stream>)")
    }
}

impl From<Vec<u8>> for Body {
    fn from(data: Vec<u8>) -> Self {
        Body::from_bytes(data)
    }
}

impl From<&'static [u8]> for Body {
    fn from(data: &'static [u8]) -> Self {
        Body::new(data)
    }
}

impl From<String> for Body {
    fn from(data: String) -> Self {
        Body::from_bytes(data.into_bytes())
    }
}

impl From<&'static str> for Body {
    fn from(data: &'static str) -> Self {
        Body::new(data.as_bytes())
    }
}
