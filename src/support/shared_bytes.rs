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

//! Cheaply cloneable views into a single in-memory byte block.
//!
//! When a multipart body is decomposed, every sub-part is a window into the
//! bytes the scanner buffered. `SharedBytes` lets the children (and their
//! bodies in turn) keep referring to that one allocation instead of copying.

use std::fmt;
use std::io::{self, BufRead, Read};
use std::ops::Range;
use std::sync::Arc;

/// A window into a shared, immutable byte block.
///
/// This also works as a single-shot `Read`er: reading consumes the window
/// from the front. Clones are independent windows over the same block.
#[derive(Clone)]
pub struct SharedBytes {
    data: Arc<Vec<u8>>,
    start: usize,
    end: usize,
}

impl SharedBytes {
    pub fn new(data: Vec<u8>) -> Self {
        let end = data.len();
        SharedBytes {
            data: Arc::new(data),
            start: 0,
            end,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.start..self.end]
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns a new window covering `range`, relative to this window.
    ///
    /// Panics if `range` is not within this window, like slice indexing.
    pub fn slice(&self, range: Range<usize>) -> Self {
        assert!(range.start <= range.end && range.end <= self.len());
        SharedBytes {
            data: Arc::clone(&self.data),
            start: self.start + range.start,
            end: self.start + range.end,
        }
    }
}

impl From<Vec<u8>> for SharedBytes {
    fn from(data: Vec<u8>) -> Self {
        SharedBytes::new(data)
    }
}

impl fmt::Debug for SharedBytes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SharedBytes({:?})", String::from_utf8_lossy(self.as_slice()))
    }
}

impl Read for SharedBytes {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        let n = dst.len().min(self.len());
        dst[..n].copy_from_slice(&self.as_slice()[..n]);
        self.start += n;
        Ok(n)
    }
}

impl BufRead for SharedBytes {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        Ok(self.as_slice())
    }

    fn consume(&mut self, amt: usize) {
        self.start = (self.start + amt).min(self.end);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn windows_share_and_read_independently() {
        let all = SharedBytes::new(b"hello world".to_vec());
        let mut world = all.slice(6..11);
        let hello = all.slice(0..5);
        assert_eq!(b"hello", hello.as_slice());

        let mut buf = [0u8; 3];
        assert_eq!(3, world.read(&mut buf).unwrap());
        assert_eq!(b"wor", &buf);
        assert_eq!(b"ld", world.as_slice());

        let mut rest = Vec::new();
        world.read_to_end(&mut rest).unwrap();
        assert_eq!(b"ld", &rest[..]);
        assert!(world.is_empty());
        assert_eq!(11, all.len());
    }

    #[test]
    fn nested_slices_are_relative() {
        let all = SharedBytes::new(b"0123456789".to_vec());
        let mid = all.slice(2..8);
        assert_eq!(b"45", mid.slice(2..4).as_slice());
    }
}
