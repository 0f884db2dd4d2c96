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

//! Traversal of message trees.

use std::collections::VecDeque;

use super::message::Message;

/// Visits every part of `root`, breadth-first.
///
/// The visitor receives the depth of the part (0 for `root`), its index
/// among its siblings, and the part itself. The first error returned by the
/// visitor stops the walk and is returned.
pub fn walk_parts<E, F>(root: &mut Message, mut visitor: F) -> Result<(), E>
where
    F: FnMut(usize, usize, &mut Message) -> Result<(), E>,
{
    let mut queue: VecDeque<(usize, usize, &mut Message)> = VecDeque::new();
    queue.push_back((0, 0, root));

    while let Some((depth, index, part)) = queue.pop_front() {
        visitor(depth, index, part)?;

        if let Message::Multipart(ref mut multipart) = *part {
            for (ix, child) in multipart.parts.iter_mut().enumerate() {
                queue.push_back((depth + 1, ix, child));
            }
        }
    }

    Ok(())
}

/// Like `walk_parts()`, but only visits leaves.
pub fn walk_leaves<E, F>(root: &mut Message, mut visitor: F) -> Result<(), E>
where
    F: FnMut(usize, usize, &mut Message) -> Result<(), E>,
{
    walk_parts(root, |depth, index, part| match *part {
        Message::Opaque(_) => visitor(depth, index, part),
        Message::Multipart(_) => Ok(()),
    })
}
