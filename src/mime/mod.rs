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

pub mod address;
pub mod body;
pub mod buffer;
pub mod charset;
pub mod content_encoding;
pub mod encoded_word;
pub mod field;
pub mod fold;
pub mod header;
pub mod line_break;
pub mod message;
pub mod multipart;
pub mod params;
pub mod parse;
pub mod quoted_printable;
pub mod split;
pub mod walk;
mod syntax;

pub use self::body::Body;
pub use self::buffer::Buffer;
pub use self::header::Header;
pub use self::line_break::LineBreak;
pub use self::message::{Message, Multipart, Opaque, Part};
pub use self::parse::{parse, parse_bytes};
pub use self::walk::{walk_leaves, walk_parts};
