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


/// A single-part message with LF line endings.
pub static SIMPLE: &[u8] = b"Subject: test\n\nBody\n";

/// A multipart/alternative with one HTML part, exactly as the builder
/// writes it.
pub static SIMPLE_MULTIPART: &[u8] = b"Subject: test multipart\r\n\
Content-Type: multipart/alternative; boundary=testing\r\n\
\r\n\
--testing\r\n\
Content-type: text/html\r\n\
\r\n\
Test message.\r\n\
--testing--";

/// A multipart with a preamble, an epilogue, a folded header and a part
/// without a header, written with LF. `with_line_break()` converts it to the
/// other terminators.
pub static MULTIPART_LF: &[u8] = b"From: Someone <someone@example.com>\n\
To: a@example.com,\n b@example.com\n\
Subject: =?utf-8?q?caf=C3=A9?= menu\n\
MIME-Version: 1.0\n\
Content-Type: multipart/mixed;\n\tboundary=\"=_sep\"\n\
\n\
This is a multi-part message in MIME format.\n\
\n\
--=_sep\n\
Content-Type: text/plain\n\
\n\
Soup of the day.\n\
--=_sep\n\
\n\
No header here.\n\
--=_sep--\n\
Trailing epilogue.\n";

/// A multipart containing a digest, so three levels deep.
pub static NESTED: &[u8] = b"From: a@example.com\n\
Subject: nested\n\
MIME-Version: 1.0\n\
Content-Type: multipart/mixed; boundary=\"outer\"\n\
\n\
This is the preamble.\n\
--outer\n\
Content-Type: text/plain; charset=us-ascii\n\
\n\
Top text.\n\
--outer\n\
Content-Type: multipart/digest; boundary=inner\n\
\n\
--inner\n\
\n\
Subject: first\n\
\n\
Digest body one.\n\
--inner\n\
\n\
Subject: second\n\
\n\
Digest body two.\n\
--inner--\n\
--outer\n\
Content-Type: application/octet-stream\n\
Content-Transfer-Encoding: base64\n\
\n\
aGVsbG8gd29ybGQ=\n\
--outer--\n\
epilogue\n";

/// A quoted-printable leaf.
pub static QUOTED_PRINTABLE: &[u8] =
    b"Content-transfer-encoding: quoted-printable\r\n\
\r\n\
I =E2=9D=A4 email!\r\n";

/// A header that starts with a continuation line.
pub static ORPHAN_CONTINUATION: &[u8] =
    b" orphan-continuation\nSubject: real\n\nbody";

/// A multipart content type with no boundary.
pub static NO_BOUNDARY: &[u8] =
    b"Content-Type: multipart/mixed\n\n--b\nX: 1\n\npart\n--b--\n";

/// A multipart which is never closed.
pub static UNCLOSED_MULTIPART: &[u8] =
    b"Content-Type: multipart/mixed; boundary=b\n\n--b\nX: 1\n\npart\n";

/// A multipart whose body contains none of its boundaries.
pub static BOUNDARY_NEVER_USED: &[u8] =
    b"Content-Type: multipart/mixed; boundary=b\n\njust text\n";

/// Rewrites an LF-terminated fixture to use `line_break` instead.
pub fn with_line_break(data: &[u8], line_break: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 2);
    for &b in data {
        if b'\n' == b {
            out.extend_from_slice(line_break);
        } else {
            out.push(b);
        }
    }
    out
}
