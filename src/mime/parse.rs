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

//! Recursive decomposition of a message into a tree of parts.

use std::io::{self, Read};
use std::sync::Arc;

use log::{debug, warn};

use super::body::Body;
use super::charset::{CharsetResolver, DefaultCharsets, ExtendedCharsets};
use super::header::Header;
use super::line_break::LineBreak;
use super::message::{Message, Multipart, Opaque};
use super::multipart::{self, ScanOutcome, Scanned, Tokens};
use super::split::{self, Split, SplitOutcome};
use crate::support::error::{Error, ParseError};
use crate::support::parse_options::ParseOptions;
use crate::support::shared_bytes::SharedBytes;

/// Parses a message from a stream.
///
/// The header is read `chunk_size` bytes at a time. A leaf body that is not
/// inside a multipart streams straight from `reader` without being
/// buffered.
///
/// If anything went wrong, the error still carries a message tree, unless
/// the input could not be read at all. When the only problems were with the
/// structure of a multipart, the affected multipart is kept as an opaque
/// part holding its original bytes, so the tree always writes back to the
/// original input.
pub fn parse<R: Read + Send + 'static>(
    reader: R,
    options: &ParseOptions,
) -> Result<Message, ParseError> {
    let split = split::split_stream(
        reader,
        options.chunk_size,
        options.max_header_length,
    )
    .map_err(|e| ParseError::new(None, Error::Io(e)))?;

    Parser::new(options).finish(split, options)
}

/// Parses a message held in memory.
///
/// Multipart children are windows into `data` rather than copies.
pub fn parse_bytes(
    data: impl Into<Vec<u8>>,
    options: &ParseOptions,
) -> Result<Message, ParseError> {
    let split = split::split_shared(
        SharedBytes::new(data.into()),
        options.max_header_length,
        false,
    );
    Parser::new(options).finish(split, options)
}

struct Parser {
    resolver: Arc<dyn CharsetResolver>,
    /// Recoverable problems, which leave the tree intact.
    errors: Vec<Error>,
}

impl Parser {
    fn new(options: &ParseOptions) -> Self {
        let resolver: Arc<dyn CharsetResolver> = if options.extended_charsets
        {
            Arc::new(ExtendedCharsets)
        } else {
            Arc::new(DefaultCharsets)
        };

        Parser {
            resolver,
            errors: Vec::new(),
        }
    }

    fn finish(
        mut self,
        split: SplitOutcome,
        options: &ParseOptions,
    ) -> Result<Message, ParseError> {
        let message = match self.split_part(split, options) {
            Ok(message) => message,
            Err(Failure::Fatal(body, error)) => {
                return Err(ParseError::new(Some(unparsed(body)), error));
            },
            Err(Failure::Io(e)) => {
                return Err(ParseError::new(None, Error::Io(e)));
            },
        };

        if self.errors.is_empty() {
            Ok(message)
        } else {
            Err(ParseError {
                message: Some(message),
                errors: self.errors,
            })
        }
    }
}

/// Something that stops a part from being decomposed at all.
enum Failure {
    /// A size limit was exceeded. The body has every byte of the part.
    Fatal(Body, Error),
    Io(io::Error),
}

impl From<io::Error> for Failure {
    fn from(e: io::Error) -> Self {
        Failure::Io(e)
    }
}

/// Wraps content that could not be parsed so that it writes back verbatim.
fn unparsed(body: Body) -> Message {
    Opaque::new(Header::passthrough(LineBreak::default()), body).into()
}

impl Parser {
    fn split_part(
        &mut self,
        split: SplitOutcome,
        options: &ParseOptions,
    ) -> Result<Message, Failure> {
        match split {
            SplitOutcome::TooLarge(body) => {
                Err(Failure::Fatal(body, Error::LargeHeader))
            },
            SplitOutcome::Split(Split {
                header,
                line_break,
                separated,
                body,
            }) => {
                let (header, error) = Header::parse(
                    &header,
                    line_break,
                    separated,
                    Arc::clone(&self.resolver),
                );
                if let Some(error) = error {
                    self.errors.push(error);
                }

                self.build(header, body, options)
            },
        }
    }

    /// Turns a parsed header and its body into a tree node, decomposing it
    /// if it is a multipart.
    fn build(
        &mut self,
        mut header: Header,
        body: Body,
        options: &ParseOptions,
    ) -> Result<Message, Failure> {
        if !options.may_descend() {
            return Ok(self.leaf(header, body, options));
        }

        let media_type = match header.media_type() {
            Ok(media_type) => media_type,
            Err(_) => return Ok(self.leaf(header, body, options)),
        };

        let is_multipart = media_type.starts_with("multipart/");
        if !is_multipart && !media_type.starts_with("message/") {
            return Ok(self.leaf(header, body, options));
        }

        let boundary = header.boundary().unwrap_or_default();
        if boundary.is_empty() {
            if is_multipart {
                warn!("{} without boundary left undivided", media_type);
                self.errors.push(Error::NoBoundary);
            }
            // Encapsulated messages are usually not divided by boundaries at
            // all
            return Ok(Opaque::new(header, body).into());
        }

        debug!("Descending into {} with boundary {:?}", media_type, boundary);
        let line_break = header.line_break();
        let tokens = Tokens::new(&boundary, line_break);
        let scanned = match multipart::scan(
            body,
            &tokens,
            options.max_part_length,
            options.chunk_size,
        )? {
            ScanOutcome::Complete(scanned) => scanned,
            ScanOutcome::Failed { body, error } => {
                self.errors.push(error);
                return Ok(Opaque::new(header, body).into());
            },
        };

        let Scanned {
            prefix,
            parts,
            suffix,
        } = scanned;

        if prefix.is_none() {
            // The boundary never occurs, so there are no part headers to
            // parse; the body is kept as one undivided chunk
            debug!("No {} boundary found, body left undivided", media_type);
            let children: Vec<Message> = parts
                .into_iter()
                .map(|part| {
                    Opaque::new(Header::passthrough(line_break), part).into()
                })
                .collect();
            return Ok(Multipart {
                header,
                line_break,
                prefix,
                parts: children,
                suffix,
            }
            .into());
        }

        let parts = parts
            .into_iter()
            .map(SharedBytes::new)
            .collect::<Vec<_>>();

        let errors_before = self.errors.len();
        let child_options = options.descend();
        let mut children = Vec::with_capacity(parts.len());
        for part in &parts {
            let split = split::split_shared(
                part.clone(),
                child_options.max_header_length,
                true,
            );
            match self.split_part(split, &child_options) {
                Ok(child) => children.push(child),
                Err(Failure::Io(e)) => return Err(Failure::Io(e)),
                Err(Failure::Fatal(_, error)) => {
                    warn!(
                        "Part {} of {} unparseable, keeping it whole: {}",
                        children.len(),
                        media_type,
                        error
                    );
                    // Problems inside the discarded subtree no longer apply
                    self.errors.truncate(errors_before);
                    self.errors.push(error);

                    let original = Scanned {
                        prefix,
                        parts: parts
                            .iter()
                            .map(|p| p.as_slice().to_vec())
                            .collect(),
                        suffix,
                    }
                    .reassemble(&tokens);
                    return Ok(Opaque::new(header, original).into());
                },
            }
        }

        Ok(Multipart {
            header,
            line_break,
            prefix,
            parts: children,
            suffix,
        }
        .into())
    }

    fn leaf(
        &mut self,
        header: Header,
        body: Body,
        options: &ParseOptions,
    ) -> Message {
        if options.decode_transfer_encoding {
            let encoding = header.transfer_encoding();
            Opaque::decoded(header, encoding.decoder(body)).into()
        } else {
            Opaque::new(header, body).into()
        }
    }
}
