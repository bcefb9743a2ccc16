//! `multipart/form-data` wire format.
//!
//! Incremental, state-machine based parser plus the matching writer. The
//! entity extractor uses both: it writes a [`MultipartForm`] the way it would be
//! transmitted and parses the bytes back into normalized parts.
//!
//! # Parsing Flow
//!
//! 1. **Preamble**: Skip bytes until the first `--boundary` delimiter
//! 2. **Delimiter**: Consume `--boundary`, then `\r\n` (next part) or `--` (end)
//! 3. **Headers**: Accumulate until `\r\n\r\n`, parse part headers
//! 4. **Body**: Accumulate until `\r\n--boundary`, emit the part
//! 5. **Epilogue**: Closing delimiter seen, ignore the rest
//!
//! # Examples
//!
//! ```
//! use restdocs_http::protocol::{write_multipart, MultipartParser};
//! use restdocs_http::types::MultipartForm;
//!
//! let form = MultipartForm::new().field("a", "alpha").field("b", "bravo");
//! let mut bytes = Vec::new();
//! write_multipart(form.parts(), "xyz", &mut bytes).unwrap();
//!
//! let mut parser = MultipartParser::new("xyz");
//! let parts = parser.feed(&bytes).unwrap();
//! parser.finish().unwrap();
//! assert_eq!(parts.len(), 2);
//! assert_eq!(parts[1].value_as_string(), "bravo");
//! ```

use super::headers::{format_content_disposition, parse_content_disposition, parse_media_type};
use crate::error::{DocsError, Result};
use crate::types::{FormDataPart, Headers};
use bytes::BytesMut;
use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use std::io::{self, Write};

/// Parse state of [`MultipartParser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultipartState {
    /// Looking for the first delimiter
    Preamble,
    /// At a delimiter, deciding between another part and the end
    Delimiter,
    /// Accumulating part headers
    Headers,
    /// Accumulating part content
    Body,
    /// Closing delimiter seen
    Epilogue,
}

/// Incremental `multipart/form-data` parser.
#[derive(Debug)]
pub struct MultipartParser {
    /// `--` followed by the boundary
    delimiter: Vec<u8>,
    /// Input not yet consumed
    buffer: BytesMut,
    /// Current state
    state: MultipartState,
    /// Headers of the part being parsed
    headers: Headers,
}

impl MultipartParser {
    /// Create a parser for the given boundary (without leading dashes)
    pub fn new(boundary: &str) -> Self {
        let mut delimiter = b"--".to_vec();
        delimiter.extend_from_slice(boundary.as_bytes());
        MultipartParser {
            delimiter,
            buffer: BytesMut::with_capacity(8192),
            state: MultipartState::Preamble,
            headers: Headers::new(),
        }
    }

    /// Feed bytes, returning every part completed by them
    pub fn feed(&mut self, data: &[u8]) -> Result<Vec<FormDataPart>> {
        self.buffer.extend_from_slice(data);
        let mut parts = Vec::new();

        loop {
            match self.state {
                MultipartState::Preamble => {
                    if self.buffer.starts_with(&self.delimiter) {
                        self.state = MultipartState::Delimiter;
                    } else if let Some(pos) = self.find_delimiter() {
                        let _ = self.buffer.split_to(pos + 2);
                        self.state = MultipartState::Delimiter;
                    } else {
                        break;
                    }
                }
                MultipartState::Delimiter => {
                    let needed = self.delimiter.len() + 2;
                    if self.buffer.len() < needed {
                        break;
                    }
                    let _ = self.buffer.split_to(self.delimiter.len());
                    let marker = self.buffer.split_to(2);
                    match &marker[..] {
                        b"\r\n" => self.state = MultipartState::Headers,
                        b"--" => self.state = MultipartState::Epilogue,
                        other => {
                            return Err(DocsError::MalformedMultipart(format!(
                                "unexpected bytes after delimiter: {:?}",
                                String::from_utf8_lossy(other)
                            )))
                        }
                    }
                }
                MultipartState::Headers => {
                    if self.buffer.starts_with(b"\r\n") {
                        let _ = self.buffer.split_to(2);
                        self.state = MultipartState::Body;
                    } else if let Some(end) = find(&self.buffer, b"\r\n\r\n") {
                        self.parse_headers(end)?;
                        self.state = MultipartState::Body;
                    } else {
                        break;
                    }
                }
                MultipartState::Body => {
                    if let Some(pos) = self.find_delimiter() {
                        let content = self.buffer.split_to(pos).freeze();
                        let _ = self.buffer.split_to(2);
                        parts.push(self.finalize_part(content)?);
                        self.state = MultipartState::Delimiter;
                    } else {
                        break;
                    }
                }
                MultipartState::Epilogue => {
                    self.buffer.clear();
                    break;
                }
            }
        }

        Ok(parts)
    }

    /// Check that the closing delimiter was reached
    pub fn finish(&self) -> Result<()> {
        if self.state == MultipartState::Epilogue {
            Ok(())
        } else {
            Err(DocsError::MalformedMultipart(format!(
                "body ended in state {:?} before the closing delimiter",
                self.state
            )))
        }
    }

    /// Get current parse state
    pub fn state(&self) -> MultipartState {
        self.state
    }

    /// Position of `\r\n--boundary` in the buffer
    fn find_delimiter(&self) -> Option<usize> {
        let mut needle = b"\r\n".to_vec();
        needle.extend_from_slice(&self.delimiter);
        find(&self.buffer, &needle)
    }

    /// Parse part headers from the buffer, consuming the blank line
    fn parse_headers(&mut self, end: usize) -> Result<()> {
        let header_bytes = self.buffer.split_to(end + 4);
        let header_str = String::from_utf8(header_bytes[..end].to_vec())
            .map_err(|e| DocsError::MalformedMultipart(e.to_string()))?;

        for line in header_str.split("\r\n") {
            if let Some(colon_pos) = line.find(':') {
                let key = line[..colon_pos].trim();
                let value = line[colon_pos + 1..].trim();
                self.headers.add(key, value);
            }
        }
        Ok(())
    }

    /// Turn accumulated headers and content into a part
    fn finalize_part(&mut self, content: bytes::Bytes) -> Result<FormDataPart> {
        let headers = std::mem::take(&mut self.headers);
        let disposition = headers
            .get_first(CONTENT_DISPOSITION.as_str())
            .ok_or_else(|| {
                DocsError::MalformedMultipart("part without Content-Disposition".to_string())
            })
            .and_then(parse_content_disposition)?;
        let name = disposition.name.ok_or_else(|| {
            DocsError::MalformedMultipart("Content-Disposition without name".to_string())
        })?;
        let media_type = match headers.get_first(CONTENT_TYPE.as_str()) {
            Some(value) => parse_media_type(value)?,
            None => mime::TEXT_PLAIN,
        };
        Ok(FormDataPart::from_parts(
            name,
            disposition.filename,
            media_type,
            headers,
            content,
        ))
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Parse a complete multipart body
pub fn parse_multipart(boundary: &str, body: &[u8]) -> Result<Vec<FormDataPart>> {
    let mut parser = MultipartParser::new(boundary);
    let parts = parser.feed(body)?;
    parser.finish()?;
    Ok(parts)
}

/// Write parts framed by `boundary`.
///
/// Each part gets `Content-Disposition` and `Content-Type` first, then its own
/// headers except those two.
pub fn write_multipart(parts: &[FormDataPart], boundary: &str, sink: &mut dyn Write) -> io::Result<()> {
    for part in parts {
        write!(sink, "--{}\r\n", boundary)?;
        write!(
            sink,
            "Content-Disposition: {}\r\n",
            format_content_disposition(part.name(), part.filename())
        )?;
        write!(sink, "Content-Type: {}\r\n", part.media_type())?;
        for (name, value) in part.headers().iter() {
            if name.eq_ignore_ascii_case(CONTENT_DISPOSITION.as_str())
                || name.eq_ignore_ascii_case(CONTENT_TYPE.as_str())
            {
                continue;
            }
            write!(sink, "{}: {}\r\n", name, value)?;
        }
        sink.write_all(b"\r\n")?;
        sink.write_all(part.content())?;
        sink.write_all(b"\r\n")?;
    }
    write!(sink, "--{}--\r\n", boundary)
}

/// Generate a boundary unlikely to collide with part content
pub fn generate_boundary() -> String {
    format!("Boundary_{}", uuid::Uuid::new_v4().simple())
}
