//! Media type and `Content-Disposition` parsing and formatting.
//!
//! # Header Formats
//!
//! | Header | Format | Example |
//! |--------|--------|---------|
//! | Content-Type | `type/subtype; param=value` | `multipart/form-data; boundary=Boundary_1` |
//! | Content-Disposition | `form-data; name="…"; filename="…"` | `form-data; name="file"; filename="a.png"` |
//!
//! # Examples
//!
//! ```
//! use restdocs_http::protocol::{
//!     parse_media_type, boundary, format_content_disposition, parse_content_disposition,
//! };
//!
//! let media_type = parse_media_type("multipart/form-data; boundary=abc").unwrap();
//! assert_eq!(boundary(&media_type), Some("abc"));
//!
//! let header = format_content_disposition("file", Some("a.png"));
//! let disposition = parse_content_disposition(&header).unwrap();
//! assert_eq!(disposition.name.as_deref(), Some("file"));
//! assert_eq!(disposition.filename.as_deref(), Some("a.png"));
//! ```

use crate::error::{DocsError, Result};
use mime::Mime;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// Bytes escaped inside quoted `name` and `filename` values.
///
/// `%` itself is escaped so decoding restores the original value exactly.
const DISPOSITION_VALUE: &AsciiSet = &CONTROLS.add(b'"').add(b'%');

/// Parsed `Content-Disposition` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Disposition type, lowercased (`form-data`, `attachment`, …)
    pub disposition: String,
    /// `name` parameter
    pub name: Option<String>,
    /// `filename` parameter, `None` when absent or empty
    pub filename: Option<String>,
}

/// Parse a media type string.
///
/// # Errors
///
/// Returns [`DocsError::InvalidMediaType`] when the value is not `type/subtype[; params]`.
pub fn parse_media_type(value: &str) -> Result<Mime> {
    value
        .trim()
        .parse::<Mime>()
        .map_err(|e| DocsError::InvalidMediaType(format!("{}: {}", value, e)))
}

/// Whether the media type is compatible with `application/x-www-form-urlencoded`
pub fn is_form(media_type: &Mime) -> bool {
    media_type.type_() == mime::APPLICATION && media_type.subtype() == mime::WWW_FORM_URLENCODED
}

/// Whether the media type is compatible with `multipart/form-data`
pub fn is_multipart(media_type: &Mime) -> bool {
    media_type.type_() == mime::MULTIPART && media_type.subtype() == mime::FORM_DATA
}

/// Whether the media type is JSON, including `+json` suffixes
pub fn is_json(media_type: &Mime) -> bool {
    media_type.subtype() == mime::JSON || media_type.suffix() == Some(mime::JSON)
}

/// The `boundary` parameter of a media type
pub fn boundary(media_type: &Mime) -> Option<&str> {
    media_type.get_param(mime::BOUNDARY).map(|b| b.as_str())
}

/// Rebuild a media type with the given boundary, keeping its other parameters
pub fn with_boundary(media_type: &Mime, boundary: &str) -> Result<Mime> {
    let mut value = media_type.essence_str().to_string();
    for (name, param) in media_type.params() {
        if name != mime::BOUNDARY {
            value.push_str(&format!("; {}={}", name, param));
        }
    }
    value.push_str(&format!("; boundary={}", boundary));
    parse_media_type(&value)
}

/// Split a header value into its leading token and `name=value` parameters.
///
/// Quoted values may contain `;`. Quotes are removed from returned values.
pub fn parse_header_params(value: &str) -> (String, Vec<(String, String)>) {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in value.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            ';' if !quoted => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);

    let mut iter = segments.into_iter();
    let head = iter.next().unwrap_or_default().trim().to_string();
    let params = iter
        .filter_map(|segment| {
            let (name, value) = segment.split_once('=')?;
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            Some((name.trim().to_lowercase(), value.to_string()))
        })
        .collect();
    (head, params)
}

/// Parse a `Content-Disposition` header value.
///
/// # Errors
///
/// Returns [`DocsError::MalformedMultipart`] when the disposition type is missing.
pub fn parse_content_disposition(value: &str) -> Result<ContentDisposition> {
    let (disposition, params) = parse_header_params(value);
    if disposition.is_empty() {
        return Err(DocsError::MalformedMultipart(format!(
            "Invalid Content-Disposition: '{}'",
            value
        )));
    }
    let param = |key: &str| {
        params
            .iter()
            .find(|(n, _)| n == key)
            .map(|(_, v)| v.clone())
    };
    Ok(ContentDisposition {
        disposition: disposition.to_lowercase(),
        name: param("name").map(|n| unescape_quoted(&n)),
        filename: param("filename")
            .filter(|f| !f.is_empty())
            .map(|f| unescape_quoted(&f)),
    })
}

/// Format a `form-data` `Content-Disposition` header value
pub fn format_content_disposition(name: &str, filename: Option<&str>) -> String {
    match filename {
        Some(filename) => format!(
            "form-data; name=\"{}\"; filename=\"{}\"",
            escape_quoted(name),
            escape_quoted(filename)
        ),
        None => format!("form-data; name=\"{}\"", escape_quoted(name)),
    }
}

fn escape_quoted(value: &str) -> String {
    utf8_percent_encode(value, DISPOSITION_VALUE).to_string()
}

fn unescape_quoted(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}
