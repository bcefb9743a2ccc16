//! Wire-level helpers: constants, media types and the multipart format.
//!
//! # Module Organization
//!
//! ```text
//! protocol/
//! ├── constants - Reserved keys, priorities, capture limits
//! ├── headers   - Media type and Content-Disposition parsing
//! └── multipart - multipart/form-data writer and parser
//! ```

pub mod constants;
mod headers;
mod multipart;

pub use headers::{
    boundary, format_content_disposition, is_form, is_json, is_multipart, parse_content_disposition,
    parse_header_params, parse_media_type, with_boundary, ContentDisposition,
};
pub use multipart::{
    generate_boundary, parse_multipart, write_multipart, MultipartParser, MultipartState,
};
