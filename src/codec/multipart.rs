//! `multipart/form-data` codec.
//!
//! The writer picks a boundary (from the media type, the form, or a fresh one)
//! and records it in the `Content-Type` header so that readers of the written
//! bytes can find it again.

use super::{BodyReader, BodyWriter};
use crate::error::{DocsError, Result};
use crate::protocol;
use crate::types::{Entity, EntityKind, Headers, MultipartForm};
use http::header::CONTENT_TYPE;
use mime::Mime;
use std::io::{Read, Write};

/// Writes and reads [`MultipartForm`] entities.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultipartCodec;

impl MultipartCodec {
    /// Boundary announced by `Content-Type` or, failing that, the media type
    fn boundary_of(media_type: &Mime, headers: &Headers) -> Result<String> {
        if let Some(value) = headers.get_first(CONTENT_TYPE.as_str()) {
            let declared = protocol::parse_media_type(value)?;
            if let Some(boundary) = protocol::boundary(&declared) {
                return Ok(boundary.to_string());
            }
        }
        protocol::boundary(media_type)
            .map(str::to_string)
            .ok_or_else(|| {
                let content_type = headers
                    .get_first(CONTENT_TYPE.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| media_type.to_string());
                DocsError::MissingBoundary(content_type)
            })
    }
}

impl BodyWriter for MultipartCodec {
    fn is_writeable(&self, kind: EntityKind, media_type: &Mime) -> bool {
        kind == EntityKind::Multipart && protocol::is_multipart(media_type)
    }

    fn write_to(
        &self,
        entity: &Entity,
        media_type: &Mime,
        headers: &mut Headers,
        sink: &mut dyn Write,
    ) -> Result<()> {
        let Entity::Multipart(multipart) = entity else {
            return Ok(());
        };
        let boundary = protocol::boundary(media_type)
            .or_else(|| multipart.boundary())
            .map(str::to_string)
            .unwrap_or_else(protocol::generate_boundary);
        let bounded = protocol::with_boundary(media_type, &boundary)?;
        headers.set(CONTENT_TYPE.as_str(), bounded.to_string());
        protocol::write_multipart(multipart.parts(), &boundary, sink)?;
        Ok(())
    }
}

impl BodyReader for MultipartCodec {
    fn is_readable(&self, kind: EntityKind, media_type: &Mime) -> bool {
        kind == EntityKind::Multipart && protocol::is_multipart(media_type)
    }

    fn read_from(
        &self,
        _kind: EntityKind,
        media_type: &Mime,
        headers: &Headers,
        source: &mut dyn Read,
    ) -> Result<Entity> {
        let boundary = Self::boundary_of(media_type, headers)?;
        let mut body = Vec::new();
        source.read_to_end(&mut body)?;
        let parts = protocol::parse_multipart(&boundary, &body)?;
        let multipart = parts
            .into_iter()
            .fold(MultipartForm::new().with_boundary(boundary), MultipartForm::part);
        Ok(Entity::Multipart(multipart))
    }
}
