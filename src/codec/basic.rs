//! Byte, text and JSON codecs.

use super::{BodyReader, BodyWriter};
use crate::error::Result;
use crate::protocol;
use crate::types::{Entity, EntityKind, Headers};
use bytes::Bytes;
use mime::Mime;
use std::io::{Read, Write};

/// Writes and reads raw bytes in any media type.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

impl BodyWriter for BytesCodec {
    fn is_writeable(&self, kind: EntityKind, _media_type: &Mime) -> bool {
        kind == EntityKind::Bytes
    }

    fn write_to(
        &self,
        entity: &Entity,
        _media_type: &Mime,
        _headers: &mut Headers,
        sink: &mut dyn Write,
    ) -> Result<()> {
        if let Entity::Bytes(bytes) = entity {
            sink.write_all(bytes)?;
        }
        Ok(())
    }
}

impl BodyReader for BytesCodec {
    fn is_readable(&self, kind: EntityKind, _media_type: &Mime) -> bool {
        kind == EntityKind::Bytes
    }

    fn read_from(
        &self,
        _kind: EntityKind,
        _media_type: &Mime,
        _headers: &Headers,
        source: &mut dyn Read,
    ) -> Result<Entity> {
        let mut buf = Vec::new();
        source.read_to_end(&mut buf)?;
        Ok(Entity::Bytes(Bytes::from(buf)))
    }
}

/// Writes and reads UTF-8 text in any media type.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl BodyWriter for TextCodec {
    fn is_writeable(&self, kind: EntityKind, _media_type: &Mime) -> bool {
        kind == EntityKind::Text
    }

    fn write_to(
        &self,
        entity: &Entity,
        _media_type: &Mime,
        _headers: &mut Headers,
        sink: &mut dyn Write,
    ) -> Result<()> {
        if let Entity::Text(text) = entity {
            sink.write_all(text.as_bytes())?;
        }
        Ok(())
    }
}

impl BodyReader for TextCodec {
    fn is_readable(&self, kind: EntityKind, _media_type: &Mime) -> bool {
        kind == EntityKind::Text
    }

    fn read_from(
        &self,
        _kind: EntityKind,
        _media_type: &Mime,
        _headers: &Headers,
        source: &mut dyn Read,
    ) -> Result<Entity> {
        let mut text = String::new();
        source.read_to_string(&mut text)?;
        Ok(Entity::Text(text))
    }
}

/// Writes and reads JSON documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl BodyWriter for JsonCodec {
    fn is_writeable(&self, kind: EntityKind, media_type: &Mime) -> bool {
        kind == EntityKind::Json && protocol::is_json(media_type)
    }

    fn write_to(
        &self,
        entity: &Entity,
        _media_type: &Mime,
        _headers: &mut Headers,
        sink: &mut dyn Write,
    ) -> Result<()> {
        if let Entity::Json(value) = entity {
            serde_json::to_writer(sink, value)?;
        }
        Ok(())
    }
}

impl BodyReader for JsonCodec {
    fn is_readable(&self, kind: EntityKind, media_type: &Mime) -> bool {
        kind == EntityKind::Json && protocol::is_json(media_type)
    }

    fn read_from(
        &self,
        _kind: EntityKind,
        _media_type: &Mime,
        _headers: &Headers,
        source: &mut dyn Read,
    ) -> Result<Entity> {
        Ok(Entity::Json(serde_json::from_reader(source)?))
    }
}
