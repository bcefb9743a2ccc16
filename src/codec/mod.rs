//! Body serialization machinery.
//!
//! [`Codecs`] is the registry of [`BodyWriter`]s and [`BodyReader`]s used both
//! to transmit request entities and, by the entity extractor, to re-derive
//! structure from them. It is built once and passed explicitly to whoever needs
//! it; there is no global registry.
//!
//! # Built-in Codecs
//!
//! | Codec | Entity | Media types |
//! |-------|--------|-------------|
//! | [`BytesCodec`] | `Bytes` | any |
//! | [`TextCodec`] | `Text` | any |
//! | [`JsonCodec`] | `Json` | `application/json`, `*/*+json` |
//! | [`FormCodec`] | `Form` | `application/x-www-form-urlencoded` |
//! | [`MultipartCodec`] | `Multipart` | `multipart/form-data` |
//!
//! # Examples
//!
//! ```
//! use restdocs_http::codec::Codecs;
//! use restdocs_http::types::{Entity, Form, Headers};
//!
//! let codecs = Codecs::default();
//! let entity = Entity::Form(Form::new().param("a", "alpha").param("b", "bravo"));
//! let mut headers = Headers::new();
//! let mut out = Vec::new();
//! codecs
//!     .write(&entity, &mime::APPLICATION_WWW_FORM_URLENCODED, &mut headers, &mut out)
//!     .unwrap();
//! assert_eq!(out, b"a=alpha&b=bravo");
//! ```

mod basic;
mod form;
mod multipart;

pub use basic::{BytesCodec, JsonCodec, TextCodec};
pub use form::FormCodec;
pub use multipart::MultipartCodec;

use crate::error::{DocsError, Result};
use crate::types::{Entity, EntityKind, Headers};
use mime::Mime;
use std::io::{Read, Write};
use std::sync::Arc;

/// Serializes an [`Entity`] to bytes.
pub trait BodyWriter: Send + Sync {
    /// Whether this writer handles the entity kind in the media type
    fn is_writeable(&self, kind: EntityKind, media_type: &Mime) -> bool;

    /// Write the entity to `sink`.
    ///
    /// Writers may update `headers`, e.g. to record a generated multipart boundary
    /// in `Content-Type`.
    fn write_to(
        &self,
        entity: &Entity,
        media_type: &Mime,
        headers: &mut Headers,
        sink: &mut dyn Write,
    ) -> Result<()>;
}

/// Deserializes bytes into an [`Entity`] of a requested kind.
pub trait BodyReader: Send + Sync {
    /// Whether this reader can produce `kind` from the media type
    fn is_readable(&self, kind: EntityKind, media_type: &Mime) -> bool;

    /// Read an entity of `kind` from `source`
    fn read_from(
        &self,
        kind: EntityKind,
        media_type: &Mime,
        headers: &Headers,
        source: &mut dyn Read,
    ) -> Result<Entity>;
}

/// Registry of body writers and readers.
///
/// Later registrations take precedence over earlier ones, so callers can
/// override a built-in codec for a media type.
#[derive(Clone)]
pub struct Codecs {
    writers: Vec<Arc<dyn BodyWriter>>,
    readers: Vec<Arc<dyn BodyReader>>,
}

impl Codecs {
    /// Create an empty registry
    pub fn empty() -> Self {
        Codecs {
            writers: Vec::new(),
            readers: Vec::new(),
        }
    }

    /// Create a registry with the built-in codecs
    pub fn new() -> Self {
        let mut codecs = Self::empty();
        codecs.register(BytesCodec);
        codecs.register(TextCodec);
        codecs.register(JsonCodec);
        codecs.register(FormCodec);
        codecs.register(MultipartCodec);
        codecs
    }

    /// Register a codec as both writer and reader
    pub fn register<C>(&mut self, codec: C) -> &mut Self
    where
        C: BodyWriter + BodyReader + 'static,
    {
        let codec = Arc::new(codec);
        self.writers.push(codec.clone());
        self.readers.push(codec);
        self
    }

    /// Register a writer only
    pub fn register_writer(&mut self, writer: Arc<dyn BodyWriter>) -> &mut Self {
        self.writers.push(writer);
        self
    }

    /// Register a reader only
    pub fn register_reader(&mut self, reader: Arc<dyn BodyReader>) -> &mut Self {
        self.readers.push(reader);
        self
    }

    /// Find a writer for the entity kind and media type
    pub fn writer(&self, kind: EntityKind, media_type: &Mime) -> Option<Arc<dyn BodyWriter>> {
        self.writers
            .iter()
            .rev()
            .find(|w| w.is_writeable(kind, media_type))
            .cloned()
    }

    /// Find a reader producing `kind` from the media type
    pub fn reader(&self, kind: EntityKind, media_type: &Mime) -> Option<Arc<dyn BodyReader>> {
        self.readers
            .iter()
            .rev()
            .find(|r| r.is_readable(kind, media_type))
            .cloned()
    }

    /// Serialize `entity` with the matching writer.
    ///
    /// # Errors
    ///
    /// [`DocsError::NoWriter`] when nothing handles the entity in this media type.
    pub fn write(
        &self,
        entity: &Entity,
        media_type: &Mime,
        headers: &mut Headers,
        sink: &mut dyn Write,
    ) -> Result<()> {
        let writer = self
            .writer(entity.kind(), media_type)
            .ok_or_else(|| DocsError::NoWriter {
                media_type: media_type.to_string(),
                kind: entity.kind(),
            })?;
        writer.write_to(entity, media_type, headers, sink)
    }

    /// Deserialize bytes into `kind` with the matching reader.
    ///
    /// # Errors
    ///
    /// [`DocsError::NoReader`] when nothing produces `kind` from this media type.
    pub fn read(
        &self,
        kind: EntityKind,
        media_type: &Mime,
        headers: &Headers,
        source: &mut dyn Read,
    ) -> Result<Entity> {
        let reader = self
            .reader(kind, media_type)
            .ok_or_else(|| DocsError::NoReader {
                media_type: media_type.to_string(),
                kind,
            })?;
        reader.read_from(kind, media_type, headers, source)
    }
}

impl Default for Codecs {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Codecs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codecs")
            .field("writers", &self.writers.len())
            .field("readers", &self.readers.len())
            .finish()
    }
}
