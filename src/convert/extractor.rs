//! Structure recovery for in-memory entities.
//!
//! The bytes captured from the wire no longer say which fields a form or
//! multipart body had. The [`EntityExtractor`] re-runs the same codecs the
//! transport used: it writes the entity into memory and reads the bytes back as
//! the normalized inspection type.

use crate::codec::Codecs;
use crate::error::{DocsError, Result};
use crate::types::{Entity, EntityKind, Form, Headers, MultipartForm};
use mime::Mime;
use std::sync::Arc;
use tracing::trace;

/// Round-trips entities through a [`Codecs`] registry.
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    codecs: Arc<Codecs>,
}

impl EntityExtractor {
    /// Extractor backed by `codecs`
    pub fn new(codecs: Arc<Codecs>) -> Self {
        EntityExtractor { codecs }
    }

    /// Serialize `entity` as `media_type` and read the bytes back as `kind`.
    ///
    /// `headers` seeds the scratch headers the writer may update; the reader
    /// sees the updated copy, which is how a generated multipart boundary
    /// travels from writer to reader.
    ///
    /// # Errors
    ///
    /// [`DocsError::NoWriter`] or [`DocsError::NoReader`] when the registry
    /// cannot handle the combination, [`DocsError::MissingBoundary`] when a
    /// multipart body cannot be split.
    pub fn extract(
        &self,
        entity: &Entity,
        kind: EntityKind,
        media_type: &Mime,
        headers: &Headers,
    ) -> Result<Entity> {
        let mut scratch = headers.clone();
        let mut bytes = Vec::new();
        self.codecs.write(entity, media_type, &mut scratch, &mut bytes)?;
        trace!(bytes = bytes.len(), media_type = %media_type, "extracting entity");
        self.codecs.read(kind, media_type, &scratch, &mut bytes.as_slice())
    }

    /// Recover form fields
    pub fn extract_form(&self, entity: &Entity, media_type: &Mime) -> Result<Form> {
        match self.extract(entity, EntityKind::Form, media_type, &Headers::new())? {
            Entity::Form(form) => Ok(form),
            _ => Err(DocsError::NoReader {
                media_type: media_type.to_string(),
                kind: EntityKind::Form,
            }),
        }
    }

    /// Recover multipart parts
    pub fn extract_multipart(&self, entity: &Entity, media_type: &Mime) -> Result<MultipartForm> {
        match self.extract(entity, EntityKind::Multipart, media_type, &Headers::new())? {
            Entity::Multipart(multipart) => Ok(multipart),
            _ => Err(DocsError::NoReader {
                media_type: media_type.to_string(),
                kind: EntityKind::Multipart,
            }),
        }
    }
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new(Arc::new(Codecs::default()))
    }
}
