//! Request body capture.
//!
//! Serialization of a request entity runs through a chain of
//! [`WriterInterceptor`]s ending in the [`Codecs`] writer. [`RequestBodyCapture`]
//! sits in that chain, diverts the serialized bytes into a [`CaptureBuffer`],
//! records them in the [`Context`], and forwards them to the real sink.

use super::Context;
use crate::codec::Codecs;
use crate::error::Result;
use crate::types::{Entity, Headers};
use bytes::{Bytes, BytesMut};
use mime::Mime;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::debug;

/// Sink the serialized entity is written to.
pub type Sink<'a> = Box<dyn Write + Send + 'a>;

/// Hook around entity serialization.
pub trait WriterInterceptor: Send + Sync {
    /// Wrap the rest of the chain; call [`WriterContext::proceed`] to continue
    fn around_write(&self, ctx: &mut WriterContext<'_>) -> Result<()>;
}

/// State of one serialization pass through the interceptor chain.
pub struct WriterContext<'a> {
    entity: &'a Entity,
    media_type: &'a Mime,
    headers: &'a mut Headers,
    context: &'a mut Context,
    codecs: &'a Codecs,
    interceptors: &'a [Arc<dyn WriterInterceptor>],
    next: usize,
    sink: Sink<'a>,
}

impl<'a> WriterContext<'a> {
    /// Start a pass writing `entity` into `sink`
    pub fn new(
        entity: &'a Entity,
        media_type: &'a Mime,
        headers: &'a mut Headers,
        context: &'a mut Context,
        codecs: &'a Codecs,
        interceptors: &'a [Arc<dyn WriterInterceptor>],
        sink: Sink<'a>,
    ) -> Self {
        WriterContext {
            entity,
            media_type,
            headers,
            context,
            codecs,
            interceptors,
            next: 0,
            sink,
        }
    }

    /// Run the next interceptor, or the codec writer at the end of the chain
    pub fn proceed(&mut self) -> Result<()> {
        let interceptors = self.interceptors;
        match interceptors.get(self.next) {
            Some(interceptor) => {
                self.next += 1;
                let result = interceptor.around_write(self);
                self.next -= 1;
                result
            }
            None => self
                .codecs
                .write(self.entity, self.media_type, self.headers, &mut self.sink),
        }
    }

    /// Swap the sink, returning the previous one
    pub fn replace_sink(&mut self, sink: Sink<'a>) -> Sink<'a> {
        std::mem::replace(&mut self.sink, sink)
    }

    /// Entity being written
    pub fn entity(&self) -> &Entity {
        self.entity
    }

    /// Media type the entity is written as
    pub fn media_type(&self) -> &Mime {
        self.media_type
    }

    /// Outgoing request headers
    pub fn headers(&self) -> &Headers {
        &*self.headers
    }

    /// Exchange context
    pub fn context(&self) -> &Context {
        &*self.context
    }

    /// Exchange context, mutably
    pub fn context_mut(&mut self) -> &mut Context {
        &mut *self.context
    }
}

/// Shared in-memory sink.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    inner: Arc<Mutex<BytesMut>>,
}

impl CaptureBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything written so far
    pub fn take(&self) -> Bytes {
        self.inner.lock().split().freeze()
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether nothing has been written
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Restores the original sink when dropped.
struct SinkGuard<'c, 'a> {
    ctx: &'c mut WriterContext<'a>,
    original: Option<Sink<'a>>,
}

impl Drop for SinkGuard<'_, '_> {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            self.ctx.replace_sink(original);
        }
    }
}

/// Records the serialized request body in the exchange [`Context`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestBodyCapture;

impl WriterInterceptor for RequestBodyCapture {
    fn around_write(&self, ctx: &mut WriterContext<'_>) -> Result<()> {
        let buffer = CaptureBuffer::new();
        let original = ctx.replace_sink(Box::new(buffer.clone()));
        let mut guard = SinkGuard {
            ctx,
            original: Some(original),
        };

        guard.ctx.proceed()?;

        let body = buffer.take();
        debug!(bytes = body.len(), "captured request body");
        guard.ctx.context_mut().set_request_body(body.clone());
        if let Some(original) = guard.original.as_mut() {
            original.write_all(&body)?;
            original.flush()?;
        }
        Ok(())
    }
}
