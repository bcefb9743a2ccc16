//! Response entity streams with mark/reset support.
//!
//! The response peek filter reads a prefix of the body and then rewinds, so the
//! caller still sees the whole entity. Streams that cannot rewind on their own
//! are wrapped in a [`ReplayReader`].

use bytes::Bytes;
use std::io::{self, Cursor, Read};

/// Readable entity that may support rewinding to a mark.
pub trait EntityStream: Read + Send {
    /// Whether [`mark`](Self::mark) and [`reset`](Self::reset) work
    fn mark_supported(&self) -> bool {
        false
    }

    /// Remember the current position; at least `read_limit` bytes stay replayable
    fn mark(&mut self, _read_limit: usize) {}

    /// Rewind to the last mark
    fn reset(&mut self) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "mark/reset not supported",
        ))
    }
}

/// Fully buffered entity.
#[derive(Debug, Clone)]
pub struct BytesStream {
    cursor: Cursor<Bytes>,
    mark: u64,
}

impl BytesStream {
    /// Stream over `bytes` from the start
    pub fn new(bytes: Bytes) -> Self {
        BytesStream {
            cursor: Cursor::new(bytes),
            mark: 0,
        }
    }
}

impl Read for BytesStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl EntityStream for BytesStream {
    fn mark_supported(&self) -> bool {
        true
    }

    fn mark(&mut self, _read_limit: usize) {
        self.mark = self.cursor.position();
    }

    fn reset(&mut self) -> io::Result<()> {
        self.cursor.set_position(self.mark);
        Ok(())
    }
}

/// Buffering adapter that adds mark/reset to any reader.
///
/// Bytes read after a mark are retained until more than the mark's read limit
/// has been consumed, at which point the mark is invalidated.
pub struct ReplayReader<R> {
    inner: R,
    buffer: Vec<u8>,
    pos: usize,
    mark: Option<usize>,
    limit: usize,
}

impl<R: Read + Send> ReplayReader<R> {
    /// Wrap a reader
    pub fn new(inner: R) -> Self {
        ReplayReader {
            inner,
            buffer: Vec::new(),
            pos: 0,
            mark: None,
            limit: 0,
        }
    }

    /// Unwrap the inner reader, dropping any replay buffer
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Send> Read for ReplayReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos < self.buffer.len() {
            let n = (&self.buffer[self.pos..]).read(buf)?;
            self.pos += n;
            return Ok(n);
        }

        let n = self.inner.read(buf)?;
        match self.mark {
            Some(_) if self.buffer.len() + n <= self.limit => {
                self.buffer.extend_from_slice(&buf[..n]);
                self.pos = self.buffer.len();
            }
            Some(_) => {
                self.mark = None;
                self.buffer.clear();
                self.pos = 0;
            }
            None => {
                self.buffer.clear();
                self.pos = 0;
            }
        }
        Ok(n)
    }
}

impl<R: Read + Send> EntityStream for ReplayReader<R> {
    fn mark_supported(&self) -> bool {
        true
    }

    fn mark(&mut self, read_limit: usize) {
        self.buffer.drain(..self.pos);
        self.pos = 0;
        self.mark = Some(0);
        self.limit = read_limit;
    }

    fn reset(&mut self) -> io::Result<()> {
        match self.mark {
            Some(mark) => {
                self.pos = mark;
                Ok(())
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "resetting to invalid mark",
            )),
        }
    }
}

impl<R> std::fmt::Debug for ReplayReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayReader")
            .field("buffered", &self.buffer.len())
            .field("pos", &self.pos)
            .field("mark", &self.mark)
            .finish()
    }
}
