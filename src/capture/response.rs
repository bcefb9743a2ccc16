//! Response body peek.
//!
//! Reads at most [`MAX_CAPTURED_RESPONSE`] bytes of the response entity into the
//! exchange context and rewinds the stream, so the caller still reads the full
//! body.

use super::stream::{EntityStream, ReplayReader};
use crate::error::Result;
use crate::pipeline::{PipelineState, RequestContext, ResponseContext, ResponseFilter};
use crate::protocol::constants::{MAX_CAPTURED_RESPONSE, TRUNCATION_MARKER};
use bytes::Bytes;
use std::io::Read;
use tracing::{debug, warn};

/// Captures a bounded prefix of the response entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponsePeekFilter;

impl ResponsePeekFilter {
    /// Read a bounded prefix of `stream` and rewind it.
    ///
    /// The stream must support mark/reset. Bodies longer than the limit are cut
    /// at the last complete UTF-8 sequence and get [`TRUNCATION_MARKER`]
    /// appended.
    pub fn peek(stream: &mut dyn EntityStream) -> Result<Bytes> {
        let limit = MAX_CAPTURED_RESPONSE + 1;
        stream.mark(limit);

        let mut prefix = Vec::with_capacity(limit);
        let read = Read::take(&mut *stream, limit as u64).read_to_end(&mut prefix);
        stream.reset()?;
        read?;

        if prefix.len() <= MAX_CAPTURED_RESPONSE {
            debug!(bytes = prefix.len(), "captured response body");
            return Ok(Bytes::from(String::from_utf8_lossy(&prefix).into_owned()));
        }

        let cut = utf8_cut(&prefix, MAX_CAPTURED_RESPONSE);
        warn!(
            limit = MAX_CAPTURED_RESPONSE,
            "response body exceeds capture limit, truncating"
        );
        let mut text = String::from_utf8_lossy(&prefix[..cut]).into_owned();
        text.push_str(TRUNCATION_MARKER);
        Ok(Bytes::from(text))
    }
}

/// Largest cut at or below `max` that does not split a UTF-8 sequence
fn utf8_cut(bytes: &[u8], max: usize) -> usize {
    let mut cut = max;
    while cut > 0 && max - cut < 3 && (bytes[cut] & 0xC0) == 0x80 {
        cut -= 1;
    }
    if (bytes[cut] & 0xC0) == 0x80 {
        max
    } else {
        cut
    }
}

impl ResponseFilter for ResponsePeekFilter {
    fn filter(&self, request: &mut RequestContext, response: &mut ResponseContext) -> Result<()> {
        if let Some(mut stream) = response.take_entity() {
            if !stream.mark_supported() {
                stream = Box::new(ReplayReader::new(stream));
            }
            let captured = Self::peek(&mut *stream);
            response.set_entity(stream);
            request.context_mut().set_response_body(captured?);
        }
        request.context_mut().advance(PipelineState::ResponseCaptured);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::BytesStream;
    use std::io;

    fn peek_text(body: Vec<u8>) -> (String, Vec<u8>) {
        let mut stream = BytesStream::new(Bytes::from(body));
        let captured = ResponsePeekFilter::peek(&mut stream).unwrap();
        let mut rest = Vec::new();
        stream.read_to_end(&mut rest).unwrap();
        (String::from_utf8(captured.to_vec()).unwrap(), rest)
    }

    #[test]
    fn test_exact_limit_captured_in_full() {
        let (text, rest) = peek_text(vec![b'x'; 8192]);
        assert_eq!(text.len(), 8192);
        assert!(!text.ends_with(TRUNCATION_MARKER));
        assert_eq!(rest.len(), 8192);
    }

    #[test]
    fn test_one_over_limit_truncated() {
        let (text, rest) = peek_text(vec![b'x'; 8193]);
        assert_eq!(text.len(), 8192 + TRUNCATION_MARKER.len());
        assert!(text.ends_with("...more..."));
        assert_eq!(rest.len(), 8193);
    }

    #[test]
    fn test_truncation_does_not_split_characters() {
        let mut body = vec![b'x'; 8191];
        body.extend_from_slice("é".as_bytes());
        body.extend_from_slice(b"tail");
        let (text, _) = peek_text(body);
        assert_eq!(text, format!("{}{}", "x".repeat(8191), TRUNCATION_MARKER));
    }

    #[test]
    fn test_empty_body() {
        let (text, rest) = peek_text(Vec::new());
        assert!(text.is_empty());
        assert!(rest.is_empty());
    }

    struct Unmarkable(io::Cursor<Vec<u8>>);

    impl Read for Unmarkable {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.0.read(buf)
        }
    }

    impl EntityStream for Unmarkable {}

    #[test]
    fn test_filter_wraps_unmarkable_stream() {
        let mut request = RequestContext::for_tests();
        let mut response = ResponseContext::new(http::StatusCode::OK, Default::default())
            .with_entity(Box::new(Unmarkable(io::Cursor::new(b"{\"id\":1}".to_vec()))));

        ResponsePeekFilter.filter(&mut request, &mut response).unwrap();

        assert_eq!(
            request.context().response_body().map(|b| b.as_ref()),
            Some(&b"{\"id\":1}"[..])
        );
        assert_eq!(request.context().state(), PipelineState::ResponseCaptured);
        assert_eq!(response.read_to_bytes().unwrap().as_ref(), b"{\"id\":1}");
    }

    #[test]
    fn test_filter_without_entity_leaves_slot_absent() {
        let mut request = RequestContext::for_tests();
        let mut response = ResponseContext::new(http::StatusCode::NO_CONTENT, Default::default());
        ResponsePeekFilter.filter(&mut request, &mut response).unwrap();
        assert!(request.context().response_body().is_none());
    }
}
