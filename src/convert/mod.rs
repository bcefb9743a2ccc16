//! Conversion of a captured exchange into [`OperationRequest`] and
//! [`OperationResponse`].
//!
//! Converters only look at what the exchange already captured; they never
//! touch the network or the disk.

mod extractor;

pub use extractor::EntityExtractor;

use crate::capture::Context;
use crate::error::Result;
use crate::pipeline::{RequestContext, ResponseContext};
use crate::protocol;
use crate::types::{FormDataPart, OperationPart, OperationRequest, OperationResponse, Parameters};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::Method;

/// Builds the documented request.
pub trait RequestConverter: Send + Sync {
    /// Convert the request side of an exchange
    fn convert(&self, request: &RequestContext) -> Result<OperationRequest>;
}

/// Builds the documented response.
pub trait ResponseConverter: Send + Sync {
    /// Convert the response side of an exchange
    fn convert(&self, response: &ResponseContext, context: &Context) -> Result<OperationResponse>;
}

/// Request converter used unless a filter is built with another.
///
/// - content is the captured request body, or empty when there was none;
///   form requests document an empty body and carry the form as parameters
/// - query parameters come from the resolved URI
/// - POST and PUT requests with a form or multipart entity get their fields
///   and parts from the [`EntityExtractor`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRequestConverter;

impl RequestConverter for DefaultRequestConverter {
    fn convert(&self, request: &RequestContext) -> Result<OperationRequest> {
        let uri = request.uri().clone();
        let query_parameters = Parameters::from_query(uri.query().unwrap_or(""));
        let mut content = request
            .context()
            .request_body()
            .cloned()
            .unwrap_or_default();
        let mut form_parameters = Parameters::new();
        let mut parts = Vec::new();

        let carries_fields = matches!(*request.method(), Method::POST | Method::PUT);
        if let (true, Some(entity), Some(media_type)) =
            (carries_fields, request.entity(), request.media_type())
        {
            let extractor = EntityExtractor::new(request.codecs().clone());
            if protocol::is_form(media_type) {
                let form = extractor.extract_form(entity, media_type)?;
                form_parameters = form.as_parameters().clone();
                content = Bytes::new();
            } else if protocol::is_multipart(media_type) {
                let multipart = extractor.extract_multipart(entity, media_type)?;
                parts = multipart.parts().iter().map(operation_part).collect();
            }
        }

        Ok(OperationRequest::new(
            request.method().clone(),
            uri,
            request.headers().clone(),
            content,
            query_parameters,
            form_parameters,
            parts,
        ))
    }
}

fn operation_part(part: &FormDataPart) -> OperationPart {
    let mut headers = part.headers().clone();
    if !headers.contains(CONTENT_TYPE.as_str()) {
        headers.add("Content-Type", part.media_type().to_string());
    }
    let filename = part
        .filename()
        .filter(|f| !f.is_empty())
        .map(str::to_string);
    OperationPart::new(part.name(), filename, part.content().clone(), headers)
}

/// Response converter used unless a filter is built with another.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResponseConverter;

impl ResponseConverter for DefaultResponseConverter {
    fn convert(&self, response: &ResponseContext, context: &Context) -> Result<OperationResponse> {
        Ok(OperationResponse::new(
            response.status(),
            response.headers().clone(),
            context.response_body().cloned().unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Codecs;
    use crate::types::{Entity, Form, Headers, MultipartForm};
    use http::StatusCode;
    use std::sync::Arc;
    use url::Url;

    fn request(method: Method, uri: &str, entity: Option<(Entity, mime::Mime)>, body: Option<&'static [u8]>) -> RequestContext {
        let headers: Headers = [("Accept", "application/json"), ("X-Trace", "a"), ("x-trace", "b")]
            .into_iter()
            .collect();
        let mut context = Context::new();
        if let Some(body) = body {
            context.set_request_body(Bytes::from_static(body));
        }
        let request = RequestContext::new(
            method,
            Url::parse(uri).unwrap(),
            headers,
            Arc::new(Codecs::default()),
            context,
        );
        match entity {
            Some((entity, media_type)) => request.with_entity(entity, media_type),
            None => request,
        }
    }

    #[test]
    fn test_get_without_body() {
        let converted = DefaultRequestConverter
            .convert(&request(Method::GET, "http://localhost/items?page=2&sort=name&page=3", None, None))
            .unwrap();
        assert!(converted.content().is_empty());
        assert_eq!(converted.query_parameters().get_all("page"), vec!["2", "3"]);
        assert_eq!(converted.headers().get_all("X-TRACE"), vec!["a", "b"]);
        let names: Vec<&str> = converted.headers().iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Accept", "X-Trace", "x-trace"]);
    }

    #[test]
    fn test_form_post_carries_parameters() {
        let form = Form::new().param("a", "alpha").param("b", "bravo");
        let converted = DefaultRequestConverter
            .convert(&request(
                Method::POST,
                "http://localhost/test/post-form?c=charlie&d=delta",
                Some((Entity::Form(form), mime::APPLICATION_WWW_FORM_URLENCODED)),
                Some(b"a=alpha&b=bravo"),
            ))
            .unwrap();
        assert!(converted.content().is_empty());
        assert_eq!(converted.form_parameters().get_first("a"), Some("alpha"));
        assert_eq!(converted.form_parameters().get_first("b"), Some("bravo"));
        assert_eq!(converted.query_parameters().get_first("d"), Some("delta"));
    }

    #[test]
    fn test_form_get_is_not_extracted() {
        let form = Form::new().param("a", "alpha");
        let converted = DefaultRequestConverter
            .convert(&request(
                Method::GET,
                "http://localhost/search",
                Some((Entity::Form(form), mime::APPLICATION_WWW_FORM_URLENCODED)),
                Some(b"a=alpha"),
            ))
            .unwrap();
        assert!(converted.form_parameters().is_empty());
        assert_eq!(converted.content().as_ref(), b"a=alpha");
    }

    #[test]
    fn test_multipart_parts() {
        let multipart = MultipartForm::new()
            .field("a", "alpha")
            .file("upload", "", mime::APPLICATION_OCTET_STREAM, vec![1u8, 2, 3]);
        let converted = DefaultRequestConverter
            .convert(&request(
                Method::PUT,
                "http://localhost/upload",
                Some((Entity::Multipart(multipart), mime::MULTIPART_FORM_DATA)),
                Some(b"raw"),
            ))
            .unwrap();
        let parts = converted.parts();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].name(), "a");
        assert_eq!(parts[0].content_as_string(), "alpha");
        assert_eq!(parts[0].headers().get_first("content-type"), Some("text/plain"));
        assert_eq!(parts[1].filename(), None);
        assert_eq!(parts[1].content().as_ref(), &[1u8, 2, 3]);
        assert_eq!(converted.content().as_ref(), b"raw");
    }

    #[test]
    fn test_response_uses_captured_body() {
        let headers: Headers = [("Content-Type", "application/json")].into_iter().collect();
        let response = ResponseContext::new(StatusCode::CREATED, headers);
        let mut context = Context::new();

        let empty = DefaultResponseConverter.convert(&response, &context).unwrap();
        assert!(empty.content().is_empty());

        context.set_response_body(Bytes::from_static(b"{\"id\":7}"));
        let converted = DefaultResponseConverter.convert(&response, &context).unwrap();
        assert_eq!(converted.status(), StatusCode::CREATED);
        assert_eq!(converted.content().as_ref(), b"{\"id\":7}");
    }
}
