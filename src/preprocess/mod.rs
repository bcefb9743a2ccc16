//! Operation preprocessors.
//!
//! Preprocessors rewrite the documented view of a request or response before
//! snippets see it. They never touch what went over the wire.
//!
//! ```
//! use restdocs_http::pipeline::DocumentationFilter;
//! use restdocs_http::preprocess::{binary_parts, pretty_print, remove_headers};
//!
//! let filter = DocumentationFilter::builder("upload-avatar")
//!     .preprocess_request(binary_parts().field("avatar"))
//!     .preprocess_request(remove_headers(["Authorization"]))
//!     .preprocess_response(pretty_print())
//!     .build();
//! assert_eq!(filter.identifier(), "upload-avatar");
//! ```

use crate::protocol::{self, constants::DEFAULT_BINARY_PLACEHOLDER};
use crate::types::{Headers, OperationPart, OperationRequest, OperationResponse};
use std::collections::BTreeMap;

/// Rewrites a documented request or response.
///
/// Both methods default to returning their input.
pub trait OperationPreprocessor: Send + Sync {
    /// Rewrite a request
    fn preprocess_request(&self, request: OperationRequest) -> OperationRequest {
        request
    }

    /// Rewrite a response
    fn preprocess_response(&self, response: OperationResponse) -> OperationResponse {
        response
    }
}

/// Replace the content of binary multipart fields with a placeholder.
pub fn binary_parts() -> BinaryParts {
    BinaryParts::default()
}

/// See [`binary_parts`].
#[derive(Debug, Clone, Default)]
pub struct BinaryParts {
    placeholders: BTreeMap<String, String>,
}

impl BinaryParts {
    /// Hide field `name` behind `<binary-data>`
    pub fn field(self, name: impl Into<String>) -> Self {
        self.field_with_placeholder(name, DEFAULT_BINARY_PLACEHOLDER)
    }

    /// Hide field `name` behind `placeholder`
    pub fn field_with_placeholder(mut self, name: impl Into<String>, placeholder: impl Into<String>) -> Self {
        self.placeholders.insert(name.into(), placeholder.into());
        self
    }
}

impl OperationPreprocessor for BinaryParts {
    fn preprocess_request(&self, request: OperationRequest) -> OperationRequest {
        if request.parts().is_empty() {
            return request;
        }
        let parts = request
            .parts()
            .iter()
            .map(|part| match self.placeholders.get(part.name()) {
                Some(placeholder) => OperationPart::new(
                    part.name(),
                    part.filename().map(str::to_string),
                    placeholder.clone(),
                    part.headers().clone(),
                ),
                None => part.clone(),
            })
            .collect();
        request.with_parts(parts)
    }
}

/// Remove the named headers from requests and responses.
pub fn remove_headers<I, S>(names: I) -> RemoveHeaders
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    RemoveHeaders {
        names: names.into_iter().map(Into::into).collect(),
    }
}

/// See [`remove_headers`].
#[derive(Debug, Clone)]
pub struct RemoveHeaders {
    names: Vec<String>,
}

impl RemoveHeaders {
    fn strip(&self, headers: &Headers) -> Headers {
        let mut headers = headers.clone();
        for name in &self.names {
            headers.remove(name);
        }
        headers
    }
}

impl OperationPreprocessor for RemoveHeaders {
    fn preprocess_request(&self, request: OperationRequest) -> OperationRequest {
        let headers = self.strip(request.headers());
        request.with_headers(headers)
    }

    fn preprocess_response(&self, response: OperationResponse) -> OperationResponse {
        let headers = self.strip(response.headers());
        response.with_headers(headers)
    }
}

/// Indent JSON content. Non-JSON content passes through.
pub fn pretty_print() -> PrettyPrint {
    PrettyPrint
}

/// See [`pretty_print`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PrettyPrint;

fn pretty(headers: &Headers, content: &[u8]) -> Option<Vec<u8>> {
    if content.is_empty() {
        return None;
    }
    let declared_json = headers
        .get_first(http::header::CONTENT_TYPE.as_str())
        .and_then(|value| protocol::parse_media_type(value).ok())
        .map(|media_type| protocol::is_json(&media_type));
    if declared_json == Some(false) {
        return None;
    }
    let value: serde_json::Value = serde_json::from_slice(content).ok()?;
    serde_json::to_vec_pretty(&value).ok()
}

impl OperationPreprocessor for PrettyPrint {
    fn preprocess_request(&self, request: OperationRequest) -> OperationRequest {
        match pretty(request.headers(), request.content()) {
            Some(content) => request.with_content(content),
            None => request,
        }
    }

    fn preprocess_response(&self, response: OperationResponse) -> OperationResponse {
        match pretty(response.headers(), response.content()) {
            Some(content) => response.with_content(content),
            None => response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Parameters;
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use url::Url;

    fn request(headers: Headers, content: &'static [u8], parts: Vec<OperationPart>) -> OperationRequest {
        OperationRequest::new(
            Method::POST,
            Url::parse("http://localhost/upload").unwrap(),
            headers,
            Bytes::from_static(content),
            Parameters::new(),
            Parameters::new(),
            parts,
        )
    }

    #[test]
    fn test_binary_parts_hides_named_fields() {
        let parts = vec![
            OperationPart::new("avatar", Some("me.png".into()), vec![0x89, 0x50, 0x4e], Headers::new()),
            OperationPart::new("caption", None, "hello", Headers::new()),
            OperationPart::new("thumb", None, vec![0u8; 4], Headers::new()),
        ];
        let preprocessor = binary_parts().field("avatar").field_with_placeholder("thumb", "<thumbnail>");
        let result = preprocessor.preprocess_request(request(Headers::new(), b"", parts));

        assert_eq!(result.parts()[0].content_as_string(), DEFAULT_BINARY_PLACEHOLDER);
        assert_eq!(result.parts()[0].filename(), Some("me.png"));
        assert_eq!(result.parts()[1].content_as_string(), "hello");
        assert_eq!(result.parts()[2].content_as_string(), "<thumbnail>");
    }

    #[test]
    fn test_remove_headers_is_case_insensitive() {
        let headers: Headers = [("Authorization", "Bearer x"), ("Accept", "*/*")].into_iter().collect();
        let result = remove_headers(["authorization"]).preprocess_request(request(headers, b"", vec![]));
        assert!(!result.headers().contains("Authorization"));
        assert!(result.headers().contains("Accept"));
    }

    #[test]
    fn test_pretty_print_json_only() {
        let json: Headers = [("Content-Type", "application/json")].into_iter().collect();
        let response = OperationResponse::new(StatusCode::OK, json, Bytes::from_static(br#"{"a":1}"#));
        let result = pretty_print().preprocess_response(response);
        assert_eq!(result.content_as_string(), "{\n  \"a\": 1\n}");

        let text: Headers = [("Content-Type", "text/plain")].into_iter().collect();
        let response = OperationResponse::new(StatusCode::OK, text, Bytes::from_static(br#"{"a":1}"#));
        let result = pretty_print().preprocess_response(response);
        assert_eq!(result.content_as_string(), r#"{"a":1}"#);
    }

    #[test]
    fn test_pretty_print_leaves_invalid_json() {
        let result = pretty_print().preprocess_request(request(Headers::new(), b"not json", vec![]));
        assert_eq!(result.content().as_ref(), b"not json");
    }
}
