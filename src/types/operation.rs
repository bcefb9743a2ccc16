//! The canonical operation snapshot handed to snippet generators.
//!
//! An [`Operation`] is built once per documented exchange and never mutated.
//! Preprocessors that need a different view build a new request or response
//! with the `with_*` methods, which consume the old value.

use super::{Headers, Parameters};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use http::{Method, StatusCode};
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::collections::BTreeMap;
use url::Url;

/// A documented request/response pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    name: String,
    uri_template: String,
    request: OperationRequest,
    response: OperationResponse,
    attributes: BTreeMap<String, serde_json::Value>,
}

impl Operation {
    /// Assemble an operation
    pub fn new(
        name: impl Into<String>,
        uri_template: impl Into<String>,
        request: OperationRequest,
        response: OperationResponse,
        attributes: BTreeMap<String, serde_json::Value>,
    ) -> Self {
        Operation {
            name: name.into(),
            uri_template: uri_template.into(),
            request,
            response,
            attributes,
        }
    }

    /// Documentation identifier, usually the snippet directory name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path and query with `{placeholders}` left unresolved
    pub fn uri_template(&self) -> &str {
        &self.uri_template
    }

    /// The request half
    pub fn request(&self) -> &OperationRequest {
        &self.request
    }

    /// The response half
    pub fn response(&self) -> &OperationResponse {
        &self.response
    }

    /// Renderer configuration captured for this operation
    pub fn attributes(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.attributes
    }

    /// Serialize as pretty JSON for snippet generators that consume files
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Request half of an [`Operation`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationRequest {
    #[serde(serialize_with = "display")]
    method: Method,
    #[serde(serialize_with = "display")]
    uri: Url,
    headers: Headers,
    #[serde(serialize_with = "content")]
    content: Bytes,
    query_parameters: Parameters,
    form_parameters: Parameters,
    parts: Vec<OperationPart>,
}

impl OperationRequest {
    /// Assemble a request snapshot
    pub fn new(
        method: Method,
        uri: Url,
        headers: Headers,
        content: Bytes,
        query_parameters: Parameters,
        form_parameters: Parameters,
        parts: Vec<OperationPart>,
    ) -> Self {
        OperationRequest {
            method,
            uri,
            headers,
            content,
            query_parameters,
            form_parameters,
            parts,
        }
    }

    /// HTTP method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Fully resolved URI
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Request headers in the order they were sent
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Captured request body; empty when there was none
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Body decoded as UTF-8, lossily
    pub fn content_as_string(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    /// Parameters parsed from the resolved URI's query string
    pub fn query_parameters(&self) -> &Parameters {
        &self.query_parameters
    }

    /// Parameters recovered from a form body
    pub fn form_parameters(&self) -> &Parameters {
        &self.form_parameters
    }

    /// Query parameters followed by form parameters
    pub fn parameters(&self) -> Parameters {
        let mut all = self.query_parameters.clone();
        all.extend(&self.form_parameters);
        all
    }

    /// Multipart parts in the order they were sent
    pub fn parts(&self) -> &[OperationPart] {
        &self.parts
    }

    /// Copy with a different URI
    pub fn with_uri(mut self, uri: Url) -> Self {
        self.uri = uri;
        self
    }

    /// Copy with different headers
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Copy with a different body
    pub fn with_content(mut self, content: impl Into<Bytes>) -> Self {
        self.content = content.into();
        self
    }

    /// Copy with different parts
    pub fn with_parts(mut self, parts: Vec<OperationPart>) -> Self {
        self.parts = parts;
        self
    }
}

/// Response half of an [`Operation`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResponse {
    #[serde(serialize_with = "status")]
    status: StatusCode,
    headers: Headers,
    #[serde(serialize_with = "content")]
    content: Bytes,
}

impl OperationResponse {
    /// Assemble a response snapshot
    pub fn new(status: StatusCode, headers: Headers, content: Bytes) -> Self {
        OperationResponse {
            status,
            headers,
            content,
        }
    }

    /// Status code
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers as the transport delivered them: names lowercased,
    /// repeated names grouped together in first-seen order
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Captured body prefix; empty when there was none
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Body decoded as UTF-8, lossily
    pub fn content_as_string(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    /// Copy with different headers
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Copy with a different body
    pub fn with_content(mut self, content: impl Into<Bytes>) -> Self {
        self.content = content.into();
        self
    }
}

/// One multipart part of an [`OperationRequest`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationPart {
    name: String,
    filename: Option<String>,
    #[serde(serialize_with = "content")]
    content: Bytes,
    headers: Headers,
}

impl OperationPart {
    /// Assemble a part
    pub fn new(
        name: impl Into<String>,
        filename: Option<String>,
        content: impl Into<Bytes>,
        headers: Headers,
    ) -> Self {
        OperationPart {
            name: name.into(),
            filename,
            content: content.into(),
            headers,
        }
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Submitted filename
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Part content
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Content decoded as UTF-8, lossily
    pub fn content_as_string(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    /// Part headers
    pub fn headers(&self) -> &Headers {
        &self.headers
    }
}

fn display<T: std::fmt::Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

fn status<S: Serializer>(status: &StatusCode, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u16(status.as_u16())
}

// Text bodies stay readable; anything else is base64.
fn content<S: Serializer>(content: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    match std::str::from_utf8(content) {
        Ok(text) => serializer.serialize_str(text),
        Err(_) => {
            let mut map = BTreeMap::new();
            map.insert("base64", STANDARD.encode(content));
            map.serialize(serializer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> OperationRequest {
        OperationRequest::new(
            Method::POST,
            Url::parse("http://localhost:8080/test/post-form?c=charlie").unwrap(),
            Headers::new(),
            Bytes::new(),
            Parameters::from_query("c=charlie"),
            Parameters::from_query("a=alpha&b=bravo"),
            Vec::new(),
        )
    }

    #[test]
    fn test_parameters_merge_query_first() {
        let merged = request().parameters();
        let names: Vec<&str> = merged.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_json_shape() {
        let operation = Operation::new(
            "form",
            "/test/post-form?c=charlie",
            request(),
            OperationResponse::new(StatusCode::OK, Headers::new(), Bytes::from_static(b"ok")),
            BTreeMap::new(),
        );
        let json: serde_json::Value = serde_json::from_str(&operation.to_json().unwrap()).unwrap();
        assert_eq!(json["request"]["method"], "POST");
        assert_eq!(json["response"]["status"], 200);
        assert_eq!(json["response"]["content"], "ok");
        assert_eq!(json["uri_template"], "/test/post-form?c=charlie");
    }

    #[test]
    fn test_binary_content_serializes_as_base64() {
        let part = OperationPart::new("file", None, vec![0xff, 0xfe], Headers::new());
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["content"]["base64"], "//4=");
    }
}
