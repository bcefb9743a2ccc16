//! In-memory request entities.
//!
//! An [`Entity`] is the body a test hands to an invocation before it is
//! serialized. The same values come back out of the entity extractor, which
//! re-reads serialized bytes into a normalized [`Form`] or [`MultipartForm`].

use super::{Headers, Parameters};
use bytes::Bytes;
use mime::Mime;
use std::borrow::Cow;

/// Request body held by the caller before serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    /// Raw bytes, written as-is
    Bytes(Bytes),
    /// Text, written as UTF-8
    Text(String),
    /// JSON document
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded` form
    Form(Form),
    /// `multipart/form-data` container
    Multipart(MultipartForm),
}

/// Discriminant of [`Entity`], used to look up readers and writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// [`Entity::Bytes`]
    Bytes,
    /// [`Entity::Text`]
    Text,
    /// [`Entity::Json`]
    Json,
    /// [`Entity::Form`]
    Form,
    /// [`Entity::Multipart`]
    Multipart,
}

impl Entity {
    /// Kind of this entity
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Bytes(_) => EntityKind::Bytes,
            Entity::Text(_) => EntityKind::Text,
            Entity::Json(_) => EntityKind::Json,
            Entity::Form(_) => EntityKind::Form,
            Entity::Multipart(_) => EntityKind::Multipart,
        }
    }

    /// Media type used when the caller does not supply one
    pub fn default_media_type(&self) -> Mime {
        match self {
            Entity::Bytes(_) => mime::APPLICATION_OCTET_STREAM,
            Entity::Text(_) => mime::TEXT_PLAIN_UTF_8,
            Entity::Json(_) => mime::APPLICATION_JSON,
            Entity::Form(_) => mime::APPLICATION_WWW_FORM_URLENCODED,
            Entity::Multipart(_) => mime::MULTIPART_FORM_DATA,
        }
    }
}

impl From<Form> for Entity {
    fn from(form: Form) -> Self {
        Entity::Form(form)
    }
}

impl From<MultipartForm> for Entity {
    fn from(multipart: MultipartForm) -> Self {
        Entity::Multipart(multipart)
    }
}

impl From<serde_json::Value> for Entity {
    fn from(value: serde_json::Value) -> Self {
        Entity::Json(value)
    }
}

impl From<String> for Entity {
    fn from(text: String) -> Self {
        Entity::Text(text)
    }
}

impl From<&str> for Entity {
    fn from(text: &str) -> Self {
        Entity::Text(text.to_string())
    }
}

impl From<Bytes> for Entity {
    fn from(bytes: Bytes) -> Self {
        Entity::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Entity {
    fn from(bytes: Vec<u8>) -> Self {
        Entity::Bytes(Bytes::from(bytes))
    }
}

/// Ordered form fields.
///
/// ```
/// use restdocs_http::types::Form;
///
/// let form = Form::new().param("a", "alpha").param("b", "bravo");
/// assert_eq!(form.get_first("b"), Some("bravo"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    params: Parameters,
}

impl Form {
    /// Create an empty form
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field value
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.add(name, value);
        self
    }

    /// First value of a field
    pub fn get_first(&self, name: &str) -> Option<&str> {
        self.params.get_first(name)
    }

    /// All fields in insertion order
    pub fn as_parameters(&self) -> &Parameters {
        &self.params
    }

    /// Whether the form has no fields
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl From<Parameters> for Form {
    fn from(params: Parameters) -> Self {
        Form { params }
    }
}

/// One named part of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq)]
pub struct FormDataPart {
    name: String,
    filename: Option<String>,
    media_type: Mime,
    headers: Headers,
    content: Bytes,
}

impl FormDataPart {
    /// A plain text field
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        FormDataPart {
            name: name.into(),
            filename: None,
            media_type: mime::TEXT_PLAIN,
            headers: Headers::new(),
            content: Bytes::from(value.into()),
        }
    }

    /// A file field with a submitted filename
    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        media_type: Mime,
        content: impl Into<Bytes>,
    ) -> Self {
        FormDataPart {
            name: name.into(),
            filename: Some(filename.into()),
            media_type,
            headers: Headers::new(),
            content: content.into(),
        }
    }

    /// Assemble a part from already parsed pieces
    pub fn from_parts(
        name: impl Into<String>,
        filename: Option<String>,
        media_type: Mime,
        headers: Headers,
        content: Bytes,
    ) -> Self {
        FormDataPart {
            name: name.into(),
            filename,
            media_type,
            headers,
            content,
        }
    }

    /// Add a part header written after `Content-Disposition` and `Content-Type`
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    /// Field name from `Content-Disposition`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Submitted filename, if any
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Media type of the part content
    pub fn media_type(&self) -> &Mime {
        &self.media_type
    }

    /// Part headers
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Raw part content
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Content decoded as UTF-8, lossily
    pub fn value_as_string(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

/// Ordered `multipart/form-data` container.
///
/// ```
/// use restdocs_http::types::MultipartForm;
///
/// let multipart = MultipartForm::new()
///     .field("a", "alpha")
///     .field("b", "bravo");
/// assert_eq!(multipart.parts().len(), 2);
/// assert_eq!(multipart.fields("a")[0].value_as_string(), "alpha");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartForm {
    parts: Vec<FormDataPart>,
    boundary: Option<String>,
}

impl MultipartForm {
    /// Create an empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field
    pub fn field(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.part(FormDataPart::text(name, value))
    }

    /// Add a file field
    pub fn file(
        self,
        name: impl Into<String>,
        filename: impl Into<String>,
        media_type: Mime,
        content: impl Into<Bytes>,
    ) -> Self {
        self.part(FormDataPart::file(name, filename, media_type, content))
    }

    /// Add a prepared part
    pub fn part(mut self, part: FormDataPart) -> Self {
        self.parts.push(part);
        self
    }

    /// Use a fixed boundary instead of a generated one
    pub fn with_boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Fixed boundary, if one was set
    pub fn boundary(&self) -> Option<&str> {
        self.boundary.as_deref()
    }

    /// All parts in order
    pub fn parts(&self) -> &[FormDataPart] {
        &self.parts
    }

    /// Parts with the given field name, in order
    pub fn fields(&self, name: &str) -> Vec<&FormDataPart> {
        self.parts.iter().filter(|p| p.name == name).collect()
    }
}
