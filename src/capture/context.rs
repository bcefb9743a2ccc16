//! Per-exchange context store.
//!
//! A [`Context`] is created when an invocation starts and dropped when it
//! returns. Pipeline stages own disjoint reserved slots; application code only
//! reaches the free-form property map, and writing a reserved name there is a
//! usage error.
//!
//! # Reserved Slots
//!
//! | Key | Writer | Reader |
//! |-----|--------|--------|
//! | `restdocs.request-body` | body capture interceptor | request converter |
//! | `restdocs.response-body` | response peek filter | response converter |
//! | `restdocs.path-template` / `restdocs.query-template` | invocation (from the tracker) | documentation filter |
//! | `restdocs.documentation-filter` | documentation stage | diagnostics |
//! | `restdocs.configuration` | configurer | documentation filter |

use crate::error::{DocsError, Result};
use crate::pipeline::{PipelineState, RendererConfiguration};
use crate::protocol::constants::keys;
use bytes::Bytes;
use std::collections::BTreeMap;

/// A reserved context key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservedKey {
    /// Captured request body
    RequestBody,
    /// Captured response body prefix
    ResponseBody,
    /// Path template accumulator
    PathTemplate,
    /// Query template accumulator
    QueryTemplate,
    /// Primary documentation registration
    DocumentationFilter,
    /// Renderer configuration
    Configuration,
}

impl ReservedKey {
    /// Every reserved key
    pub const ALL: [ReservedKey; 6] = [
        ReservedKey::RequestBody,
        ReservedKey::ResponseBody,
        ReservedKey::PathTemplate,
        ReservedKey::QueryTemplate,
        ReservedKey::DocumentationFilter,
        ReservedKey::Configuration,
    ];

    /// Property name of the key
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservedKey::RequestBody => keys::REQUEST_BODY,
            ReservedKey::ResponseBody => keys::RESPONSE_BODY,
            ReservedKey::PathTemplate => keys::PATH_TEMPLATE,
            ReservedKey::QueryTemplate => keys::QUERY_TEMPLATE,
            ReservedKey::DocumentationFilter => keys::DOCUMENTATION_FILTER,
            ReservedKey::Configuration => keys::CONFIGURATION,
        }
    }

    /// Look up a key by property name
    pub fn from_name(name: &str) -> Option<ReservedKey> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

/// Reject reserved property names.
///
/// # Errors
///
/// [`DocsError::ReservedProperty`] when `name` is one of [`keys::ALL`].
pub fn check_property_name(name: &str) -> Result<()> {
    match ReservedKey::from_name(name) {
        Some(key) => Err(DocsError::ReservedProperty(key.as_str().to_string())),
        None => Ok(()),
    }
}

/// Mutable state of one exchange.
#[derive(Debug, Default)]
pub struct Context {
    request_body: Option<Bytes>,
    response_body: Option<Bytes>,
    path_template: Option<String>,
    query_template: Option<String>,
    documentation: Option<String>,
    configuration: Option<RendererConfiguration>,
    state: PipelineState,
    properties: BTreeMap<String, serde_json::Value>,
}

impl Context {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an application property.
    ///
    /// # Errors
    ///
    /// [`DocsError::ReservedProperty`] for reserved names.
    pub fn set_property(
        &mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Result<()> {
        let name = name.into();
        check_property_name(&name)?;
        self.properties.insert(name, value.into());
        Ok(())
    }

    /// Application property by name
    pub fn property(&self, name: &str) -> Option<&serde_json::Value> {
        self.properties.get(name)
    }

    /// All application properties
    pub fn properties(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.properties
    }

    /// Whether a reserved slot holds a value
    pub fn contains(&self, key: ReservedKey) -> bool {
        match key {
            ReservedKey::RequestBody => self.request_body.is_some(),
            ReservedKey::ResponseBody => self.response_body.is_some(),
            ReservedKey::PathTemplate => self.path_template.is_some(),
            ReservedKey::QueryTemplate => self.query_template.is_some(),
            ReservedKey::DocumentationFilter => self.documentation.is_some(),
            ReservedKey::Configuration => self.configuration.is_some(),
        }
    }

    /// Bytes written for the request body; `None` when there was no body
    pub fn request_body(&self) -> Option<&Bytes> {
        self.request_body.as_ref()
    }

    /// Captured response prefix; `None` when the response had no entity
    pub fn response_body(&self) -> Option<&Bytes> {
        self.response_body.as_ref()
    }

    /// Accumulated path template
    pub fn path_template(&self) -> Option<&str> {
        self.path_template.as_deref()
    }

    /// Accumulated query template
    pub fn query_template(&self) -> Option<&str> {
        self.query_template.as_deref()
    }

    /// Identifier of the primary documentation registration
    pub fn documentation(&self) -> Option<&str> {
        self.documentation.as_deref()
    }

    /// Renderer configuration set by the configurer
    pub fn configuration(&self) -> Option<&RendererConfiguration> {
        self.configuration.as_ref()
    }

    /// Current pipeline state
    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub(crate) fn set_request_body(&mut self, body: Bytes) {
        self.request_body = Some(body);
    }

    pub(crate) fn set_response_body(&mut self, body: Bytes) {
        self.response_body = Some(body);
    }

    pub(crate) fn set_templates(&mut self, path: Option<String>, query: Option<String>) {
        self.path_template = path;
        self.query_template = query;
    }

    pub(crate) fn set_documentation(&mut self, identifier: impl Into<String>) {
        self.documentation = Some(identifier.into());
    }

    pub(crate) fn set_configuration(&mut self, configuration: RendererConfiguration) {
        self.configuration = Some(configuration);
    }

    pub(crate) fn advance(&mut self, state: PipelineState) {
        if state > self.state {
            self.state = state;
        }
    }
}
