//! Per-exchange configuration.
//!
//! The [`Configurer`] is the first built-in stage. It asks its
//! [`ContextProvider`] for the current [`DocumentationContext`], computes the
//! renderer attributes every operation of the exchange carries, applies URI
//! overrides to the documented request, and attaches the result to the
//! exchange [`Context`](crate::capture::Context).
//!
//! # Examples
//!
//! ```
//! use restdocs_http::pipeline::{documentation_configuration, ManualContextProvider, UriConfigurer};
//!
//! let configurer = documentation_configuration(ManualContextProvider::new("target/generated-snippets"))
//!     .uris(UriConfigurer::new().with_scheme("https").with_host("api.example.com").remove_port());
//! ```

use super::{PipelineState, RequestContext, ResponseContext, ResponseFilter};
use crate::error::{DocsError, Result};
use crate::protocol::constants::attributes;
use crate::snippet::Snippet;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Where and for which test an operation is documented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentationContext {
    /// Base directory for generated snippets
    pub output_directory: PathBuf,
    /// Name of the running test
    pub test_name: String,
    /// One-based operation counter within the test
    pub step: usize,
}

/// Supplies the documentation context for each operation.
pub trait ContextProvider: Send + Sync {
    /// Called once per exchange, before the operation is documented
    fn before_operation(&self) -> DocumentationContext;
}

/// Context provider driven explicitly by the test.
#[derive(Debug)]
pub struct ManualContextProvider {
    output_directory: PathBuf,
    test_name: Mutex<String>,
    step: AtomicUsize,
}

impl ManualContextProvider {
    /// Provider writing below `output_directory`
    pub fn new(output_directory: impl Into<PathBuf>) -> Self {
        ManualContextProvider {
            output_directory: output_directory.into(),
            test_name: Mutex::new(String::new()),
            step: AtomicUsize::new(0),
        }
    }

    /// Start a new test; the step counter restarts
    pub fn before_test(&self, test_name: impl Into<String>) {
        *self.test_name.lock() = test_name.into();
        self.step.store(0, Ordering::SeqCst);
    }
}

impl ContextProvider for ManualContextProvider {
    fn before_operation(&self) -> DocumentationContext {
        DocumentationContext {
            output_directory: self.output_directory.clone(),
            test_name: self.test_name.lock().clone(),
            step: self.step.fetch_add(1, Ordering::SeqCst) + 1,
        }
    }
}

impl<P: ContextProvider + ?Sized> ContextProvider for Arc<P> {
    fn before_operation(&self) -> DocumentationContext {
        (**self).before_operation()
    }
}

/// Rewrites scheme, host and port of the documented URI.
///
/// Only the documentation sees the rewritten URI; the request was already sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UriConfigurer {
    /// Scheme to document
    pub scheme: Option<String>,
    /// Host to document
    pub host: Option<String>,
    /// Port to document
    pub port: Option<u16>,
    /// Document the URI without a port
    pub remove_port: bool,
}

impl UriConfigurer {
    /// No overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Document `scheme` instead of the real one
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// Document `host` instead of the real one
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Document `port` instead of the real one
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self.remove_port = false;
        self
    }

    /// Document the URI without a port
    pub fn remove_port(mut self) -> Self {
        self.port = None;
        self.remove_port = true;
        self
    }

    /// Apply the overrides to `uri`
    pub fn apply(&self, uri: &mut Url) -> Result<()> {
        if let Some(scheme) = &self.scheme {
            uri.set_scheme(scheme)
                .map_err(|_| DocsError::InvalidUri(format!("cannot use scheme '{}' for {}", scheme, uri)))?;
        }
        if let Some(host) = &self.host {
            uri.set_host(Some(host))?;
        }
        let port = if self.remove_port { None } else { self.port };
        if self.remove_port || self.port.is_some() {
            uri.set_port(port)
                .map_err(|_| DocsError::InvalidUri(format!("cannot set port on {}", uri)))?;
        }
        Ok(())
    }
}

/// Documentation settings shared by every exchange of a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentationConfig {
    /// Overrides the provider's output directory
    pub output_directory: Option<PathBuf>,
    /// Encoding snippets are written with
    pub snippet_encoding: String,
    /// Template format snippets are rendered in
    pub template_format: String,
    /// Names of the snippets every operation gets
    pub default_snippets: Vec<String>,
    /// URI overrides
    pub uris: UriConfigurer,
}

impl Default for DocumentationConfig {
    fn default() -> Self {
        DocumentationConfig {
            output_directory: None,
            snippet_encoding: "UTF-8".to_string(),
            template_format: "asciidoctor".to_string(),
            default_snippets: [
                "curl-request",
                "httpie-request",
                "http-request",
                "http-response",
                "request-body",
                "response-body",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            uris: UriConfigurer::default(),
        }
    }
}

impl DocumentationConfig {
    /// Load settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Configuration attached to one exchange by the [`Configurer`].
#[derive(Clone)]
pub struct RendererConfiguration {
    context: DocumentationContext,
    attributes: BTreeMap<String, Value>,
    default_snippets: Vec<Arc<dyn Snippet>>,
}

impl RendererConfiguration {
    /// Documentation context of this operation
    pub fn context(&self) -> &DocumentationContext {
        &self.context
    }

    /// Attributes copied into every operation
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// Snippets run for every documentation registration
    pub fn default_snippets(&self) -> &[Arc<dyn Snippet>] {
        &self.default_snippets
    }
}

impl fmt::Debug for RendererConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererConfiguration")
            .field("context", &self.context)
            .field("attributes", &self.attributes)
            .field("default_snippets", &self.default_snippets.len())
            .finish()
    }
}

/// Context initializer stage.
#[derive(Clone)]
pub struct Configurer {
    provider: Arc<dyn ContextProvider>,
    config: DocumentationConfig,
    default_snippets: Vec<Arc<dyn Snippet>>,
}

/// Start configuring documentation for a target.
pub fn documentation_configuration(provider: impl ContextProvider + 'static) -> Configurer {
    Configurer {
        provider: Arc::new(provider),
        config: DocumentationConfig::default(),
        default_snippets: Vec::new(),
    }
}

impl Configurer {
    /// Replace all settings
    pub fn with_config(mut self, config: DocumentationConfig) -> Self {
        self.config = config;
        self
    }

    /// Snippets run for every operation, before the registration's own
    pub fn snippets(mut self, snippets: Vec<Arc<dyn Snippet>>) -> Self {
        self.default_snippets = snippets;
        self
    }

    /// URI overrides for documented requests
    pub fn uris(mut self, uris: UriConfigurer) -> Self {
        self.config.uris = uris;
        self
    }

    /// Encoding snippets are written with
    pub fn snippet_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.config.snippet_encoding = encoding.into();
        self
    }

    /// Current settings
    pub fn config(&self) -> &DocumentationConfig {
        &self.config
    }

    fn configuration(&self) -> RendererConfiguration {
        let mut context = self.provider.before_operation();
        if let Some(dir) = &self.config.output_directory {
            context.output_directory = dir.clone();
        }

        let mut values = BTreeMap::new();
        values.insert(
            attributes::OUTPUT_DIRECTORY.to_string(),
            json!(context.output_directory.to_string_lossy()),
        );
        values.insert(attributes::TEST_NAME.to_string(), json!(context.test_name));
        values.insert(attributes::STEP.to_string(), json!(context.step));
        values.insert(
            attributes::SNIPPET_ENCODING.to_string(),
            json!(self.config.snippet_encoding),
        );
        values.insert(
            attributes::TEMPLATE_FORMAT.to_string(),
            json!(self.config.template_format),
        );
        values.insert(
            attributes::DEFAULT_SNIPPETS.to_string(),
            json!(self.config.default_snippets),
        );

        RendererConfiguration {
            context,
            attributes: values,
            default_snippets: self.default_snippets.clone(),
        }
    }
}

impl fmt::Debug for Configurer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configurer")
            .field("config", &self.config)
            .field("default_snippets", &self.default_snippets.len())
            .finish()
    }
}

impl ResponseFilter for Configurer {
    fn filter(&self, request: &mut RequestContext, _response: &mut ResponseContext) -> Result<()> {
        let configuration = self.configuration();
        debug!(
            test = %configuration.context.test_name,
            step = configuration.context.step,
            "initialized documentation context"
        );

        let mut uri = request.uri().clone();
        self.config.uris.apply(&mut uri)?;
        request.set_uri(uri);

        let context = request.context_mut();
        context.set_configuration(configuration);
        context.advance(PipelineState::ContextInitialized);
        Ok(())
    }
}
