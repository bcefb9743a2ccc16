//! Documentation stage.
//!
//! A [`DocumentationFilter`] converts the captured exchange into an
//! [`Operation`] and hands it to its snippets. Only one documentation stage
//! exists per pipeline: the first registered filter is the primary of a
//! [`DocumentationChain`], and later registrations become its children. Every
//! member builds its own operation from the same captured context.

use super::{PipelineState, RequestContext, ResponseContext, ResponseFilter};
use crate::capture::Context;
use crate::convert::{
    DefaultRequestConverter, DefaultResponseConverter, RequestConverter, ResponseConverter,
};
use crate::error::{DocsError, Result};
use crate::preprocess::OperationPreprocessor;
use crate::protocol::constants::attributes;
use crate::snippet::Snippet;
use crate::target::uri_template;
use crate::types::Operation;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Documents one operation of an exchange.
#[derive(Clone)]
pub struct DocumentationFilter {
    identifier: String,
    snippets: Vec<Arc<dyn Snippet>>,
    request_preprocessors: Vec<Arc<dyn OperationPreprocessor>>,
    response_preprocessors: Vec<Arc<dyn OperationPreprocessor>>,
    request_converter: Arc<dyn RequestConverter>,
    response_converter: Arc<dyn ResponseConverter>,
}

/// Document the exchange as `identifier` with the given snippets.
///
/// ```
/// use restdocs_http::pipeline::document;
/// use restdocs_http::snippet::OperationRecorder;
///
/// let recorder = OperationRecorder::new();
/// let filter = document("create-team", vec![]).snippet(recorder.clone());
/// assert_eq!(filter.identifier(), "create-team");
/// ```
pub fn document(identifier: impl Into<String>, snippets: Vec<Arc<dyn Snippet>>) -> DocumentationFilter {
    DocumentationFilter::builder(identifier).snippets(snippets).build()
}

impl DocumentationFilter {
    /// Start building a filter
    pub fn builder(identifier: impl Into<String>) -> DocumentationFilterBuilder {
        DocumentationFilterBuilder {
            filter: DocumentationFilter {
                identifier: identifier.into(),
                snippets: Vec::new(),
                request_preprocessors: Vec::new(),
                response_preprocessors: Vec::new(),
                request_converter: Arc::new(DefaultRequestConverter),
                response_converter: Arc::new(DefaultResponseConverter),
            },
        }
    }

    /// Add a snippet
    pub fn snippet(mut self, snippet: impl Snippet + 'static) -> Self {
        self.snippets.push(Arc::new(snippet));
        self
    }

    /// Operation name
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Number of snippets this filter runs besides the defaults
    pub fn snippet_count(&self) -> usize {
        self.snippets.len()
    }

    /// Convert the captured exchange and run every snippet on the result.
    ///
    /// # Errors
    ///
    /// [`DocsError::NotConfigured`] when no configurer ran for this exchange,
    /// conversion errors, and [`DocsError::Snippet`] from failing snippets.
    pub fn handle(&self, request: &RequestContext, response: &ResponseContext) -> Result<Operation> {
        let context = request.context();
        let configuration = context.configuration().ok_or(DocsError::NotConfigured)?;
        let template = template_of(context);

        let operation_request = self
            .request_preprocessors
            .iter()
            .fold(self.request_converter.convert(request)?, |r, p| p.preprocess_request(r));
        let operation_response = self
            .response_preprocessors
            .iter()
            .fold(self.response_converter.convert(response, context)?, |r, p| {
                p.preprocess_response(r)
            });

        let mut values = configuration.attributes().clone();
        values.insert(attributes::URL_TEMPLATE.to_string(), template.clone().into());
        let operation = Operation::new(
            &self.identifier,
            template,
            operation_request,
            operation_response,
            values,
        );

        for snippet in configuration.default_snippets().iter().chain(&self.snippets) {
            snippet.document(&operation)?;
        }
        debug!(
            identifier = %self.identifier,
            uri_template = operation.uri_template(),
            "documented operation"
        );
        Ok(operation)
    }
}

fn template_of(context: &Context) -> String {
    uri_template(context.path_template(), context.query_template())
}

impl fmt::Debug for DocumentationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentationFilter")
            .field("identifier", &self.identifier)
            .field("snippets", &self.snippets.len())
            .finish()
    }
}

/// Builder for [`DocumentationFilter`].
pub struct DocumentationFilterBuilder {
    filter: DocumentationFilter,
}

impl DocumentationFilterBuilder {
    /// Add a snippet
    pub fn snippet(mut self, snippet: impl Snippet + 'static) -> Self {
        self.filter.snippets.push(Arc::new(snippet));
        self
    }

    /// Add several snippets
    pub fn snippets(mut self, snippets: Vec<Arc<dyn Snippet>>) -> Self {
        self.filter.snippets.extend(snippets);
        self
    }

    /// Rewrite the documented request before snippets see it
    pub fn preprocess_request(mut self, preprocessor: impl OperationPreprocessor + 'static) -> Self {
        self.filter.request_preprocessors.push(Arc::new(preprocessor));
        self
    }

    /// Rewrite the documented response before snippets see it
    pub fn preprocess_response(mut self, preprocessor: impl OperationPreprocessor + 'static) -> Self {
        self.filter.response_preprocessors.push(Arc::new(preprocessor));
        self
    }

    /// Replace the request converter
    pub fn request_converter(mut self, converter: impl RequestConverter + 'static) -> Self {
        self.filter.request_converter = Arc::new(converter);
        self
    }

    /// Replace the response converter
    pub fn response_converter(mut self, converter: impl ResponseConverter + 'static) -> Self {
        self.filter.response_converter = Arc::new(converter);
        self
    }

    /// Finish the filter
    pub fn build(self) -> DocumentationFilter {
        self.filter
    }
}

/// Primary documentation filter and the children it dispatches to.
#[derive(Debug, Clone)]
pub struct DocumentationChain {
    primary: DocumentationFilter,
    children: Vec<DocumentationFilter>,
}

impl DocumentationChain {
    /// Chain with `primary` and no children
    pub fn new(primary: DocumentationFilter) -> Self {
        DocumentationChain {
            primary,
            children: Vec::new(),
        }
    }

    /// Append a child
    pub fn add_child(&mut self, child: DocumentationFilter) {
        self.children.push(child);
    }

    /// The filter that owns the stage
    pub fn primary(&self) -> &DocumentationFilter {
        &self.primary
    }

    /// Children in registration order
    pub fn children(&self) -> &[DocumentationFilter] {
        &self.children
    }
}

impl ResponseFilter for DocumentationChain {
    fn filter(&self, request: &mut RequestContext, response: &mut ResponseContext) -> Result<()> {
        if request.context().configuration().is_none() {
            return Err(DocsError::NotConfigured);
        }
        request.context_mut().set_documentation(self.primary.identifier());

        self.primary.handle(request, response)?;
        for child in &self.children {
            debug!(
                primary = %self.primary.identifier(),
                child = %child.identifier(),
                "dispatching to child documentation filter"
            );
            child.handle(request, response)?;
        }

        request.context_mut().advance(PipelineState::Documented);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{documentation_configuration, ManualContextProvider};
    use crate::preprocess::remove_headers;
    use crate::snippet::OperationRecorder;
    use crate::types::Headers;
    use bytes::Bytes;
    use http::StatusCode;

    fn configured_request() -> RequestContext {
        let mut request = RequestContext::for_tests();
        let mut response = ResponseContext::new(StatusCode::OK, Headers::new());
        documentation_configuration(ManualContextProvider::new("target/snippets"))
            .filter(&mut request, &mut response)
            .unwrap();
        request
            .context_mut()
            .set_templates(Some("/teams/{id}".into()), Some("expand=members".into()));
        request
    }

    #[test]
    fn test_handle_builds_operation() {
        let recorder = OperationRecorder::new();
        let filter = document("get-team", vec![]).snippet(recorder.clone());

        let request = configured_request();
        let response = ResponseContext::new(StatusCode::OK, Headers::new());
        let operation = filter.handle(&request, &response).unwrap();

        assert_eq!(operation.name(), "get-team");
        assert_eq!(operation.uri_template(), "/teams/{id}?expand=members");
        assert_eq!(
            operation.attributes()[attributes::URL_TEMPLATE],
            serde_json::json!("/teams/{id}?expand=members")
        );
        assert_eq!(recorder.operations().len(), 1);
    }

    #[test]
    fn test_chain_runs_children_after_primary() {
        let recorder = OperationRecorder::new();
        let mut chain = DocumentationChain::new(document("primary", vec![]).snippet(recorder.clone()));
        chain.add_child(document("child-a", vec![]).snippet(recorder.clone()));
        chain.add_child(document("child-b", vec![]).snippet(recorder.clone()));

        let mut request = configured_request();
        let mut response = ResponseContext::new(StatusCode::OK, Headers::new());
        chain.filter(&mut request, &mut response).unwrap();

        let names: Vec<String> = recorder
            .operations()
            .iter()
            .map(|o| o.name().to_string())
            .collect();
        assert_eq!(names, vec!["primary", "child-a", "child-b"]);
        assert_eq!(request.context().documentation(), Some("primary"));
        assert_eq!(request.context().state(), PipelineState::Documented);
    }

    #[test]
    fn test_requires_configuration() {
        let filter = document("unconfigured", vec![]);
        let request = RequestContext::for_tests();
        let response = ResponseContext::new(StatusCode::OK, Headers::new());
        assert!(matches!(
            filter.handle(&request, &response),
            Err(DocsError::NotConfigured)
        ));
    }

    #[test]
    fn test_failing_snippet_surfaces() {
        let filter = document("broken", vec![])
            .snippet(|_: &Operation| -> anyhow::Result<()> { anyhow::bail!("template missing") });
        let request = configured_request();
        let response = ResponseContext::new(StatusCode::OK, Headers::new());
        let err = filter.handle(&request, &response).unwrap_err();
        assert!(matches!(err, DocsError::Snippet(ref m) if m.contains("template missing")));
    }

    #[test]
    fn test_preprocessors_apply_to_documented_view() {
        let recorder = OperationRecorder::new();
        let filter = DocumentationFilter::builder("trimmed")
            .preprocess_response(remove_headers(["X-Internal"]))
            .snippet(recorder.clone())
            .build();

        let mut request = configured_request();
        request.context_mut().set_response_body(Bytes::from_static(b"ok"));
        let headers: Headers = [("X-Internal", "1"), ("Content-Type", "text/plain")]
            .into_iter()
            .collect();
        let response = ResponseContext::new(StatusCode::OK, headers);
        filter.handle(&request, &response).unwrap();

        let operation = recorder.last().unwrap();
        assert!(!operation.response().headers().contains("x-internal"));
        assert_eq!(operation.response().content().as_ref(), b"ok");
        assert_eq!(response.headers().len(), 2);
    }
}
