//! Template-tracking target decorator.

use super::{UriTarget, UriTemplateAccumulator, WebTarget};
use crate::capture::check_property_name;
use crate::client::{DocsClient, Invocation};
use crate::error::Result;
use crate::pipeline::{Pipeline, Registration, ResponseFilter, Stage};
use crate::protocol::constants::priorities;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

/// Wraps a [`WebTarget`] and mirrors path and query calls into a URI template.
///
/// Methods that derive a new target take `&self` and return a new tracker with
/// its own copy of the template. Methods that configure this target take
/// `&mut self` and return the same tracker.
///
/// ```
/// use restdocs_http::DocsClient;
///
/// let client = DocsClient::new().unwrap();
/// let target = client
///     .target("http://localhost:8080")
///     .unwrap()
///     .path("test/post-form")
///     .query_param("c", &["charlie"])
///     .query_param("d", &["delta"]);
/// assert_eq!(target.uri_template(), "/test/post-form?c=charlie&d=delta");
/// ```
///
/// Documentation filters are registered from a value, never by type:
///
/// ```compile_fail
/// use restdocs_http::pipeline::DocumentationFilter;
/// use restdocs_http::DocsClient;
///
/// let mut target = DocsClient::new().unwrap().target("http://localhost").unwrap();
/// target.register_type::<DocumentationFilter>();
/// ```
#[derive(Clone)]
pub struct TrackingTarget<T: WebTarget = UriTarget> {
    inner: T,
    template: UriTemplateAccumulator,
    pipeline: Pipeline,
    properties: BTreeMap<String, Value>,
    client: DocsClient,
}

impl<T: WebTarget> TrackingTarget<T> {
    /// Track `inner`, sending through `client`
    pub fn new(client: DocsClient, inner: T) -> Self {
        TrackingTarget {
            inner,
            template: UriTemplateAccumulator::new(),
            pipeline: Pipeline::new(),
            properties: BTreeMap::new(),
            client,
        }
    }

    fn derive(&self, inner: T) -> Self {
        TrackingTarget {
            inner,
            template: self.template.clone(),
            pipeline: self.pipeline.clone(),
            properties: self.properties.clone(),
            client: self.client.clone(),
        }
    }

    /// Append a path segment to both the target and the template
    pub fn path(&self, segment: &str) -> Self {
        let mut target = self.derive(self.inner.path(segment));
        target.template.append_path(segment);
        target
    }

    /// Append one `name=value` pair per value to both the target and the template
    pub fn query_param(&self, name: &str, values: &[&str]) -> Self {
        let mut target = self.derive(self.inner.query_param(name, values));
        for value in values {
            target.template.append_query(name, value);
        }
        target
    }

    /// Resolve a placeholder; the template keeps it
    pub fn resolve_template(&self, name: &str, value: impl ToString) -> Self {
        self.derive(self.inner.resolve_template(name, &value.to_string()))
    }

    /// Resolve several placeholders; an empty map leaves this target as is
    pub fn resolve_templates(&self, values: &BTreeMap<String, String>) -> Cow<'_, Self> {
        if values.is_empty() {
            Cow::Borrowed(self)
        } else {
            Cow::Owned(self.derive(self.inner.resolve_templates(values)))
        }
    }

    /// Set an application property copied into every exchange's context.
    ///
    /// # Errors
    ///
    /// [`DocsError::ReservedProperty`](crate::DocsError::ReservedProperty) for
    /// reserved names.
    pub fn property(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        check_property_name(name)?;
        self.properties.insert(name.to_string(), value.into());
        Ok(self)
    }

    /// Register a pipeline component.
    ///
    /// # Errors
    ///
    /// [`DocsError::DuplicateStage`](crate::DocsError::DuplicateStage) when the
    /// stage is already registered. Documentation filters fan out instead.
    pub fn register(&mut self, component: impl Into<Registration>) -> Result<&mut Self> {
        self.pipeline.register(component)?;
        Ok(self)
    }

    /// Register a default-constructed filter at user priority, named after its type
    pub fn register_type<F>(&mut self) -> Result<&mut Self>
    where
        F: ResponseFilter + Default + 'static,
    {
        self.pipeline.register(Registration::Filter {
            stage: Stage::Custom(std::any::type_name::<F>().to_string()),
            priority: priorities::USER,
            filter: Arc::new(F::default()),
        })?;
        Ok(self)
    }

    /// Start building a request to this target
    pub fn request(&self) -> Invocation<T> {
        Invocation::new(self.clone())
    }

    /// Resolved URI of the wrapped target
    pub fn uri(&self) -> Result<Url> {
        self.inner.uri()
    }

    /// Accumulated URI template
    pub fn uri_template(&self) -> String {
        self.template.to_template()
    }

    /// Template accumulator
    pub fn template(&self) -> &UriTemplateAccumulator {
        &self.template
    }

    /// Wrapped target
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Registered pipeline
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Application properties
    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    /// Client requests are sent through
    pub fn client(&self) -> &DocsClient {
        &self.client
    }
}

impl<T: WebTarget + std::fmt::Debug> std::fmt::Debug for TrackingTarget<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingTarget")
            .field("inner", &self.inner)
            .field("template", &self.template)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocsError;
    use crate::pipeline::{RequestContext, ResponseContext};
    use crate::protocol::constants::keys;

    fn target() -> TrackingTarget {
        DocsClient::new().unwrap().target("http://localhost:8080").unwrap()
    }

    #[test]
    fn test_resolving_keeps_template() {
        let target = target().path("teams/{id}").resolve_template("id", 42);
        assert_eq!(target.uri_template(), "/teams/{id}");
        assert_eq!(target.uri().unwrap().as_str(), "http://localhost:8080/teams/42");
    }

    #[test]
    fn test_derived_targets_are_independent() {
        let base = target().path("teams");
        let members = base.path("members/");
        assert_eq!(base.uri_template(), "/teams");
        assert_eq!(members.uri_template(), "/teams/members");
    }

    #[test]
    fn test_query_values_each_produce_a_pair() {
        let target = target().query_param("tag", &["a", "b"]).query_param("page", &["1"]);
        assert_eq!(target.template().query(), "tag=a&tag=b&page=1");
        assert_eq!(target.uri().unwrap().query(), Some("tag=a&tag=b&page=1"));
    }

    #[test]
    fn test_empty_resolve_returns_same_instance() {
        let target = target().path("{id}");
        match target.resolve_templates(&BTreeMap::new()) {
            Cow::Borrowed(same) => assert!(std::ptr::eq(same, &target)),
            Cow::Owned(_) => panic!("expected the same instance"),
        }

        let mut values = BTreeMap::new();
        values.insert("id".to_string(), "9".to_string());
        let resolved = target.resolve_templates(&values);
        assert!(matches!(resolved, Cow::Owned(_)));
        assert_eq!(resolved.uri_template(), "/{id}");
    }

    #[test]
    fn test_configuration_returns_same_instance() {
        let mut target = target();
        let original: *const TrackingTarget = &target;
        let returned: *const TrackingTarget = target.property("team", "blue").unwrap();
        assert_eq!(original, returned);
        assert_eq!(target.properties()["team"], Value::from("blue"));
    }

    #[test]
    fn test_reserved_property_rejected() {
        let mut target = target();
        let err = target.property(keys::REQUEST_BODY, "x").unwrap_err();
        assert!(matches!(err, DocsError::ReservedProperty(_)));
        assert!(target.properties().is_empty());
    }

    #[derive(Default)]
    struct Audit;

    impl ResponseFilter for Audit {
        fn filter(&self, _request: &mut RequestContext, _response: &mut ResponseContext) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_register_type_once() {
        let mut target = target();
        target.register_type::<Audit>().unwrap();
        assert!(matches!(
            target.register_type::<Audit>(),
            Err(DocsError::DuplicateStage(_))
        ));
        let (stage, priority) = target.pipeline().stages()[0];
        assert!(matches!(stage, Stage::Custom(name) if name.ends_with("Audit")));
        assert_eq!(priority, priorities::USER);
    }
}
