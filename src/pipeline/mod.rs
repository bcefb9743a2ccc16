//! Ordered response pipeline.
//!
//! After the transport returns, each exchange runs an explicit list of stages in
//! ascending priority:
//!
//! ```text
//! Unconfigured --Configurer(4000)--> ContextInitialized
//!              --ResponsePeek(4100)--> ResponseCaptured
//!              --Documentation(4200)--> Documented
//! ```
//!
//! Built-in stages appear at most once. Registering a second documentation
//! filter adds it as a child of the first, which dispatches to it after its
//! own processing.

mod configurer;
mod documentation;

pub use configurer::{
    documentation_configuration, Configurer, ContextProvider, DocumentationConfig,
    DocumentationContext, ManualContextProvider, RendererConfiguration, UriConfigurer,
};
pub use documentation::{document, DocumentationChain, DocumentationFilter, DocumentationFilterBuilder};

use crate::capture::{BytesStream, Context, EntityStream, ResponsePeekFilter};
use crate::codec::Codecs;
use crate::error::{DocsError, Result};
use crate::protocol::constants::priorities;
use crate::types::{Entity, Headers};
use bytes::Bytes;
use http::{Method, StatusCode};
use mime::Mime;
use std::fmt;
use std::io::Read;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Progress of one exchange through the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineState {
    /// Nothing has run yet
    #[default]
    Unconfigured,
    /// Configurer attached the renderer configuration
    ContextInitialized,
    /// Response prefix captured (or there was no entity)
    ResponseCaptured,
    /// Every documentation registration has produced its operation
    Documented,
}

/// Identity of a pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Context initializer
    Configurer,
    /// Response body capture
    ResponsePeek,
    /// Documentation filter chain
    Documentation,
    /// Application filter
    Custom(String),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Configurer => write!(f, "configurer"),
            Stage::ResponsePeek => write!(f, "response-peek"),
            Stage::Documentation => write!(f, "documentation"),
            Stage::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// Callback run after the response arrives.
pub trait ResponseFilter: Send + Sync {
    /// Inspect or adjust the exchange
    fn filter(&self, request: &mut RequestContext, response: &mut ResponseContext) -> Result<()>;
}

/// Request side of a completed exchange.
#[derive(Debug)]
pub struct RequestContext {
    method: Method,
    uri: Url,
    headers: Headers,
    entity: Option<Entity>,
    media_type: Option<Mime>,
    codecs: Arc<Codecs>,
    context: Context,
}

impl RequestContext {
    /// Describe a request that was sent
    pub fn new(method: Method, uri: Url, headers: Headers, codecs: Arc<Codecs>, context: Context) -> Self {
        RequestContext {
            method,
            uri,
            headers,
            entity: None,
            media_type: None,
            codecs,
            context,
        }
    }

    /// Attach the entity the request carried
    pub fn with_entity(mut self, entity: Entity, media_type: Mime) -> Self {
        self.entity = Some(entity);
        self.media_type = Some(media_type);
        self
    }

    /// HTTP method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Resolved request URI
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Replace the URI recorded for documentation
    pub fn set_uri(&mut self, uri: Url) {
        self.uri = uri;
    }

    /// Request headers as sent
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Entity the caller supplied
    pub fn entity(&self) -> Option<&Entity> {
        self.entity.as_ref()
    }

    /// Media type the entity was written as
    pub fn media_type(&self) -> Option<&Mime> {
        self.media_type.as_ref()
    }

    /// Codecs used to write the entity
    pub fn codecs(&self) -> &Arc<Codecs> {
        &self.codecs
    }

    /// Exchange context
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Exchange context, mutably
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Give up the exchange context
    pub fn into_context(self) -> Context {
        self.context
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        let uri = Url::parse("http://localhost:8080/").unwrap();
        RequestContext::new(Method::GET, uri, Headers::new(), Arc::new(Codecs::default()), Context::new())
    }
}

/// Response side of a completed exchange.
pub struct ResponseContext {
    status: StatusCode,
    headers: Headers,
    entity: Option<Box<dyn EntityStream>>,
}

impl ResponseContext {
    /// Describe a received response
    pub fn new(status: StatusCode, headers: Headers) -> Self {
        ResponseContext {
            status,
            headers,
            entity: None,
        }
    }

    /// Attach the response entity
    pub fn with_entity(mut self, entity: Box<dyn EntityStream>) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Attach a buffered entity; an empty body means no entity
    pub fn with_body(self, body: Bytes) -> Self {
        if body.is_empty() {
            self
        } else {
            self.with_entity(Box::new(BytesStream::new(body)))
        }
    }

    /// Response status
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers in received order
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Whether the response carries an entity
    pub fn has_entity(&self) -> bool {
        self.entity.is_some()
    }

    /// Detach the entity stream
    pub fn take_entity(&mut self) -> Option<Box<dyn EntityStream>> {
        self.entity.take()
    }

    /// Put an entity stream back
    pub fn set_entity(&mut self, entity: Box<dyn EntityStream>) {
        self.entity = Some(entity);
    }

    /// Read the remaining entity into memory
    pub fn read_to_bytes(&mut self) -> Result<Bytes> {
        let mut body = Vec::new();
        if let Some(entity) = self.entity.as_mut() {
            entity.read_to_end(&mut body)?;
        }
        Ok(Bytes::from(body))
    }
}

impl fmt::Debug for ResponseContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseContext")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("has_entity", &self.has_entity())
            .finish()
    }
}

/// Anything [`Pipeline::register`] accepts.
pub enum Registration {
    /// Context initializer
    Configurer(Configurer),
    /// Response body capture
    ResponsePeek(ResponsePeekFilter),
    /// Documentation filter; second and later registrations become children
    Documentation(DocumentationFilter),
    /// Application filter with its own stage identity
    Filter {
        /// Stage identity
        stage: Stage,
        /// Execution priority; lower runs earlier
        priority: i32,
        /// The filter
        filter: Arc<dyn ResponseFilter>,
    },
}

impl Registration {
    /// An application filter named `name`
    pub fn filter(name: impl Into<String>, priority: i32, filter: impl ResponseFilter + 'static) -> Self {
        Registration::Filter {
            stage: Stage::Custom(name.into()),
            priority,
            filter: Arc::new(filter),
        }
    }
}

impl From<Configurer> for Registration {
    fn from(configurer: Configurer) -> Self {
        Registration::Configurer(configurer)
    }
}

impl From<ResponsePeekFilter> for Registration {
    fn from(filter: ResponsePeekFilter) -> Self {
        Registration::ResponsePeek(filter)
    }
}

impl From<DocumentationFilter> for Registration {
    fn from(filter: DocumentationFilter) -> Self {
        Registration::Documentation(filter)
    }
}

#[derive(Clone)]
enum Action {
    Filter(Arc<dyn ResponseFilter>),
    Documentation(DocumentationChain),
}

#[derive(Clone)]
struct Entry {
    stage: Stage,
    priority: i32,
    action: Action,
}

/// Explicit, priority-ordered list of stages.
///
/// Entries run in ascending priority; equal priorities keep registration
/// order.
#[derive(Clone, Default)]
pub struct Pipeline {
    entries: Vec<Entry>,
}

impl Pipeline {
    /// Create an empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component.
    ///
    /// # Errors
    ///
    /// [`DocsError::DuplicateStage`] when the stage identity is already present,
    /// except for documentation filters, which fan out.
    pub fn register(&mut self, registration: impl Into<Registration>) -> Result<()> {
        match registration.into() {
            Registration::Configurer(configurer) => self.insert(
                Stage::Configurer,
                priorities::CONFIGURER,
                Action::Filter(Arc::new(configurer)),
            ),
            Registration::ResponsePeek(filter) => self.insert(
                Stage::ResponsePeek,
                priorities::RESPONSE_PEEK,
                Action::Filter(Arc::new(filter)),
            ),
            Registration::Documentation(filter) => {
                let existing = self.entries.iter_mut().find_map(|e| match &mut e.action {
                    Action::Documentation(chain) => Some(chain),
                    Action::Filter(_) => None,
                });
                match existing {
                    Some(chain) => {
                        debug!(identifier = filter.identifier(), "adding child documentation filter");
                        chain.add_child(filter);
                        Ok(())
                    }
                    None => self.insert(
                        Stage::Documentation,
                        priorities::DOCUMENTATION,
                        Action::Documentation(DocumentationChain::new(filter)),
                    ),
                }
            }
            Registration::Filter {
                stage,
                priority,
                filter,
            } => self.insert(stage, priority, Action::Filter(filter)),
        }
    }

    fn insert(&mut self, stage: Stage, priority: i32, action: Action) -> Result<()> {
        if self.contains(&stage) {
            return Err(DocsError::DuplicateStage(stage.to_string()));
        }
        let at = self.entries.partition_point(|e| e.priority <= priority);
        self.entries.insert(
            at,
            Entry {
                stage,
                priority,
                action,
            },
        );
        Ok(())
    }

    /// Whether a stage identity is registered
    pub fn contains(&self, stage: &Stage) -> bool {
        self.entries.iter().any(|e| &e.stage == stage)
    }

    /// Stages with their priorities, in execution order
    pub fn stages(&self) -> Vec<(&Stage, i32)> {
        self.entries.iter().map(|e| (&e.stage, e.priority)).collect()
    }

    /// The documentation chain, if any documentation filter is registered
    pub fn documentation(&self) -> Option<&DocumentationChain> {
        self.entries.iter().find_map(|e| match &e.action {
            Action::Documentation(chain) => Some(chain),
            Action::Filter(_) => None,
        })
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run every stage in order, stopping at the first error
    pub fn run(&self, request: &mut RequestContext, response: &mut ResponseContext) -> Result<()> {
        for entry in &self.entries {
            debug!(stage = %entry.stage, priority = entry.priority, "running pipeline stage");
            match &entry.action {
                Action::Filter(filter) => filter.filter(request, response)?,
                Action::Documentation(chain) => chain.filter(request, response)?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| (&e.stage, e.priority)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snippet::OperationRecorder;
    use parking_lot::Mutex;
    use std::path::PathBuf;

    struct Recorded {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl ResponseFilter for Recorded {
        fn filter(&self, request: &mut RequestContext, _response: &mut ResponseContext) -> Result<()> {
            self.log
                .lock()
                .push(format!("{}:{:?}", self.name, request.context().state()));
            Ok(())
        }
    }

    fn recorded(log: &Arc<Mutex<Vec<String>>>, name: &'static str, priority: i32) -> Registration {
        Registration::filter(
            name,
            priority,
            Recorded {
                name,
                log: log.clone(),
            },
        )
    }

    fn configurer() -> Configurer {
        documentation_configuration(ManualContextProvider::new(PathBuf::from("target/snippets")))
    }

    #[test]
    fn test_builtin_order_independent_of_registration() {
        let recorder = OperationRecorder::new();
        let mut pipeline = Pipeline::new();
        pipeline.register(document("first", vec![]).snippet(recorder.clone())).unwrap();
        pipeline.register(ResponsePeekFilter).unwrap();
        pipeline.register(configurer()).unwrap();

        let stages: Vec<Stage> = pipeline.stages().into_iter().map(|(s, _)| s.clone()).collect();
        assert_eq!(
            stages,
            vec![Stage::Configurer, Stage::ResponsePeek, Stage::Documentation]
        );
    }

    #[test]
    fn test_user_filters_interleave_by_priority() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = Pipeline::new();
        pipeline.register(recorded(&log, "late", priorities::USER)).unwrap();
        pipeline.register(recorded(&log, "between", priorities::CONFIGURER + 50)).unwrap();
        pipeline.register(recorded(&log, "early", 0)).unwrap();
        pipeline.register(configurer()).unwrap();
        pipeline.register(ResponsePeekFilter).unwrap();

        let mut request = RequestContext::for_tests();
        let mut response = ResponseContext::new(StatusCode::OK, Headers::new());
        pipeline.run(&mut request, &mut response).unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                "early:Unconfigured",
                "between:ContextInitialized",
                "late:ResponseCaptured"
            ]
        );
    }

    #[test]
    fn test_duplicate_stage_rejected() {
        let mut pipeline = Pipeline::new();
        pipeline.register(configurer()).unwrap();
        let err = pipeline.register(configurer()).unwrap_err();
        assert!(matches!(err, DocsError::DuplicateStage(ref s) if s == "configurer"));

        pipeline.register(ResponsePeekFilter).unwrap();
        assert!(pipeline.register(ResponsePeekFilter).is_err());

        let log = Arc::new(Mutex::new(Vec::new()));
        pipeline.register(recorded(&log, "audit", 10)).unwrap();
        assert!(pipeline.register(recorded(&log, "audit", 20)).is_err());
    }

    #[test]
    fn test_documentation_fans_out() {
        let mut pipeline = Pipeline::new();
        pipeline.register(document("primary", vec![])).unwrap();
        pipeline.register(document("second", vec![])).unwrap();
        pipeline.register(document("third", vec![])).unwrap();

        assert_eq!(pipeline.stages().len(), 1);
        let chain = pipeline.documentation().unwrap();
        assert_eq!(chain.primary().identifier(), "primary");
        let children: Vec<&str> = chain.children().iter().map(|c| c.identifier()).collect();
        assert_eq!(children, vec!["second", "third"]);
    }

    #[test]
    fn test_stops_at_first_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = Pipeline::new();
        pipeline.register(document("undocumented", vec![])).unwrap();
        pipeline.register(recorded(&log, "after", priorities::USER)).unwrap();

        let mut request = RequestContext::for_tests();
        let mut response = ResponseContext::new(StatusCode::OK, Headers::new());
        let err = pipeline.run(&mut request, &mut response).unwrap_err();
        assert!(matches!(err, DocsError::NotConfigured));
        assert!(log.lock().is_empty());
    }
}
