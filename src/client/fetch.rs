//! The documenting client.
//!
//! # Examples
//!
//! ## Against an in-process router
//!
//! ```ignore
//! use axum::{routing::get, Router};
//! use restdocs_http::pipeline::{document, documentation_configuration, ManualContextProvider};
//! use restdocs_http::snippet::OperationRecorder;
//! use restdocs_http::DocsClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = Router::new().route("/teams/{id}", get(|| async { "blue" }));
//!     let client = DocsClient::for_service(app);
//!     let recorder = OperationRecorder::new();
//!
//!     let mut target = client.target("http://localhost")?.path("teams/{id}").resolve_template("id", 7);
//!     target
//!         .register(documentation_configuration(ManualContextProvider::new("target/snippets")))?
//!         .register(document("get-team", vec![]).snippet(recorder.clone()))?;
//!
//!     let response = target.request().get().await?;
//!     assert_eq!(response.text()?, "blue");
//!     assert_eq!(recorder.last().unwrap().uri_template(), "/teams/{id}");
//!     Ok(())
//! }
//! ```

use super::{ClientConfig, ReqwestTransport, ServiceTransport, Transport};
use crate::codec::{BodyReader, BodyWriter, Codecs};
use crate::error::Result;
use crate::target::{TrackingTarget, UriTarget, WebTarget};
use axum::body::Body;
use std::fmt;
use std::sync::Arc;
use tower::Service;

/// Client that documents every exchange sent through its targets.
///
/// Cloning is cheap; clones share the transport, codecs and configuration.
#[derive(Clone)]
pub struct DocsClient {
    transport: Arc<dyn Transport>,
    codecs: Arc<Codecs>,
    config: Arc<ClientConfig>,
}

impl DocsClient {
    /// Network client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Network client with custom configuration.
    ///
    /// # Errors
    ///
    /// [`DocsError::Transport`](crate::DocsError::Transport) when the network
    /// transport cannot be built from `config`.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Client calling `service` in process, for example an axum `Router`
    pub fn for_service<S>(service: S) -> Self
    where
        S: Service<http::Request<Body>, Response = http::Response<Body>> + Clone + Send + Sync + 'static,
        S::Future: Send,
        S::Error: Into<tower::BoxError>,
    {
        DocsClient {
            transport: Arc::new(ServiceTransport::new(service)),
            codecs: Arc::new(Codecs::new()),
            config: Arc::new(ClientConfig::default()),
        }
    }

    /// Start configuring a client
    pub fn builder() -> DocsClientBuilder {
        DocsClientBuilder::default()
    }

    /// Tracking target for `url`.
    ///
    /// # Errors
    ///
    /// [`DocsError::InvalidUri`](crate::DocsError::InvalidUri) when `url` does
    /// not parse.
    pub fn target(&self, url: &str) -> Result<TrackingTarget<UriTarget>> {
        Ok(self.track(UriTarget::parse(url)?))
    }

    /// Wrap an existing target
    pub fn track<T: WebTarget>(&self, target: T) -> TrackingTarget<T> {
        TrackingTarget::new(self.clone(), target)
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Codecs used for request entities and extraction
    pub fn codecs(&self) -> &Arc<Codecs> {
        &self.codecs
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

impl fmt::Debug for DocsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocsClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`DocsClient`].
#[derive(Default)]
pub struct DocsClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    codecs: Codecs,
}

impl DocsClientBuilder {
    /// Replace the configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Send through `transport` instead of the network
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Send to `service` in process
    pub fn service<S>(self, service: S) -> Self
    where
        S: Service<http::Request<Body>, Response = http::Response<Body>> + Clone + Send + Sync + 'static,
        S::Future: Send,
        S::Error: Into<tower::BoxError>,
    {
        self.transport(ServiceTransport::new(service))
    }

    /// Add a codec; it takes precedence over the built-in ones
    pub fn codec<C>(mut self, codec: C) -> Self
    where
        C: BodyWriter + BodyReader + 'static,
    {
        self.codecs.register(codec);
        self
    }

    /// Finish the client. Without a transport, requests go over the network.
    ///
    /// # Errors
    ///
    /// [`DocsError::Transport`](crate::DocsError::Transport) when the network
    /// transport cannot be built.
    pub fn build(self) -> Result<DocsClient> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.config)?),
        };
        Ok(DocsClient {
            transport,
            codecs: Arc::new(self.codecs),
            config: Arc::new(self.config),
        })
    }
}
