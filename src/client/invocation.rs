//! One documented exchange.

use super::TransportRequest;
use crate::capture::{Context, RequestBodyCapture, ResponsePeekFilter, WriterContext, WriterInterceptor};
use crate::error::{DocsError, Result};
use crate::pipeline::{PipelineState, RequestContext, ResponseContext, Stage};
use crate::protocol;
use crate::target::{TrackingTarget, WebTarget};
use crate::types::{Entity, Headers};
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{Method, StatusCode};
use mime::Mime;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

/// Request being built against a [`TrackingTarget`].
///
/// Each call to a sending method runs one exchange with its own context,
/// capture interceptor and pipeline copy.
pub struct Invocation<T: WebTarget> {
    target: TrackingTarget<T>,
    headers: Headers,
}

impl<T: WebTarget> Invocation<T> {
    pub(crate) fn new(target: TrackingTarget<T>) -> Self {
        Invocation {
            target,
            headers: Headers::new(),
        }
    }

    /// Add a request header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    /// Add an `Accept` header
    pub fn accept(self, media_type: impl Into<String>) -> Self {
        self.header(ACCEPT.as_str(), media_type)
    }

    /// Send a GET request
    pub async fn get(self) -> Result<Response> {
        self.send(Method::GET, None).await
    }

    /// Send a DELETE request
    pub async fn delete(self) -> Result<Response> {
        self.send(Method::DELETE, None).await
    }

    /// POST `entity` in its default media type
    pub async fn post(self, entity: impl Into<Entity>) -> Result<Response> {
        self.method(Method::POST, Some(entity.into())).await
    }

    /// PUT `entity` in its default media type
    pub async fn put(self, entity: impl Into<Entity>) -> Result<Response> {
        self.method(Method::PUT, Some(entity.into())).await
    }

    /// POST `entity` as `media_type`
    pub async fn post_as(self, entity: impl Into<Entity>, media_type: &str) -> Result<Response> {
        let media_type = protocol::parse_media_type(media_type)?;
        self.send(Method::POST, Some((entity.into(), media_type))).await
    }

    /// PUT `entity` as `media_type`
    pub async fn put_as(self, entity: impl Into<Entity>, media_type: &str) -> Result<Response> {
        let media_type = protocol::parse_media_type(media_type)?;
        self.send(Method::PUT, Some((entity.into(), media_type))).await
    }

    /// Send with any method; an entity goes out in its default media type
    pub async fn method(self, method: Method, entity: Option<Entity>) -> Result<Response> {
        let entity = entity.map(|entity| {
            let media_type = entity.default_media_type();
            (entity, media_type)
        });
        self.send(method, entity).await
    }

    /// Run the exchange.
    ///
    /// The entity is serialized through the capture interceptor, sent, and the
    /// response handed to the pipeline. Errors from any step are returned as
    /// they are; nothing is retried.
    pub async fn send(self, method: Method, entity: Option<(Entity, Mime)>) -> Result<Response> {
        let Invocation { target, mut headers } = self;
        let client = target.client().clone();
        let config = client.config();
        let uri = target.uri()?;

        let mut context = Context::new();
        context.set_templates(
            Some(target.template().path().to_string()),
            Some(target.template().query().to_string()),
        );
        for (name, value) in target.properties() {
            context.set_property(name.clone(), value.clone())?;
        }

        let body = match &entity {
            Some((entity, media_type)) => {
                if !headers.contains(CONTENT_TYPE.as_str()) {
                    headers.set(CONTENT_TYPE.as_str(), media_type.to_string());
                }
                let interceptors: Vec<Arc<dyn WriterInterceptor>> = if config.capture_enabled {
                    vec![Arc::new(RequestBodyCapture)]
                } else {
                    Vec::new()
                };
                let mut wire = Vec::new();
                WriterContext::new(
                    entity,
                    media_type,
                    &mut headers,
                    &mut context,
                    client.codecs(),
                    &interceptors,
                    Box::new(&mut wire),
                )
                .proceed()?;
                Some(Bytes::from(wire))
            }
            None => None,
        };

        if config.enable_logging {
            debug!(method = %method, uri = %uri, "sending request");
        }
        let transport_response = client
            .transport()
            .execute(TransportRequest {
                method: method.clone(),
                uri: uri.clone(),
                headers: headers.to_header_map()?,
                body,
            })
            .await?;

        let mut request = RequestContext::new(method, uri, headers, client.codecs().clone(), context);
        if let Some((entity, media_type)) = entity {
            // Writers may have refined the media type, e.g. with a multipart boundary.
            let media_type = request
                .headers()
                .get_first(CONTENT_TYPE.as_str())
                .and_then(|value| protocol::parse_media_type(value).ok())
                .unwrap_or(media_type);
            request = request.with_entity(entity, media_type);
        }
        let mut response = ResponseContext::new(
            transport_response.status,
            Headers::from_header_map(&transport_response.headers),
        )
        .with_body(transport_response.body);

        let mut pipeline = target.pipeline().clone();
        if config.capture_enabled && !pipeline.contains(&Stage::ResponsePeek) {
            pipeline.register(ResponsePeekFilter)?;
        }
        pipeline.run(&mut request, &mut response)?;

        let state = request.context().state();
        if config.enable_logging {
            debug!(status = %response.status(), state = ?state, "exchange complete");
        }
        Ok(Response { inner: response, state })
    }
}

/// Response returned to the caller after the pipeline ran.
///
/// The body is the full response, independent of how much was captured for
/// documentation.
#[derive(Debug)]
pub struct Response {
    inner: ResponseContext,
    state: PipelineState,
}

impl Response {
    /// Status code
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    /// Response headers
    pub fn headers(&self) -> &Headers {
        self.inner.headers()
    }

    /// How far the pipeline got for this exchange
    pub fn pipeline_state(&self) -> PipelineState {
        self.state
    }

    /// Full body
    pub fn bytes(mut self) -> Result<Bytes> {
        self.inner.read_to_bytes()
    }

    /// Full body as UTF-8 text
    pub fn text(self) -> Result<String> {
        String::from_utf8(self.bytes()?.to_vec())
            .map_err(|e| DocsError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }

    /// Full body as JSON
    pub fn json<D: DeserializeOwned>(self) -> Result<D> {
        Ok(serde_json::from_slice(&self.bytes()?)?)
    }
}
