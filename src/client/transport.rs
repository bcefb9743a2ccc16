//! Transports performing the actual exchange.
//!
//! [`ReqwestTransport`] goes over the network. [`ServiceTransport`] calls a
//! `tower::Service` in process, which lets tests drive an axum `Router`
//! without binding a socket.

use super::ClientConfig;
use crate::error::{DocsError, Result};
use async_trait::async_trait;
use axum::body::Body;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use http::{HeaderMap, Method, StatusCode};
use std::time::Duration;
use tower::{Service, ServiceExt};
use url::Url;

/// Request as handed to a transport.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method
    pub method: Method,
    /// Resolved URI
    pub uri: Url,
    /// Headers to send
    pub headers: HeaderMap,
    /// Serialized entity, if any
    pub body: Option<Bytes>,
}

/// Response as returned by a transport, body fully read.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// Status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Bytes,
}

/// Performs one exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and read the whole response
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse>;
}

/// Network transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Transport configured from `config`.
    ///
    /// # Errors
    ///
    /// [`DocsError::Transport`] when the proxy URL is invalid or the client
    /// cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(config.max_total_connections as usize);

        if !config.proxy_url.is_empty() {
            let proxy = reqwest::Proxy::all(&config.proxy_url).map_err(|e| {
                DocsError::Transport(format!("invalid proxy '{}': {}", config.proxy_url, e))
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| DocsError::Transport(format!("cannot build HTTP client: {}", e)))?;
        Ok(ReqwestTransport { client })
    }

    /// Transport using an existing client
    pub fn from_client(client: reqwest::Client) -> Self {
        ReqwestTransport { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse> {
        let mut builder = self
            .client
            .request(request.method, request.uri)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();

        let mut body = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk?);
        }

        Ok(TransportResponse {
            status,
            headers,
            body: body.freeze(),
        })
    }
}

/// In-process transport calling a `tower::Service`.
#[derive(Debug, Clone)]
pub struct ServiceTransport<S> {
    service: S,
}

impl<S> ServiceTransport<S> {
    /// Transport calling `service`
    pub fn new(service: S) -> Self {
        ServiceTransport { service }
    }
}

#[async_trait]
impl<S> Transport for ServiceTransport<S>
where
    S: Service<http::Request<Body>, Response = http::Response<Body>> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: Into<tower::BoxError>,
{
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse> {
        let mut builder = http::Request::builder()
            .method(request.method)
            .uri(request.uri.as_str());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(request.headers);
        }
        let body = request.body.map(Body::from).unwrap_or_else(Body::empty);
        let http_request = builder
            .body(body)
            .map_err(|e| DocsError::InvalidUri(e.to_string()))?;

        let response = self
            .service
            .clone()
            .oneshot(http_request)
            .await
            .map_err(|e| {
                let e: tower::BoxError = e.into();
                DocsError::Transport(e.to_string())
            })?;

        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| DocsError::Transport(e.to_string()))?;

        Ok(TransportResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::Router;

    #[tokio::test]
    async fn test_service_transport_round_trip() {
        let app = Router::new().route("/echo", post(|body: String| async move { body.to_uppercase() }));
        let transport = ServiceTransport::new(app);
        let response = transport
            .execute(TransportRequest {
                method: Method::POST,
                uri: Url::parse("http://localhost/echo").unwrap(),
                headers: HeaderMap::new(),
                body: Some(Bytes::from_static(b"hello")),
            })
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body.as_ref(), b"HELLO");
    }

    #[tokio::test]
    async fn test_reqwest_transport_against_mock() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/items")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id":1}]"#)
            .create_async()
            .await;

        let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();
        let response = transport
            .execute(TransportRequest {
                method: Method::GET,
                uri: Url::parse(&format!("{}/items", server.url())).unwrap(),
                headers: HeaderMap::new(),
                body: None,
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body.as_ref(), br#"[{"id":1}]"#);
    }

    #[test]
    fn test_invalid_proxy_fails_fast() {
        let config = ClientConfig {
            proxy_url: "not a proxy url".to_string(),
            ..Default::default()
        };
        let err = ReqwestTransport::new(&config).unwrap_err();
        assert!(matches!(err, DocsError::Transport(ref m) if m.contains("not a proxy url")));
    }
}
