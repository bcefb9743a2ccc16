//! Documenting HTTP client.
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── config     - Client configuration
//! ├── fetch      - DocsClient and its builder
//! ├── invocation - One exchange: serialize, send, run the pipeline
//! └── transport  - Network and in-process transports
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DocsClient`] | Entry point; hands out tracking targets |
//! | [`Invocation`] | Request under construction |
//! | [`Response`] | Full response after documentation ran |
//! | [`Transport`] | Performs the exchange |
//! | [`ClientConfig`] | Client configuration options |
//!
//! # Examples
//!
//! ```
//! use restdocs_http::client::{ClientConfig, DocsClient};
//!
//! let client = DocsClient::with_config(ClientConfig {
//!     enable_logging: true,
//!     ..Default::default()
//! })
//! .unwrap();
//! let target = client.target("http://localhost:8080").unwrap().path("teams");
//! assert_eq!(target.uri_template(), "/teams");
//! ```

mod config;
mod fetch;
mod invocation;
mod transport;

pub use config::ClientConfig;
pub use fetch::{DocsClient, DocsClientBuilder};
pub use invocation::{Invocation, Response};
pub use transport::{ReqwestTransport, ServiceTransport, Transport, TransportRequest, TransportResponse};
