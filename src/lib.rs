#![warn(missing_docs)]

//! # restdocs-http: API documentation from integration tests
//!
//! This crate sits between an integration test and the HTTP client it drives.
//! Every exchange the test sends is captured: the request body as it was
//! written, a bounded prefix of the response body, and the URI template the
//! request was built from. The captured exchange becomes an [`Operation`]
//! that is handed to snippet generators.
//!
//! ## Overview
//!
//! One exchange goes through these stages:
//!
//! 1. **Template tracking** - [`TrackingTarget`] mirrors every path and query
//!    call into a URI template, so documentation shows `/teams/{id}` while the
//!    request goes to `/teams/42`
//! 2. **Request capture** - the body capture interceptor tees the serialized
//!    entity into the exchange [`Context`](capture::Context)
//! 3. **Response pipeline** - filters run in priority order: the configurer,
//!    the response peek filter (first 8 KiB, marked when truncated), then the
//!    documentation filter
//! 4. **Conversion** - the documentation filter builds an [`Operation`] from
//!    the captured context and runs every [`Snippet`]
//!
//! The caller still receives the full response body.
//!
//! ## Client Usage
//!
//! ```ignore
//! use restdocs_http::pipeline::{document, documentation_configuration, ManualContextProvider};
//! use restdocs_http::types::Form;
//! use restdocs_http::DocsClient;
//!
//! #[tokio::main]
//! async fn main() -> restdocs_http::Result<()> {
//!     let client = DocsClient::new()?;
//!     let mut target = client
//!         .target("http://localhost:8080")?
//!         .path("test/post-form")
//!         .query_param("c", &["charlie"]);
//!     target
//!         .register(documentation_configuration(ManualContextProvider::new("target/snippets")))?
//!         .register(document("post-form", vec![]))?;
//!
//!     let form = Form::new().param("a", "alpha").param("b", "bravo");
//!     let response = target.request().post(form).await?;
//!     println!("{}", response.text()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - Headers, entities and the documented operation
//! - **[error]** - Error types and result handling
//! - **[client]** - Client, invocation and transports
//! - **[target]** - URI template tracking
//! - **[capture]** - Exchange context, request and response capture
//! - **[pipeline]** - Priority-ordered response filters and documentation
//! - **[convert]** - Entity extraction and operation conversion
//! - **[codec]** - Body writers and readers
//! - **[preprocess]** - Rewrites of the documented view
//! - **[snippet]** - Snippet generator seam
//! - **[protocol]** - Constants, media types and the multipart wire format

pub mod capture;
pub mod client;
pub mod codec;
pub mod convert;
pub mod error;
pub mod pipeline;
pub mod preprocess;
pub mod protocol;
pub mod snippet;
pub mod target;
pub mod types;

pub use client::{ClientConfig, DocsClient, Response};
pub use error::{DocsError, Result};
pub use snippet::Snippet;
pub use target::TrackingTarget;
pub use types::{Entity, Operation};

#[cfg(test)]
mod tests;
