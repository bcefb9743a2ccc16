//! Core data types shared by every stage of the capture pipeline.
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Headers`] | Ordered, repeatable headers with case-insensitive lookup |
//! | [`Parameters`] | Ordered, repeatable query/form parameters |
//! | [`Entity`] | Request body the test holds before serialization |
//! | [`Form`] / [`MultipartForm`] | Structured bodies recovered by the entity extractor |
//! | [`Operation`] | Immutable snapshot handed to snippet generators |

mod entity;
mod headers;
mod operation;

pub use entity::{Entity, EntityKind, Form, FormDataPart, MultipartForm};
pub use headers::{Headers, Parameters};
pub use operation::{Operation, OperationPart, OperationRequest, OperationResponse};
