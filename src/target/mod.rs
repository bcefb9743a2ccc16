//! Request targets and URI template tracking.
//!
//! [`WebTarget`] is the narrow delegation interface the tracker observes;
//! [`UriTarget`] is its URL-backed binding. [`TrackingTarget`] wraps any
//! `WebTarget` and records the unresolved shape of the request in a
//! [`UriTemplateAccumulator`], so documentation shows `/teams/{id}` while the
//! request goes to `/teams/42`.

mod accumulator;
mod tracking;
mod uri;

pub use accumulator::{uri_template, UriTemplateAccumulator};
pub use tracking::TrackingTarget;
pub use uri::{UriTarget, WebTarget};
