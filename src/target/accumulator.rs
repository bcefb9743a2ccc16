//! URI template accumulation.

use tracing::trace;

/// Records the unresolved shape of a target as path and query fragments.
///
/// Append-only. Path segments are normalized when appended, so `"a/"`,
/// `"/a/"`, `"/a"` and `"a"` all add `/a`.
///
/// ```
/// use restdocs_http::target::UriTemplateAccumulator;
///
/// let mut template = UriTemplateAccumulator::new();
/// template.append_path("teams/");
/// template.append_path("/{id}");
/// template.append_query("expand", "members");
/// assert_eq!(template.to_template(), "/teams/{id}?expand=members");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UriTemplateAccumulator {
    path: String,
    query: String,
}

impl UriTemplateAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a path segment
    pub fn append_path(&mut self, segment: &str) {
        let segment = segment.strip_suffix('/').unwrap_or(segment);
        let segment = segment.strip_prefix('/').unwrap_or(segment);
        if segment.is_empty() {
            return;
        }
        self.path.push('/');
        self.path.push_str(segment);
        trace!(path = %self.path, "appended path template");
    }

    /// Append one `name=value` pair
    pub fn append_query(&mut self, name: &str, value: &str) {
        if !self.query.is_empty() {
            self.query.push('&');
        }
        self.query.push_str(name);
        self.query.push('=');
        self.query.push_str(value);
        trace!(query = %self.query, "appended query template");
    }

    /// Accumulated path, empty when nothing was appended
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Accumulated query, empty when nothing was appended
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Full URI template
    pub fn to_template(&self) -> String {
        uri_template(Some(&self.path), Some(&self.query))
    }
}

/// Assemble a URI template from its path and query parts.
///
/// The path defaults to `/`; the query is added after `?` when non-empty.
pub fn uri_template(path: Option<&str>, query: Option<&str>) -> String {
    let mut template = match path.filter(|p| !p.is_empty()) {
        Some(path) => path.to_string(),
        None => "/".to_string(),
    };
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        template.push('?');
        template.push_str(query);
    }
    template
}
