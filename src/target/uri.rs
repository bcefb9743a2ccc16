//! Request targets.

use crate::error::{DocsError, Result};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use url::Url;

/// Characters left alone when a template value is substituted into a path.
const PATH_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\s*([A-Za-z0-9_.\-]+)\s*(?::[^{}]*)?\}").expect("Is a valid regex")
    })
}

/// The target operations observed while building a request.
///
/// Methods build new targets; the receiver is never changed.
pub trait WebTarget: Clone + Send + Sync + 'static {
    /// The resolved, executable URI.
    ///
    /// # Errors
    ///
    /// [`DocsError::UnresolvedTemplate`] when a placeholder has no value.
    fn uri(&self) -> Result<Url>;

    /// Append a path segment
    fn path(&self, segment: &str) -> Self;

    /// Append one query parameter per value
    fn query_param(&self, name: &str, values: &[&str]) -> Self;

    /// Supply a value for a `{name}` placeholder
    fn resolve_template(&self, name: &str, value: &str) -> Self;

    /// Supply values for several placeholders
    fn resolve_templates(&self, values: &BTreeMap<String, String>) -> Self;
}

/// URL-backed target with `{name}` placeholders.
///
/// ```
/// use restdocs_http::target::{UriTarget, WebTarget};
///
/// let target = UriTarget::parse("http://localhost:8080/api")
///     .unwrap()
///     .path("teams/{id}")
///     .query_param("expand", &["members"])
///     .resolve_template("id", "a b");
/// assert_eq!(
///     target.uri().unwrap().as_str(),
///     "http://localhost:8080/api/teams/a%20b?expand=members"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTarget {
    base: Url,
    path: String,
    query: Vec<(String, String)>,
    values: BTreeMap<String, String>,
}

impl UriTarget {
    /// Target for an absolute URL
    pub fn parse(url: &str) -> Result<Self> {
        let base = Url::parse(url)?;
        let path = percent_decode_str(base.path()).decode_utf8_lossy().into_owned();
        let query = base.query_pairs().into_owned().collect();
        Ok(UriTarget {
            base,
            path,
            query,
            values: BTreeMap::new(),
        })
    }

    /// Path template with placeholders intact
    pub fn path_template(&self) -> &str {
        &self.path
    }

    /// Values supplied for placeholders
    pub fn template_values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    fn substitute(&self, template: &str, encode: bool) -> Result<String> {
        let mut missing = None;
        let resolved = placeholder().replace_all(template, |caps: &Captures<'_>| {
            match self.values.get(&caps[1]) {
                Some(value) if encode => utf8_percent_encode(value, PATH_VALUE).to_string(),
                Some(value) => value.clone(),
                None => {
                    missing.get_or_insert_with(|| caps[1].to_string());
                    String::new()
                }
            }
        });
        match missing {
            Some(name) => Err(DocsError::UnresolvedTemplate(name)),
            None => Ok(resolved.into_owned()),
        }
    }
}

impl WebTarget for UriTarget {
    fn uri(&self) -> Result<Url> {
        let path = self.substitute(&self.path, true)?;
        let mut uri = self.base.clone();
        uri.set_path(&path);
        uri.set_query(None);
        if !self.query.is_empty() {
            let mut pairs = Vec::with_capacity(self.query.len());
            for (name, value) in &self.query {
                pairs.push((self.substitute(name, false)?, self.substitute(value, false)?));
            }
            uri.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(uri)
    }

    fn path(&self, segment: &str) -> Self {
        let mut target = self.clone();
        if !segment.is_empty() {
            let base = target.path.trim_end_matches('/');
            target.path = format!("{}/{}", base, segment.trim_start_matches('/'));
        }
        target
    }

    fn query_param(&self, name: &str, values: &[&str]) -> Self {
        let mut target = self.clone();
        target
            .query
            .extend(values.iter().map(|v| (name.to_string(), v.to_string())));
        target
    }

    fn resolve_template(&self, name: &str, value: &str) -> Self {
        let mut target = self.clone();
        target.values.insert(name.to_string(), value.to_string());
        target
    }

    fn resolve_templates(&self, values: &BTreeMap<String, String>) -> Self {
        let mut target = self.clone();
        target
            .values
            .extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
        target
    }
}
