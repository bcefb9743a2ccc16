//! Fixed names and numbers of the capture pipeline.

/// Upper bound on how many response body bytes are captured for documentation.
pub const MAX_CAPTURED_RESPONSE: usize = 8 * 1024;

/// Suffix appended to a captured response body that exceeded [`MAX_CAPTURED_RESPONSE`].
pub const TRUNCATION_MARKER: &str = "...more...";

/// Content shown in place of a hidden binary multipart field.
pub const DEFAULT_BINARY_PLACEHOLDER: &str = "<binary-data>";

/// Reserved context keys.
///
/// Application code may not set properties under these names; the pipeline
/// owns them.
pub mod keys {
    /// Bytes written for the request body
    pub const REQUEST_BODY: &str = "restdocs.request-body";
    /// Captured (possibly truncated) response body
    pub const RESPONSE_BODY: &str = "restdocs.response-body";
    /// Path part of the URI template
    pub const PATH_TEMPLATE: &str = "restdocs.path-template";
    /// Query part of the URI template
    pub const QUERY_TEMPLATE: &str = "restdocs.query-template";
    /// Primary documentation filter registration
    pub const DOCUMENTATION_FILTER: &str = "restdocs.documentation-filter";
    /// Per-exchange renderer configuration
    pub const CONFIGURATION: &str = "restdocs.configuration";

    /// Every reserved key
    pub const ALL: [&str; 6] = [
        REQUEST_BODY,
        RESPONSE_BODY,
        PATH_TEMPLATE,
        QUERY_TEMPLATE,
        DOCUMENTATION_FILTER,
        CONFIGURATION,
    ];
}

/// Pipeline priorities. Lower values run first.
///
/// The gaps leave room for user filters to run between built-in stages.
pub mod priorities {
    /// Creates the context and the per-call configuration
    pub const CONFIGURER: i32 = 4000;
    /// Captures the response body prefix
    pub const RESPONSE_PEEK: i32 = 4100;
    /// Converts the exchange and runs snippets
    pub const DOCUMENTATION: i32 = 4200;
    /// Priority given to user filters registered without one
    pub const USER: i32 = 5000;
}

/// Attribute names written into the renderer configuration.
pub mod attributes {
    /// Resolved URI template of the operation
    pub const URL_TEMPLATE: &str = "urlTemplate";
    /// Output directory of the documentation context
    pub const OUTPUT_DIRECTORY: &str = "outputDirectory";
    /// Test or operation group name
    pub const TEST_NAME: &str = "testName";
    /// Step counter within the current test
    pub const STEP: &str = "step";
    /// Encoding snippets are written with
    pub const SNIPPET_ENCODING: &str = "snippetEncoding";
    /// Template format id (e.g. `asciidoctor`)
    pub const TEMPLATE_FORMAT: &str = "templateFormat";
    /// Names of snippets every operation gets
    pub const DEFAULT_SNIPPETS: &str = "defaultSnippets";
}
