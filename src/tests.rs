//! End-to-end exchanges against an in-process axum router.

use crate::client::ClientConfig;
use crate::error::{DocsError, Result};
use crate::pipeline::{
    document, documentation_configuration, DocumentationFilter, ManualContextProvider, PipelineState,
    Registration, RequestContext, ResponseContext, ResponseFilter, Stage, UriConfigurer,
};
use crate::preprocess::pretty_print;
use crate::protocol::constants::{attributes, priorities, MAX_CAPTURED_RESPONSE, TRUNCATION_MARKER};
use crate::snippet::OperationRecorder;
use crate::target::TrackingTarget;
use crate::types::{Form, MultipartForm};
use crate::DocsClient;
use axum::extract::{Path, Query};
use axum::routing::{get, post};
use axum::{Form as FormBody, Json, Router};
use bytes::Bytes;
use http::{Method, StatusCode};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

fn app() -> Router {
    Router::new()
        .route(
            "/test/post-form",
            post(
                |Query(query): Query<HashMap<String, String>>,
                 FormBody(form): FormBody<HashMap<String, String>>| async move {
                    format!("{} {} {} {}", form["a"], form["b"], query["c"], query["d"])
                },
            ),
        )
        .route("/large/{size}", get(|Path(size): Path<usize>| async move { "x".repeat(size) }))
        .route(
            "/teams/{id}",
            get(|Path(id): Path<u32>| async move { Json(json!({ "id": id, "name": "blue" })) }),
        )
        .route("/upload", post(|body: Bytes| async move { (StatusCode::CREATED, body) }))
}

fn client() -> DocsClient {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    DocsClient::for_service(app())
}

fn documented(target: &mut TrackingTarget, recorder: &OperationRecorder, identifier: &str) {
    target
        .register(documentation_configuration(ManualContextProvider::new("target/snippets")))
        .unwrap()
        .register(document(identifier, vec![]).snippet(recorder.clone()))
        .unwrap();
}

/// Records what the exchange looked like when the filter ran.
#[derive(Clone, Default)]
struct Observer {
    seen: Arc<Mutex<Vec<(String, PipelineState, bool)>>>,
}

struct Witness {
    name: String,
    observer: Observer,
}

impl ResponseFilter for Witness {
    fn filter(&self, request: &mut RequestContext, _response: &mut ResponseContext) -> Result<()> {
        let context = request.context();
        self.observer.seen.lock().push((
            self.name.clone(),
            context.state(),
            context.response_body().is_some(),
        ));
        Ok(())
    }
}

impl Observer {
    fn witness(&self, name: &str, priority: i32) -> Registration {
        Registration::filter(
            name,
            priority,
            Witness {
                name: name.to_string(),
                observer: self.clone(),
            },
        )
    }
}

#[tokio::test]
async fn test_post_form_is_documented_with_template_and_parameters() {
    let recorder = OperationRecorder::new();
    let mut target = client()
        .target("http://localhost:8080")
        .unwrap()
        .path("test/post-form")
        .query_param("c", &["charlie"])
        .query_param("d", &["delta"]);
    documented(&mut target, &recorder, "post-form");

    let form = Form::new().param("a", "alpha").param("b", "bravo");
    let response = target.request().post(form).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.pipeline_state(), PipelineState::Documented);
    assert_eq!(response.text().unwrap(), "alpha bravo charlie delta");

    let operation = recorder.last().unwrap();
    assert_eq!(operation.name(), "post-form");
    assert_eq!(operation.uri_template(), "/test/post-form?c=charlie&d=delta");
    let request = operation.request();
    assert_eq!(request.form_parameters().get_first("a"), Some("alpha"));
    assert_eq!(request.form_parameters().get_first("b"), Some("bravo"));
    assert_eq!(request.form_parameters().len(), 2);
    assert_eq!(request.query_parameters().get_first("c"), Some("charlie"));
    assert!(request.content().is_empty());
}

#[tokio::test]
async fn test_builtin_stages_run_in_priority_order() {
    let observer = Observer::default();
    let recorder = OperationRecorder::new();
    let mut target = client().target("http://localhost").unwrap().path("large/16");

    // Registered backwards on purpose.
    target
        .register(observer.witness("after-documentation", priorities::USER))
        .unwrap()
        .register(document("ordering", vec![]).snippet(recorder.clone()))
        .unwrap()
        .register(observer.witness("between-peek-and-documentation", priorities::RESPONSE_PEEK + 50))
        .unwrap()
        .register(observer.witness("between-configurer-and-peek", priorities::CONFIGURER + 50))
        .unwrap()
        .register(documentation_configuration(ManualContextProvider::new("target/snippets")))
        .unwrap();

    target.request().get().await.unwrap();

    let seen = observer.seen.lock().clone();
    assert_eq!(
        seen,
        vec![
            ("between-configurer-and-peek".to_string(), PipelineState::ContextInitialized, false),
            ("between-peek-and-documentation".to_string(), PipelineState::ResponseCaptured, true),
            ("after-documentation".to_string(), PipelineState::Documented, true),
        ]
    );
    assert_eq!(recorder.len(), 1);
}

#[tokio::test]
async fn test_additional_documentation_filters_are_children() {
    let recorder = OperationRecorder::new();
    let mut target = client().target("http://localhost").unwrap().path("teams/{id}").resolve_template("id", 3);
    documented(&mut target, &recorder, "get-team");
    target
        .register(document("get-team-fields", vec![]).snippet(recorder.clone()))
        .unwrap()
        .register(document("get-team-links", vec![]).snippet(recorder.clone()))
        .unwrap();

    let documentation_stages = target
        .pipeline()
        .stages()
        .iter()
        .filter(|(stage, _)| **stage == Stage::Documentation)
        .count();
    assert_eq!(documentation_stages, 1);
    assert_eq!(target.pipeline().documentation().unwrap().children().len(), 2);

    let response = target.request().get().await.unwrap();
    let body: serde_json::Value = response.json().unwrap();
    assert_eq!(body["id"], 3);

    let operations = recorder.operations();
    let names: Vec<&str> = operations.iter().map(|o| o.name()).collect();
    assert_eq!(names, vec!["get-team", "get-team-fields", "get-team-links"]);
    assert!(operations
        .iter()
        .all(|o| o.response().content() == operations[0].response().content()));
    assert!(operations.iter().all(|o| o.uri_template() == "/teams/{id}"));
}

#[tokio::test]
async fn test_response_capture_boundary() {
    for (size, truncated) in [(MAX_CAPTURED_RESPONSE, false), (MAX_CAPTURED_RESPONSE + 1, true)] {
        let recorder = OperationRecorder::new();
        let mut target = client()
            .target("http://localhost")
            .unwrap()
            .path("large/{size}")
            .resolve_template("size", size);
        documented(&mut target, &recorder, "large");

        let response = target.request().get().await.unwrap();
        assert_eq!(response.bytes().unwrap().len(), size, "caller sees the full body");

        let operation = recorder.last().unwrap();
        let captured = operation.response().content_as_string();
        if truncated {
            assert_eq!(captured.len(), MAX_CAPTURED_RESPONSE + TRUNCATION_MARKER.len());
            assert!(captured.ends_with(TRUNCATION_MARKER));
        } else {
            assert_eq!(captured.len(), size);
            assert!(!captured.ends_with(TRUNCATION_MARKER));
        }
    }
}

#[tokio::test]
async fn test_multipart_fields_become_parts() {
    let recorder = OperationRecorder::new();
    let mut target = client().target("http://localhost").unwrap().path("upload");
    documented(&mut target, &recorder, "upload");

    let form = MultipartForm::new()
        .field("a", "apple")
        .field("b", "banana")
        .field("c", "cherry");
    let response = target.request().post(form).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let operation = recorder.last().unwrap();
    let parts: Vec<(&str, String)> = operation
        .request()
        .parts()
        .iter()
        .map(|p| (p.name(), p.content_as_string().into_owned()))
        .collect();
    assert_eq!(
        parts,
        vec![
            ("a", "apple".to_string()),
            ("b", "banana".to_string()),
            ("c", "cherry".to_string()),
        ]
    );
    let content_type = operation.request().headers().get_first("content-type").unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    assert!(!operation.request().content().is_empty());
}

#[tokio::test]
async fn test_request_body_is_captured_and_preprocessed() {
    let recorder = OperationRecorder::new();
    let mut target = client().target("http://localhost").unwrap().path("upload");
    target
        .register(documentation_configuration(ManualContextProvider::new("target/snippets")))
        .unwrap()
        .register(
            DocumentationFilter::builder("echo-json")
                .preprocess_request(pretty_print())
                .snippet(recorder.clone())
                .build(),
        )
        .unwrap();

    let response = target.request().post(json!({ "name": "blue" })).await.unwrap();
    assert_eq!(response.text().unwrap(), r#"{"name":"blue"}"#);

    let operation = recorder.last().unwrap();
    assert_eq!(operation.request().content_as_string(), "{\n  \"name\": \"blue\"\n}");
    assert_eq!(operation.response().content_as_string(), r#"{"name":"blue"}"#);
}

#[tokio::test]
async fn test_capture_disabled_documents_empty_bodies() {
    let recorder = OperationRecorder::new();
    let client = DocsClient::builder()
        .config(ClientConfig {
            capture_enabled: false,
            ..Default::default()
        })
        .service(app())
        .build()
        .unwrap();
    let mut target = client.target("http://localhost").unwrap().path("upload");
    documented(&mut target, &recorder, "uncaptured");

    let response = target.request().post("plain text").await.unwrap();
    assert_eq!(response.text().unwrap(), "plain text");

    let operation = recorder.last().unwrap();
    assert!(operation.request().content().is_empty());
    assert!(operation.response().content().is_empty());
}

#[tokio::test]
async fn test_documented_uri_uses_overrides() {
    let recorder = OperationRecorder::new();
    let mut target = client().target("http://localhost:8080").unwrap().path("teams/{id}").resolve_template("id", 7);
    target
        .register(
            documentation_configuration(ManualContextProvider::new("target/snippets"))
                .uris(UriConfigurer::new().with_scheme("https").with_host("api.example.com").remove_port()),
        )
        .unwrap()
        .register(document("get-team", vec![]).snippet(recorder.clone()))
        .unwrap();

    target.request().accept("application/json").get().await.unwrap();

    let operation = recorder.last().unwrap();
    assert_eq!(operation.request().uri().as_str(), "https://api.example.com/teams/7");
    assert_eq!(operation.request().headers().get_first("accept"), Some("application/json"));
}

#[tokio::test]
async fn test_documentation_without_configurer_fails() {
    let recorder = OperationRecorder::new();
    let mut target = client().target("http://localhost").unwrap().path("large/1");
    target.register(document("unconfigured", vec![]).snippet(recorder.clone())).unwrap();

    let err = target.request().get().await.unwrap_err();
    assert!(matches!(err, DocsError::NotConfigured));
    assert!(err.is_usage_error());
    assert!(recorder.is_empty());
}

#[tokio::test]
async fn test_properties_reach_filters() {
    let seen = Arc::new(Mutex::new(None));
    let reader_seen = seen.clone();
    let mut target = client().target("http://localhost").unwrap().path("large/1");
    target
        .property("team", "blue")
        .unwrap()
        .register(Registration::filter(
            "read-property",
            priorities::USER,
            PropertyReader { seen: reader_seen },
        ))
        .unwrap();

    target.request().get().await.unwrap();
    assert_eq!(*seen.lock(), Some(json!("blue")));
}

struct PropertyReader {
    seen: Arc<Mutex<Option<serde_json::Value>>>,
}

impl ResponseFilter for PropertyReader {
    fn filter(&self, request: &mut RequestContext, _response: &mut ResponseContext) -> Result<()> {
        *self.seen.lock() = request.context().property("team").cloned();
        Ok(())
    }
}

#[tokio::test]
async fn test_multipart_names_with_quotes_are_recovered() {
    let recorder = OperationRecorder::new();
    let mut target = client().target("http://localhost").unwrap().path("upload");
    documented(&mut target, &recorder, "upload-quoted");

    let form = MultipartForm::new().field("a\"b", "v").file(
        "doc\"ument",
        "50% \"final\".txt",
        mime::TEXT_PLAIN,
        "contents",
    );
    target.request().post(form).await.unwrap();

    let operation = recorder.last().unwrap();
    let parts = operation.request().parts();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].name(), "a\"b");
    assert_eq!(parts[0].content_as_string(), "v");
    assert_eq!(parts[1].name(), "doc\"ument");
    assert_eq!(parts[1].filename(), Some("50% \"final\".txt"));
    assert_eq!(parts[1].content_as_string(), "contents");
}

#[tokio::test]
async fn test_each_exchange_gets_its_own_context() {
    let recorder = OperationRecorder::new();
    let mut target = client().target("http://localhost").unwrap().path("upload");
    documented(&mut target, &recorder, "upload-twice");

    let first = target.request().post("first body").await.unwrap();
    assert_eq!(first.text().unwrap(), "first body");
    let second = target.request().method(Method::POST, None).await.unwrap();
    assert_eq!(second.status(), StatusCode::CREATED);

    let operations = recorder.operations();
    assert_eq!(operations.len(), 2);
    assert_eq!(operations[0].request().content_as_string(), "first body");
    assert_eq!(operations[0].response().content_as_string(), "first body");
    assert!(operations[1].request().content().is_empty());
    assert!(operations[1].response().content().is_empty());
    assert_eq!(operations[0].attributes()[attributes::STEP], json!(1));
    assert_eq!(operations[1].attributes()[attributes::STEP], json!(2));
}
