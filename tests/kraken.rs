// tests/kraken.rs

mod common;
use crate::common::{file_names, init_tracing, with_timeout, Project};

use std::sync::Arc;

use assetpipe::fs::RealFileSystem;
use assetpipe::transform::kraken::CompressImages;
use assetpipe::transform::{
    Transform, TransformEnv, TransformError, TransformInvocation, TransformOptions,
};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PATTERN: &str = "images/compress/**/*.{jpg,jpeg,png,svg,gif}";

fn invocation(project: &Project, concurrency: usize) -> TransformInvocation {
    TransformInvocation::new(vec![PATTERN.to_string()], project.path("images"))
        .options(TransformOptions::default().with_concurrency(concurrency))
}

fn env(project: &Project) -> TransformEnv {
    TransformEnv::new(project.root(), Arc::new(RealFileSystem))
}

async fn mount_download(server: &MockServer, body: &'static [u8]) {
    Mock::given(method("GET"))
        .and(path("/dl/compressed"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

fn upload_ok(server: &MockServer) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "file_name": "upload",
        "original_size": 1000,
        "kraked_size": 400,
        "kraked_url": format!("{}/dl/compressed", server.uri()),
    }))
}

#[tokio::test]
async fn uploads_with_credentials_and_writes_download() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/upload"))
        .and(body_string_contains("\"api_key\":\"k1\""))
        .and(body_string_contains("\"api_secret\":\"s1\""))
        .and(body_string_contains("\"wait\":true"))
        .and(body_string_contains("\"lossy\":true"))
        .respond_with(upload_ok(&server))
        .expect(1)
        .mount(&server)
        .await;
    mount_download(&server, b"tiny").await;

    let project = Project::new();
    project.write("images/compress/team/portrait.jpg", "raw portrait bytes");

    let transform = CompressImages::new(format!("{}/v1/upload", server.uri()), "k1", "s1").unwrap();
    let env = env(&project);
    let inv = invocation(&project, 2);

    let produced = with_timeout(transform.invoke(&env, &inv)).await.unwrap();

    assert_eq!(produced, [project.path("images/team/portrait.jpg")]);
    assert_eq!(project.read("images/team/portrait.jpg"), "tiny");
    // The source stays until the publish step.
    assert!(project.exists("images/compress/team/portrait.jpg"));
}

#[tokio::test]
async fn every_image_is_uploaded_once() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/upload"))
        .respond_with(upload_ok(&server))
        .expect(5)
        .mount(&server)
        .await;
    mount_download(&server, b"small").await;

    let project = Project::new();
    for name in ["a.png", "b.jpg", "c.gif", "d.svg", "e.jpeg"] {
        project.write(&format!("images/compress/{name}"), name);
    }
    project.write("images/compress/notes.txt", "not an image");

    let transform = CompressImages::new(format!("{}/v1/upload", server.uri()), "k", "s").unwrap();
    let env = env(&project);

    let produced = with_timeout(transform.invoke(&env, &invocation(&project, 2)))
        .await
        .unwrap();

    assert_eq!(
        file_names(&produced),
        ["a.png", "b.jpg", "c.gif", "d.svg", "e.jpeg"]
    );
    assert!(!project.exists("images/notes.txt"));
}

#[tokio::test]
async fn one_rejected_image_fails_the_batch_but_not_the_others() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/upload"))
        .and(body_string_contains("broken.gif"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "success": false,
            "message": "Incoming request body does not contain a valid image",
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/upload"))
        .respond_with(upload_ok(&server))
        .mount(&server)
        .await;
    mount_download(&server, b"ok").await;

    let project = Project::new();
    project.write("images/compress/hero.png", "hero");
    project.write("images/compress/broken.gif", "garbage");

    let transform = CompressImages::new(format!("{}/v1/upload", server.uri()), "k", "s").unwrap();
    let env = env(&project);

    let err = with_timeout(transform.invoke(&env, &invocation(&project, 4)))
        .await
        .unwrap_err();

    assert!(matches!(err, TransformError::Partial { failed: 1, total: 2 }), "{err}");
    assert_eq!(project.read("images/hero.png"), "ok");
    assert!(!project.exists("images/broken.gif"));
}

#[tokio::test]
async fn missing_credentials_fail_without_uploading() {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let project = Project::new();
    project.write("images/compress/hero.png", "hero");

    let transform = CompressImages::new(format!("{}/v1/upload", server.uri()), "", "").unwrap();
    let env = env(&project);

    let err = transform
        .invoke(&env, &invocation(&project, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, TransformError::Remote { .. }));
}

#[tokio::test]
async fn empty_compression_dir_is_a_no_op() {
    let project = Project::new();
    let transform = CompressImages::new("http://127.0.0.1:9/v1/upload", "k", "s").unwrap();
    let env = env(&project);

    let produced = transform.invoke(&env, &invocation(&project, 1)).await.unwrap();
    assert!(produced.is_empty());
}
