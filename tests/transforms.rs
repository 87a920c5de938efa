// tests/transforms.rs

#![cfg(unix)]

mod common;
use crate::common::{file_names, init_tracing, ConfigFileBuilder, Project};

use std::sync::Arc;
use std::time::Duration;

use assetpipe::fs::RealFileSystem;
use assetpipe::transform::{
    TransformEnv, TransformError, TransformInvocation, TransformOptions, TransformRegistry,
    BUNDLE_SCRIPTS, CLEAN, COMPILE_STYLESHEETS, LINT_SCRIPTS, PUBLISH_COMPRESSED,
};
use assetpipe::types::BuildMode;

fn registry(project: &Project, builder: ConfigFileBuilder) -> TransformRegistry {
    let env = TransformEnv::new(project.root(), Arc::new(RealFileSystem));
    TransformRegistry::with_builtins(env, &builder.build()).unwrap()
}

fn css_invocation(project: &Project, mode: BuildMode) -> TransformInvocation {
    TransformInvocation::new(
        vec!["stylesheets/src/all.scss".to_string()],
        project.path("stylesheets/dist"),
    )
    .output_name("all.css")
    .options(TransformOptions::for_mode(mode))
}

#[tokio::test]
async fn compiled_stylesheet_is_written_from_compiler_stdout() {
    init_tracing();
    let project = Project::new();
    project.write("stylesheets/src/all.scss", "$c: red; body { color: $c; }");

    // The trailing `#` swallows the arguments the transform appends.
    let registry = registry(
        &project,
        ConfigFileBuilder::new().sass("printf 'body{color:red}' #"),
    );

    let produced = registry
        .invoke(COMPILE_STYLESHEETS, &css_invocation(&project, BuildMode::Production))
        .await
        .unwrap();

    assert_eq!(file_names(&produced), ["all.css"]);
    assert_eq!(project.read("stylesheets/dist/all.css"), "body{color:red}");
}

#[tokio::test]
async fn failed_compilation_keeps_previous_output() {
    init_tracing();
    let project = Project::new();
    project.write("stylesheets/src/all.scss", "body {");
    project.write("stylesheets/dist/all.css", "body{color:blue}");

    let registry = registry(
        &project,
        ConfigFileBuilder::new().sass("echo 'Error: expected \"}\"' >&2; exit 3 #"),
    );

    let err = registry
        .invoke(COMPILE_STYLESHEETS, &css_invocation(&project, BuildMode::Development))
        .await
        .unwrap_err();

    match err {
        TransformError::Tool { code, stderr, .. } => {
            assert_eq!(code, 3);
            assert!(stderr.contains("expected"), "{stderr}");
        }
        other => panic!("expected a tool error, got {other}"),
    }
    assert_eq!(project.read("stylesheets/dist/all.css"), "body{color:blue}");
}

#[tokio::test]
async fn production_bundle_goes_through_minifier() {
    init_tracing();
    let project = Project::new();
    project.write("javascripts/src/a.js", "var a = 1;");
    project.write("javascripts/src/b.js", "var b = 2;");

    let registry = registry(&project, ConfigFileBuilder::new().minifier("tr -d ' '"));
    let inv = TransformInvocation::new(
        vec!["javascripts/src/*.js".to_string()],
        project.path("javascripts/dist"),
    )
    .output_name("all.js")
    .options(TransformOptions::for_mode(BuildMode::Production));

    registry.invoke(BUNDLE_SCRIPTS, &inv).await.unwrap();

    let bundle = project.read("javascripts/dist/all.js");
    assert_eq!(bundle, "vara=1;\nvarb=2;");
    assert!(!bundle.contains("sourceMappingURL"));
}

#[tokio::test]
async fn dependency_bundle_keeps_declared_order() {
    init_tracing();
    let project = Project::new();
    project.write("vendor/zepto.js", "// zepto");
    project.write("vendor/alpha.js", "// alpha");

    let registry = registry(&project, ConfigFileBuilder::new());
    let inv = TransformInvocation::new(
        vec!["vendor/zepto.js".to_string(), "vendor/alpha.js".to_string()],
        project.path("javascripts/dist"),
    )
    .output_name("libs.js")
    .options(TransformOptions::for_mode(BuildMode::Development));

    registry.invoke(BUNDLE_SCRIPTS, &inv).await.unwrap();

    let bundle = project.read("javascripts/dist/libs.js");
    assert!(bundle.starts_with("// zepto\n// alpha\n"), "{bundle}");
    assert!(bundle.contains("//# sourceMappingURL=data:application/json;"));
}

#[tokio::test]
async fn failing_minifier_leaves_no_bundle() {
    init_tracing();
    let project = Project::new();
    project.write("javascripts/src/a.js", "var a = ;");

    let registry = registry(&project, ConfigFileBuilder::new().minifier("exit 1"));
    let inv = TransformInvocation::new(
        vec!["javascripts/src/*.js".to_string()],
        project.path("javascripts/dist"),
    )
    .output_name("all.js")
    .options(TransformOptions::for_mode(BuildMode::Production));

    let err = registry.invoke(BUNDLE_SCRIPTS, &inv).await.unwrap_err();
    assert!(matches!(err, TransformError::Tool { code: 1, .. }));
    assert!(!project.exists("javascripts/dist/all.js"));
}

#[tokio::test]
async fn lint_reports_every_offending_file() {
    init_tracing();
    let project = Project::new();
    project.write("javascripts/src/clean.js", "var ok = true;");
    project.write("javascripts/src/dirty.js", "debugger;");
    project.write("javascripts/src/worse.js", "debugger; debugger;");

    // Exits non-zero (and prints the match) when `debugger` is present.
    let registry = registry(&project, ConfigFileBuilder::new().linter("! grep -H debugger"));
    let inv = TransformInvocation::new(
        vec!["javascripts/src/*.js".to_string()],
        project.path("javascripts/dist"),
    );

    let err = registry.invoke(LINT_SCRIPTS, &inv).await.unwrap_err();
    match err {
        TransformError::Lint { files, report } => {
            assert_eq!(files, 2);
            assert!(report.contains("dirty.js"), "{report}");
            assert!(report.contains("worse.js"), "{report}");
            assert!(!report.contains("clean.js"), "{report}");
        }
        other => panic!("expected a lint error, got {other}"),
    }
}

#[tokio::test]
async fn clean_lint_produces_nothing() {
    init_tracing();
    let project = Project::new();
    project.write("javascripts/src/clean.js", "var ok = true;");

    let registry = registry(&project, ConfigFileBuilder::new().linter("! grep -H debugger"));
    let inv = TransformInvocation::new(
        vec!["javascripts/src/*.js".to_string()],
        project.path("javascripts/dist"),
    );

    let produced = registry.invoke(LINT_SCRIPTS, &inv).await.unwrap();
    assert!(produced.is_empty());
}

#[tokio::test]
async fn clean_removes_only_matching_files() {
    init_tracing();
    let project = Project::new();
    project.write("stylesheets/dist/all.css", "a");
    project.write("stylesheets/dist/all.css.map", "b");
    project.write("stylesheets/dist/README", "keep");

    let registry = registry(&project, ConfigFileBuilder::new());
    let inv = TransformInvocation::new(
        vec!["stylesheets/dist/*.*".to_string()],
        project.path("stylesheets/dist"),
    );

    let mut removed = file_names(&registry.invoke(CLEAN, &inv).await.unwrap());
    removed.sort();
    assert_eq!(removed, ["all.css", "all.css.map"]);
    assert!(project.exists("stylesheets/dist/README"));

    // Nothing left to match is not an error.
    assert!(registry.invoke(CLEAN, &inv).await.unwrap().is_empty());
}

#[tokio::test]
async fn publish_clears_only_compressed_sources() {
    init_tracing();
    let project = Project::new();
    project.write("images/compress/hero.png", "raw hero");
    project.write("images/compress/icons/star.svg", "raw star");
    project.write("images/compress/broken.gif", "raw broken");

    // Outputs written after their sources.
    std::thread::sleep(Duration::from_millis(20));
    project.write("images/hero.png", "small hero");
    project.write("images/icons/star.svg", "small star");

    let registry = registry(&project, ConfigFileBuilder::new());
    let inv = TransformInvocation::new(
        vec!["images/compress/**/*.{jpg,jpeg,png,svg,gif}".to_string()],
        project.path("images"),
    );

    let mut removed = file_names(&registry.invoke(PUBLISH_COMPRESSED, &inv).await.unwrap());
    removed.sort();
    assert_eq!(removed, ["hero.png", "star.svg"]);
    assert!(project.exists("images/compress/broken.gif"));
    assert_eq!(project.read("images/hero.png"), "small hero");
}

#[tokio::test]
async fn unknown_transform_is_an_error() {
    let project = Project::new();
    let registry = registry(&project, ConfigFileBuilder::new());
    let inv = TransformInvocation::new(vec![], project.root());

    let err = registry.invoke("uglify-everything", &inv).await.unwrap_err();
    assert!(matches!(err, TransformError::UnknownTransform(name) if name == "uglify-everything"));
}
