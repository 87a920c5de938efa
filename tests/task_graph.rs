// tests/task_graph.rs

mod common;
use crate::common::{init_tracing, with_timeout, Recorder};

use std::sync::Arc;
use std::time::Duration;

use assetpipe::dag::{no_work, TaskContext, TaskGraph, TaskRunState};
use assetpipe::errors::PipelineError;

/// build-css <- clean-css, plus an unrelated task.
fn css_graph(rec: &Recorder) -> TaskGraph {
    let mut g = TaskGraph::new();
    g.register("clean-css", &[], rec.work("clean-css")).unwrap();
    g.register("build-css", &["clean-css"], rec.work("build-css"))
        .unwrap();
    g.register("hint-js", &[], rec.work("hint-js")).unwrap();
    g
}

#[tokio::test]
async fn prerequisites_run_before_dependents() {
    init_tracing();
    let rec = Recorder::new();
    let graph = Arc::new(css_graph(&rec));

    let report = with_timeout(graph.run("build-css")).await.unwrap();

    assert_eq!(rec.recorded(), ["clean-css", "build-css"]);
    assert_eq!(report.executed(), ["clean-css", "build-css"]);
    assert!(report.is_success());
    assert_eq!(report.state_of("hint-js"), TaskRunState::NotInRun);
}

#[tokio::test]
async fn shared_prerequisite_runs_once_per_run() {
    init_tracing();
    let rec = Recorder::new();
    let mut g = TaskGraph::new();
    g.register("base", &[], rec.work("base")).unwrap();
    g.register("left", &["base"], rec.work("left")).unwrap();
    g.register("right", &["base"], rec.work("right")).unwrap();
    g.register("top", &["left", "right"], rec.work("top")).unwrap();
    let graph = Arc::new(g);

    graph.run("top").await.unwrap();

    assert_eq!(rec.recorded(), ["base", "left", "right", "top"]);
}

#[tokio::test]
async fn slow_prerequisite_is_awaited() {
    init_tracing();
    let rec = Recorder::new();
    let mut g = TaskGraph::new();
    g.register("compress", &[], rec.delayed("compress", Duration::from_millis(50)))
        .unwrap();
    g.register("publish", &["compress"], rec.work("publish"))
        .unwrap();
    let graph = Arc::new(g);

    with_timeout(graph.run("publish")).await.unwrap();

    assert_eq!(rec.recorded(), ["compress:start", "compress", "publish"]);
}

#[tokio::test]
async fn failure_is_recorded_and_the_run_continues() {
    init_tracing();
    let rec = Recorder::new();
    let mut g = TaskGraph::new();
    g.register("clean-js", &[], rec.failing("clean-js")).unwrap();
    g.register("build-js", &["clean-js"], rec.work("build-js"))
        .unwrap();
    let graph = Arc::new(g);

    let report = graph.run("build-js").await.unwrap();

    assert_eq!(rec.recorded(), ["clean-js", "build-js"]);
    assert_eq!(report.state_of("clean-js"), TaskRunState::Failed);
    assert_eq!(report.state_of("build-js"), TaskRunState::Succeeded);
    assert!(!report.is_success());
    assert!(report.any_succeeded());
    let failed: Vec<_> = report.failed().map(|r| r.name.as_str()).collect();
    assert_eq!(failed, ["clean-js"]);
    assert!(report.records[0]
        .error
        .as_deref()
        .unwrap()
        .contains("failed on purpose"));
}

#[tokio::test]
async fn unknown_task_fails_without_running_anything() {
    init_tracing();
    let rec = Recorder::new();
    let graph = Arc::new(css_graph(&rec));

    let err = graph.run("build-scss").await.unwrap_err();

    assert!(matches!(err, PipelineError::UnknownTask(ref n) if n == "build-scss"));
    assert!(rec.recorded().is_empty());
}

#[tokio::test]
async fn unresolved_prerequisite_fails_without_side_effects() {
    init_tracing();
    let rec = Recorder::new();
    let mut g = TaskGraph::new();
    g.register("a", &[], rec.work("a")).unwrap();
    g.register("b", &["a", "missing"], rec.work("b")).unwrap();
    let graph = Arc::new(g);

    let err = graph.run("b").await.unwrap_err();

    match err {
        PipelineError::UnresolvedPrerequisite { task, prerequisite } => {
            assert_eq!(task, "b");
            assert_eq!(prerequisite, "missing");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(rec.recorded().is_empty());
    assert!(graph.ensure_resolved().is_err());
}

#[test]
fn forward_references_resolve_once_registered() {
    let mut g = TaskGraph::new();
    g.register("watch", &["browser-sync"], no_work()).unwrap();
    assert!(g.ensure_resolved().is_err());

    g.register("browser-sync", &[], no_work()).unwrap();
    g.ensure_resolved().unwrap();
    assert_eq!(g.plan("watch").unwrap(), ["browser-sync", "watch"]);
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut g = TaskGraph::new();
    g.register("kraken", &[], no_work()).unwrap();
    let err = g.register("kraken", &[], no_work()).unwrap_err();
    assert!(matches!(err, PipelineError::DuplicateTask(ref n) if n == "kraken"));
}

#[test]
fn cycles_are_rejected_at_registration() {
    let mut g = TaskGraph::new();
    g.register("a", &["b"], no_work()).unwrap();
    g.register("b", &["c"], no_work()).unwrap();

    let err = g.register("c", &["a"], no_work()).unwrap_err();
    assert!(matches!(err, PipelineError::CyclicDependency(_)));
    assert!(!g.contains("c"));

    let err = g.register("self", &["self"], no_work()).unwrap_err();
    assert!(matches!(err, PipelineError::CyclicDependency(_)));

    // The rejected edge left no trace: `c` can still be registered sanely.
    g.register("c", &[], no_work()).unwrap();
    assert_eq!(g.plan("a").unwrap(), ["c", "b", "a"]);
}

#[test]
fn listing_keeps_registration_order_and_dedups_prerequisites() {
    let mut g = TaskGraph::new();
    g.register("x", &[], no_work()).unwrap();
    g.register("y", &["x", "x"], no_work()).unwrap();

    assert_eq!(g.task_names().collect::<Vec<_>>(), ["x", "y"]);
    assert_eq!(g.prerequisites_of("y"), ["x"]);
    assert!(g.prerequisites_of("nope").is_empty());
}

#[tokio::test]
async fn each_run_gets_a_new_id_and_fresh_state() {
    init_tracing();
    let rec = Recorder::new();
    let graph = Arc::new(css_graph(&rec));

    let first = graph.run("build-css").await.unwrap();
    let second = graph.run("build-css").await.unwrap();

    assert!(second.run_id > first.run_id);
    assert_eq!(rec.count("clean-css"), 2);
    assert_eq!(rec.count("build-css"), 2);
}

#[tokio::test]
async fn concurrent_runs_do_not_interfere() {
    init_tracing();
    let rec = Recorder::new();
    let mut g = TaskGraph::new();
    g.register("slow", &[], rec.delayed("slow", Duration::from_millis(40)))
        .unwrap();
    g.register("fast", &[], rec.work("fast")).unwrap();
    let graph = Arc::new(g);

    let (a, b) = with_timeout(async { tokio::join!(graph.run("slow"), graph.run("fast")) }).await;
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a.run_id, b.run_id);
    assert_eq!(a.executed(), ["slow"]);
    assert_eq!(b.executed(), ["fast"]);
    assert_eq!(rec.recorded(), ["slow:start", "fast", "slow"]);
}

#[tokio::test]
async fn work_can_start_further_runs_through_its_context() {
    init_tracing();
    let rec = Recorder::new();
    let mut g = TaskGraph::new();
    g.register("leaf", &[], rec.work("leaf")).unwrap();
    g.register("launcher", &[], |ctx: TaskContext| async move {
        let report = ctx.graph.run("leaf").await?;
        assert!(report.run_id > ctx.run_id);
        assert_eq!(ctx.task, "launcher");
        Ok::<(), PipelineError>(())
    })
    .unwrap();
    let graph = Arc::new(g);

    let report = with_timeout(graph.run("launcher")).await.unwrap();
    assert!(report.is_success());
    assert_eq!(rec.recorded(), ["leaf"]);
}
