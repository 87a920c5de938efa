// tests/watch_runtime.rs

mod common;
use crate::common::{init_tracing, wait_until, with_timeout, Project, Recorder};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use assetpipe::dag::TaskGraph;
use assetpipe::engine::{RuntimeEvent, WatchRuntime};
use assetpipe::fs::RealFileSystem;
use assetpipe::server::ReloadHub;
use assetpipe::watch::{spawn_watcher, WatchBindings};

fn stylesheet_graph(recorder: &Recorder) -> Arc<TaskGraph> {
    let mut graph = TaskGraph::new();
    graph.register("clean-css", &[], recorder.work("clean-css")).unwrap();
    graph
        .register("build-css", &["clean-css"], recorder.work("build-css"))
        .unwrap();
    graph.register("hint-js", &[], recorder.failing("hint-js")).unwrap();
    graph.register("build-js", &[], recorder.work("build-js")).unwrap();
    Arc::new(graph)
}

#[tokio::test]
async fn firing_runs_bound_tasks_and_reloads_browsers() {
    init_tracing();
    let recorder = Recorder::new();
    let graph = stylesheet_graph(&recorder);

    let mut bindings = WatchBindings::new();
    bindings.watch(&["stylesheets/**/*"], &["build-css"]).unwrap();

    let hub = ReloadHub::new();
    let mut browser = hub.subscribe();
    let runtime = WatchRuntime::new(graph, Arc::new(bindings), Some(hub));
    let tx = runtime.sender();
    let session = tokio::spawn(runtime.run());

    tx.send(RuntimeEvent::BindingFired {
        binding: 0,
        path: PathBuf::from("stylesheets/site.scss"),
    })
    .await
    .unwrap();

    let reason = with_timeout(browser.recv()).await.unwrap();
    assert_eq!(reason, "build-css");
    assert_eq!(recorder.recorded(), ["clean-css", "build-css"]);

    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    with_timeout(session).await.unwrap().unwrap();
}

#[tokio::test]
async fn every_bound_task_runs_even_when_one_fails() {
    init_tracing();
    let recorder = Recorder::new();
    let graph = stylesheet_graph(&recorder);

    let mut bindings = WatchBindings::new();
    bindings
        .watch(&["javascripts/src/*"], &["hint-js", "build-js"])
        .unwrap();

    let hub = ReloadHub::new();
    let mut browser = hub.subscribe();
    let runtime = WatchRuntime::new(graph, Arc::new(bindings), Some(hub));
    let tx = runtime.sender();
    let session = tokio::spawn(runtime.run());

    tx.send(RuntimeEvent::BindingFired {
        binding: 0,
        path: PathBuf::from("javascripts/src/app.js"),
    })
    .await
    .unwrap();

    // Only the successful run asks for a reload.
    let reason = with_timeout(browser.recv()).await.unwrap();
    assert_eq!(reason, "build-js");

    wait_until(Duration::from_secs(2), || {
        recorder.count("hint-js") == 1 && recorder.count("build-js") == 1
    })
    .await;

    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    with_timeout(session).await.unwrap().unwrap();
    assert!(browser.try_recv().is_err());
}

#[tokio::test]
async fn repeated_firings_run_again() {
    init_tracing();
    let recorder = Recorder::new();
    let graph = stylesheet_graph(&recorder);

    let mut bindings = WatchBindings::new();
    bindings.watch(&["stylesheets/**/*"], &["build-css"]).unwrap();

    let runtime = WatchRuntime::new(graph, Arc::new(bindings), None);
    let tx = runtime.sender();
    let session = tokio::spawn(runtime.run());

    for _ in 0..3 {
        tx.send(RuntimeEvent::BindingFired {
            binding: 0,
            path: PathBuf::from("stylesheets/a.scss"),
        })
        .await
        .unwrap();
    }

    wait_until(Duration::from_secs(2), || recorder.count("build-css") == 3).await;
    assert_eq!(recorder.count("clean-css"), 3);

    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    with_timeout(session).await.unwrap().unwrap();
}

#[tokio::test]
async fn unknown_binding_is_ignored() {
    init_tracing();
    let recorder = Recorder::new();
    let graph = stylesheet_graph(&recorder);

    let runtime = WatchRuntime::new(graph, Arc::new(WatchBindings::new()), None);
    let tx = runtime.sender();
    let session = tokio::spawn(runtime.run());

    tx.send(RuntimeEvent::BindingFired {
        binding: 7,
        path: PathBuf::from("anything"),
    })
    .await
    .unwrap();
    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();

    with_timeout(session).await.unwrap().unwrap();
    assert!(recorder.recorded().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn filesystem_changes_trigger_bound_tasks() {
    init_tracing();
    let project = Project::new();
    project.write("javascripts/src/app.js", "var a = 1;");
    project.write("notes.txt", "nothing to see");

    let recorder = Recorder::new();
    let graph = stylesheet_graph(&recorder);

    let mut bindings = WatchBindings::new();
    bindings.watch(&["javascripts/src/*"], &["build-js"]).unwrap();
    let bindings = Arc::new(bindings);

    let runtime = WatchRuntime::new(graph, Arc::clone(&bindings), None);
    let tx = runtime.sender();
    let _watcher = spawn_watcher(
        project.root(),
        bindings,
        Arc::new(RealFileSystem),
        runtime.sender(),
    )
    .unwrap();
    let session = tokio::spawn(runtime.run());

    // Give the OS watcher a moment to arm.
    tokio::time::sleep(Duration::from_millis(300)).await;

    project.write("notes.txt", "still nothing");
    project.write("javascripts/src/app.js", "var a = 2;");

    wait_until(Duration::from_secs(10), || recorder.count("build-js") >= 1).await;
    assert_eq!(recorder.count("build-css"), 0);

    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    with_timeout(session).await.unwrap().unwrap();
}

#[tokio::test]
async fn session_survives_a_failed_rebuild() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assetpipe::dag::TaskContext;
    use assetpipe::errors::PipelineError;

    init_tracing();
    let attempts = Arc::new(AtomicUsize::new(0));
    let mut graph = TaskGraph::new();
    {
        let attempts = Arc::clone(&attempts);
        graph
            .register("build-css", &[], move |_ctx: TaskContext| {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        return Err(PipelineError::Other(anyhow::anyhow!(
                            "expected \"}}\" at line 1"
                        )));
                    }
                    Ok::<(), PipelineError>(())
                }
            })
            .unwrap();
    }

    let mut bindings = WatchBindings::new();
    bindings.watch(&["stylesheets/**/*"], &["build-css"]).unwrap();

    let hub = ReloadHub::new();
    let mut browser = hub.subscribe();
    let runtime = WatchRuntime::new(Arc::new(graph), Arc::new(bindings), Some(hub));
    let tx = runtime.sender();
    let session = tokio::spawn(runtime.run());

    let fire = || RuntimeEvent::BindingFired {
        binding: 0,
        path: PathBuf::from("stylesheets/src/all.scss"),
    };

    tx.send(fire()).await.unwrap();
    wait_until(Duration::from_secs(2), || attempts.load(Ordering::SeqCst) == 1).await;

    tx.send(fire()).await.unwrap();
    let reason = with_timeout(browser.recv()).await.unwrap();
    assert_eq!(reason, "build-css");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);

    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    with_timeout(session).await.unwrap().unwrap();
}
