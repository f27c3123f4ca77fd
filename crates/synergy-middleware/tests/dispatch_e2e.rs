//! End-to-end dispatch through assembled pipelines.

use std::sync::Arc;
use std::time::Duration;
use synergy_controllers::{FileController, MemoryController};
use synergy_core::fixtures::{CallLog, ObservedController, RecordingController};
use synergy_core::{ControllerFilter, DispatchError, ErrorKind, Request, StatusCode};
use synergy_middleware::{
    ControllerRegistry, Dispatcher, EnvExpandMiddleware, PathResolveMiddleware, Pipeline,
    RecoveryMiddleware, TelemetryMiddleware,
};
use tokio_util::sync::CancellationToken;

fn registry_of(controllers: &[RecordingController]) -> Arc<ControllerRegistry> {
    Arc::new(controllers.iter().cloned().collect())
}

fn pipeline_over(dispatcher: Arc<Dispatcher>) -> Pipeline {
    Pipeline::builder()
        .add_stage(TelemetryMiddleware::new("e2e"))
        .build_shared(dispatcher)
}

#[tokio::test]
async fn read_returns_first_success_in_registration_order() {
    let controllers = [
        RecordingController::not_found("c0", "file"),
        RecordingController::with_resources("c1", "file", ["other.txt"]),
        RecordingController::with_resources("c2", "file", ["a.txt"]),
        RecordingController::found("c3", "file"),
        RecordingController::found("c4", "file"),
    ];
    let pipeline = pipeline_over(Arc::new(Dispatcher::new(registry_of(&controllers))));

    let response = pipeline.process(Request::read("file", "a.txt")).await.unwrap();

    assert_eq!(response.body().as_text(), Some("c2:a.txt"));
    let counts: Vec<usize> = controllers.iter().map(RecordingController::call_count).collect();
    assert_eq!(counts, vec![1, 1, 1, 0, 0]);
}

#[tokio::test]
async fn writes_require_exactly_one_candidate() {
    let a = RecordingController::found("a", "file").with_tag("primary");
    let b = RecordingController::found("b", "file");
    let pipeline = pipeline_over(Arc::new(Dispatcher::new(registry_of(&[a.clone(), b.clone()]))));

    let err = pipeline
        .process(Request::create("file", "x.txt", "body"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AmbiguousMatch);
    assert!(err.to_string().contains("x.txt"));

    let err = pipeline
        .process(Request::update("file", "x.txt", "body").with_filter(ControllerFilter::by_tag("none")))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ZeroMatch);

    let response = pipeline
        .process(Request::update("file", "x.txt", "body").with_filter(ControllerFilter::by_tag("primary")))
        .await
        .unwrap();
    assert!(response.is_success());
    assert_eq!(a.call_count(), 1);
    assert_eq!(b.call_count(), 0);
}

#[tokio::test]
async fn ambiguous_create_names_the_resource() {
    let registry = registry_of(&[
        RecordingController::found("ControllerA", "file"),
        RecordingController::found("ControllerB", "file"),
    ]);
    let pipeline = pipeline_over(Arc::new(Dispatcher::new(registry)));

    match pipeline.process(Request::create("file", "x.txt", "data")).await {
        Err(DispatchError::AmbiguousMatch {
            resource,
            candidates,
            ..
        }) => {
            assert_eq!(resource, "x.txt");
            assert_eq!(candidates, vec!["ControllerA", "ControllerB"]);
        }
        other => panic!("expected ambiguous match, got {other:?}"),
    }
}

#[tokio::test]
async fn cached_controller_is_invoked_without_search() {
    let first = RecordingController::not_found("first", "file");
    let second = RecordingController::found("second", "file");
    let registry = registry_of(&[first.clone(), second.clone()]);
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&registry)));
    let pipeline = pipeline_over(Arc::clone(&dispatcher));

    pipeline.process(Request::read("file", "a.txt")).await.unwrap();
    registry.register(RecordingController::found("late", "file"));
    let response = pipeline.process(Request::read("file", "a.txt")).await.unwrap();

    assert_eq!(response.body().as_text(), Some("second:a.txt"));
    assert_eq!(first.call_count(), 1);
    assert_eq!(second.call_count(), 2);
    assert_eq!(dispatcher.cache().stats().hits, 1);
}

#[tokio::test]
async fn caching_disabled_resolves_every_time() {
    let first = RecordingController::not_found("first", "file");
    let second = RecordingController::found("second", "file");
    let dispatcher = Arc::new(Dispatcher::new(registry_of(&[first.clone(), second.clone()])));
    let pipeline = pipeline_over(Arc::clone(&dispatcher));

    for _ in 0..2 {
        let request = Request::read("file", "a.txt").with_controller_caching(false);
        assert!(pipeline.process(request).await.unwrap().is_success());
    }

    assert_eq!(first.call_count(), 2);
    assert_eq!(second.call_count(), 2);
    assert!(dispatcher.cache().is_empty());
    assert_eq!(dispatcher.cache().stats().hits, 0);
}

#[tokio::test]
async fn stale_cache_wins_after_registry_removal() {
    let only = RecordingController::found("only", "file");
    let registry = registry_of(&[only.clone()]);
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&registry)));
    let pipeline = pipeline_over(Arc::clone(&dispatcher));

    pipeline.process(Request::read("file", "a.txt")).await.unwrap();
    pipeline.process(Request::read("file", "a.txt")).await.unwrap();
    assert_eq!(dispatcher.cache().stats().hits, 1);

    assert!(registry.remove("only").is_some());
    let stale = pipeline.process(Request::read("file", "a.txt")).await.unwrap();
    assert_eq!(stale.body().as_text(), Some("only:a.txt"));
    assert_eq!(only.call_count(), 3);

    let err = pipeline
        .process(Request::read("file", "a.txt").with_controller_caching(false))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
    assert_eq!(only.call_count(), 3);
}

#[tokio::test]
async fn name_rewrites_before_dispatch_change_the_cache_key() {
    let store = Arc::new(MemoryController::new("mem").with_schemas(["file"]));
    store.insert("/srv/a.txt", "contents");

    let registry = Arc::new(ControllerRegistry::new());
    registry.register_shared(store);
    let dispatcher = Arc::new(Dispatcher::new(registry));

    let pipeline = Pipeline::builder()
        .add_stage(EnvExpandMiddleware::with_lookup(|name| {
            (name == "NAME").then(|| "a.txt".to_string())
        }))
        .add_stage(PathResolveMiddleware::new("/srv"))
        .build_shared(dispatcher.clone());

    let response = pipeline.process(Request::read("file", "${NAME}")).await.unwrap();
    assert_eq!(response.status(), StatusCode::Success);
    assert_eq!(response.resource_name(), "/srv/a.txt");

    assert_eq!(dispatcher.cache().peek("/srv/a.txt").as_deref(), Some("mem"));
    assert!(dispatcher.cache().peek("${NAME}").is_none());
}

#[tokio::test]
async fn file_system_fallback_after_memory_miss() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "on disk").unwrap();

    let log = CallLog::new();
    let registry = Arc::new(ControllerRegistry::new());
    registry.register(ObservedController::new(
        MemoryController::new("memory").with_schemas(["file"]),
        &log,
    ));
    registry.register(ObservedController::new(
        FileController::new("physical", dir.path()),
        &log,
    ));
    let pipeline = pipeline_over(Arc::new(Dispatcher::new(registry)));

    let response = pipeline.process(Request::read("file", "a.txt")).await.unwrap();
    assert!(response.is_success());
    assert_eq!(
        response.body().as_bytes().map(|b| b.as_ref()),
        Some(&b"on disk"[..])
    );
    assert_eq!(
        log.outcomes(),
        vec![
            ("memory".to_string(), Some(StatusCode::NotFound)),
            ("physical".to_string(), Some(StatusCode::Success)),
        ]
    );
}

#[tokio::test]
async fn recovery_turns_undeclared_schema_into_not_found() {
    let registry = registry_of(&[RecordingController::found("mem", "memory")]);
    let pipeline = Pipeline::builder()
        .add_stage(RecoveryMiddleware::new())
        .build(Dispatcher::new(registry));

    let response = pipeline.process(Request::read("sql", "users")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NotFound);
}

#[tokio::test]
async fn cancellation_surfaces_as_cancelled() {
    let registry = registry_of(&[RecordingController::hanging("slow", "file")]);
    let pipeline = pipeline_over(Arc::new(Dispatcher::new(registry)));
    let token = CancellationToken::new();

    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = pipeline
        .process_cancellable(Request::read("file", "a.txt"), token)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(err.resource_name(), Some("a.txt"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_share_one_pipeline() {
    let store = Arc::new(MemoryController::new("mem"));
    for i in 0..32 {
        store.insert(format!("key-{i}"), format!("value-{i}"));
    }
    let registry = Arc::new(ControllerRegistry::new());
    registry.register_shared(store);
    let dispatcher = Arc::new(Dispatcher::new(registry));
    let pipeline = Arc::new(pipeline_over(Arc::clone(&dispatcher)));

    let mut handles = Vec::new();
    for round in 0..4 {
        for i in 0..32 {
            let pipeline = Arc::clone(&pipeline);
            handles.push(tokio::spawn(async move {
                let request = Request::read("memory", format!("key-{i}"));
                let response = pipeline.process(request).await.unwrap();
                (round, i, response.body().as_text().map(str::to_string))
            }));
        }
    }

    for handle in handles {
        let (_, i, body) = handle.await.unwrap();
        assert_eq!(body, Some(format!("value-{i}")));
    }
    assert_eq!(dispatcher.cache().len(), 32);
}
