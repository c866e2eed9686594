//! End-to-end tests for the span lifecycle contract: exactly-once
//! completion, scope restoration, failure propagation, and isolation
//! between threads.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Barrier};
use std::thread;

use tracewrap::trace::{
    FinishedSpan, InMemoryReporter, SequentialIdGenerator, SpanKind, SpanReporter, TraceResult,
    Tracer,
};
use tracewrap::Context;

#[derive(Debug, PartialEq)]
struct NotFoundError(String);

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key {} not found", self.0)
    }
}

impl std::error::Error for NotFoundError {}

fn test_tracer() -> (Tracer, InMemoryReporter) {
    let reporter = InMemoryReporter::default();
    let tracer = Tracer::builder()
        .with_id_generator(SequentialIdGenerator::new())
        .with_reporter(reporter.clone())
        .build();
    (tracer, reporter)
}

fn only_span(reporter: &InMemoryReporter) -> FinishedSpan {
    let mut spans = reporter.finished_spans();
    assert_eq!(spans.len(), 1);
    spans.remove(0)
}

#[test]
fn success_returns_value_and_finishes_span() {
    let (tracer, reporter) = test_tracer();

    let span = tracer.start_span("op");
    let value = tracer.in_scope(span, || 42);

    assert_eq!(value, 42);
    let span = only_span(&reporter);
    assert_eq!(span.name, "op");
    assert_eq!(span.error, None);
    assert!(span.end_time >= span.start_time);
    assert!(!Context::current().has_active_span());
}

#[test]
fn failure_reaches_caller_unchanged_and_is_recorded_once() {
    let (tracer, reporter) = test_tracer();

    let span = tracer.start_span("get");
    let result: Result<u32, NotFoundError> =
        tracer.try_in_scope(span, || Err(NotFoundError("k1".into())));

    assert_eq!(result, Err(NotFoundError("k1".into())));

    let span = only_span(&reporter);
    let error = span.error.expect("span must carry an error record");
    assert!(error.contains("NotFoundError"), "missing type name: {error}");
    assert!(error.contains("k1"), "missing message: {error}");
    assert!(!Context::current().has_active_span());
}

#[test]
fn work_sees_its_own_span_as_ambient() {
    let (tracer, _) = test_tracer();

    let span = tracer.start_span("op");
    let span_id = span.span_context().span_id();

    tracer.in_scope(span, || {
        let ambient = Context::current();
        assert_eq!(
            ambient.span_context().map(|sc| sc.span_id()),
            Some(span_id)
        );
    });
}

#[test]
fn nested_call_produces_child_span_and_restores_outer_scope() {
    let (tracer, reporter) = test_tracer();

    let outer = tracer.start_span("outer");
    let outer_id = outer.span_context().span_id();
    let outer_trace = outer.span_context().trace_id();

    tracer.in_scope(outer, || {
        let inner = tracer.start_span("inner");
        assert_eq!(inner.span_context().parent_span_id(), Some(outer_id));
        assert_eq!(inner.span_context().trace_id(), outer_trace);

        tracer.in_scope(inner, || ());

        // After the inner call the ambient span is the outer one again.
        assert_eq!(
            Context::current().span_context().map(|sc| sc.span_id()),
            Some(outer_id)
        );
    });

    let spans = reporter.finished_spans();
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].name, "inner");
    assert_eq!(spans[1].name, "outer");
    assert_eq!(spans[0].span_context.parent_span_id(), Some(outer_id));
    assert_eq!(spans[1].span_context.parent_span_id(), None);
}

#[test]
fn unwind_is_recorded_finished_and_resumed() {
    let (tracer, reporter) = test_tracer();

    let span = tracer.start_span("explode");
    let unwind = catch_unwind(AssertUnwindSafe(|| {
        tracer.in_scope(span, || panic!("boom"));
    }));

    let payload = unwind.expect_err("panic must propagate");
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"boom"));

    let span = only_span(&reporter);
    assert_eq!(span.error.as_deref(), Some("panic: boom"));
    assert!(!Context::current().has_active_span());
}

#[test]
fn scope_restored_to_outer_span_after_inner_failure() {
    let (tracer, _) = test_tracer();

    let outer = tracer.start_span("outer");
    let outer_id = outer.span_context().span_id();

    tracer.in_scope(outer, || {
        let inner = tracer.start_span("inner");
        let result: Result<(), NotFoundError> =
            tracer.try_in_scope(inner, || Err(NotFoundError("missing".into())));
        assert!(result.is_err());

        assert_eq!(
            Context::current().span_context().map(|sc| sc.span_id()),
            Some(outer_id)
        );
    });
}

#[test]
fn concurrent_calls_are_fully_isolated() {
    let reporter = InMemoryReporter::default();
    let tracer = Tracer::builder().with_reporter(reporter.clone()).build();

    const THREADS: usize = 100;
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let tracer = tracer.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                assert!(!Context::current().has_active_span());

                let mut span = tracer.start_span("worker");
                span.tag("worker", i.to_string());
                let span_id = span.span_context().span_id();
                tracer.in_scope(span, || {
                    assert_eq!(
                        Context::current().span_context().map(|sc| sc.span_id()),
                        Some(span_id)
                    );
                });

                assert!(!Context::current().has_active_span());
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker thread must not panic");
    }

    let spans = reporter.finished_spans();
    assert_eq!(spans.len(), THREADS);

    let mut span_ids: Vec<_> = spans.iter().map(|s| s.span_context.span_id()).collect();
    span_ids.sort_unstable_by_key(|id| id.to_bytes());
    span_ids.dedup();
    assert_eq!(span_ids.len(), THREADS, "span ids must be distinct");

    let mut workers: Vec<_> = spans
        .iter()
        .map(|s| s.tag("worker").expect("worker tag").to_owned())
        .collect();
    workers.sort_unstable();
    workers.dedup();
    assert_eq!(workers.len(), THREADS, "tags must not cross-contaminate");

    for span in &spans {
        assert_eq!(span.span_context.parent_span_id(), None);
    }
}

#[derive(Debug)]
struct PanickingReporter;

impl SpanReporter for PanickingReporter {
    fn report(&self, _span: FinishedSpan) -> TraceResult<()> {
        panic!("reporter exploded");
    }
}

#[derive(Debug)]
struct RejectingReporter;

impl SpanReporter for RejectingReporter {
    fn report(&self, _span: FinishedSpan) -> TraceResult<()> {
        Err("backend unavailable".into())
    }
}

#[test]
fn panicking_reporter_does_not_affect_caller() {
    let tracer = Tracer::builder().with_reporter(PanickingReporter).build();

    let span = tracer.start_span("op");
    let value = tracer.in_scope(span, || 42);
    assert_eq!(value, 42);
    assert!(!Context::current().has_active_span());

    // The work's own failure also still reaches the caller unchanged.
    let span = tracer.start_span("get");
    let result: Result<(), NotFoundError> =
        tracer.try_in_scope(span, || Err(NotFoundError("k1".into())));
    assert_eq!(result, Err(NotFoundError("k1".into())));
}

#[test]
fn rejecting_reporter_does_not_affect_caller() {
    let tracer = Tracer::builder().with_reporter(RejectingReporter).build();

    let span = tracer.start_span("op");
    assert_eq!(tracer.in_scope(span, || "ok"), "ok");
    assert!(!Context::current().has_active_span());
}

#[test]
fn spans_have_client_kind_when_built_by_traced_call() {
    let (tracer, reporter) = test_tracer();

    tracewrap::trace::traced_call(&tracer, "set", [("key", "a".to_string())], || {
        Ok::<_, NotFoundError>(())
    })
    .unwrap();

    let span = only_span(&reporter);
    assert_eq!(span.kind, SpanKind::Client);
    assert_eq!(span.tag("key"), Some("a"));
}
