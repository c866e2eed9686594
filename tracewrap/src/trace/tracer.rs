//! Span factory and the traced executor.
//!
//! The [`Tracer`] creates spans that continue the ambient trace, activates
//! them as scopes, and runs units of work under the exactly-once completion
//! contract: on every exit path (return, error, or unwind) the prior ambient
//! scope is restored and the span is finished exactly once, while the work's
//! own outcome reaches the caller unchanged.

use crate::context::{Context, ContextGuard};
use crate::trace::id::{IdGenerator, RandomIdGenerator};
use crate::trace::reporter::{NoopReporter, SpanReporter};
use crate::trace::{Span, SpanContext, SpanKind};
use std::any::Any;
use std::borrow::Cow;
use std::convert::Infallible;
use std::error::Error;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Factory for spans and scopes.
///
/// A `Tracer` is constructed once at startup and shared (it is a cheap
/// cloneable handle). Creating spans and activating scopes is safe from any
/// number of threads concurrently: per-call state lives in thread-local
/// storage, and id generation is race-free.
///
/// # Examples
///
/// ```
/// use tracewrap::trace::Tracer;
///
/// let tracer = Tracer::builder().build();
///
/// let span = tracer.start_span("doing_work");
/// let answer = tracer.in_scope(span, || 42);
/// assert_eq!(answer, 42);
/// ```
#[derive(Clone, Debug)]
pub struct Tracer {
    inner: Arc<TracerInner>,
}

#[derive(Debug)]
struct TracerInner {
    id_generator: Box<dyn IdGenerator>,
    reporter: Arc<dyn SpanReporter>,
}

/// Configures and builds a [`Tracer`].
#[derive(Debug)]
pub struct TracerBuilder {
    id_generator: Box<dyn IdGenerator>,
    reporter: Arc<dyn SpanReporter>,
}

impl Default for TracerBuilder {
    fn default() -> Self {
        TracerBuilder {
            id_generator: Box::new(RandomIdGenerator::default()),
            reporter: Arc::new(NoopReporter::default()),
        }
    }
}

impl TracerBuilder {
    /// Replaces the default random id generator.
    pub fn with_id_generator<G>(mut self, id_generator: G) -> Self
    where
        G: IdGenerator + 'static,
    {
        self.id_generator = Box::new(id_generator);
        self
    }

    /// Replaces the default no-op span reporter.
    pub fn with_reporter<R>(mut self, reporter: R) -> Self
    where
        R: SpanReporter + 'static,
    {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Builds the configured [`Tracer`].
    pub fn build(self) -> Tracer {
        Tracer {
            inner: Arc::new(TracerInner {
                id_generator: self.id_generator,
                reporter: self.reporter,
            }),
        }
    }
}

/// A guard marking a span as the ambient span for the current thread.
///
/// Dropping the guard restores the previously ambient span, whatever the
/// exit reason. Guards nest strictly LIFO.
#[must_use = "dropping the guard deactivates the scope immediately"]
pub struct ScopeGuard {
    _guard: ContextGuard,
}

impl fmt::Debug for ScopeGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeGuard").finish()
    }
}

impl Tracer {
    /// Starts building a tracer.
    pub fn builder() -> TracerBuilder {
        TracerBuilder::default()
    }

    /// Returns a new span, continuing the ambient trace if a scope is
    /// currently active, otherwise starting a new trace.
    ///
    /// The span is created unstarted and inactive so that the call site can
    /// attach descriptive tags before any of it becomes observable.
    pub fn next_span(&self) -> Span {
        let parent = Context::map_current(|cx| cx.span_context().copied());
        let span_context = match parent {
            Some(parent) => SpanContext::new(
                parent.trace_id(),
                self.inner.id_generator.new_span_id(),
                Some(parent.span_id()),
            ),
            None => SpanContext::new(
                self.inner.id_generator.new_trace_id(),
                self.inner.id_generator.new_span_id(),
                None,
            ),
        };
        Span::new(span_context, Arc::clone(&self.inner.reporter))
    }

    /// [`next_span`] plus a name and an explicit start.
    ///
    /// [`next_span`]: Tracer::next_span
    pub fn start_span<T>(&self, name: T) -> Span
    where
        T: Into<Cow<'static, str>>,
    {
        let mut span = self.next_span();
        span.set_name(name);
        span.start();
        span
    }

    /// Pushes `span` as the ambient span for the calling thread.
    ///
    /// The returned [`ScopeGuard`] restores the prior ambient span on drop.
    /// Reentrant: nested calls form a stack. Only the span's identity is
    /// captured; the span itself remains exclusively owned by the caller.
    pub fn with_scope(&self, span: &Span) -> ScopeGuard {
        let cx = Context::map_current(|cx| cx.with_span_context(*span.span_context()));
        ScopeGuard { _guard: cx.attach() }
    }

    /// Runs infallible work inside the span's scope.
    ///
    /// The span's scope is active while `f` runs; the scope is released and
    /// the span finished exactly once on every exit path, including unwinds,
    /// which are recorded on the span and resumed unchanged.
    pub fn in_scope<T, F>(&self, span: Span, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        match self.run(span, || Ok::<T, Infallible>(f())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Runs fallible work inside the span's scope.
    ///
    /// Behaves like [`in_scope`], and additionally records `Err` outcomes on
    /// the span (error type plus message) before returning them unchanged.
    ///
    /// [`in_scope`]: Tracer::in_scope
    pub fn try_in_scope<T, E, F>(&self, span: Span, f: F) -> Result<T, E>
    where
        E: Error,
        F: FnOnce() -> Result<T, E>,
    {
        self.run(span, f)
    }

    /// The shared executor algorithm.
    ///
    /// Ordering is load-bearing: failure recording happens while the scope
    /// is still active, the scope is released before the span finishes, and
    /// the finish step swallows reporter failures so a broken tracer cannot
    /// alter caller-visible behavior.
    fn run<T, E, F>(&self, mut span: Span, f: F) -> Result<T, E>
    where
        E: Error,
        F: FnOnce() -> Result<T, E>,
    {
        let scope = self.with_scope(&span);
        let outcome = panic::catch_unwind(AssertUnwindSafe(f));
        match &outcome {
            Ok(Err(err)) => span.set_error(error_summary(err)),
            Err(payload) => span.set_error(panic_summary(payload.as_ref())),
            Ok(Ok(_)) => {}
        }
        drop(scope);
        span.finish();
        match outcome {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}

/// Composes span construction with the traced executor: builds a CLIENT span
/// named `operation`, applies the given tags, and runs `work` under it.
///
/// This is the one-call surface intended for generated call-site wrappers.
///
/// # Examples
///
/// ```
/// use tracewrap::trace::{traced_call, InMemoryReporter, Tracer};
///
/// let reporter = InMemoryReporter::default();
/// let tracer = Tracer::builder().with_reporter(reporter.clone()).build();
///
/// let value = traced_call(&tracer, "get", [("key", "k1".to_string())], || {
///     Ok::<_, std::io::Error>("v1")
/// })
/// .unwrap();
///
/// assert_eq!(value, "v1");
/// assert_eq!(reporter.finished_spans()[0].tag("key"), Some("k1"));
/// ```
pub fn traced_call<T, E, N, I, K, V, F>(
    tracer: &Tracer,
    operation: N,
    tags: I,
    work: F,
) -> Result<T, E>
where
    E: Error,
    N: Into<Cow<'static, str>>,
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
    F: FnOnce() -> Result<T, E>,
{
    let mut span = tracer.next_span();
    span.set_name(operation);
    span.set_kind(SpanKind::Client);
    for (key, value) in tags {
        span.tag(key, value);
    }
    span.start();
    tracer.try_in_scope(span, work)
}

fn error_summary<E: Error>(err: &E) -> String {
    format!("{}: {}", short_type_name::<E>(), err)
}

/// Last path segment of a type name, e.g. `NotFoundError` for
/// `my_app::errors::NotFoundError`.
fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

fn panic_summary(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        format!("panic: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::id::SequentialIdGenerator;
    use crate::trace::reporter::InMemoryReporter;
    use crate::trace::TraceId;

    fn test_tracer() -> (Tracer, InMemoryReporter) {
        let reporter = InMemoryReporter::default();
        let tracer = Tracer::builder()
            .with_id_generator(SequentialIdGenerator::new())
            .with_reporter(reporter.clone())
            .build();
        (tracer, reporter)
    }

    #[test]
    fn next_span_starts_new_trace_without_scope() {
        let (tracer, _) = test_tracer();
        let span = tracer.next_span();
        assert!(span.span_context().is_valid());
        assert_eq!(span.span_context().parent_span_id(), None);
        assert!(!span.is_started());
    }

    #[test]
    fn next_span_continues_ambient_trace() {
        let (tracer, _) = test_tracer();
        let outer = tracer.start_span("outer");
        let outer_cx = *outer.span_context();

        let _scope = tracer.with_scope(&outer);
        let child = tracer.next_span();

        assert_eq!(child.span_context().trace_id(), outer_cx.trace_id());
        assert_eq!(
            child.span_context().parent_span_id(),
            Some(outer_cx.span_id())
        );
    }

    #[test]
    fn scope_guard_restores_prior_ambient_span() {
        let (tracer, _) = test_tracer();
        let outer = tracer.start_span("outer");
        let outer_id = outer.span_context().span_id();

        let _outer_scope = tracer.with_scope(&outer);
        {
            let inner = tracer.start_span("inner");
            let inner_id = inner.span_context().span_id();
            let _inner_scope = tracer.with_scope(&inner);
            assert_eq!(
                Context::current().span_context().map(|sc| sc.span_id()),
                Some(inner_id)
            );
        }
        assert_eq!(
            Context::current().span_context().map(|sc| sc.span_id()),
            Some(outer_id)
        );
    }

    #[test]
    fn sibling_spans_share_a_parent() {
        let (tracer, reporter) = test_tracer();
        let root = tracer.start_span("root");
        let root_id = root.span_context().span_id();

        tracer.in_scope(root, || {
            let first = tracer.start_span("first");
            tracer.in_scope(first, || ());
            let second = tracer.start_span("second");
            tracer.in_scope(second, || ());
        });

        let finished = reporter.finished_spans();
        assert_eq!(finished.len(), 3);
        assert_eq!(finished[0].span_context.parent_span_id(), Some(root_id));
        assert_eq!(finished[1].span_context.parent_span_id(), Some(root_id));
        assert_ne!(
            finished[0].span_context.span_id(),
            finished[1].span_context.span_id()
        );
    }

    #[test]
    fn short_type_name_trims_path() {
        assert_eq!(short_type_name::<std::io::Error>(), "Error");
        assert_eq!(short_type_name::<String>(), "String");
    }

    #[test]
    fn traced_call_builds_client_span() {
        let (tracer, reporter) = test_tracer();
        let result = traced_call(&tracer, "mget", [("key", "a, b".to_string())], || {
            Ok::<_, std::io::Error>(2)
        });
        assert_eq!(result.unwrap(), 2);

        let finished = reporter.finished_spans();
        assert_eq!(finished[0].name, "mget");
        assert_eq!(finished[0].kind, SpanKind::Client);
        assert_eq!(finished[0].tag("key"), Some("a, b"));
        assert_eq!(finished[0].span_context.trace_id(), TraceId::from(1u128));
    }
}
