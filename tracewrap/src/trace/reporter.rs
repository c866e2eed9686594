//! Reporting seam for completed spans.
//!
//! The core does not define a transport or storage backend; it hands each
//! completed span to a [`SpanReporter`] and guarantees that a failing or
//! panicking reporter never disturbs the traced caller.

use crate::trace::{SpanContext, SpanKind, TraceError, TraceResult};
use indexmap::IndexMap;
use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Owned snapshot of a span at the moment it finished.
#[derive(Clone, Debug)]
pub struct FinishedSpan {
    /// The span's immutable identity.
    pub span_context: SpanContext,
    /// Operation name.
    pub name: Cow<'static, str>,
    /// Span kind.
    pub kind: SpanKind,
    /// Label of the remote service the operation talked to, if any.
    pub remote_service_name: Option<String>,
    /// Key/value tags, in first-insertion order.
    pub tags: IndexMap<String, String>,
    /// Failure summary, if the traced work failed.
    pub error: Option<String>,
    /// When the span was started.
    pub start_time: SystemTime,
    /// When the span finished.
    pub end_time: SystemTime,
}

impl FinishedSpan {
    /// Looks up a tag value by key.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// Sink for completed spans.
///
/// Implementations must be safe for concurrent use; spans from independent
/// threads finish independently.
pub trait SpanReporter: Send + Sync + fmt::Debug {
    /// Handle one completed span.
    ///
    /// Errors are logged by the span-finishing machinery and never surface
    /// to the traced caller.
    fn report(&self, span: FinishedSpan) -> TraceResult<()>;
}

/// A [`SpanReporter`] that discards every span.
#[derive(Clone, Debug, Default)]
pub struct NoopReporter {
    _private: (),
}

impl SpanReporter for NoopReporter {
    fn report(&self, _span: FinishedSpan) -> TraceResult<()> {
        Ok(())
    }
}

/// An in-memory span reporter that stores finished spans.
///
/// Useful for testing and debugging. Finished spans can be retrieved with
/// [`InMemoryReporter::finished_spans`].
///
/// # Example
///
/// ```
/// use tracewrap::trace::{InMemoryReporter, Tracer};
///
/// let reporter = InMemoryReporter::default();
/// let tracer = Tracer::builder().with_reporter(reporter.clone()).build();
///
/// let span = tracer.start_span("say hello");
/// tracer.in_scope(span, || ());
///
/// assert_eq!(reporter.finished_spans().len(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryReporter {
    spans: Arc<Mutex<Vec<FinishedSpan>>>,
}

impl InMemoryReporter {
    /// Creates an empty `InMemoryReporter`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the spans finished so far, in completion order.
    pub fn finished_spans(&self) -> Vec<FinishedSpan> {
        self.spans
            .lock()
            .map(|spans| spans.clone())
            .unwrap_or_default()
    }

    /// Clears the internal storage of finished spans.
    pub fn reset(&self) {
        let _ = self.spans.lock().map(|mut spans| spans.clear());
    }
}

impl SpanReporter for InMemoryReporter {
    fn report(&self, span: FinishedSpan) -> TraceResult<()> {
        self.spans
            .lock()
            .map(|mut spans| spans.push(span))
            .map_err(|_| TraceError::LockPoisoned)
    }
}
