//! Single operation within a trace.
//!
//! A [`Span`] pairs an immutable identity ([`SpanContext`]) with mutable
//! descriptive state: name, kind, remote service, tags, and a recorded
//! error. The mutable state is held as `Option<SpanData>` and taken on
//! [`Span::finish`], which makes the finished transition monotonic: every
//! mutation after finishing is a no-op, and a second finish does nothing.

use crate::trace::reporter::{FinishedSpan, SpanReporter};
use crate::trace::SpanContext;
use indexmap::IndexMap;
use std::borrow::Cow;
use std::error::Error;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::SystemTime;

/// `SpanKind` describes the relationship between the span, its parents, and
/// its children in a trace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpanKind {
    /// The span describes a request to some remote service.
    Client,

    /// The span covers server-side handling of a synchronous request.
    Server,

    /// The span describes the initiator of an asynchronous request.
    Producer,

    /// The span describes a child of an asynchronous producer request.
    Consumer,

    /// Default value. An internal operation within an application, with no
    /// remote parent or child.
    #[default]
    Internal,
}

#[derive(Clone, Debug)]
pub(crate) struct SpanData {
    pub(crate) name: Cow<'static, str>,
    pub(crate) kind: SpanKind,
    pub(crate) remote_service_name: Option<String>,
    pub(crate) tags: IndexMap<String, String>,
    pub(crate) error: Option<String>,
    pub(crate) start_time: Option<SystemTime>,
}

impl Default for SpanData {
    fn default() -> Self {
        SpanData {
            name: Cow::Borrowed(""),
            kind: SpanKind::default(),
            remote_service_name: None,
            tags: IndexMap::new(),
            error: None,
            start_time: None,
        }
    }
}

/// Single operation within a trace.
///
/// Spans move through `CREATED -> STARTED -> FINISHED`. They are created
/// unstarted by [`Tracer::next_span`] so that call sites can attach
/// descriptive tags before the span becomes visible to concurrent work,
/// started explicitly via [`Span::start`], and finished exactly once by the
/// traced executor.
///
/// A span is exclusively owned by the logical thread that created it and
/// requires no internal locking.
///
/// [`Tracer::next_span`]: crate::trace::Tracer::next_span
#[derive(Debug)]
pub struct Span {
    span_context: SpanContext,
    data: Option<SpanData>,
    reporter: Arc<dyn SpanReporter>,
}

impl Span {
    pub(crate) fn new(span_context: SpanContext, reporter: Arc<dyn SpanReporter>) -> Self {
        Span {
            span_context,
            data: Some(SpanData::default()),
            reporter,
        }
    }

    /// A reference to this span's immutable identity.
    pub fn span_context(&self) -> &SpanContext {
        &self.span_context
    }

    /// Operate on a mutable reference to span data. No-op once finished.
    fn with_data<T, F>(&mut self, f: F) -> Option<T>
    where
        F: FnOnce(&mut SpanData) -> T,
    {
        self.data.as_mut().map(f)
    }

    /// Updates the span's name.
    pub fn set_name<T>(&mut self, name: T)
    where
        T: Into<Cow<'static, str>>,
    {
        self.with_data(|data| data.name = name.into());
    }

    /// Sets the span kind. Defaults to [`SpanKind::Internal`].
    pub fn set_kind(&mut self, kind: SpanKind) {
        self.with_data(|data| data.kind = kind);
    }

    /// Labels the remote service this span's operation talks to.
    pub fn set_remote_service_name<T>(&mut self, name: T)
    where
        T: Into<String>,
    {
        self.with_data(|data| data.remote_service_name = Some(name.into()));
    }

    /// Attaches a key/value tag. Setting a tag with an existing key
    /// overwrites the previous value; first-insertion order is preserved.
    pub fn tag<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.with_data(|data| data.tags.insert(key.into(), value.into()));
    }

    /// Records a failure summary on this span.
    ///
    /// The summary is stored as the span's error field; the failure itself is
    /// never mutated or retained.
    pub fn set_error<T>(&mut self, summary: T)
    where
        T: Into<String>,
    {
        self.with_data(|data| data.error = Some(summary.into()));
    }

    /// Records an error's display output as this span's failure summary.
    pub fn record_error(&mut self, err: &dyn Error) {
        self.set_error(err.to_string());
    }

    /// Marks the span as started, recording the start timestamp.
    ///
    /// Idempotent: only the first call records a timestamp.
    pub fn start(&mut self) {
        self.with_data(|data| {
            data.start_time.get_or_insert_with(SystemTime::now);
        });
    }

    /// Returns `true` once [`Span::start`] has been called.
    pub fn is_started(&self) -> bool {
        self.data
            .as_ref()
            .map(|data| data.start_time.is_some())
            .unwrap_or(true)
    }

    /// Returns `true` once the span has finished.
    pub fn is_finished(&self) -> bool {
        self.data.is_none()
    }

    /// Completes the span and hands it to the reporter.
    ///
    /// Only the first call has any effect. A reporter that fails or panics is
    /// logged and otherwise ignored: a broken tracer backend must never break
    /// caller-visible behavior.
    pub fn finish(&mut self) {
        let data = match self.data.take() {
            Some(data) => data,
            None => return, // Already finished
        };

        let start_time = match data.start_time {
            Some(start_time) => start_time,
            None => {
                tracing::debug!(
                    name: "Span.Finish.NeverStarted",
                    span_id = %self.span_context.span_id(),
                    "finished span was never started; dropping it"
                );
                return;
            }
        };

        let finished = FinishedSpan {
            span_context: self.span_context,
            name: data.name,
            kind: data.kind,
            remote_service_name: data.remote_service_name,
            tags: data.tags,
            error: data.error,
            start_time,
            end_time: SystemTime::now(),
        };

        let reporter = Arc::clone(&self.reporter);
        match panic::catch_unwind(AssertUnwindSafe(move || reporter.report(finished))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(
                    name: "Span.Finish.ReporterError",
                    error = %err,
                    "span reporter rejected finished span"
                );
            }
            Err(_) => {
                tracing::warn!(
                    name: "Span.Finish.ReporterPanic",
                    "span reporter panicked while handling a finished span"
                );
            }
        }
    }
}

impl Drop for Span {
    /// Safety net: a span abandoned without going through the executor is
    /// still finished, so no span can leak.
    fn drop(&mut self) {
        self.finish();
    }
}
