//! The `trace` module tracks single operations as spans: identity, tags,
//! failure status, and lifecycle.
//!
//! A trace is a tree of [`Span`]s linked by parent/child span ids. The
//! [`Tracer`] creates spans (continuing the ambient trace when a scope is
//! active), and its executor methods [`Tracer::in_scope`] and
//! [`Tracer::try_in_scope`] run work under a span with the exactly-once
//! completion guarantee.
//!
//! ## Managing active spans
//!
//! The ambient span for a thread is managed through scopes: activating a
//! span with [`Tracer::with_scope`] makes every span created on that thread
//! a child of it until the returned guard drops.
//!
//! ```
//! use tracewrap::trace::{InMemoryReporter, Tracer};
//!
//! let reporter = InMemoryReporter::default();
//! let tracer = Tracer::builder().with_reporter(reporter.clone()).build();
//!
//! let parent = tracer.start_span("parent");
//! let parent_id = parent.span_context().span_id();
//!
//! tracer.in_scope(parent, || {
//!     // spans created here are children of `parent`
//!     let child = tracer.start_span("child");
//!     assert_eq!(child.span_context().parent_span_id(), Some(parent_id));
//!     tracer.in_scope(child, || ());
//! });
//! ```

mod id;
mod reporter;
mod span;
mod span_context;
mod tracer;

pub use self::{
    id::{IdGenerator, RandomIdGenerator, SequentialIdGenerator, SpanId, TraceId},
    reporter::{FinishedSpan, InMemoryReporter, NoopReporter, SpanReporter},
    span::{Span, SpanKind},
    span_context::SpanContext,
    tracer::{traced_call, ScopeGuard, Tracer, TracerBuilder},
};

use thiserror::Error;

/// Describe the result of operations in the trace API.
pub type TraceResult<T> = Result<T, TraceError>;

/// Errors returned on the span-reporting seam.
///
/// These never reach traced callers; the span-finishing machinery logs and
/// suppresses them.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TraceError {
    /// A reporter's internal lock was poisoned.
    #[error("span reporter state lock poisoned")]
    LockPoisoned,

    /// Other errors propagated from a reporter implementation.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl From<String> for TraceError {
    fn from(err_msg: String) -> Self {
        TraceError::Other(Box::new(Custom(err_msg)))
    }
}

impl From<&'static str> for TraceError {
    fn from(err_msg: &'static str) -> Self {
        TraceError::Other(Box::new(Custom(err_msg.into())))
    }
}

/// Wrap type for string
#[derive(Error, Debug)]
#[error("{0}")]
struct Custom(String);
