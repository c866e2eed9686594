use crate::trace::{SpanId, TraceId};

/// Immutable identity of a [`Span`], linking it into its trace tree.
///
/// A `SpanContext` is the only part of a span that is shared across threads:
/// the scope stack carries it to establish parent/child relationships, and
/// it may be read concurrently for reporting. All other span state stays
/// exclusively owned by the creating thread.
///
/// [`Span`]: crate::trace::Span
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpanContext {
    trace_id: TraceId,
    span_id: SpanId,
    parent_span_id: Option<SpanId>,
}

impl SpanContext {
    /// An invalid span context
    pub const NONE: SpanContext = SpanContext {
        trace_id: TraceId::INVALID,
        span_id: SpanId::INVALID,
        parent_span_id: None,
    };

    /// Construct a new `SpanContext`
    pub fn new(trace_id: TraceId, span_id: SpanId, parent_span_id: Option<SpanId>) -> Self {
        SpanContext {
            trace_id,
            span_id,
            parent_span_id,
        }
    }

    /// The [`TraceId`] for this span context.
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// The [`SpanId`] for this span context.
    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    /// The parent span's id, if this span continues an existing trace.
    pub fn parent_span_id(&self) -> Option<SpanId> {
        self.parent_span_id
    }

    /// Returns `true` if the span context has a valid (non-zero) `trace_id`
    /// and a valid (non-zero) `span_id`.
    pub fn is_valid(&self) -> bool {
        self.trace_id != TraceId::INVALID && self.span_id != SpanId::INVALID
    }
}
