//! Span-lifecycle core for wrapping synchronous client calls with tracing
//! spans.
//!
//! `tracewrap` instruments a client library's operations without altering
//! their observable behavior: for every intercepted call it opens a span,
//! attaches operation-identifying tags, executes the real call inside an
//! activated scope, classifies failures, and finishes the span exactly once
//! on every exit path, whether the call returned, failed, or unwound.
//!
//! The pieces:
//!
//! * [`trace::Span`]: one timed operation, an immutable identity plus name,
//!   kind, remote service label, tags, and recorded error.
//! * [`Context`]: the per-thread scope stack associating an ambient span
//!   with the executing logical thread of control.
//! * [`trace::Tracer`]: span factory and scope activation; its
//!   [`in_scope`]/[`try_in_scope`] methods are the traced executor.
//! * [`tags`]: total, panic-free rendering of call arguments into tag
//!   values.
//!
//! [`in_scope`]: trace::Tracer::in_scope
//! [`try_in_scope`]: trace::Tracer::try_in_scope
//!
//! # Getting started
//!
//! ```
//! use tracewrap::trace::{traced_call, InMemoryReporter, Tracer};
//! use tracewrap::tags;
//!
//! let reporter = InMemoryReporter::default();
//! let tracer = Tracer::builder().with_reporter(reporter.clone()).build();
//!
//! // Wrap a call: one span per operation, tags from its arguments.
//! let result = traced_call(
//!     &tracer,
//!     "get",
//!     [("key", tags::scalar(Some(&"user:42")))],
//!     || Ok::<_, std::io::Error>("value"),
//! );
//!
//! assert_eq!(result.unwrap(), "value");
//! let spans = reporter.finished_spans();
//! assert_eq!(spans[0].name, "get");
//! assert_eq!(spans[0].tag("key"), Some("user:42"));
//! ```
//!
//! Tracing is transparent on the success/failure contract: the wrapped
//! work's result or error reaches the caller unchanged, and a failing
//! reporter is logged and suppressed rather than surfaced.

#![warn(missing_docs)]

mod context;
pub mod tags;
pub mod trace;

pub use context::{Context, ContextGuard, FutureExt, WithContext};
