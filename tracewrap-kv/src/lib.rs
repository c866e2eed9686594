//! Tracing decorator for a synchronous key-value client, built on the
//! [`tracewrap`] span core.
//!
//! The client is a trait ([`KvClient`]); the tracing layer ([`Traced`]) is a
//! decorator implementing the same trait by composition. Each wrapped call
//! opens a CLIENT span named after the command, tags it with the operation's
//! primary key (rendered by [`tracewrap::tags`]), runs the real call through
//! the traced executor, and returns its result or error unchanged.
//!
//! ```
//! use tracewrap::trace::{InMemoryReporter, Tracer};
//! use tracewrap_kv::{InMemoryKv, KvClient, KvError, Traced};
//!
//! let reporter = InMemoryReporter::default();
//! let tracer = Tracer::builder().with_reporter(reporter.clone()).build();
//! let kv = Traced::new(InMemoryKv::new(), tracer);
//!
//! assert_eq!(
//!     kv.get("missing"),
//!     Err(KvError::NotFound { key: "missing".into() })
//! );
//!
//! let span = &reporter.finished_spans()[0];
//! assert_eq!(span.name, "get");
//! assert!(span.error.as_deref().unwrap().contains("missing"));
//! ```

#![warn(missing_docs)]

mod client;
mod traced;

pub use client::{InMemoryKv, KvClient, KvError};
pub use traced::{KvTracer, Traced, FIELDS_TAG, KEY_TAG, REMOTE_SERVICE};
