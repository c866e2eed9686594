//! The tracing decorator over [`KvClient`].
//!
//! [`Traced`] implements the same trait as the client it wraps: each call
//! builds a descriptive CLIENT span (operation name, remote service label,
//! key tag), then delegates to the inner client through the traced
//! executor. The uniform single-key wrappers are generated by a macro; the
//! heterogeneous argument shapes are written out.

use crate::client::{KvClient, KvError};
use indexmap::IndexMap;
use tracewrap::tags;
use tracewrap::trace::{Span, SpanKind, Tracer};

/// Remote service label attached to every key-value span.
pub const REMOTE_SERVICE: &str = "kv";

/// Tag key under which the operation's primary key is recorded.
pub const KEY_TAG: &str = "key";

/// Tag key under which hash field maps are recorded.
pub const FIELDS_TAG: &str = "fields";

/// Builds command spans for key-value operations.
#[derive(Clone, Debug)]
pub struct KvTracer {
    tracer: Tracer,
}

impl KvTracer {
    /// Wraps a core [`Tracer`].
    pub fn new(tracer: Tracer) -> Self {
        KvTracer { tracer }
    }

    /// The underlying tracer, for running work in a span's scope.
    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Starts a CLIENT span named after a key-value command.
    pub fn command_span(&self, command: &'static str) -> Span {
        let mut span = self.tracer.next_span();
        span.set_name(command);
        span.set_kind(SpanKind::Client);
        span.set_remote_service_name(REMOTE_SERVICE);
        span.start();
        span
    }

    /// [`command_span`] plus the operation's primary-key tag.
    ///
    /// [`command_span`]: KvTracer::command_span
    pub fn command_span_with_key(&self, command: &'static str, key: String) -> Span {
        let mut span = self.command_span(command);
        span.tag(KEY_TAG, key);
        span
    }
}

/// A [`KvClient`] decorator that traces every operation.
///
/// Wrapping changes nothing about the client's observable behavior: values
/// and errors pass through unchanged, and the span is completed on every
/// exit path.
///
/// # Examples
///
/// ```
/// use tracewrap::trace::{InMemoryReporter, Tracer};
/// use tracewrap_kv::{InMemoryKv, KvClient, Traced};
///
/// let reporter = InMemoryReporter::default();
/// let tracer = Tracer::builder().with_reporter(reporter.clone()).build();
/// let kv = Traced::new(InMemoryKv::new(), tracer);
///
/// kv.set("user:42", "alice").unwrap();
/// assert_eq!(kv.get("user:42").unwrap(), "alice");
///
/// let spans = reporter.finished_spans();
/// assert_eq!(spans[0].name, "set");
/// assert_eq!(spans[1].name, "get");
/// assert_eq!(spans[1].tag("key"), Some("user:42"));
/// ```
#[derive(Debug)]
pub struct Traced<C> {
    inner: C,
    tracing: KvTracer,
}

impl<C> Traced<C> {
    /// Decorates `inner` with spans produced by `tracer`.
    pub fn new(inner: C, tracer: Tracer) -> Self {
        Traced {
            inner,
            tracing: KvTracer::new(tracer),
        }
    }

    /// A reference to the wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Unwraps the decorator, returning the inner client.
    pub fn into_inner(self) -> C {
        self.inner
    }
}

/// Generates the wrapper methods whose only argument is one string key:
/// span from command name + key tag, then delegate through the executor.
macro_rules! traced_unary_key {
    ($($method:ident => $command:literal -> $ret:ty;)+) => {
        $(
            fn $method(&self, key: &str) -> Result<$ret, KvError> {
                let span = self
                    .tracing
                    .command_span_with_key($command, tags::scalar(Some(&key)));
                self.tracing
                    .tracer()
                    .try_in_scope(span, || self.inner.$method(key))
            }
        )+
    };
}

impl<C: KvClient> KvClient for Traced<C> {
    traced_unary_key! {
        get => "get" -> String;
        del => "del" -> bool;
        hash_get_all => "hgetall" -> IndexMap<String, String>;
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let span = self
            .tracing
            .command_span_with_key("set", tags::scalar(Some(&key)));
        self.tracing
            .tracer()
            .try_in_scope(span, || self.inner.set(key, value))
    }

    fn del_many(&self, keys: &[String]) -> Result<usize, KvError> {
        let rendered = tags::strings(Some(keys.iter().map(String::as_str)));
        let span = self.tracing.command_span_with_key("del", rendered);
        self.tracing
            .tracer()
            .try_in_scope(span, || self.inner.del_many(keys))
    }

    fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, KvError> {
        let rendered = tags::strings(Some(keys.iter().map(String::as_str)));
        let span = self.tracing.command_span_with_key("mget", rendered);
        self.tracing
            .tracer()
            .try_in_scope(span, || self.inner.mget(keys))
    }

    fn get_bytes(&self, key: &[u8]) -> Result<Vec<u8>, KvError> {
        let span = self
            .tracing
            .command_span_with_key("get", tags::bytes(Some(key)));
        self.tracing
            .tracer()
            .try_in_scope(span, || self.inner.get_bytes(key))
    }

    fn set_bytes(&self, key: &[u8], value: &[u8]) -> Result<(), KvError> {
        let span = self
            .tracing
            .command_span_with_key("set", tags::bytes(Some(key)));
        self.tracing
            .tracer()
            .try_in_scope(span, || self.inner.set_bytes(key, value))
    }

    fn hash_set_all(&self, key: &str, fields: &IndexMap<String, String>) -> Result<(), KvError> {
        let mut span = self
            .tracing
            .command_span_with_key("hmset", tags::scalar(Some(&key)));
        span.tag(FIELDS_TAG, tags::map(Some(fields)));
        self.tracing
            .tracer()
            .try_in_scope(span, || self.inner.hash_set_all(key, fields))
    }
}
