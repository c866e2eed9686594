//! Execution-scoped tracking of the active span.
//!
//! A [`Context`] records which span is "ambient" for the current logical
//! thread of control. Contexts are immutable values; making one current is
//! done by [`attach`]ing it, which returns a [`ContextGuard`] that restores
//! the previously current context when dropped. Guards nest strictly LIFO
//! within one thread, so a traced operation that calls another traced
//! operation always sees the outer span restored once the inner scope ends.
//!
//! [`attach`]: Context::attach()

use crate::trace::SpanContext;
use pin_project_lite::pin_project;
use std::fmt;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

thread_local! {
    static CURRENT_CONTEXT: std::cell::RefCell<Context> =
        std::cell::RefCell::new(Context::default());
}

/// An execution-scoped value carrying the identity of the active span.
///
/// Only the immutable [`SpanContext`] travels here; the span itself stays
/// exclusively owned by the code that created it. This is what allows
/// concurrent readers of the ambient scope without any locking.
///
/// # Examples
///
/// ```
/// use tracewrap::Context;
/// use tracewrap::trace::{SpanContext, SpanId, TraceId};
///
/// let identity = SpanContext::new(TraceId::from(1), SpanId::from(2), None);
///
/// {
///     let _guard = Context::current().with_span_context(identity).attach();
///     assert_eq!(Context::current().span_context(), Some(&identity));
/// }
///
/// // Dropping the guard restores the previous (empty) context.
/// assert_eq!(Context::current().span_context(), None);
/// ```
#[derive(Clone, Default)]
pub struct Context {
    active_span: Option<SpanContext>,
}

impl Context {
    /// Creates an empty `Context` with no active span.
    pub fn new() -> Self {
        Context::default()
    }

    /// Returns a snapshot of the current thread's context.
    pub fn current() -> Self {
        Context::map_current(|cx| cx.clone())
    }

    /// Applies a function to the current context, returning its value.
    ///
    /// Avoids the clone of [`Context::current`] when only a read is needed.
    ///
    /// Note: this will panic if called while the current context is already
    /// borrowed, i.e. from inside another `map_current` closure.
    pub fn map_current<T>(f: impl FnOnce(&Context) -> T) -> T {
        CURRENT_CONTEXT.with(|cx| f(&cx.borrow()))
    }

    /// The identity of this context's active span, if one has been set.
    pub fn span_context(&self) -> Option<&SpanContext> {
        self.active_span.as_ref()
    }

    /// Returns whether an active span has been set.
    pub fn has_active_span(&self) -> bool {
        self.active_span.is_some()
    }

    /// Returns a copy of this context with the given span identity as its
    /// active span.
    pub fn with_span_context(&self, span_context: SpanContext) -> Self {
        Context {
            active_span: Some(span_context),
        }
    }

    /// Replaces the current context on this thread with this context.
    ///
    /// Dropping the returned [`ContextGuard`] restores the prior context.
    /// Attaching is reentrant: nested attachments form a stack, unwound in
    /// LIFO order as the guards drop.
    ///
    /// ```
    /// use tracewrap::Context;
    /// use tracewrap::trace::{SpanContext, SpanId, TraceId};
    ///
    /// let outer = SpanContext::new(TraceId::from(1), SpanId::from(1), None);
    /// let inner = SpanContext::new(TraceId::from(1), SpanId::from(2), Some(SpanId::from(1)));
    ///
    /// let _outer_guard = Context::new().with_span_context(outer).attach();
    /// {
    ///     let _inner_guard = Context::current().with_span_context(inner).attach();
    ///     assert_eq!(Context::current().span_context(), Some(&inner));
    /// }
    /// assert_eq!(Context::current().span_context(), Some(&outer));
    /// ```
    pub fn attach(self) -> ContextGuard {
        let previous_cx = CURRENT_CONTEXT
            .try_with(|current| current.replace(self))
            .ok();

        ContextGuard {
            previous_cx,
            _marker: PhantomData,
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("active_span", &self.active_span)
            .finish()
    }
}

/// A guard that resets the current context to the prior context when dropped.
#[must_use = "dropping the guard detaches the context immediately"]
pub struct ContextGuard {
    previous_cx: Option<Context>,
    // ensure this type is !Send as it relies on thread locals
    _marker: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if let Some(previous_cx) = self.previous_cx.take() {
            let _ = CURRENT_CONTEXT.try_with(|current| current.replace(previous_cx));
        }
    }
}

pin_project! {
    /// A future with an associated tracing context.
    ///
    /// The context is attached around every `poll`, so the ambient span
    /// resolves to the same value even when the future resumes on a
    /// different worker thread.
    #[derive(Clone, Debug)]
    pub struct WithContext<T> {
        #[pin]
        inner: T,
        cx: Context,
    }
}

impl<T: std::future::Future> std::future::Future for WithContext<T> {
    type Output = T::Output;

    fn poll(self: Pin<&mut Self>, task_cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let _guard = this.cx.clone().attach();

        this.inner.poll(task_cx)
    }
}

/// Extension trait allowing futures to carry a tracing context across
/// suspension points.
pub trait FutureExt: Sized {
    /// Attaches the provided [`Context`] to this future, returning a
    /// [`WithContext`] wrapper that makes it current during each poll.
    fn with_context(self, cx: Context) -> WithContext<Self> {
        WithContext { inner: self, cx }
    }

    /// Attaches the current [`Context`] to this future.
    fn with_current_context(self) -> WithContext<Self> {
        let cx = Context::current();
        self.with_context(cx)
    }
}

impl<T: Sized> FutureExt for T {}
