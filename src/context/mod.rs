//! Request Context Module
//!
//! The ambient, request-scoped object threaded through cache calls, log
//! calls and message encoding. It carries the OpenTelemetry context holding
//! the active span, the caller's request header and a cancellation token,
//! each as an explicit field.

mod head;

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use opentelemetry::trace::{SpanRef, TraceContextExt, Tracer};
use tokio_util::sync::CancellationToken;

pub use head::{JsonHead, RequestHead, RequestHeader};

// == Context ==
/// Request-scoped values. Cloning is cheap; clones share the span, the
/// header and the cancellation token.
#[derive(Clone)]
pub struct Context {
    otel: opentelemetry::Context,
    head: Option<Arc<dyn RequestHeader>>,
    cancel: CancellationToken,
}

impl Context {
    /// An empty context: no span, no header, never cancelled unless its
    /// token is.
    pub fn background() -> Self {
        Self {
            otel: opentelemetry::Context::new(),
            head: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the OpenTelemetry context, and with it the active span.
    pub fn with_otel(mut self, otel: opentelemetry::Context) -> Self {
        self.otel = otel;
        self
    }

    pub fn with_head(mut self, head: Arc<dyn RequestHeader>) -> Self {
        self.head = Some(head);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn otel(&self) -> &opentelemetry::Context {
        &self.otel
    }

    /// Active span. Without one this is a non-recording span with an
    /// invalid span context.
    pub fn span(&self) -> SpanRef<'_> {
        self.otel.span()
    }

    pub fn has_active_span(&self) -> bool {
        self.otel.has_active_span()
    }

    /// Request header, if any.
    pub fn head(&self) -> Option<&Arc<dyn RequestHeader>> {
        self.head.as_ref()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    // == Start Span ==
    /// Starts an internal span as a child of the active span (or as a root)
    /// and returns a context carrying it. The span ends when the last clone
    /// of that context is dropped.
    pub fn start_span<T>(&self, tracer: &T, operation: impl Into<Cow<'static, str>>) -> Context
    where
        T: Tracer,
        T::Span: Send + Sync + 'static,
    {
        let span = tracer.start_with_context(operation, &self.otel);
        self.clone().with_otel(self.otel.with_span(span))
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("span", self.otel.span().span_context())
            .field("head", &self.head)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use opentelemetry::global;
    use opentelemetry::trace::SpanKind;

    use super::*;
    use crate::trace::testing::TestTracing;

    #[test]
    fn test_background_is_empty() {
        let ctx = Context::background();
        assert!(!ctx.has_active_span());
        assert!(!ctx.span().span_context().is_valid());
        assert!(ctx.head().is_none());
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_start_span_parents_on_active_span() {
        let tracing = TestTracing::new();
        let tracer = tracing.tracer();

        let root = Context::background().start_span(&tracer, "root");
        let child = root.start_span(&tracer, "child");
        let root_span = root.span().span_context().clone();
        let child_span = child.span().span_context().clone();
        drop(child);
        drop(root);

        assert_eq!(child_span.trace_id(), root_span.trace_id());
        assert_ne!(child_span.span_id(), root_span.span_id());

        let child = tracing.finished_span("child").unwrap();
        assert_eq!(child.parent_span_id, root_span.span_id());
        assert_eq!(child.span_kind, SpanKind::Internal);
    }

    #[test]
    fn test_start_span_keeps_head_and_token() {
        let head: Arc<dyn RequestHeader> = Arc::new(RequestHead {
            uid: 7,
            ..Default::default()
        });
        let token = CancellationToken::new();
        let ctx = Context::background()
            .with_head(head)
            .with_cancel_token(token.clone());

        let child = ctx.start_span(&global::tracer("noop"), "op");
        assert!(child.head().is_some());

        token.cancel();
        assert!(child.is_cancelled());
    }
}
