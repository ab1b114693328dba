//! In-memory tracer provider for unit tests.

use opentelemetry::global::BoxedTracer;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};

use super::TRACER_NAME;

/// A recording tracer provider whose finished spans can be inspected.
pub(crate) struct TestTracing {
    provider: SdkTracerProvider,
    exporter: InMemorySpanExporter,
}

impl TestTracing {
    pub(crate) fn new() -> Self {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        Self { provider, exporter }
    }

    pub(crate) fn tracer(&self) -> BoxedTracer {
        BoxedTracer::new(Box::new(self.provider.tracer(TRACER_NAME)))
    }

    pub(crate) fn finished_spans(&self) -> Vec<SpanData> {
        self.exporter.get_finished_spans().unwrap_or_default()
    }

    pub(crate) fn finished_span(&self, name: &str) -> Option<SpanData> {
        self.finished_spans().into_iter().find(|span| span.name == name)
    }
}
