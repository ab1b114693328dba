//! Trace Carrier Module
//!
//! Flat text map a propagator writes a span context into on send and reads
//! it back from on receipt.

use std::collections::BTreeMap;

use opentelemetry::propagation::{Extractor, Injector};
use serde::{Deserialize, Serialize};

/// Instrumentation scope name of the spans started by this crate.
pub const TRACER_NAME: &str = "trace_cache";

// == Text Map Carrier ==
/// String to string map serialized as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextMapCarrier(BTreeMap<String, String>);

impl TextMapCarrier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, String>> for TextMapCarrier {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl Injector for TextMapCarrier {
    fn set(&mut self, key: &str, value: String) {
        self.0.insert(key.to_string(), value);
    }
}

impl Extractor for TextMapCarrier {
    fn get(&self, key: &str) -> Option<&str> {
        TextMapCarrier::get(self, key)
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use opentelemetry::propagation::TextMapPropagator;
    use opentelemetry::trace::{TraceContextExt, Tracer};
    use opentelemetry_sdk::propagation::TraceContextPropagator;

    use super::*;
    use crate::trace::testing::TestTracing;

    #[test]
    fn test_carrier_serializes_as_plain_object() {
        let mut carrier = TextMapCarrier::new();
        carrier.insert("traceparent", "00-01-02-01");

        let json = serde_json::to_value(&carrier).unwrap();
        assert_eq!(json, serde_json::json!({"traceparent": "00-01-02-01"}));

        let back: TextMapCarrier = serde_json::from_value(json).unwrap();
        assert_eq!(back, carrier);
    }

    #[test]
    fn test_propagator_round_trip() {
        let tracing = TestTracing::new();
        let tracer = tracing.tracer();
        let span = tracer.start("send");
        let cx = opentelemetry::Context::new().with_span(span);

        let propagator = TraceContextPropagator::new();
        let mut carrier = TextMapCarrier::new();
        propagator.inject_context(&cx, &mut carrier);
        assert!(carrier.contains_key("traceparent"));
        assert_eq!(Extractor::keys(&carrier), vec!["traceparent"]);

        let extracted = propagator.extract_with_context(&opentelemetry::Context::new(), &carrier);
        let remote = extracted.span().span_context().clone();
        assert!(remote.is_remote());
        assert_eq!(remote.trace_id(), cx.span().span_context().trace_id());
        assert_eq!(remote.span_id(), cx.span().span_context().span_id());
    }

    #[test]
    fn test_garbage_header_extracts_nothing() {
        let propagator = TraceContextPropagator::new();
        for value in ["garbage", "€aaaaaaaaaaaaaaa:1:0:1", "00-€€€€€€€€€€€€€€€€-01-01", ""] {
            let mut carrier = TextMapCarrier::new();
            carrier.insert("traceparent", value);

            let extracted =
                propagator.extract_with_context(&opentelemetry::Context::new(), &carrier);
            assert!(!extracted.span().span_context().is_valid(), "{value:?}");
        }
    }
}
