//! Payload Module
//!
//! Message envelopes carrying a trace carrier, a JSON body and the sender's
//! request header, so the receiver can continue the sender's trace.

use std::fmt;
use std::sync::Arc;

use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::{SpanKind, TraceContextExt, Tracer};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::context::{Context, JsonHead, RequestHeader};
use crate::error::{PayloadError, TraceError};
use crate::trace::{TextMapCarrier, TRACER_NAME};

// == Envelope ==
/// Wire unit of asynchronous delivery: `{"c": carrier, "v": body, "h": head}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "c", default)]
    pub carrier: TextMapCarrier,
    /// JSON text of the message value
    #[serde(rename = "v")]
    pub value: String,
    #[serde(rename = "h", default)]
    pub head: Option<Value>,
}

impl Envelope {
    pub fn to_bytes(&self) -> Result<Vec<u8>, PayloadError> {
        serde_json::to_vec(self).map_err(PayloadError::Encode)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, PayloadError> {
        serde_json::from_slice(data).map_err(PayloadError::Decode)
    }
}

// == Message ==
/// A keyed message of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message<V> {
    pub key: String,
    pub value: V,
}

impl<V> Message<V> {
    pub fn new(key: impl Into<String>, value: V) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

// == Payload Codec ==
/// Builds envelopes from a [`Context`] and turns received envelopes back
/// into a [`Context`] plus value.
///
/// Spans start on the global tracer and carriers go through the global
/// propagator unless others are supplied.
#[derive(Clone)]
pub struct PayloadCodec {
    tracer: Arc<BoxedTracer>,
    propagator: Option<Arc<dyn TextMapPropagator + Send + Sync>>,
}

impl PayloadCodec {
    pub fn new() -> Self {
        Self {
            tracer: Arc::new(global::tracer(TRACER_NAME)),
            propagator: None,
        }
    }

    /// Tracer used for the receiving span of `parse_payload`.
    pub fn with_tracer(mut self, tracer: BoxedTracer) -> Self {
        self.tracer = Arc::new(tracer);
        self
    }

    pub fn with_propagator<P>(mut self, propagator: P) -> Self
    where
        P: TextMapPropagator + Send + Sync + 'static,
    {
        self.propagator = Some(Arc::new(propagator));
        self
    }

    fn carrier(&self, ctx: &Context) -> TextMapCarrier {
        let mut carrier = TextMapCarrier::new();
        match &self.propagator {
            Some(propagator) => propagator.inject_context(ctx.otel(), &mut carrier),
            None => global::get_text_map_propagator(|propagator| {
                propagator.inject_context(ctx.otel(), &mut carrier)
            }),
        }
        carrier
    }

    fn remote_parent(&self, carrier: &TextMapCarrier) -> opentelemetry::Context {
        let empty = opentelemetry::Context::new();
        match &self.propagator {
            Some(propagator) => propagator.extract_with_context(&empty, carrier),
            None => global::get_text_map_propagator(|propagator| {
                propagator.extract_with_context(&empty, carrier)
            }),
        }
    }

    fn head(ctx: &Context) -> Option<Value> {
        ctx.head().map(|head| head.to_json())
    }

    // == Generate Payload ==
    /// Envelope for `value`. Only JSON encoding of `value` can fail.
    pub fn generate_payload<V: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        value: &V,
    ) -> Result<Envelope, PayloadError> {
        let body = serde_json::to_string(value).map_err(PayloadError::Encode)?;

        Ok(Envelope {
            carrier: self.carrier(ctx),
            value: body,
            head: Self::head(ctx),
        })
    }

    // == Generate Batch Payload ==
    /// Envelopes for a batch sent as one operation: the carrier and the
    /// header are captured once and shared; any encode failure fails the
    /// whole batch.
    pub fn generate_msgs_payload<V: Serialize>(
        &self,
        ctx: &Context,
        msgs: &[Message<V>],
    ) -> Result<Vec<Message<Envelope>>, PayloadError> {
        let carrier = self.carrier(ctx);
        let head = Self::head(ctx);

        msgs.iter()
            .map(|msg| {
                let body = serde_json::to_string(&msg.value).map_err(PayloadError::Encode)?;
                Ok(Message {
                    key: msg.key.clone(),
                    value: Envelope {
                        carrier: carrier.clone(),
                        value: body,
                        head: head.clone(),
                    },
                })
            })
            .collect()
    }

    // == Parse Payload ==
    /// Continues the sender's trace with a server span named `op_name`
    /// (a fresh root span when the carrier holds nothing usable) and decodes
    /// the value. Only decoding the value can fail.
    pub fn parse_payload<T: DeserializeOwned>(
        &self,
        envelope: &Envelope,
        op_name: &str,
    ) -> Result<(Context, T), PayloadError> {
        let tracer = &*self.tracer;
        let parent = self.remote_parent(&envelope.carrier);

        let span = if parent.span().span_context().is_valid() {
            tracer
                .span_builder(op_name.to_string())
                .with_kind(SpanKind::Server)
                .start_with_context(tracer, &parent)
        } else {
            debug!(
                op = op_name,
                err = %TraceError::SpanContextNotFound,
                "no parent span in carrier, starting root span"
            );
            tracer.start_with_context(op_name.to_string(), &opentelemetry::Context::new())
        };

        let mut ctx =
            Context::background().with_otel(opentelemetry::Context::new().with_span(span));
        if let Some(head) = envelope.head.clone().and_then(JsonHead::from_value) {
            let head: Arc<dyn RequestHeader> = Arc::new(head);
            ctx = ctx.with_head(head);
        }

        let value = serde_json::from_str(&envelope.value).map_err(PayloadError::Decode)?;
        Ok((ctx, value))
    }
}

impl Default for PayloadCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PayloadCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadCodec")
            .field("custom_propagator", &self.propagator.is_some())
            .finish_non_exhaustive()
    }
}
