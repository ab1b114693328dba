//! Context Extraction Module
//!
//! Pulls the trace id and the request header out of a [`Context`] for log
//! lines. Missing pieces are replaced by placeholders so logging keeps
//! working with no tracing or header data at all.

use std::collections::BTreeMap;
use std::fmt;

use opentelemetry::trace::TraceId;
use serde_json::Value;

use crate::context::Context;
use crate::error::TraceError;

/// Header field identifying the operator of a request.
pub const CONTEXT_KEY_OP_UID: &str = "uid";

/// Field holding the rendered trace id.
pub const CONTEXT_KEY_TRACE_ID: &str = "traceID";

// == Context KV ==
/// One extracted component: a small, ordered key/value map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextKv(BTreeMap<String, Value>);

impl ContextKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Placeholder used when no trace id can be found.
    pub fn empty_trace() -> Self {
        let mut kv = Self::new();
        kv.insert(CONTEXT_KEY_TRACE_ID, Value::String("0".to_string()));
        kv
    }

    /// Placeholder used when no request header can be found.
    pub fn empty_head() -> Self {
        let mut kv = Self::new();
        kv.insert(CONTEXT_KEY_OP_UID, Value::from(0i64));
        kv
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl From<BTreeMap<String, Value>> for ContextKv {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for ContextKv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(self.0.len() + 1);

        if let Some(trace_id) = self.0.get(CONTEXT_KEY_TRACE_ID) {
            parts.push(plain(trace_id));
        }

        // uid is column aligned, and only when it is a 64-bit integer
        if let Some(uid) = self.0.get(CONTEXT_KEY_OP_UID).and_then(Value::as_i64) {
            parts.push(format!("{uid:<10}"));
            parts.push("  ".to_string());
        }

        for (key, value) in &self.0 {
            if key != CONTEXT_KEY_OP_UID && key != CONTEXT_KEY_TRACE_ID {
                parts.push(format!("{key}:{}", plain(value)));
            }
        }

        f.write_str(&parts.join(" "))
    }
}

// == Extraction ==
/// Trace id of the active span.
pub fn extract_trace_id(ctx: &Context) -> Result<ContextKv, TraceError> {
    let trace_id = ctx.span().span_context().trace_id();
    if trace_id == TraceId::INVALID {
        return Err(TraceError::TraceIdNotFound);
    }

    let mut kv = ContextKv::new();
    kv.insert(CONTEXT_KEY_TRACE_ID, Value::String(trace_id.to_string()));
    Ok(kv)
}

/// Request header projection: the full view, or just the uid.
pub fn extract_head(ctx: &Context, full_head: bool) -> Result<ContextKv, TraceError> {
    let head = ctx.head().ok_or(TraceError::HeadNotFound)?;
    let mut kv = head.to_kv();

    if full_head {
        return Ok(ContextKv::from(kv));
    }

    let mut only_uid = ContextKv::new();
    only_uid.insert(
        CONTEXT_KEY_OP_UID,
        kv.remove(CONTEXT_KEY_OP_UID).unwrap_or(Value::Null),
    );
    Ok(only_uid)
}

/// `[trace, head]`, with placeholders for whatever is missing. Never fails.
pub fn extract_context(ctx: &Context, full_head: bool) -> [ContextKv; 2] {
    let trace = extract_trace_id(ctx).unwrap_or_else(|_| ContextKv::empty_trace());
    let head = extract_head(ctx, full_head).unwrap_or_else(|_| ContextKv::empty_head());
    [trace, head]
}

pub fn extract_context_as_string(ctx: &Context, full_head: bool) -> String {
    extract_context(ctx, full_head)
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
