//! Trace Module
//!
//! Text carrier for OpenTelemetry propagators, and extraction of
//! trace/header data from a [`Context`](crate::context::Context) for logging.

mod carrier;
mod extract;

#[cfg(test)]
pub(crate) mod testing;

pub use carrier::{TextMapCarrier, TRACER_NAME};
pub use extract::{
    extract_context, extract_context_as_string, extract_head, extract_trace_id, ContextKv,
    CONTEXT_KEY_OP_UID, CONTEXT_KEY_TRACE_ID,
};
