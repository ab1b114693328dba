//! Message Queue Module
//!
//! Trace-carrying envelopes for asynchronous message delivery.

mod payload;

pub use payload::{Envelope, Message, PayloadCodec};
