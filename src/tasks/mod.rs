//! Background Tasks Module
//!
//! # Tasks
//! - TTL Cleanup: removes expired values from the memory store

mod cleanup;

pub use cleanup::spawn_cleanup_task;
