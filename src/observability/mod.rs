//! Structured logging for the storage engine
//!
//! One log line = one event, JSON, synchronous, deterministic key order.

mod logger;

pub use logger::{Logger, Severity};
