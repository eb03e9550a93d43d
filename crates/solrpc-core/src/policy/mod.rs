//! Reliability policies shared by the HTTP and WebSocket transports.

pub mod retry;

pub use retry::{RetryConfig, RetryPolicy};
