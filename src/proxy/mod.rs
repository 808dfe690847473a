//! Remote Execution Proxy Module
//!
//! Host-side API for the execution worker: owns the worker lifecycle,
//! posts execution requests, and multiplexes tagged replies back to the
//! matching caller by correlation id.

pub mod handle;
pub mod proxy;

pub use handle::{WorkerHandle, WorkerState};
pub use proxy::{ExecutionProxy, ProxyConfig};
