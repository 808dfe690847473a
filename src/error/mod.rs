//! Error types for the app-shell runtime.
//!
//! - [`ExecError`] — Errors raised on the script-execution path (proxy, worker, runtime).
//! - [`CacheError`] — Errors raised by the offline cache manager and its store/fetcher seams.

pub mod cache_error;
pub mod exec_error;

pub use cache_error::CacheError;
pub use exec_error::ExecError;

/// Convenience alias for execution-path results.
pub type ExecResult<T> = Result<T, ExecError>;
/// Convenience alias for cache-path results.
pub type CacheResult<T> = Result<T, CacheError>;
