//! # appshell — Offline App-Shell Runtime
//!
//! `appshell` implements the two boundary layers an offline-capable
//! application shell needs:
//!
//! - **Remote execution proxy**: request execution of a script with named
//!   input bindings inside an isolated worker task, and receive exactly
//!   one tagged result back. Callback- and future-based APIs, lazy worker
//!   spawn, explicit terminate/restart lifecycle, correlation-id
//!   multiplexing for concurrent calls.
//! - **Execution worker**: a leaf task owning a [`ScriptRuntime`]. One
//!   guarded runtime initialization, strict arrival-order processing,
//!   explicit input environments, unified success/error reply envelope.
//! - **Offline cache**: a fixed asset manifest installed into a
//!   version-tagged cache generation, whole-generation invalidation on
//!   activation, and fetch interception with cross-CDN-domain key
//!   rewriting and opportunistic population.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use appshell::{ExecutionProxy, InputMap, JsRuntime};
//!
//! #[tokio::main]
//! async fn main() {
//!     let proxy = ExecutionProxy::new(Arc::new(JsRuntime::default()));
//!     let mut inputs = InputMap::new();
//!     inputs.insert("a".into(), serde_json::json!(40));
//!     inputs.insert("b".into(), serde_json::json!(2));
//!     let result = proxy.run_async("a + b", inputs).await.unwrap();
//!     println!("{result}");
//! }
//! ```
//!
//! # Feature Flags
//!
//! | Flag | Description |
//! |------|-------------|
//! | `builtin-runtime-js` | Bundles the JavaScript script runtime (Boa engine) |

pub mod cache;
pub mod error;
pub mod proxy;
pub mod runtime;
pub mod worker;

pub use crate::cache::{
    ActivateReport, AssetStore, CacheConfig, CacheManifest, CachePhase, CacheStats, CacheVersion,
    CachedAsset, FetchedResource, FetcherConfig, HttpFetcher, MemoryStore, OfflineCacheManager,
    ResourceFetcher,
};
pub use crate::error::{CacheError, CacheResult, ExecError, ExecResult};
pub use crate::proxy::{ExecutionProxy, ProxyConfig, WorkerHandle, WorkerState};
#[cfg(feature = "builtin-runtime-js")]
pub use crate::runtime::JsRuntime;
pub use crate::runtime::{InputMap, RuntimeConfig, ScriptRuntime};
pub use crate::worker::{ExecReply, ExecRequest};
