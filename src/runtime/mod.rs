//! Script Runtime Module
//!
//! Provides the interface the execution worker uses to talk to an embedded
//! interpreter. The runtime is an external collaborator: the worker only
//! assumes a one-time asynchronous load step and an evaluation call that
//! takes the script plus an explicit environment record and returns a
//! structured JSON value.

#[cfg(feature = "builtin-runtime-js")]
pub mod js;

#[cfg(feature = "builtin-runtime-js")]
pub use js::JsRuntime;

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

use crate::error::ExecError;

/// Named input bindings for one evaluation.
///
/// Values are plain structured data; nothing with identity crosses the
/// worker boundary.
pub type InputMap = HashMap<String, Value>;

/// Script runtime execution interface
///
/// All runtime implementations (embedded JS engine, remote interpreter
/// service, test fakes) must implement this trait.
#[async_trait::async_trait]
pub trait ScriptRuntime: Send + Sync {
    /// Runtime identifier used in logs.
    fn name(&self) -> &str;

    /// One-time interpreter and library initialization.
    ///
    /// Called exactly once per worker instance before the first
    /// evaluation. A failure is fatal to that worker: it is never retried
    /// and every subsequent request on the worker fails.
    async fn load(&self) -> Result<(), ExecError>;

    /// Binding names that inputs may not shadow.
    fn reserved_names(&self) -> &[&'static str] {
        &[]
    }

    /// Evaluate `script` with `env` bound as its evaluation environment.
    ///
    /// Returns the script's completion value as structured JSON. The
    /// environment is passed explicitly; implementations must not leak
    /// bindings into shared interpreter state across calls.
    async fn eval(&self, script: &str, env: &InputMap) -> Result<Value, ExecError>;
}

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Execution timeout per script.
    pub default_timeout: Duration,

    /// Max script length (bytes).
    pub max_script_bytes: usize,

    /// Max result JSON bytes.
    pub max_output_bytes: usize,

    /// Library scripts evaluated into the environment before every user
    /// script, validated once at load time.
    pub preload: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            max_script_bytes: 1_000_000, // 1MB
            max_output_bytes: 1024 * 1024,
            preload: Vec::new(),
        }
    }
}
