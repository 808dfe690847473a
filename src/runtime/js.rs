//! Built-in JavaScript runtime implementation using boa_engine.
//!
//! Each evaluation runs in a fresh engine context: input bindings are
//! materialized from JSON into local `var` declarations, the user script is
//! evaluated for its completion value, and the result travels back out as a
//! JSON string. Values without a JSON representation (functions,
//! `undefined`) degrade to `null` at the boundary.

use std::time::Instant;

use boa_engine::{Context, Source};
use serde_json::Value;

use crate::error::ExecError;
use crate::runtime::{InputMap, RuntimeConfig, ScriptRuntime};

/// Names the generated wrapper depends on: its own temporaries plus the
/// globals it calls after the user bindings are in scope.
const RESERVED_NAMES: &[&'static str] = &["__env", "__completion", "JSON", "eval"];

/// ECMAScript keywords that cannot be bound as `var` names.
const JS_KEYWORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "enum", "export", "extends", "false", "finally", "for", "function", "if", "import",
    "in", "instanceof", "let", "new", "null", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Built-in JavaScript runtime using boa_engine
#[derive(Debug, Clone)]
pub struct JsRuntime {
    config: RuntimeConfig,
}

impl JsRuntime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }

    fn validate_script(&self, script: &str) -> Result<(), ExecError> {
        if script.len() > self.config.max_script_bytes {
            return Err(ExecError::ScriptTooLarge {
                max: self.config.max_script_bytes,
                actual: script.len(),
            });
        }
        Ok(())
    }

    fn is_bindable_identifier(name: &str) -> bool {
        let mut chars = name.chars();
        let head_ok = chars
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
            .unwrap_or(false);
        head_ok
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
            && !JS_KEYWORDS.contains(&name)
    }

    /// Generate the wrapper program: env parse, preload libraries, input
    /// bindings, user script, JSON result extraction.
    fn build_program(&self, script: &str, env: &InputMap) -> Result<String, ExecError> {
        let env_json = serde_json::to_string(env)?;
        // Double-encoding yields a valid JS string literal with all
        // escapes handled.
        let env_literal = serde_json::to_string(&env_json)?;
        let script_literal = serde_json::to_string(script)?;

        let mut bindings = String::new();
        let mut keys: Vec<&String> = env.keys().collect();
        keys.sort();
        for key in keys {
            if RESERVED_NAMES.contains(&key.as_str()) {
                return Err(ExecError::ReservedBinding(key.clone()));
            }
            if !Self::is_bindable_identifier(key) {
                return Err(ExecError::InvalidBinding(key.clone()));
            }
            let key_literal = serde_json::to_string(key)?;
            bindings.push_str(&format!("var {key} = __env[{key_literal}];\n"));
        }

        let preload = self.config.preload.join("\n");

        Ok(format!(
            r#"var __env = JSON.parse({env_literal});
{preload}
{bindings}
var __completion = eval({script_literal});
JSON.stringify({{ "value": (typeof __completion === "undefined") ? null : __completion }});
"#
        ))
    }

    /// Execute the generated program in a boa context.
    fn execute_js(&self, program: &str) -> Result<Value, ExecError> {
        let start_time = Instant::now();
        let timeout = self.config.default_timeout;

        let mut context = Context::default();
        let result = context
            .eval(Source::from_bytes(program))
            .map_err(|e| ExecError::Script(e.to_string()))?;

        // boa has no native interrupt mechanism, so wall time is checked
        // after the fact.
        if start_time.elapsed() > timeout {
            return Err(ExecError::Timeout);
        }

        let result_str = result
            .as_string()
            .map(|s| s.to_std_string_escaped())
            .ok_or_else(|| {
                ExecError::Internal("wrapper did not produce a JSON string".to_string())
            })?;

        let wrapper: Value = serde_json::from_str(&result_str)
            .map_err(|e| ExecError::Serialization(format!("failed to parse result: {e}")))?;
        let value = wrapper.get("value").cloned().unwrap_or(Value::Null);

        let output_bytes = serde_json::to_vec(&value)?;
        if output_bytes.len() > self.config.max_output_bytes {
            return Err(ExecError::OutputTooLarge {
                max: self.config.max_output_bytes,
                actual: output_bytes.len(),
            });
        }

        Ok(value)
    }
}

impl Default for JsRuntime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

#[async_trait::async_trait]
impl ScriptRuntime for JsRuntime {
    fn name(&self) -> &str {
        "builtin-js"
    }

    async fn load(&self) -> Result<(), ExecError> {
        if self.config.preload.is_empty() {
            return Ok(());
        }

        // Preload libraries are re-evaluated per call (contexts are not
        // shared), so loading only has to prove they parse and run.
        let preload = self.config.preload.clone();
        tokio::task::spawn_blocking(move || {
            let mut context = Context::default();
            for (index, library) in preload.iter().enumerate() {
                context.eval(Source::from_bytes(library)).map_err(|e| {
                    ExecError::RuntimeLoad(format!("preload library #{index} failed: {e}"))
                })?;
            }
            Ok(())
        })
        .await
        .map_err(|e| ExecError::Internal(format!("task join error: {e}")))?
    }

    fn reserved_names(&self) -> &[&'static str] {
        RESERVED_NAMES
    }

    async fn eval(&self, script: &str, env: &InputMap) -> Result<Value, ExecError> {
        self.validate_script(script)?;
        let program = self.build_program(script, env)?;

        // boa is synchronous; evaluate off the async executor.
        let runtime = self.clone();
        tokio::task::spawn_blocking(move || runtime.execute_js(&program))
            .await
            .map_err(|e| ExecError::Internal(format!("task join error: {e}")))?
    }
}
