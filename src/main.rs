use std::sync::Arc;

use appshell::{ExecutionProxy, InputMap, JsRuntime, WorkerState};
use serde_json::json;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== appshell execution proxy demo ===\n");

    let proxy = ExecutionProxy::new(Arc::new(JsRuntime::default()));

    let mut inputs = InputMap::new();
    inputs.insert("price".into(), json!(19.99));
    inputs.insert("quantity".into(), json!(3));

    match proxy.run_async("price * quantity", inputs).await {
        Ok(result) => println!("price * quantity = {result}"),
        Err(e) => eprintln!("execution failed: {e}"),
    }

    let mut inputs = InputMap::new();
    inputs.insert("names".into(), json!(["ada", "grace", "edsger"]));
    let script = r#"
        var upper = [];
        for (var i = 0; i < names.length; i++) {
            upper.push(names[i].toUpperCase());
        }
        upper
    "#;
    match proxy.run_async(script, inputs).await {
        Ok(result) => println!("uppercased: {result}"),
        Err(e) => eprintln!("execution failed: {e}"),
    }

    match proxy.run_async("definitely.not.defined", InputMap::new()).await {
        Ok(result) => println!("unexpected: {result}"),
        Err(e) => println!("script error (expected): {e}"),
    }

    proxy.terminate();
    assert_eq!(proxy.state(), WorkerState::Terminated);
    println!("\nworker terminated; done.");
}
