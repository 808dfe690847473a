//! The execution worker task.
//!
//! Requests are processed strictly in arrival order; the handler is
//! asynchronous but the loop never overlaps two evaluations. Runtime
//! initialization happens once, triggered by the first request — requests
//! that arrive during the load simply wait in the queue behind it. A load
//! failure is fatal to the worker instance: it is not retried, and every
//! later request fails with [`ExecError::RuntimeUnavailable`].

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::ExecError;
use crate::runtime::ScriptRuntime;
use crate::worker::protocol::{ExecReply, ExecRequest, ReplySender, RequestReceiver};

/// Outcome of the one-time runtime load, latched after the first request.
enum LoadState {
    NotLoaded,
    Ready,
    Failed(ExecError),
}

/// Run the worker loop until the request channel closes or `cancel` fires.
pub async fn run_worker(
    runtime: Arc<dyn ScriptRuntime>,
    mut requests: RequestReceiver,
    replies: ReplySender,
    cancel: CancellationToken,
) {
    let mut load_state = LoadState::NotLoaded;

    loop {
        let request = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(runtime = runtime.name(), "worker cancelled");
                break;
            }
            maybe = requests.recv() => match maybe {
                Some(request) => request,
                None => break,
            },
        };

        let id = request.id;
        let outcome = handle_request(&*runtime, &mut load_state, request).await;
        debug!(id, ok = outcome.is_ok(), "worker reply");
        if replies.send(ExecReply { id, outcome }).is_err() {
            // Proxy side is gone; nothing left to serve.
            break;
        }
    }
}

async fn handle_request(
    runtime: &dyn ScriptRuntime,
    load_state: &mut LoadState,
    request: ExecRequest,
) -> Result<serde_json::Value, ExecError> {
    if let LoadState::NotLoaded = load_state {
        *load_state = match runtime.load().await {
            Ok(()) => LoadState::Ready,
            Err(e) => {
                error!(runtime = runtime.name(), error = %e, "runtime load failed");
                LoadState::Failed(e)
            }
        };
    }
    if let LoadState::Failed(e) = load_state {
        return Err(ExecError::RuntimeUnavailable(e.to_string()));
    }

    for name in request.inputs.keys() {
        if runtime.reserved_names().contains(&name.as_str()) {
            return Err(ExecError::ReservedBinding(name.clone()));
        }
    }

    runtime.eval(&request.script, &request.inputs).await
}
