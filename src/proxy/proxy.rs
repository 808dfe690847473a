//! The execution proxy: callback- and future-based script execution
//! against a lazily spawned worker.
//!
//! Every call gets a correlation id and a single-shot reply slot; the
//! reply router resolves slots as tagged replies arrive, so any number of
//! calls may be in flight at once. Requests are serialized through the
//! worker's queue and processed in order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::ExecError;
use crate::proxy::handle::{WorkerHandle, WorkerState};
use crate::runtime::{InputMap, ScriptRuntime};
use crate::worker::executor::run_worker;
use crate::worker::protocol::{reply_channel, request_channel, ExecRequest, ReplyReceiver};

/// Proxy configuration
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Request queue capacity between proxy and worker.
    pub queue_capacity: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self { queue_capacity: 32 }
    }
}

type ReplySlot = oneshot::Sender<Result<Value, ExecError>>;
type PendingMap = HashMap<u64, ReplySlot>;

struct ProxyInner {
    handle: Option<WorkerHandle>,
    lifecycle: WorkerState,
}

/// Remote execution proxy.
///
/// Independent instances own independent workers; dropping the proxy
/// closes the request queue and the worker winds down on its own.
pub struct ExecutionProxy {
    runtime: Arc<dyn ScriptRuntime>,
    config: ProxyConfig,
    inner: Mutex<ProxyInner>,
    pending: Arc<Mutex<PendingMap>>,
    next_id: AtomicU64,
}

impl ExecutionProxy {
    pub fn new(runtime: Arc<dyn ScriptRuntime>) -> Self {
        Self::with_config(runtime, ProxyConfig::default())
    }

    pub fn with_config(runtime: Arc<dyn ScriptRuntime>, config: ProxyConfig) -> Self {
        Self {
            runtime,
            config,
            inner: Mutex::new(ProxyInner {
                handle: None,
                lifecycle: WorkerState::Unstarted,
            }),
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Current worker lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.inner.lock().lifecycle
    }

    /// Spawn the worker if absent. Idempotent.
    pub fn start(&self) {
        let _ = self.ensure_started();
    }

    /// Request execution, delivering the outcome through callbacks.
    ///
    /// Exactly one of the callbacks fires per call — unless the worker is
    /// terminated while the call is in flight, in which case neither
    /// does (the abandonment is logged at debug level).
    pub fn run<S, E>(&self, script: impl Into<String>, inputs: InputMap, on_success: S, on_error: E)
    where
        S: FnOnce(Value) + Send + 'static,
        E: FnOnce(ExecError) + Send + 'static,
    {
        let (id, reply_rx, requests) = self.begin_call();
        let request = ExecRequest {
            id,
            script: script.into(),
            inputs,
        };
        let pending = self.pending.clone();

        tokio::spawn(async move {
            if requests.send(request).await.is_err() {
                pending.lock().remove(&id);
                debug!(id, "worker gone before request could be posted");
                return;
            }
            match reply_rx.await {
                Ok(Ok(value)) => on_success(value),
                Ok(Err(e)) => on_error(e),
                Err(_) => debug!(id, "worker terminated in flight; callbacks dropped"),
            }
        });
    }

    /// Future form of [`run`](Self::run).
    ///
    /// Yields exactly one outcome per call. Termination while the call is
    /// in flight fails the future with [`ExecError::Terminated`] rather
    /// than leaving it pending.
    pub async fn run_async(
        &self,
        script: impl Into<String>,
        inputs: InputMap,
    ) -> Result<Value, ExecError> {
        let (id, reply_rx, requests) = self.begin_call();
        let request = ExecRequest {
            id,
            script: script.into(),
            inputs,
        };

        if requests.send(request).await.is_err() {
            self.pending.lock().remove(&id);
            return Err(ExecError::Terminated);
        }
        match reply_rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(ExecError::Terminated),
        }
    }

    /// Tear down the worker, abandoning any in-flight evaluation. A
    /// no-op when no worker is live. A later `start`/`run` spawns a
    /// fresh, independent worker.
    pub fn terminate(&self) {
        let handle = {
            let mut inner = self.inner.lock();
            match inner.handle.take() {
                Some(handle) => {
                    inner.lifecycle = WorkerState::Terminated;
                    handle
                }
                None => return,
            }
        };
        handle.shutdown();

        let abandoned = {
            let mut pending = self.pending.lock();
            let n = pending.len();
            pending.clear();
            n
        };
        if abandoned > 0 {
            debug!(abandoned, "terminated with in-flight calls");
        }
        info!(runtime = self.runtime.name(), "worker terminated");
    }

    fn begin_call(
        &self,
    ) -> (
        u64,
        oneshot::Receiver<Result<Value, ExecError>>,
        crate::worker::protocol::RequestSender,
    ) {
        let requests = self.ensure_started();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (slot_tx, slot_rx) = oneshot::channel();
        self.pending.lock().insert(id, slot_tx);
        (id, slot_rx, requests)
    }

    fn ensure_started(&self) -> crate::worker::protocol::RequestSender {
        let mut inner = self.inner.lock();
        if let Some(handle) = &inner.handle {
            return handle.requests();
        }

        let (request_tx, request_rx) = request_channel(self.config.queue_capacity);
        let (reply_tx, reply_rx) = reply_channel();
        let cancel = CancellationToken::new();

        let worker_task = tokio::spawn(run_worker(
            self.runtime.clone(),
            request_rx,
            reply_tx,
            cancel.clone(),
        ));
        let router_task = tokio::spawn(route_replies(reply_rx, self.pending.clone()));

        debug!(runtime = self.runtime.name(), "worker started");
        let handle = WorkerHandle::new(request_tx.clone(), cancel, worker_task, router_task);
        inner.handle = Some(handle);
        inner.lifecycle = WorkerState::Running;
        request_tx
    }
}

/// Resolve pending reply slots as tagged replies arrive. When the worker
/// side closes, remaining slots are dropped so future-form callers fail
/// instead of hanging.
async fn route_replies(mut replies: ReplyReceiver, pending: Arc<Mutex<PendingMap>>) {
    while let Some(reply) = replies.recv().await {
        match pending.lock().remove(&reply.id) {
            Some(slot) => {
                // A dropped receiver just means the caller went away.
                let _ = slot.send(reply.outcome);
            }
            None => debug!(id = reply.id, "reply for unknown correlation id"),
        }
    }

    let orphaned = {
        let mut pending = pending.lock();
        let n = pending.len();
        pending.clear();
        n
    };
    if orphaned > 0 {
        debug!(orphaned, "worker exited with unresolved calls");
    }
}
