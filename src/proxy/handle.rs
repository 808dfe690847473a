//! Owned handle to a spawned execution worker.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::worker::protocol::RequestSender;

/// Lifecycle of the worker owned by a proxy.
///
/// `Unstarted → Running` on the first `start`/`run` call (lazy spawn),
/// `Running → Terminated` on `terminate`, and `Terminated → Running`
/// again when a later call spawns a fresh worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Unstarted,
    Running,
    Terminated,
}

/// Handle to a live worker: the request queue plus the task handles
/// needed to tear it down. At most one exists per proxy instance.
pub struct WorkerHandle {
    requests: RequestSender,
    cancel: CancellationToken,
    worker_task: JoinHandle<()>,
    router_task: JoinHandle<()>,
}

impl WorkerHandle {
    pub(crate) fn new(
        requests: RequestSender,
        cancel: CancellationToken,
        worker_task: JoinHandle<()>,
        router_task: JoinHandle<()>,
    ) -> Self {
        Self {
            requests,
            cancel,
            worker_task,
            router_task,
        }
    }

    pub(crate) fn requests(&self) -> RequestSender {
        self.requests.clone()
    }

    /// Tear the worker down. Any evaluation still running is abandoned;
    /// no reply is produced for it.
    pub(crate) fn shutdown(self) {
        self.cancel.cancel();
        self.worker_task.abort();
        self.router_task.abort();
    }
}
