//! Message protocol between the proxy and the execution worker.
//!
//! One request produces exactly one reply, paired by correlation id.
//! Failures ride in the same envelope as successes; there is no
//! out-of-band error event.

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::ExecError;
use crate::runtime::InputMap;

/// Execution request (proxy → worker).
#[derive(Debug, Clone)]
pub struct ExecRequest {
    /// Correlation id pairing this request with its reply.
    pub id: u64,
    /// Script text to evaluate.
    pub script: String,
    /// Named input bindings for the evaluation environment.
    pub inputs: InputMap,
}

/// Execution reply (worker → proxy).
#[derive(Debug, Clone)]
pub struct ExecReply {
    /// Correlation id of the originating request.
    pub id: u64,
    /// Tagged outcome: completion value or execution error.
    pub outcome: Result<Value, ExecError>,
}

/// Request sender half (held by the proxy).
pub type RequestSender = mpsc::Sender<ExecRequest>;
/// Request receiver half (owned by the worker).
pub type RequestReceiver = mpsc::Receiver<ExecRequest>;
/// Reply sender half (owned by the worker).
pub type ReplySender = mpsc::UnboundedSender<ExecReply>;
/// Reply receiver half (consumed by the proxy's reply router).
pub type ReplyReceiver = mpsc::UnboundedReceiver<ExecReply>;

/// Create the bounded request queue. Backpressure applies to callers, not
/// the worker: requests queue here while a slow script runs.
pub fn request_channel(capacity: usize) -> (RequestSender, RequestReceiver) {
    mpsc::channel(capacity)
}

/// Create the reply stream.
pub fn reply_channel() -> (ReplySender, ReplyReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_request_round_trip() {
        let (tx, mut rx) = request_channel(4);
        tx.send(ExecRequest {
            id: 7,
            script: "a + b".to_string(),
            inputs: [("a".to_string(), json!(1))].into_iter().collect(),
        })
        .await
        .unwrap();

        let req = rx.recv().await.unwrap();
        assert_eq!(req.id, 7);
        assert_eq!(req.script, "a + b");
        assert_eq!(req.inputs["a"], json!(1));
    }

    #[tokio::test]
    async fn test_reply_carries_tagged_outcome() {
        let (tx, mut rx) = reply_channel();
        tx.send(ExecReply {
            id: 1,
            outcome: Err(ExecError::Script("boom".into())),
        })
        .unwrap();

        let reply = rx.recv().await.unwrap();
        assert_eq!(reply.id, 1);
        assert_eq!(reply.outcome.unwrap_err(), ExecError::Script("boom".into()));
    }
}
