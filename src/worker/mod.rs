//! Execution Worker Module
//!
//! The worker is the leaf of the execution stack: an isolated task that
//! owns a [`ScriptRuntime`](crate::runtime::ScriptRuntime), receives
//! execution requests over a channel, and posts exactly one tagged reply
//! per request. It never touches the proxy or the cache.

pub mod executor;
pub mod protocol;

pub use executor::run_worker;
pub use protocol::{
    reply_channel, request_channel, ExecReply, ExecRequest, ReplyReceiver, ReplySender,
    RequestReceiver, RequestSender,
};
