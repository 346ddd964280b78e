//! Request liveness.
//!
//! A [`Liveness`] handle follows one inbound request through the pipeline.
//! The server cancels it when the request is abandoned (client disconnect,
//! timeout); pipeline stages poll it at their suspension points: while
//! waiting for admission, right after admission, and between directory
//! batches. It is never consulted inside a resample.

use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};

#[derive(Debug, Clone, Default)]
pub struct Liveness {
    token: CancellationToken,
}

impl Liveness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-blocking: is the originating request still being served?
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Mark the request as abandoned.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Resolves once the request is abandoned.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// A guard that cancels this handle when dropped.
    ///
    /// The server holds one across the request future: if the connection
    /// goes away and the future is dropped, detached pipeline work sees the
    /// cancellation.
    pub fn drop_guard(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }
}
