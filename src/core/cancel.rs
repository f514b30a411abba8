use tokio::sync::watch;

/// Creates a linked cancellation handle/token pair.
///
/// The handle stays with the host; clones of the token travel with each
/// partition worker, which checks it between pages and between retries.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

/// Host-side switch that requests a prompt, cooperative stop.
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // Receivers observe the change on their next suspension point.
        let _ = self.tx.send(true);
    }
}

/// Worker-side view of the cancellation signal.
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Non-blocking check, used between pages and time ranges.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested; used to race backoff sleeps.
    pub async fn cancelled(&mut self) {
        // Already-cancelled tokens resolve immediately.
        if *self.rx.borrow() {
            return;
        }
        while self.rx.changed().await.is_ok() {
            if *self.rx.borrow() {
                return;
            }
        }
        // Sender dropped without cancelling: treat as never-cancelled.
        std::future::pending::<()>().await;
    }

    /// Token that never fires, for hosts that do not need cancellation.
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        // Leak the sender so the channel stays open for the token's lifetime.
        std::mem::forget(tx);
        Self { rx }
    }
}

/* ---------------- Tests ---------------- */

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_observes_cancellation() {
        let (handle, token) = cancel_pair();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_future_resolves_after_cancel() {
        let (handle, mut token) = cancel_pair();
        handle.cancel();
        token.cancelled().await;
    }

    #[tokio::test]
    async fn never_token_reports_not_cancelled() {
        assert!(!CancelToken::never().is_cancelled());
    }
}
