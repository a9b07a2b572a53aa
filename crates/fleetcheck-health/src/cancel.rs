//! Helpers for the run-wide cancellation signal.
//!
//! The signal is a `watch::Receiver<bool>`; `true` means cancelled. A
//! sender dropped without sending `true` never cancels.

use tokio::sync::watch;

pub fn is_cancelled(cancel: &watch::Receiver<bool>) -> bool {
    *cancel.borrow()
}

/// Resolve once the signal fires.
pub async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let closed = cancel.wait_for(|c| *c).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}
