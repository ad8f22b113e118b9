//! Cooperative shutdown signalling
//!
//! Long-running tasks receive a `watch::Receiver<bool>`; flipping the
//! sender to `true` asks every holder to exit.

use tokio::sync::watch;

/// Create a shutdown channel in the "running" state
pub fn channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Resolve once shutdown has been requested on `rx`
///
/// A dropped sender never resolves: the holder keeps running until some
/// other exit condition applies.
pub async fn requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Check without waiting
pub fn is_requested(rx: &watch::Receiver<bool>) -> bool {
    *rx.borrow()
}
