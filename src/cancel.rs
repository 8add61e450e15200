use std::sync::Arc;

use tokio::sync::watch;

/// The one teardown mechanism for a review session.
///
/// Clones share state: cancelling any clone cancels them all, and
/// cancelling more than once is a no-op. Operator interrupts and the
/// confirmation loop's abort both route through this handle.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the handle has been cancelled. Returns immediately if
    /// it already was.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only ends on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Route Ctrl-C to `handle`. A second Ctrl-C exits the process with 130.
pub fn spawn_interrupt_listener(handle: CancelHandle) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::info!("interrupt received, cancelling review");
        handle.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("interrupted");
            std::process::exit(130);
        }
    })
}
