//! Graceful shutdown coordination
//!
//! The monitor and heartbeat loops run for the process lifetime and must
//! stop cleanly on SIGTERM/SIGINT, releasing their network handles. A
//! watch channel fans the shutdown edge out to every subscriber.

use tokio::sync::watch;
use tracing::info;

/// Owning side of the shutdown channel. Created once in `server::run`.
pub struct ShutdownCoordinator {
    tx: watch::Sender<bool>,
}

/// Cloneable handle a background task selects on.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Subscribe a task to the shutdown edge.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger shutdown for all subscribers.
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    /// Wait for SIGTERM or SIGINT, then trigger shutdown.
    pub async fn listen_for_signals(&self) {
        wait_for_termination().await;
        info!("shutdown signal received, stopping background tasks");
        self.trigger();
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// True once shutdown has been triggered.
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve when shutdown is triggered. Safe to call repeatedly.
    pub async fn recv(&mut self) {
        if *self.rx.borrow() {
            return;
        }
        // The sender lives in ShutdownCoordinator; a closed channel also
        // means the process is going down.
        let _ = self.rx.wait_for(|&stopped| stopped).await;
    }
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    let _ = tokio::signal::ctrl_c().await;
}
