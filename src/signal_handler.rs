use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

use crate::core::infrastructure::CancelToken;

/// Turns Ctrl-C (and SIGTERM on unix) into cancellation of in-flight work
#[derive(Clone)]
pub struct SignalHandler {
    token: CancelToken,
    shutdown_requested: Arc<AtomicBool>,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self {
            token: CancelToken::new(),
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Token handed to every catalog operation
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    pub fn request_shutdown(&self) {
        if !self.shutdown_requested.swap(true, Ordering::AcqRel) {
            info!("Graceful shutdown requested");
        }
        self.token.cancel();
    }

    /// Spawn the listener; it exits after the first signal or once shutdown was requested
    pub fn start_signal_monitoring(&self) -> tokio::task::JoinHandle<()> {
        let handler = self.clone();

        tokio::spawn(async move {
            tokio::select! {
                result = signal::ctrl_c() => match result {
                    Ok(()) => {
                        warn!("Received Ctrl-C, cancelling");
                        handler.request_shutdown();
                    }
                    Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
                },
                _ = wait_for_terminate() => {
                    warn!("Received SIGTERM signal, cancelling");
                    handler.request_shutdown();
                }
                _ = handler.token.cancelled() => {}
            }
        })
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn wait_for_terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("Failed to create SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_terminate() {
    std::future::pending::<()>().await;
}
