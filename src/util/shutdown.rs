//! Graceful shutdown signal handling.
//!
//! This module provides [`SigDown`], a utility for handling Unix shutdown
//! signals (SIGTERM and SIGINT) and coordinating graceful shutdown across
//! multiple subsystems using cancellation tokens.
//!
//! # Example
//!
//! ```ignore
//! let sig_down = SigDown::try_new()?;
//! let token = sig_down.cancellation_token();
//!
//! tokio::spawn(async move {
//!     token.cancelled().await;
//!     println!("Shutting down...");
//! });
//!
//! sig_down.recv().await;
//! ```

use std::time::Duration;
use tokio::signal::unix::SignalKind;
use tokio::signal::unix::signal;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Handles graceful shutdown on SIGTERM and SIGINT signals.
///
/// Spawns a background task that listens for shutdown signals and triggers
/// a cancellation token when received.
pub struct SigDown {
    task_tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

impl SigDown {
    /// Creates a new signal handler.
    ///
    /// Returns an error if signal registration fails.
    pub fn try_new() -> Result<Self, std::io::Error> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let inner = CancellationToken::new();
        let outer = inner.clone();
        let task_tracker = TaskTracker::new();
        task_tracker.spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("received SIGTERM, starting graceful shutdown");
                    inner.cancel();
                },
                _ = sigint.recv() => {
                    tracing::info!("received SIGINT, starting graceful shutdown");
                    inner.cancel();
                }
            }
        });
        task_tracker.close();
        Ok(Self {
            task_tracker,
            cancellation_token: outer,
        })
    }

    /// Returns a clone of the cancellation token for distributing to subsystems.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Waits for a shutdown signal and ensures the signal handler task completes.
    pub async fn recv(&self) {
        self.cancellation_token.cancelled().await;
        self.task_tracker.wait().await;
    }

    /// Runs `drain` to completion, but forces process exit with code 1 if it
    /// doesn't finish within `deadline` of the shutdown signal firing.
    ///
    /// This is the hard deadline: an orchestrator (k8s) that sends SIGTERM
    /// expects the process gone within its own grace period, so a loop stuck
    /// on a hung network call must not hold the process open
    /// indefinitely. The forced-exit timer itself never holds the process
    /// alive — it's a plain `tokio::time::sleep` racing the drain future.
    pub async fn drain_with_deadline<F>(&self, deadline: Duration, drain: F)
    where
        F: std::future::Future<Output = ()>,
    {
        tokio::select! {
            _ = drain => {
                tracing::info!("drained in-flight work cleanly");
            }
            _ = tokio::time::sleep(deadline) => {
                tracing::error!(deadline_secs = deadline.as_secs(), "drain deadline exceeded, forcing exit");
                std::process::exit(1);
            }
        }
    }
}
