// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Cancellation of running commands.
//!
//! Browses and expansions take a [`CancellationToken`]; the coordinator
//! cancels it when the process receives SIGINT or SIGTERM (Ctrl+C on
//! Windows), so a long walk stops at its next session call instead of
//! being killed mid-write.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// =============================================================================
// ShutdownCoordinator
// =============================================================================

/// Owns the root cancellation token of a command.
///
/// # Example
///
/// ```ignore
/// use uapub_bin::shutdown::ShutdownCoordinator;
///
/// let coordinator = ShutdownCoordinator::new();
/// let _listener = coordinator.cancel_on_signal();
///
/// services.browse_first(&connection, request, &coordinator.token()).await?;
/// ```
#[derive(Clone, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    shutdown_initiated: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    /// Creates a new shutdown coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token cancelled when shutdown is initiated.
    pub fn token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Initiates shutdown, cancelling every handed out token.
    pub fn initiate_shutdown(&self) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            info!("Shutdown initiated");
            self.token.cancel();
        }
    }

    /// Returns true if shutdown has been initiated.
    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown is initiated.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Waits for an OS signal, then initiates shutdown.
    ///
    /// Returns early when shutdown is initiated by other means. When the
    /// signal handlers cannot be installed this only waits for manual
    /// initiation.
    pub async fn wait_for_shutdown(&self) {
        tokio::select! {
            _ = self.token.cancelled() => return,
            received = wait_for_signal() => {
                if !received {
                    self.token.cancelled().await;
                    return;
                }
            }
        }
        self.initiate_shutdown();
    }

    /// Spawns a task cancelling the token on the first signal.
    pub fn cancel_on_signal(&self) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move { coordinator.wait_for_shutdown().await })
    }
}

/// Waits for a termination signal; `false` when none can be observed.
#[cfg(unix)]
async fn wait_for_signal() -> bool {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(err), _) | (_, Err(err)) => {
            warn!("Failed to register signal handlers: {}", err);
            return false;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        _ = sigint.recv() => info!("Received SIGINT"),
    }
    true
}

#[cfg(not(unix))]
async fn wait_for_signal() -> bool {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C");
            true
        }
        Err(err) => {
            warn!("Failed to register Ctrl+C handler: {}", err);
            false
        }
    }
}

// =============================================================================
// ShutdownGuard
// =============================================================================

/// A guard that initiates shutdown when dropped.
///
/// Held by the task driving a stream, so a panic or early return stops
/// everything sharing the token.
pub struct ShutdownGuard {
    coordinator: ShutdownCoordinator,
    trigger_on_drop: bool,
}

impl ShutdownGuard {
    /// Creates a new shutdown guard.
    pub fn new(coordinator: ShutdownCoordinator) -> Self {
        Self {
            coordinator,
            trigger_on_drop: true,
        }
    }

    /// Disarms the guard so it won't trigger shutdown on drop.
    pub fn disarm(mut self) {
        self.trigger_on_drop = false;
    }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        if self.trigger_on_drop {
            warn!("ShutdownGuard dropped, initiating shutdown");
            self.coordinator.initiate_shutdown();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shutdown_cancels_tokens() {
        let coordinator = ShutdownCoordinator::new();
        let token = coordinator.token();
        assert!(!coordinator.is_shutdown_initiated());
        assert!(!token.is_cancelled());

        coordinator.initiate_shutdown();

        assert!(coordinator.is_shutdown_initiated());
        assert!(token.is_cancelled());
        // Tokens handed out afterwards start cancelled.
        assert!(coordinator.token().is_cancelled());
    }

    #[tokio::test]
    async fn test_wait_returns_on_manual_shutdown() {
        let coordinator = ShutdownCoordinator::new();
        let waiter = coordinator.cancel_on_signal();

        coordinator.initiate_shutdown();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("listener should stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_guard_triggers_on_drop() {
        let coordinator = ShutdownCoordinator::new();
        {
            let _guard = ShutdownGuard::new(coordinator.clone());
        }
        assert!(coordinator.is_shutdown_initiated());
    }

    #[tokio::test]
    async fn test_shutdown_guard_disarm() {
        let coordinator = ShutdownCoordinator::new();
        ShutdownGuard::new(coordinator.clone()).disarm();
        assert!(!coordinator.is_shutdown_initiated());
    }

    #[tokio::test]
    async fn test_double_shutdown() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.initiate_shutdown();
        coordinator.initiate_shutdown();
        assert!(coordinator.is_shutdown_initiated());
        tokio::time::timeout(Duration::from_millis(100), coordinator.cancelled())
            .await
            .unwrap();
    }
}
