//! Core environment context trait for the printer engine.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// The time and scheduling interface of the engine's host.
///
/// This trait abstracts the clock so that the periodic sweep can run
/// in both production (tokio) and simulation (virtual time).
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`
/// - **Simulation**: `SimContext` - a manually advanced virtual clock
#[async_trait]
pub trait PrinterContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances virtual clock
    async fn sleep(&self, duration: Duration);

    /// Spawns a background task.
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
