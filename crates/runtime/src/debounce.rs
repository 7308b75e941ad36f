use std::time::Duration;

use tokio::time::Instant;

/// Trailing-edge debouncer over a single pending value.
///
/// Every [`Debouncer::signal`] replaces the pending value and pushes the
/// deadline out by one window. [`Debouncer::settled`] resolves once the
/// window elapses with no further signal, yielding the last value.
///
/// Time comes from `tokio::time`, so tests can drive it with a paused clock.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Records a new value and restarts the quiet period.
    pub fn signal(&mut self, value: T) {
        self.pending = Some((value, Instant::now() + self.window));
    }

    /// Drops the pending value without emitting it.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    /// Waits for the pending value to settle.
    ///
    /// Never resolves while nothing is pending. Cancel-safe: dropping the
    /// future (e.g. losing a `select!` race) keeps the pending value.
    pub async fn settled(&mut self) -> T {
        let Some(deadline) = self.deadline() else {
            return std::future::pending().await;
        };
        tokio::time::sleep_until(deadline).await;
        let Some((value, _)) = self.pending.take() else {
            return std::future::pending().await;
        };
        value
    }
}
