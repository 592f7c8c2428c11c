//! Implements the future

use crate::{
    error::{BoxError, WaitError},
    latch::Latch,
    outcome::Outcome,
    token::CancelToken,
};
use once_cell::sync::OnceCell;
use std::{
    fmt::{self, Debug, Formatter},
    sync::Arc,
    time::{Duration, Instant},
};

/// The observable state of a future
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum State {
    /// The future has not been settled yet
    Pending,
    /// The future has been settled via `complete`
    Completed,
    /// The future has been settled via `cancel`
    Cancelled,
}

/// A write-once, read-many completion cell
///
/// A future starts out pending. Exactly one call to [`Future::complete`] or [`Future::cancel`] settles it; every later
/// call reports `false` and changes nothing. Any number of threads may wait for the outcome concurrently, either
/// indefinitely via [`Future::get`] or bounded by a [`CancelToken`] via [`Future::get_with_token`].
///
/// # Blocking forever
/// [`Future::get`] on a future that is never settled blocks forever. This is part of the contract; use a bounded wait
/// if the producer may go away.
pub struct Future<T, E = BoxError> {
    /// The outcome, written at most once
    outcome: OnceCell<Outcome<T, E>>,
    /// The settled signal; fires after the outcome has been written
    settled: Arc<Latch>,
}
impl<T, E> Future<T, E> {
    /// Creates a new pending future
    pub fn new() -> Self {
        Self { outcome: OnceCell::new(), settled: Arc::new(Latch::new()) }
    }

    /// Completes the future with `value` and an optional producer error
    ///
    /// Returns `true` if this call settled the future, `false` if it has already been settled before.
    pub fn complete(&self, value: T, error: Option<E>) -> bool {
        self.settle(Outcome::completed(value, error))
    }
    /// Completes the future with the cancellation outcome
    ///
    /// Returns `true` if this call settled the future, `false` if it has already been settled before.
    pub fn cancel(&self) -> bool {
        self.settle(Outcome::cancelled())
    }
    /// Publishes `outcome` if the future is still pending
    fn settle(&self, outcome: Outcome<T, E>) -> bool {
        let cancelled = outcome.is_cancelled();
        if self.outcome.set(outcome).is_err() {
            tracing::debug!(cancelled, "future already settled");
            return false;
        }

        // Only the winner gets here, so the latch fires exactly once and only after the outcome is visible
        let fired = self.settled.fire();
        debug_assert!(fired, "settled signal fired twice");
        tracing::trace!(cancelled, "future settled");
        true
    }

    /// Whether the future has been settled via `cancel`; never blocks
    pub fn is_cancelled(&self) -> bool {
        self.outcome.get().is_some_and(Outcome::is_cancelled)
    }
    /// Whether the future has been settled; never blocks
    pub fn is_settled(&self) -> bool {
        self.outcome.get().is_some()
    }
    /// The current state of the future; never blocks
    pub fn state(&self) -> State {
        match self.outcome.get() {
            None => State::Pending,
            Some(outcome) if outcome.is_cancelled() => State::Cancelled,
            Some(_) => State::Completed,
        }
    }

    /// Gets the outcome if the future has been settled; never blocks
    pub fn try_get(&self) -> Option<&Outcome<T, E>> {
        self.outcome.get()
    }

    /// Waits until the future is settled and returns the outcome
    ///
    /// __Warning: this function blocks forever if the future is never settled__
    pub fn get(&self) -> &Outcome<T, E> {
        if let Some(outcome) = self.outcome.get() {
            return outcome;
        }

        self.settled.wait();
        self.settled_outcome()
    }

    /// Waits until the future is settled or `token` fires
    ///
    /// If the token fires first, the corresponding [`WaitError`] is returned and the future is left untouched; a later
    /// settlement is still observed by other and future waiters. If both happened, the outcome wins.
    pub fn get_with_token(&self, token: &CancelToken) -> Result<&Outcome<T, E>, WaitError> {
        if let Some(outcome) = self.outcome.get() {
            return Ok(outcome);
        }
        if let Some(error) = token.error() {
            return Err(error);
        }

        // Translate an explicit cancellation into a wakeup on our latch; the watch is retired when we return
        let settled = self.settled.clone();
        let _watch = token.watch(move || settled.wake());
        if self.settled.wait_until(token.deadline(), || token.is_done()) {
            return Ok(self.settled_outcome());
        }

        let error = token.error().unwrap_or(WaitError::DeadlineExceeded);
        tracing::trace!(%error, "wait for future interrupted");
        Err(error)
    }
    /// Waits until the future is settled or `timeout` has elapsed
    pub fn get_timeout(&self, timeout: Duration) -> Result<&Outcome<T, E>, WaitError> {
        self.get_with_token(&CancelToken::with_timeout(timeout))
    }
    /// Waits until the future is settled or `deadline` has been reached
    pub fn get_deadline(&self, deadline: Instant) -> Result<&Outcome<T, E>, WaitError> {
        self.get_with_token(&CancelToken::with_deadline(deadline))
    }

    /// Gets the outcome after the settled signal has fired
    fn settled_outcome(&self) -> &Outcome<T, E> {
        match self.outcome.get() {
            Some(outcome) => outcome,
            None => panic!("empty outcome after the settled signal fired"),
        }
    }
}
impl<T, E> Default for Future<T, E> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T, E> Debug for Future<T, E>
where
    E: Debug,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Future").field("settled", &self.settled).field("outcome", &self.outcome.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Future;
    use crate::{error::WaitError, token::CancelToken};
    use std::{sync::Arc, thread, time::Duration};

    #[test]
    fn settled_wait_retires_watch() {
        let future = Arc::new(Future::<u8, String>::new());
        let token = CancelToken::new();

        // Complete the future while the waiter is blocked
        let producer = future.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            producer.complete(5, None);
        });

        let outcome = future.get_with_token(&token).expect("Future has not been set");
        assert_eq!(outcome.value(), Some(&5));
        assert_eq!(token.watcher_count(), 0, "Wait left a registration on the token");
    }

    #[test]
    fn timed_out_waits_retire_watches() {
        let future = Future::<u8, String>::new();
        let token = CancelToken::with_timeout(Duration::from_millis(50));

        // Every wait on the same token ends by deadline
        for _ in 0..4 {
            assert_eq!(future.get_with_token(&token).err(), Some(WaitError::DeadlineExceeded));
            assert_eq!(token.watcher_count(), 0, "Wait left a registration on the token");
        }
        assert!(!future.is_settled());
    }

    #[test]
    fn cancelled_wait_retires_watch() {
        let future = Future::<u8, String>::new();
        let token = CancelToken::new();

        let canceller = token.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            canceller.cancel();
        });

        assert_eq!(future.get_with_token(&token).err(), Some(WaitError::TokenCancelled));
        assert_eq!(token.watcher_count(), 0, "Wait left a registration on the token");
    }

    #[test]
    fn losing_settlers_leave_signal_alone() {
        let future = Future::<u8, String>::new();
        assert!(future.cancel());
        assert!(!future.complete(1, None));
        assert!(!future.cancel());
        assert!(future.settled.is_fired());
        assert!(future.is_cancelled());
    }
}
