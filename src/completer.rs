//! Implements the producer handle

use crate::{error::BoxError, future::Future};
use std::{
    fmt::{self, Debug, Formatter},
    sync::Arc,
};

/// The producer side of a future with automatic cancellation on drop
///
/// Every settling method consumes the completer. If a completer is dropped while the future is still pending, the
/// future is cancelled so that waiters do not block on an abandoned producer.
pub struct Completer<T, E = BoxError> {
    /// The underlying future
    future: Arc<Future<T, E>>,
}
impl<T, E> Completer<T, E> {
    /// Creates a new completer for `future`
    pub(in crate) const fn new(future: Arc<Future<T, E>>) -> Self {
        Self { future }
    }

    /// The future this completer settles
    pub fn future(&self) -> &Arc<Future<T, E>> {
        &self.future
    }

    /// Completes the future with `value` and an optional producer error
    pub fn complete(self, value: T, error: Option<E>) -> bool {
        self.future.complete(value, error)
    }
    /// Completes the future with `value` and no error
    pub fn ok(self, value: T) -> bool {
        self.future.complete(value, None)
    }
    /// Completes the future with `value` and the producer error `error`
    pub fn fail(self, value: T, error: E) -> bool {
        self.future.complete(value, Some(error))
    }
    /// Cancels the future
    pub fn cancel(self) -> bool {
        self.future.cancel()
    }
}
impl<T, E> Debug for Completer<T, E>
where
    E: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer").field("future", &self.future).finish()
    }
}
impl<T, E> Drop for Completer<T, E> {
    fn drop(&mut self) {
        // Settling methods consume the completer, so most drops find the future already settled
        if !self.future.is_settled() && self.future.cancel() {
            tracing::debug!("completer dropped before settling, future cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::future::State;

    #[test]
    fn drop_after_fail_keeps_outcome() {
        let (completer, future) = crate::new::<u8, String>();
        assert!(completer.fail(2, "broken".to_string()));
        assert_eq!(future.state(), State::Completed);
        assert_eq!(future.get().value(), Some(&2));
    }

    #[test]
    fn drop_while_pending_cancels() {
        let (completer, future) = crate::new::<u8, String>();
        drop(completer);
        assert_eq!(future.state(), State::Cancelled);
    }
}
