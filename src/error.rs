//! Implements the error types

use thiserror::Error;

/// A boxed, thread-safe producer error
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error half of a settled outcome
///
/// A producer error is stored verbatim; the cancellation sentinel can only be stored by [`crate::Future::cancel`],
/// so matching on the variant is an identity check that a producer error can never fake, even if its message reads
/// the same.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure<E = BoxError> {
    /// The future has been completed via `cancel`
    #[error("future completed via cancel")]
    Cancelled,
    /// The producer completed the future with an error
    #[error("{0}")]
    Producer(E),
}
impl<E> Failure<E> {
    /// Whether this is the cancellation sentinel
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The producer error, if any
    pub const fn producer(&self) -> Option<&E> {
        match self {
            Self::Producer(error) => Some(error),
            Self::Cancelled => None,
        }
    }
}

/// An error returned by a wait that gave up before the future settled
///
/// This error is local to the waiting call. It is never stored in the future and other waiters never see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WaitError {
    /// The deadline of the wait token passed
    #[error("wait deadline exceeded")]
    DeadlineExceeded,
    /// The wait token has been cancelled
    #[error("wait token cancelled")]
    TokenCancelled,
}
