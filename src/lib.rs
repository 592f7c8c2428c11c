//! This library provides a write-once, read-many completion cell.
//!
//! A [`Future`] is settled exactly once, either with a value and an optional error via [`Future::complete`] or with
//! the cancellation outcome via [`Future::cancel`]. Any number of threads may wait for the outcome:
//! [`Future::get`] blocks until the future is settled, while [`Future::get_with_token`] additionally gives up once a
//! [`CancelToken`] fires, without affecting the future itself.
//!
//! ```
//! use std::thread;
//!
//! let (completer, future) = settled::new::<u8, settled::BoxError>();
//! thread::spawn(move || completer.ok(7));
//! assert_eq!(future.get().value(), Some(&7));
//! ```

mod completer;
mod error;
mod future;
mod latch;
mod outcome;
mod token;

pub use crate::{
    completer::Completer,
    error::{BoxError, Failure, WaitError},
    future::{Future, State},
    outcome::Outcome,
    token::{CancelToken, Watch},
};
use std::sync::Arc;

/// Creates a new future together with its completer
///
/// Dropping the completer without settling the future cancels it.
pub fn new<T, E>() -> (Completer<T, E>, Arc<Future<T, E>>) {
    let future = Arc::new(Future::new());
    (Completer::new(future.clone()), future)
}
