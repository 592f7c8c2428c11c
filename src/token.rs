//! Implements the external cancellation token for bounded waits

use crate::error::WaitError;
use parking_lot::Mutex;
use std::{
    fmt::{self, Debug, Formatter},
    mem,
    sync::{
        atomic::{AtomicBool, Ordering::SeqCst},
        Arc,
    },
    time::{Duration, Instant},
};

/// A callback that is invoked once the token is cancelled
type Watcher = Box<dyn FnOnce() + Send>;

/// The registered watchers
#[derive(Default)]
struct Watchers {
    /// The id of the next registration
    next_id: u64,
    /// The registrations
    entries: Vec<(u64, Watcher)>,
}

/// The shared state of a token
struct Inner {
    /// The optional deadline
    deadline: Option<Instant>,
    /// Whether the token has been cancelled explicitly
    cancelled: AtomicBool,
    /// The callbacks to invoke on cancellation
    watchers: Mutex<Watchers>,
}

/// A token that bounds a wait by a deadline, an explicit cancellation, or both
///
/// Cancelling a token only ends the waits that use it; it never touches the futures being waited on. Clones share the
/// same state, so any clone may cancel the token for all of them.
#[derive(Clone)]
pub struct CancelToken {
    /// The shared state
    inner: Arc<Inner>,
}
impl CancelToken {
    /// Creates a token that fires only when cancelled explicitly
    pub fn new() -> Self {
        Self::with_optional_deadline(None)
    }
    /// Creates a token that fires at `deadline` or when cancelled explicitly
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::with_optional_deadline(Some(deadline))
    }
    /// Creates a token that fires after `timeout` or when cancelled explicitly
    pub fn with_timeout(timeout: Duration) -> Self {
        // An unrepresentable deadline is as good as none
        Self::with_optional_deadline(Instant::now().checked_add(timeout))
    }
    /// Creates a new token
    fn with_optional_deadline(deadline: Option<Instant>) -> Self {
        let inner = Inner { deadline, cancelled: AtomicBool::new(false), watchers: Mutex::default() };
        Self { inner: Arc::new(inner) }
    }

    /// The deadline of the token, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Cancels the token and notifies all watchers; returns `false` if the token has already been cancelled
    pub fn cancel(&self) -> bool {
        if self.inner.cancelled.swap(true, SeqCst) {
            return false;
        }

        // Run the callbacks outside of the lock so they may take locks of their own
        let watchers = mem::take(&mut self.inner.watchers.lock().entries);
        tracing::trace!(watchers = watchers.len(), "cancel token fired");
        for (_, watcher) in watchers {
            watcher();
        }
        true
    }

    /// Whether the token has fired, either by cancellation or because the deadline has passed
    pub fn is_done(&self) -> bool {
        self.error().is_some()
    }
    /// The reason why the token has fired, or `None` if it has not fired yet
    ///
    /// An explicit cancellation takes precedence over an expired deadline.
    pub fn error(&self) -> Option<WaitError> {
        if self.inner.cancelled.load(SeqCst) {
            return Some(WaitError::TokenCancelled);
        }
        match self.inner.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(WaitError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Registers `callback` to be invoked once the token is cancelled explicitly
    ///
    /// Returns `None` without registering if the token has already been cancelled. The registration is retired when
    /// the returned [`Watch`] is dropped. Deadlines never invoke the callback; waiters account for them on their own.
    pub fn watch<F>(&self, callback: F) -> Option<Watch>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut watchers = self.inner.watchers.lock();

        // `cancel` sets the flag before draining, so checking under the lock cannot race with a drain
        if self.inner.cancelled.load(SeqCst) {
            return None;
        }

        let id = watchers.next_id;
        watchers.next_id += 1;
        watchers.entries.push((id, Box::new(callback)));
        Some(Watch { token: self.clone(), id })
    }

    /// The amount of live registrations
    #[cfg(test)]
    pub(in crate) fn watcher_count(&self) -> usize {
        self.inner.watchers.lock().entries.len()
    }
}
impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
impl From<Instant> for CancelToken {
    fn from(deadline: Instant) -> Self {
        Self::with_deadline(deadline)
    }
}
impl From<Duration> for CancelToken {
    fn from(timeout: Duration) -> Self {
        Self::with_timeout(timeout)
    }
}
impl Debug for CancelToken {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("deadline", &self.inner.deadline)
            .field("cancelled", &self.inner.cancelled.load(SeqCst))
            .finish()
    }
}

/// A callback registration on a [`CancelToken`]; dropping it retires the registration
pub struct Watch {
    /// The token the callback is registered on
    token: CancelToken,
    /// The registration id
    id: u64,
}
impl Debug for Watch {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Watch").field("token", &self.token).field("id", &self.id).finish()
    }
}
impl Drop for Watch {
    fn drop(&mut self) {
        let mut watchers = self.token.inner.watchers.lock();
        watchers.entries.retain(|(id, _)| *id != self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::CancelToken;
    use crate::error::WaitError;
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering::SeqCst},
            Arc,
        },
        thread,
        time::{Duration, Instant},
    };

    #[test]
    fn fresh_token_is_not_done() {
        let token = CancelToken::new();
        assert!(!token.is_done());
        assert_eq!(token.error(), None);
        assert_eq!(token.deadline(), None);
    }

    #[test]
    fn cancel_once() {
        let token = CancelToken::new();
        assert!(token.cancel(), "First cancel must succeed");
        assert!(!token.clone().cancel(), "Second cancel must be a no-op");
        assert_eq!(token.error(), Some(WaitError::TokenCancelled));
    }

    #[test]
    fn deadline_expires() {
        let token = CancelToken::with_timeout(Duration::from_millis(20));
        assert!(!token.is_done());
        thread::sleep(Duration::from_millis(40));
        assert_eq!(token.error(), Some(WaitError::DeadlineExceeded));
    }

    #[test]
    fn cancellation_beats_deadline() {
        let token = CancelToken::with_deadline(Instant::now());
        token.cancel();
        assert_eq!(token.error(), Some(WaitError::TokenCancelled));
    }

    #[test]
    fn watchers_run_once() {
        let token = CancelToken::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let watch = {
            let calls = calls.clone();
            token.watch(move || {
                calls.fetch_add(1, SeqCst);
            })
        };
        assert!(watch.is_some());

        token.cancel();
        token.cancel();
        assert_eq!(calls.load(SeqCst), 1, "Watcher must run exactly once");
        assert_eq!(token.watcher_count(), 0);
    }

    #[test]
    fn watch_after_cancel_is_rejected() {
        let token = CancelToken::new();
        token.cancel();
        assert!(token.watch(|| unreachable!("Watcher registered on a cancelled token")).is_none());
    }

    #[test]
    fn dropped_watch_is_retired() {
        let token = CancelToken::new();
        let first = token.watch(|| panic!("Retired watcher must not run"));
        let second = token.watch(|| ());
        assert_eq!(token.watcher_count(), 2);

        drop(first);
        assert_eq!(token.watcher_count(), 1);
        drop(second);
        assert_eq!(token.watcher_count(), 0);
        token.cancel();
    }
}
