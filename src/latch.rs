//! Implements the broadcast-once settled signal

use parking_lot::{Condvar, Mutex};
use std::{
    fmt::{self, Debug, Formatter},
    time::Instant,
};

/// A latch that fires once and then stays open
///
/// Waiting does not consume the signal; any number of threads may wait concurrently, and a thread that arrives after
/// the latch fired returns immediately.
pub(in crate) struct Latch {
    /// Whether the latch has fired
    fired: Mutex<bool>,
    /// The signal variable
    signal: Condvar,
}
impl Latch {
    /// Creates a new, armed latch
    pub const fn new() -> Self {
        Self { fired: parking_lot::const_mutex(false), signal: Condvar::new() }
    }

    /// Whether the latch has fired
    pub fn is_fired(&self) -> bool {
        *self.fired.lock()
    }

    /// Fires the latch and wakes all waiting threads; returns `false` if the latch has already fired
    pub fn fire(&self) -> bool {
        let mut fired = self.fired.lock();
        if *fired {
            return false;
        }

        *fired = true;
        self.signal.notify_all();
        true
    }

    /// Wakes all waiting threads without firing so that they re-check their interruption condition
    pub fn wake(&self) {
        // Take the lock so that a waiter cannot miss the notification between its check and its wait
        let _fired = self.fired.lock();
        self.signal.notify_all();
    }

    /// Waits until the latch has fired
    pub fn wait(&self) {
        let mut fired = self.fired.lock();
        while !*fired {
            self.signal.wait(&mut fired);
        }
    }

    /// Waits until the latch has fired, the deadline is reached or `interrupted` returns `true`
    ///
    /// `interrupted` is evaluated under the latch lock after every wakeup; whoever flips its condition must call
    /// [`Self::wake`] afterwards. Returns whether the latch has fired.
    pub fn wait_until<F>(&self, deadline: Option<Instant>, interrupted: F) -> bool
    where
        F: Fn() -> bool,
    {
        let mut fired = self.fired.lock();
        loop {
            if *fired {
                return true;
            }
            if interrupted() {
                return false;
            }

            match deadline {
                Some(deadline) => {
                    if self.signal.wait_until(&mut fired, deadline).timed_out() {
                        return *fired;
                    }
                }
                None => self.signal.wait(&mut fired),
            }
        }
    }
}
impl Debug for Latch {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Latch").field("fired", &self.is_fired()).finish()
    }
}
