//! Implements the settled outcome of a future

use crate::error::{BoxError, Failure};
use std::fmt::{self, Debug, Formatter};

/// The terminal outcome of a future
///
/// An outcome is written exactly once and is immutable afterwards. A completed outcome always carries the value that
/// was passed to `complete`, together with the optional producer error; a cancelled outcome carries no value and the
/// cancellation sentinel as error.
#[derive(Clone, PartialEq, Eq)]
pub struct Outcome<T, E = BoxError> {
    /// The value, absent if cancelled
    value: Option<T>,
    /// The error, if any
    error: Option<Failure<E>>,
}
impl<T, E> Outcome<T, E> {
    /// Creates a completed outcome
    pub(in crate) fn completed(value: T, error: Option<E>) -> Self {
        Self { value: Some(value), error: error.map(Failure::Producer) }
    }
    /// Creates a cancelled outcome
    pub(in crate) const fn cancelled() -> Self {
        Self { value: None, error: Some(Failure::Cancelled) }
    }

    /// The value, or `None` if the future has been cancelled
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }
    /// The error, if any
    pub fn error(&self) -> Option<&Failure<E>> {
        self.error.as_ref()
    }
    /// Whether the outcome is the cancellation outcome
    pub fn is_cancelled(&self) -> bool {
        matches!(self.error, Some(Failure::Cancelled))
    }

    /// Views the outcome as a result; a present error takes precedence over the value
    pub fn result(&self) -> Result<&T, &Failure<E>> {
        match (&self.value, &self.error) {
            (_, Some(error)) => Err(error),
            (Some(value), None) => Ok(value),
            (None, None) => unreachable!("an outcome without error always carries a value"),
        }
    }
    /// Converts the outcome into a result; a present error takes precedence over the value
    pub fn into_result(self) -> Result<T, Failure<E>> {
        match (self.value, self.error) {
            (_, Some(error)) => Err(error),
            (Some(value), None) => Ok(value),
            (None, None) => unreachable!("an outcome without error always carries a value"),
        }
    }
    /// Splits the outcome into its value and error
    pub fn into_parts(self) -> (Option<T>, Option<Failure<E>>) {
        (self.value, self.error)
    }
}
impl<T, E> Debug for Outcome<T, E>
where
    E: Debug,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        // The value type is not required to be debug-printable
        let value: &dyn Debug = match self.value {
            Some(_) => &Some("<opaque>"),
            None => &Option::<&str>::None,
        };
        f.debug_struct("Outcome").field("value", value).field("error", &self.error).finish()
    }
}
