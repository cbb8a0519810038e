//! Progress reporting and cooperative cancellation.
//!
//! Pipeline stages report fractional progress to a [`ProgressPort`] and poll
//! it for cancellation between units of work. There is no parallelism: after
//! each unit the stage calls [`ProgressPort::process_events`], giving the
//! host a chance to pump its event loop, and then checks
//! [`ProgressPort::is_cancelled`]. Work already issued (an in-flight HTTP
//! request, for instance) always completes before the poll.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Progress label used while fetching remote records.
pub const FETCH_LABEL: &str = "Fetching GBIF occurrences";

/// Progress label used while sweeping the clip result.
pub const CLIP_LABEL: &str = "Clipping occurrences";

/// Sink for stage progress and source of cancellation requests.
///
/// # Examples
///
/// ```
/// use gbif_clip_core::ProgressPort;
///
/// #[derive(Default)]
/// struct Percent(u64);
///
/// impl ProgressPort for Percent {
///     fn report(&mut self, current: u64, max: u64, _label: &str) {
///         self.0 = current.saturating_mul(100).checked_div(max).unwrap_or(100);
///     }
///
///     fn is_cancelled(&self) -> bool {
///         false
///     }
/// }
///
/// let mut port = Percent::default();
/// port.report(1, 4, "Fetching");
/// assert_eq!(port.0, 25);
/// ```
pub trait ProgressPort {
    /// Record that `current` of `max` units are complete.
    fn report(&mut self, current: u64, max: u64, label: &str);

    /// Suspension point: let the host process pending events.
    ///
    /// The default does nothing, which suits hosts without an event loop.
    fn process_events(&mut self) {}

    /// Whether the user has asked the running stage to stop.
    fn is_cancelled(&self) -> bool;
}

/// Result of an operation that the user may cancel.
///
/// Cancellation is not an error. Callers match on the outcome to tell an
/// empty result apart from an abandoned one.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The operation ran to completion.
    Completed(T),
    /// The user cancelled the operation.
    Cancelled,
}

impl<T> Outcome<T> {
    /// Whether the operation was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The completed value, if any.
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Cancelled => None,
        }
    }

    /// Map the completed value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Completed(value) => Outcome::Completed(f(value)),
            Self::Cancelled => Outcome::Cancelled,
        }
    }
}

/// Port that discards progress and never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressPort for NoProgress {
    fn report(&mut self, _current: u64, _max: u64, _label: &str) {}

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Shared cancellation flag.
///
/// Clones observe the same flag, so one owner can hand a clone to whatever
/// handles the user's cancel action while a stage polls the other.
///
/// # Examples
///
/// ```
/// use gbif_clip_core::{CancelFlag, ProgressPort};
///
/// let flag = CancelFlag::default();
/// let trigger = flag.clone();
/// assert!(!flag.is_cancelled());
/// trigger.cancel();
/// assert!(flag.is_cancelled());
/// ```
#[derive(Debug, Default, Clone)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Clear a previous request.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

impl ProgressPort for CancelFlag {
    fn report(&mut self, _current: u64, _max: u64, _label: &str) {}

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn outcome_helpers() {
        let done: Outcome<u8> = Outcome::Completed(2);
        assert!(!done.is_cancelled());
        assert_eq!(done.clone().map(u16::from), Outcome::Completed(2_u16));
        assert_eq!(done.completed(), Some(2));

        let cancelled: Outcome<u8> = Outcome::Cancelled;
        assert!(cancelled.is_cancelled());
        assert_eq!(cancelled.completed(), None);
    }

    #[rstest]
    fn cancel_flag_clones_share_state() {
        let flag = CancelFlag::default();
        let other = flag.clone();
        other.cancel();
        assert!(flag.is_cancelled());
        flag.reset();
        assert!(!other.is_cancelled());
    }

    #[rstest]
    fn no_progress_never_cancels() {
        let mut port = NoProgress;
        port.report(1, 2, FETCH_LABEL);
        port.process_events();
        assert!(!port.is_cancelled());
    }
}
