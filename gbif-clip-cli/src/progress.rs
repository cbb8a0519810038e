//! Progress reporting through the log.

use gbif_clip_core::{CancelFlag, ProgressPort};
use log::info;

/// Logs each completed tenth of a stage.
///
/// Cancellation is read from a shared [`CancelFlag`], so one flag can stop
/// both the fetch and the clip.
#[derive(Debug, Clone, Default)]
pub(crate) struct LogProgress {
    cancel: CancelFlag,
    logged_tenth: Option<u64>,
}

impl LogProgress {
    pub(crate) const fn new(cancel: CancelFlag) -> Self {
        Self {
            cancel,
            logged_tenth: None,
        }
    }
}

impl ProgressPort for LogProgress {
    fn report(&mut self, current: u64, max: u64, label: &str) {
        let Some(tenth) = current.saturating_mul(10).checked_div(max) else {
            if self.logged_tenth.is_none() {
                info!("{label}: nothing to do");
                self.logged_tenth = Some(10);
            }
            return;
        };
        if self.logged_tenth.is_some_and(|logged| logged >= tenth) {
            return;
        }
        self.logged_tenth = Some(tenth);
        info!("{label}: {current}/{max} ({}%)", tenth.saturating_mul(10));
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn logs_once_per_tenth() {
        let mut progress = LogProgress::default();
        let mut logged = Vec::new();
        for current in 0..=100 {
            let before = progress.logged_tenth;
            progress.report(current, 100, "stage");
            if progress.logged_tenth != before {
                logged.push(current);
            }
        }
        assert_eq!(logged, [0, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100]);
    }

    #[rstest]
    fn empty_stage_logs_once() {
        let mut progress = LogProgress::default();
        progress.report(0, 0, "stage");
        progress.report(0, 0, "stage");
        assert_eq!(progress.logged_tenth, Some(10));
    }

    #[rstest]
    fn follows_the_shared_flag() {
        let flag = CancelFlag::default();
        let progress = LogProgress::new(flag.clone());
        assert!(!progress.is_cancelled());
        flag.cancel();
        assert!(progress.is_cancelled());
    }
}
