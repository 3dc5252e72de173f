//! Bounded recovery: restart the count + scan sequence from scratch, drawing
//! on a lifetime budget that is never replenished.
use super::Shared;
use crate::error::ErrorKind;
use crate::model::{SyncMetrics, SyncState};

/// Lifetime recovery budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryBudget {
    attempts: u32,
    max_attempts: u32,
    exhaustion_recorded: bool,
}

impl RecoveryBudget {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            exhaustion_recorded: false,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Draw one attempt, returning its 1-based number, or `None` when spent.
    pub fn try_draw(&mut self) -> Option<u32> {
        if self.is_exhausted() {
            return None;
        }
        self.attempts += 1;
        Some(self.attempts)
    }

    /// True only for the first refused request on a spent budget.
    ///
    /// Later refusals are logged but not recorded, keeping the failure that
    /// spent the budget inside the report window.
    pub fn take_first_exhaustion(&mut self) -> bool {
        if !self.is_exhausted() || self.exhaustion_recorded {
            return false;
        }
        self.exhaustion_recorded = true;
        true
    }
}

/// Result of one call into the recovery policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// The scan was restarted; `state` is what `start_scan` left.
    Recovered { attempt: u32, state: SyncState },
    /// The attempt was spent but the restart failed.
    Failed { attempt: u32, state: SyncState },
    /// No attempts left; state was not touched.
    Exhausted,
}

impl Shared {
    pub(super) fn attempt_recovery(&self) -> RecoveryOutcome {
        let attempt = {
            let mut inner = self.inner.lock();
            let max_attempts = inner.recovery.max_attempts();
            let Some(attempt) = inner.recovery.try_draw() else {
                let attempts = inner.recovery.attempts();
                self.log.error(
                    ErrorKind::MaxRecoveryAttemptsReached.as_str(),
                    &[("attempts", &attempts)],
                );
                if inner.recovery.take_first_exhaustion() {
                    self.record_error_locked(
                        &mut inner,
                        ErrorKind::MaxRecoveryAttemptsReached,
                        format!("recovery budget of {max_attempts} attempts exhausted"),
                        None,
                    );
                }
                return RecoveryOutcome::Exhausted;
            };

            self.log.info(
                "attempting_recovery",
                &[("attempt", &attempt), ("max_attempts", &max_attempts)],
            );

            // Fresh run, but the failure tally spans the monitor's lifetime.
            let errors_count = inner.metrics.errors_count;
            inner.state = SyncState::Initializing;
            inner.metrics = SyncMetrics::new();
            inner.metrics.errors_count = errors_count;
            attempt
        };

        let restart = match self.count_files() {
            Ok(_) => {
                if self.start_scan() {
                    Ok(())
                } else {
                    Err("scan restart failed".to_owned())
                }
            }
            Err(err) => Err(err.to_string()),
        };

        let mut inner = self.inner.lock();
        let state = inner.state;
        match restart {
            Ok(()) => {
                self.log.info(
                    "recovery_successful",
                    &[("attempt", &attempt), ("state", &state)],
                );
                RecoveryOutcome::Recovered { attempt, state }
            }
            Err(message) => {
                self.log.error(
                    ErrorKind::RecoveryFailed.as_str(),
                    &[("attempt", &attempt), ("error", &message)],
                );
                self.record_error_locked(
                    &mut inner,
                    ErrorKind::RecoveryFailed,
                    format!("attempt {attempt}: {message}"),
                    None,
                );
                RecoveryOutcome::Failed { attempt, state }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_draws_until_exhausted() {
        let mut budget = RecoveryBudget::new(3);
        assert_eq!(budget.try_draw(), Some(1));
        assert_eq!(budget.try_draw(), Some(2));
        assert_eq!(budget.try_draw(), Some(3));
        assert!(budget.is_exhausted());
        assert_eq!(budget.try_draw(), None);
        assert_eq!(budget.attempts(), 3);
    }

    #[test]
    fn zero_budget_is_exhausted_immediately() {
        let mut budget = RecoveryBudget::new(0);
        assert!(budget.is_exhausted());
        assert_eq!(budget.try_draw(), None);
        assert_eq!(budget.attempts(), 0);
    }

    #[test]
    fn exhaustion_is_reported_once() {
        let mut budget = RecoveryBudget::new(1);
        assert!(!budget.take_first_exhaustion());
        assert_eq!(budget.try_draw(), Some(1));
        assert!(budget.take_first_exhaustion());
        assert!(!budget.take_first_exhaustion());
        assert!(!budget.take_first_exhaustion());
    }
}
