//! Retry policy for the bounded upload loop.

use std::time::Duration;

/// Statuses that retrying a first create/resume attempt cannot fix.
const UNRECOVERABLE_STATUSES: [u16; 4] = [400, 401, 403, 404];

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Give up immediately without consuming further attempts.
    Abort,
    /// Sleep for the given duration, then try again.
    RetryAfter(Duration),
}

/// Bounded fixed-backoff retry policy.
///
/// Two classifications apply (keyed by attempt index, not inlined in the
/// loop): a create/resume failure on the very first attempt with an
/// unrecoverable status aborts the run; every other failure — including
/// all transfer failures — is transient and retried after a fixed pause.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts across create/resume and transfer combined.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 50,
            backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Classifies a create/resume failure on the given 1-based attempt.
    pub fn on_create_error(&self, attempt: u32, status: Option<u16>) -> RetryDecision {
        if attempt == 1
            && status.is_some_and(|s| UNRECOVERABLE_STATUSES.contains(&s))
        {
            return RetryDecision::Abort;
        }
        RetryDecision::RetryAfter(self.backoff)
    }

    /// Classifies a transfer failure. Always transient.
    pub fn on_transfer_error(&self, _attempt: u32) -> RetryDecision {
        RetryDecision::RetryAfter(self.backoff)
    }
}
