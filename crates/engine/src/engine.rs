//! The bounded-retry upload loop.

use bundlepush_tus::ProgressEvent;
use reqwest::Url;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::transport::Transport;

/// Drives a [`Transport`] to completion under a [`RetryPolicy`].
///
/// Each attempt runs `create_or_resume` followed by `transfer`; both
/// failure kinds consume attempts from the same budget.
pub struct UploadEngine {
    policy: RetryPolicy,
}

impl Default for UploadEngine {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl UploadEngine {
    /// Creates an engine with the given retry policy.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Runs the upload to completion, error, or budget exhaustion.
    /// Returns the server-assigned session URL on success.
    pub async fn run<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        progress: mpsc::Sender<ProgressEvent>,
    ) -> Result<Url, EngineError> {
        let mut last_error = None;

        for attempt in 1..=self.policy.max_attempts {
            if attempt > 1 {
                info!(attempt, max_attempts = self.policy.max_attempts, "retrying upload");
            }

            let session = match transport.create_or_resume().await {
                Ok(url) => url,
                Err(e) => {
                    match self.policy.on_create_error(attempt, e.status()) {
                        RetryDecision::Abort => return Err(EngineError::Unrecoverable(e)),
                        RetryDecision::RetryAfter(delay) => {
                            warn!(
                                attempt,
                                error = %e,
                                delay_secs = delay.as_secs(),
                                "create or resume failed"
                            );
                            last_error = Some(e);
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    }
                }
            };

            if attempt == 1 {
                info!(url = %session, "starting upload");
            }

            match transport.transfer(progress.clone()).await {
                Ok(()) => return Ok(session),
                Err(e) => {
                    let RetryDecision::RetryAfter(delay) = self.policy.on_transfer_error(attempt)
                    else {
                        return Err(EngineError::Tus(e));
                    };
                    warn!(
                        attempt,
                        error = %e,
                        delay_secs = delay.as_secs(),
                        "transfer failed"
                    );
                    last_error = Some(e);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        match last_error {
            Some(source) => Err(EngineError::Exhausted {
                attempts: self.policy.max_attempts,
                source,
            }),
            None => Err(EngineError::NoAttempts),
        }
    }
}
