use std::time::Duration;

use tracing::{debug, warn};

use crate::core::cancel::CancelToken;
use crate::core::client::signer::RequestSigner;
use crate::core::client::transport::{RequestBody, SignedRequest, SoapResponse, SoapTransport};
use crate::errors::{ExtractError, Result};

/// Caller-supplied retry budget. Each call site gets its own attempt counter;
/// nothing is shared across partitions.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub initial_wait: Duration,
    pub retry_limit: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_wait: Duration::from_secs(1),
            retry_limit: 5,
        }
    }
}

impl RetryPolicy {
    /// Wait before retry `n` (1-indexed): `initial_wait * 2^(n-1)`.
    pub fn backoff_wait(&self, retry: u32) -> Duration {
        self.initial_wait * 2u32.saturating_pow(retry.saturating_sub(1))
    }
}

/// Wraps one remote operation with per-call signing, failure classification
/// and bounded exponential backoff.
pub struct RetryingClient<T: SoapTransport> {
    transport: T,
    signer: RequestSigner,
    policy: RetryPolicy,
}

impl<T: SoapTransport> RetryingClient<T> {
    pub fn new(transport: T, signer: RequestSigner, policy: RetryPolicy) -> Self {
        Self {
            transport,
            signer,
            policy,
        }
    }

    /// Performs one logical operation, retrying transient failures up to the
    /// configured budget. Configuration errors abort immediately regardless
    /// of attempts remaining; when the budget runs out the last-seen error is
    /// returned unchanged so its classification survives.
    pub async fn call(
        &self,
        operation: &'static str,
        body: RequestBody,
        cancel: &CancelToken,
    ) -> Result<SoapResponse> {
        let mut retries = 0u32;
        loop {
            // Signed immediately before transmission: signatures expire fast,
            // so credentials are never reused across attempts.
            let request = SignedRequest {
                operation,
                auth: self.signer.sign(chrono::Utc::now()),
                body: body.clone(),
            };

            match self.transport.call(request).await {
                Ok(response) => return Ok(response),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    if retries >= self.policy.retry_limit {
                        warn!(%operation, retries, error = %err, "retry budget exhausted");
                        return Err(err);
                    }
                    retries += 1;
                    let wait = self.policy.backoff_wait(retries);
                    debug!(%operation, retry = retries, ?wait, error = %err, "transient failure, backing off");

                    let mut cancel = cancel.clone();
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = cancel.cancelled() => return Err(ExtractError::Cancelled),
                    }
                }
            }
        }
    }
}

/* ---------------- Tests ---------------- */
