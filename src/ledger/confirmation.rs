//! Confirmation monitoring.
//!
//! Polls the ledger for the acceptance record of a submitted transaction
//! until one appears or the poll budget runs out. The budget is always
//! bounded: a maximum attempt count, plus an optional wall-clock deadline.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout};

use crate::config::{BackoffMode, ConfirmationConfig};
use crate::ledger::client::Ledger;
use crate::ledger::types::{AcceptanceRecord, LedgerError, TxRef};
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;

/// Why a wait ended without an acceptance record.
#[derive(Debug, Error)]
pub enum ConfirmationError {
    /// Budget exhausted. The transaction may still land later.
    #[error("transaction {tx_ref} not accepted after {attempts} polls")]
    Timeout { tx_ref: TxRef, attempts: u32 },

    /// The ledger refused the query outright.
    #[error("receipt query for {tx_ref} failed: {source}")]
    Ledger {
        tx_ref: TxRef,
        #[source]
        source: LedgerError,
    },
}

/// Bounded polling policy.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    pub deadline: Option<Duration>,
    pub backoff: BackoffMode,
    pub max_delay: Duration,
}

impl PollPolicy {
    /// Fixed-interval policy with no deadline.
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            deadline: None,
            backoff: BackoffMode::Fixed,
            max_delay: interval,
        }
    }

    /// Delay to sleep after poll number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            BackoffMode::Fixed => self.interval,
            BackoffMode::Exponential => calculate_backoff(
                attempt,
                self.interval.as_millis() as u64,
                self.max_delay.as_millis() as u64,
            ),
        }
    }
}

impl From<&ConfirmationConfig> for PollPolicy {
    fn from(config: &ConfirmationConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.poll_interval_ms),
            max_attempts: config.max_attempts,
            deadline: config.deadline_secs.map(Duration::from_secs),
            backoff: config.backoff,
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

/// Waits for acceptance records.
pub struct ConfirmationWaiter<L> {
    ledger: Arc<L>,
    policy: PollPolicy,
}

impl<L: Ledger> ConfirmationWaiter<L> {
    pub fn new(ledger: Arc<L>, policy: PollPolicy) -> Self {
        Self { ledger, policy }
    }

    /// Wait for the acceptance record of `tx_ref`.
    ///
    /// Transient query errors count against the budget and are retried;
    /// any other query error ends the wait immediately. Giving up never
    /// affects the submitted transaction.
    pub async fn wait(&self, tx_ref: TxRef) -> Result<AcceptanceRecord, ConfirmationError> {
        let mut attempts = 0u32;

        let polling = async {
            while attempts < self.policy.max_attempts {
                attempts += 1;

                match self.ledger.poll_receipt(tx_ref).await {
                    Ok(Some(record)) => {
                        metrics::record_confirmation_polls(attempts);
                        tracing::info!(
                            tx_ref = %tx_ref,
                            attempts = attempts,
                            block_number = ?record.block_number,
                            success = record.success,
                            "Transaction accepted"
                        );
                        return Ok(record);
                    }
                    Ok(None) => {
                        tracing::debug!(tx_ref = %tx_ref, attempt = attempts, "Waiting for transaction to be confirmed");
                    }
                    Err(e) if e.is_transient() => {
                        tracing::warn!(tx_ref = %tx_ref, attempt = attempts, error = %e, "Receipt query failed, retrying");
                    }
                    Err(source) => return Err(ConfirmationError::Ledger { tx_ref, source }),
                }

                if attempts < self.policy.max_attempts {
                    sleep(self.policy.delay_after(attempts)).await;
                }
            }
            Err(ConfirmationError::Timeout { tx_ref, attempts })
        };

        let result = match self.policy.deadline {
            Some(deadline) => {
                let outcome = timeout(deadline, polling).await;
                outcome.unwrap_or(Err(ConfirmationError::Timeout { tx_ref, attempts }))
            }
            None => polling.await,
        };

        if let Err(ConfirmationError::Timeout { attempts, .. }) = &result {
            metrics::record_confirmation_polls(*attempts);
            tracing::warn!(
                tx_ref = %tx_ref,
                attempts = attempts,
                "Confirmation budget exhausted; transaction may still be accepted later"
            );
        }
        result
    }
}
