//! Bounded fixed-delay polling.
//!
//! Every wait-for-state operation in the lifecycle controller runs through
//! [`Poller::run`]: a caller-supplied probe is invoked until it reports a
//! terminal condition, the attempt budget is exhausted, the probe hits an
//! unrecoverable error, or an optional cancellation token fires.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default number of probe invocations per wait
pub const DEFAULT_MAX_ATTEMPTS: u32 = 120;

/// Default delay between probe invocations
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// Attempt budget and inter-attempt delay for a wait operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Maximum number of probe invocations
    pub max_attempts: u32,
    /// Fixed delay between invocations (no backoff)
    pub delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_DELAY,
        }
    }
}

impl PollPolicy {
    /// Create a policy
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Policy that never sleeps between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Derive an attempt budget covering `max_wait` at this policy's delay.
    ///
    /// Always allows at least one attempt.
    pub fn with_max_wait(self, max_wait: Duration) -> Self {
        let attempts = if self.delay.is_zero() {
            self.max_attempts
        } else {
            let ratio = max_wait.as_millis() / self.delay.as_millis().max(1);
            u32::try_from(ratio).unwrap_or(u32::MAX)
        };
        Self {
            max_attempts: attempts.max(1),
            delay: self.delay,
        }
    }

    /// Upper bound on time spent sleeping during one wait
    pub fn ceiling(&self) -> Duration {
        self.delay.saturating_mul(self.max_attempts)
    }
}

/// What a single probe invocation observed
#[derive(Debug)]
pub enum Probe<E> {
    /// Terminal success; stop polling
    Succeeded,
    /// Terminal failure reported by the observed resource; stop polling
    Failed(String),
    /// Not yet in the desired state; try again after the delay
    Retry,
    /// The probe itself could not complete; abort immediately
    Unrecoverable(E),
}

/// How a poll loop ended (other than with an unrecoverable error)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Probe reported success
    Success {
        /// Probe invocations made
        attempts: u32,
    },
    /// Probe reported an explicit failure
    FailureReported {
        /// Failure description from the probe
        reason: String,
        /// Probe invocations made
        attempts: u32,
    },
    /// Attempt budget exhausted while the probe kept returning `Retry`
    TimedOut {
        /// Probe invocations made
        attempts: u32,
    },
    /// Cancellation token fired before a terminal state was observed
    Cancelled {
        /// Probe invocations made
        attempts: u32,
    },
}

impl PollOutcome {
    /// Number of probe invocations that led to this outcome
    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Success { attempts }
            | PollOutcome::FailureReported { attempts, .. }
            | PollOutcome::TimedOut { attempts }
            | PollOutcome::Cancelled { attempts } => *attempts,
        }
    }

    /// True for [`PollOutcome::Success`]
    pub fn is_success(&self) -> bool {
        matches!(self, PollOutcome::Success { .. })
    }
}

/// Poll loop runner
#[derive(Debug, Clone, Default)]
pub struct Poller {
    policy: PollPolicy,
    cancel: Option<CancellationToken>,
}

impl Poller {
    /// Create a poller with the given policy
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            cancel: None,
        }
    }

    /// Stop waiting as soon as `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Policy in effect
    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Run `probe` until it reaches a terminal state or the budget runs out.
    ///
    /// The probe is invoked at most `max_attempts` times. There is no sleep
    /// after the final attempt.
    pub async fn run<F, Fut, E>(&self, label: &str, mut probe: F) -> Result<PollOutcome, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Probe<E>>,
    {
        let max_attempts = self.policy.max_attempts;
        let mut attempts = 0;

        while attempts < max_attempts {
            if self.is_cancelled() {
                return Ok(PollOutcome::Cancelled { attempts });
            }

            attempts += 1;
            match probe().await {
                Probe::Succeeded => return Ok(PollOutcome::Success { attempts }),
                Probe::Failed(reason) => {
                    return Ok(PollOutcome::FailureReported { reason, attempts });
                }
                Probe::Unrecoverable(error) => return Err(error),
                Probe::Retry => {}
            }

            log::info!("Waiting for {label}... (attempt {attempts}/{max_attempts})");

            if attempts < max_attempts && !self.policy.delay.is_zero() {
                match &self.cancel {
                    Some(token) => {
                        tokio::select! {
                            _ = token.cancelled() => {
                                return Ok(PollOutcome::Cancelled { attempts });
                            }
                            _ = tokio::time::sleep(self.policy.delay) => {}
                        }
                    }
                    None => tokio::time::sleep(self.policy.delay).await,
                }
            }
        }

        Ok(PollOutcome::TimedOut { attempts })
    }
}

/// Run `probe` under `policy` without cancellation
pub async fn poll_until<F, Fut, E>(
    policy: PollPolicy,
    label: &str,
    probe: F,
) -> Result<PollOutcome, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Probe<E>>,
{
    Poller::new(policy).run(label, probe).await
}
