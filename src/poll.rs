//! Bounded, fixed-interval condition polling
//!
//! Every wait step in a run goes through [`poll_until`]. The condition does
//! one cluster read per call and answers "done" or "not yet"; the poller owns
//! the sleeping, the deadline, and the decision whether a read error is worth
//! another attempt.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

/// Default time between condition checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default time a single wait step may take
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(120 * 60);

/// Interval and timeout shared by every wait step of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollSettings {
    /// Time between condition checks
    pub interval: Duration,
    /// Wall-clock budget measured from the first check
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

/// How a poll ended
#[derive(Debug)]
pub enum PollOutcome {
    /// The condition reported done
    Succeeded,
    /// The timeout elapsed before the condition reported done
    TimedOut,
    /// The condition returned a non-retryable error
    Failed(snapmover_common::Error),
}

impl PollOutcome {
    /// Convert into a run result, naming the phase in any error
    pub fn into_result(self, phase: &str, timeout: Duration) -> crate::Result<()> {
        match self {
            Self::Succeeded => Ok(()),
            Self::TimedOut => Err(crate::Error::PhaseTimeout {
                phase: phase.to_string(),
                timeout,
            }),
            Self::Failed(source) => Err(crate::Error::PhaseFailed {
                phase: phase.to_string(),
                source,
            }),
        }
    }
}

/// Poll `condition` until it reports done, fails terminally, or time runs out
///
/// The first check happens immediately. Retryable errors (see
/// [`snapmover_common::Error::is_retryable`]) count as "not yet". The last
/// sleep is clipped to the deadline and one final check runs there, so a
/// never-satisfied condition returns [`PollOutcome::TimedOut`] no later than
/// `timeout` plus the duration of that check.
pub async fn poll_until<F, Fut>(settings: PollSettings, mut condition: F) -> PollOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = snapmover_common::Result<bool>>,
{
    let start = Instant::now();

    loop {
        match condition().await {
            Ok(true) => return PollOutcome::Succeeded,
            Ok(false) => trace!("Polling condition not yet met"),
            Err(e) if e.is_retryable() => debug!(error = %e, "Polling check failed, retrying"),
            Err(e) => return PollOutcome::Failed(e),
        }

        let elapsed = start.elapsed();
        if elapsed >= settings.timeout {
            return PollOutcome::TimedOut;
        }
        tokio::time::sleep(settings.interval.min(settings.timeout - elapsed)).await;
    }
}
