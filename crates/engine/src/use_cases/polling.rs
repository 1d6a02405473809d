//! Poll-until-condition primitive.
//!
//! Every wait in the engine goes through [`wait_for`]: approval states,
//! migration plan milestones, anything else that changes asynchronously on
//! the far side of a port. Queries are strictly sequential; a new one is
//! issued only after the previous answer has been checked and the poll
//! interval has elapsed.
//!
//! Time is measured with tokio's clock so tests can run under paused time.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Stand-in deadline for timeouts too large to add to an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Validated timeout/interval pair for one wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    timeout: Duration,
    interval: Duration,
}

/// Invalid timeout/interval relationship. This is a caller bug and is never
/// retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollConfigError {
    #[error("Poll interval must be greater than zero")]
    ZeroInterval,
    #[error("Poll timeout ({timeout:?}) must be greater than poll interval ({interval:?})")]
    TimeoutNotAboveInterval { timeout: Duration, interval: Duration },
}

impl PollSettings {
    /// # Errors
    ///
    /// Returns `PollConfigError` unless `timeout > interval > 0`.
    pub fn new(timeout: Duration, interval: Duration) -> Result<Self, PollConfigError> {
        if interval.is_zero() {
            return Err(PollConfigError::ZeroInterval);
        }
        if timeout <= interval {
            return Err(PollConfigError::TimeoutNotAboveInterval { timeout, interval });
        }
        Ok(Self { timeout, interval })
    }

    pub fn from_secs(timeout_secs: u64, interval_secs: u64) -> Result<Self, PollConfigError> {
        Self::new(
            Duration::from_secs(timeout_secs),
            Duration::from_secs(interval_secs),
        )
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// A value that satisfied the awaited condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polled<T> {
    pub value: T,
    /// Number of probes issued, including the satisfying one.
    pub attempts: u32,
    pub elapsed: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum PollError<T, E> {
    /// The deadline passed. `last` is the final reading, never a default.
    #[error("Condition not met after {attempts} attempts in {elapsed:?}")]
    TimedOut {
        last: T,
        attempts: u32,
        elapsed: Duration,
    },
    /// The probe itself failed; surfaced on the spot.
    #[error("Probe failed: {0}")]
    Probe(E),
}

/// Probe repeatedly until `predicate` accepts a reading or `settings`'
/// timeout elapses.
///
/// The first probe runs immediately, so an already-true condition returns
/// without sleeping. The last sleep is clipped to the time remaining, which
/// puts a final probe at the deadline and bounds the whole call by
/// `timeout + interval` plus the duration of one probe.
pub async fn wait_for<T, E, F, Fut, P>(
    settings: &PollSettings,
    mut probe: F,
    mut predicate: P,
) -> Result<Polled<T>, PollError<T, E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&T) -> bool,
{
    let started = Instant::now();
    let deadline = started
        .checked_add(settings.timeout)
        .unwrap_or_else(|| started + FAR_FUTURE);
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let value = probe().await.map_err(PollError::Probe)?;

        if predicate(&value) {
            return Ok(Polled {
                value,
                attempts,
                elapsed: started.elapsed(),
            });
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(PollError::TimedOut {
                last: value,
                attempts,
                elapsed: now - started,
            });
        }

        tokio::time::sleep(settings.interval.min(deadline - now)).await;
    }
}
