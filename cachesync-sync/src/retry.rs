//! Retry with capped exponential backoff for remote calls.
//!
//! The executor knows nothing about the call it wraps. It asks the error
//! whether it is [`Retryable`]; retryable errors sleep `min(2^attempt s,
//! cap)` and try again until the attempt budget is spent, anything else is
//! returned immediately.

use std::time::Duration;

use thiserror::Error;

use cachesync_core::RetrySettings;

/// Classifies errors that are worth retrying (throttling, quota).
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Blocks the calling thread between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// The real thing: `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<F: Fn(Duration)> Sleeper for F {
    fn sleep(&self, duration: Duration) {
        self(duration)
    }
}

/// Attempt budget and backoff ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(RetrySettings::default())
    }
}

impl From<RetrySettings> for RetryPolicy {
    fn from(settings: RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            max_backoff: settings.max_backoff(),
        }
    }
}

impl RetryPolicy {
    /// Delay after the failed attempt numbered `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let secs = 2u64.saturating_pow(attempt);
        Duration::from_secs(secs).min(self.max_backoff)
    }
}

/// Outcome of a call that did not succeed.
#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// Every attempt was throttled.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: E,
    },

    /// A non-retryable error; returned on the attempt that produced it.
    #[error(transparent)]
    Failed(E),
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    /// The underlying error of the last attempt.
    pub fn last_error(&self) -> &E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Failed(err) => err,
        }
    }
}

/// Runs calls under a [`RetryPolicy`].
pub struct Executor<'a> {
    policy: RetryPolicy,
    sleeper: &'a dyn Sleeper,
}

impl<'a> Executor<'a> {
    pub fn new(policy: RetryPolicy, sleeper: &'a dyn Sleeper) -> Self {
        Self { policy, sleeper }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Invoke `call` until it succeeds, fails for good, or the budget runs out.
    ///
    /// No sleep follows the final attempt.
    pub fn run<T, E, F>(&self, label: &str, mut call: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
        E: Retryable + std::error::Error + 'static,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match call() {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(RetryError::Failed(err)),
                Err(err) => {
                    attempt += 1;
                    if attempt >= max_attempts {
                        tracing::error!("{label}: rate limited on all {attempt} attempts");
                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            last: err,
                        });
                    }
                    let delay = self.policy.backoff(attempt - 1);
                    tracing::warn!("{label}: rate limited ({err}), retrying in {delay:?}");
                    self.sleeper.sleep(delay);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::error::StoreError;

    fn throttled() -> StoreError {
        StoreError::Http {
            status: 429,
            message: "quota".to_string(),
        }
    }

    fn policy(max_attempts: u32, cap_secs: u64) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            max_backoff: Duration::from_secs(cap_secs),
        }
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let p = policy(15, 60);
        assert_eq!(p.backoff(0), Duration::from_secs(1));
        assert_eq!(p.backoff(1), Duration::from_secs(2));
        assert_eq!(p.backoff(5), Duration::from_secs(32));
        assert_eq!(p.backoff(6), Duration::from_secs(60));
        assert_eq!(p.backoff(63), Duration::from_secs(60));
        assert_eq!(p.backoff(200), Duration::from_secs(60));
    }

    #[test]
    fn success_returns_without_sleeping() {
        let sleeps = RefCell::new(Vec::new());
        let sleeper = |d: Duration| sleeps.borrow_mut().push(d);
        let exec = Executor::new(policy(5, 60), &sleeper);

        let value: Result<u32, RetryError<StoreError>> = exec.run("read", || Ok(7));
        assert_eq!(value.unwrap(), 7);
        assert!(sleeps.borrow().is_empty());
    }

    #[test]
    fn retries_throttled_calls_until_success() {
        let sleeps = RefCell::new(Vec::new());
        let sleeper = |d: Duration| sleeps.borrow_mut().push(d);
        let exec = Executor::new(policy(5, 60), &sleeper);

        let mut calls = 0;
        let result = exec.run("append", || {
            calls += 1;
            if calls < 3 {
                Err(throttled())
            } else {
                Ok(())
            }
        });
        assert!(result.is_ok());
        assert_eq!(calls, 3);
        assert_eq!(
            *sleeps.borrow(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[test]
    fn non_retryable_error_returns_immediately() {
        let sleeps = RefCell::new(Vec::new());
        let sleeper = |d: Duration| sleeps.borrow_mut().push(d);
        let exec = Executor::new(policy(5, 60), &sleeper);

        let mut calls = 0;
        let result: Result<(), _> = exec.run("update", || {
            calls += 1;
            Err(StoreError::Http {
                status: 400,
                message: "bad range".to_string(),
            })
        });
        let err = result.unwrap_err();
        assert!(!err.is_exhausted());
        assert_eq!(calls, 1);
        assert!(sleeps.borrow().is_empty());
    }

    #[test]
    fn exhaustion_respects_attempt_budget_and_cap() {
        let sleeps = RefCell::new(Vec::new());
        let sleeper = |d: Duration| sleeps.borrow_mut().push(d);
        let exec = Executor::new(policy(8, 10), &sleeper);

        let mut calls = 0;
        let result: Result<(), _> = exec.run("append", || {
            calls += 1;
            Err(throttled())
        });

        let err = result.unwrap_err();
        assert!(err.is_exhausted());
        assert!(err.to_string().contains("retries exhausted after 8 attempts"));
        assert!(matches!(err.last_error(), StoreError::Http { status: 429, .. }));
        assert_eq!(calls, 8);

        let sleeps = sleeps.borrow();
        assert_eq!(sleeps.len(), 7, "no sleep after the final attempt");
        assert!(sleeps.iter().all(|d| *d <= Duration::from_secs(10)));
    }

    #[test]
    fn zero_attempt_policy_still_calls_once() {
        let sleeper = |_: Duration| {};
        let exec = Executor::new(policy(0, 1), &sleeper);
        let mut calls = 0;
        let _: Result<(), _> = exec.run("append", || {
            calls += 1;
            Err(throttled())
        });
        assert_eq!(calls, 1);
    }
}
