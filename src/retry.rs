//! Bounded fixed-delay retry
//!
//! Balance queries and broadcasts share one policy value and one combinator.
//! The delay between attempts is constant; there is no exponential growth.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::future::retry_notify;
use tracing::warn;

/// How many times to try an operation and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always >= 1.
    pub max_attempts: u32,
    /// Fixed wait between consecutive attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Policy with no wait between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// A successful result plus the attempt it succeeded on
#[derive(Debug, Clone, PartialEq)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

/// The last error once every attempt has failed
#[derive(Debug)]
pub struct RetriesExhausted<E> {
    pub last_error: E,
    pub attempts: u32,
}

/// `backoff` schedule that hands out `max_attempts - 1` identical delays
struct FixedAttempts {
    delay: Duration,
    max_attempts: u32,
    failures: u32,
}

impl Backoff for FixedAttempts {
    fn reset(&mut self) {
        self.failures = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.failures += 1;
        (self.failures < self.max_attempts).then_some(self.delay)
    }
}

/// Run `operation` until it succeeds or the policy's attempts are used up.
///
/// Every error is treated as transient. `what` only labels the retry log lines.
pub async fn retry_fixed<T, E, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut operation: F,
) -> Result<Attempted<T>, RetriesExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = AtomicU32::new(0);
    let schedule = FixedAttempts {
        delay: policy.delay,
        max_attempts: policy.max_attempts,
        failures: 0,
    };

    let result = retry_notify(
        schedule,
        || {
            attempts.fetch_add(1, Ordering::SeqCst);
            let fut = operation();
            async move { fut.await.map_err(backoff::Error::transient) }
        },
        |err: E, wait: Duration| {
            warn!(
                "{} attempt {}/{} failed: {} (retrying in {}ms)",
                what,
                attempts.load(Ordering::SeqCst),
                policy.max_attempts,
                err,
                wait.as_millis()
            );
        },
    )
    .await;

    let attempts = attempts.load(Ordering::SeqCst);
    match result {
        Ok(value) => Ok(Attempted { value, attempts }),
        Err(last_error) => Err(RetriesExhausted {
            last_error,
            attempts,
        }),
    }
}
