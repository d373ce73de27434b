//! Bounded retry-until-success polling.
//!
//! [`PollPolicy::run`] calls a probe until it succeeds, it reports a permanent
//! failure, or the elapsed time reaches the timeout. Time is read from a
//! [`Clock`] so the loop can be driven deterministically in tests.

use std::fmt::Display;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error};

/// Monotonic time source and sleep primitive used by the poll loop.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Wall-clock implementation backed by `Instant` and `thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only moves when slept on.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: std::cell::Cell<Duration>,
    sleeps: std::cell::Cell<u32>,
}

#[cfg(any(test, feature = "test-util"))]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: std::cell::Cell::new(Duration::ZERO),
            sleeps: std::cell::Cell::new(0),
        }
    }

    /// Total time slept so far.
    pub fn elapsed(&self) -> Duration {
        self.offset.get()
    }

    /// Number of `sleep` calls so far.
    pub fn sleeps(&self) -> u32 {
        self.sleeps.get()
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset.get()
    }

    fn sleep(&self, duration: Duration) {
        self.offset.set(self.offset.get() + duration);
        self.sleeps.set(self.sleeps.get() + 1);
    }
}

/// What the loop raises once the timeout is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhaustion {
    /// Log the last probe error and raise [`PollError::TimedOut`].
    SynthesizeTimeout,
    /// Raise the last probe error unchanged as [`PollError::Exhausted`].
    PropagateLast,
}

/// A failed probe attempt.
#[derive(Debug)]
pub enum ProbeError<E> {
    /// Not ready yet; try again after the interval.
    Transient(E),
    /// Stop polling immediately.
    Permanent(E),
}

#[derive(Debug, Error)]
pub enum PollError<E> {
    #[error("timed out after {waited:?} ({attempts} attempts)")]
    TimedOut { waited: Duration, attempts: u32 },
    #[error("{0}")]
    Exhausted(E),
    #[error("{0}")]
    Aborted(E),
}

#[derive(Debug, Error)]
#[error("poll interval must be greater than zero")]
pub struct InvalidPollPolicy;

/// Timing and exhaustion strategy for one poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    timeout: Duration,
    interval: Duration,
    exhaustion: Exhaustion,
}

impl PollPolicy {
    pub fn new(
        timeout: Duration,
        interval: Duration,
        exhaustion: Exhaustion,
    ) -> Result<Self, InvalidPollPolicy> {
        if interval.is_zero() {
            return Err(InvalidPollPolicy);
        }
        Ok(Self {
            timeout,
            interval,
            exhaustion,
        })
    }

    /// Compile-time variant of [`PollPolicy::new`] for fixed policies.
    pub const fn fixed(timeout: Duration, interval: Duration, exhaustion: Exhaustion) -> Self {
        assert!(!interval.is_zero(), "poll interval must be greater than zero");
        Self {
            timeout,
            interval,
            exhaustion,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn exhaustion(&self) -> Exhaustion {
        self.exhaustion
    }

    /// Runs `probe` until it succeeds or the policy gives up.
    ///
    /// The deadline is only checked after a transient failure, so the probe
    /// is always attempted at least once and may run one attempt past a
    /// timeout that is not a multiple of the interval.
    pub fn run<C, T, E, F>(&self, clock: &C, mut probe: F) -> Result<T, PollError<E>>
    where
        C: Clock + ?Sized,
        E: Display,
        F: FnMut() -> Result<T, ProbeError<E>>,
    {
        let started = clock.now();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            let last = match probe() {
                Ok(value) => {
                    debug!(attempts, "poll succeeded");
                    return Ok(value);
                }
                Err(ProbeError::Permanent(err)) => {
                    debug!(attempts, "poll aborted: {err}");
                    return Err(PollError::Aborted(err));
                }
                Err(ProbeError::Transient(err)) => err,
            };

            let waited = clock.now().saturating_duration_since(started);
            if waited >= self.timeout {
                return match self.exhaustion {
                    Exhaustion::SynthesizeTimeout => {
                        error!(attempts, "{last}");
                        Err(PollError::TimedOut { waited, attempts })
                    }
                    Exhaustion::PropagateLast => Err(PollError::Exhausted(last)),
                };
            }

            debug!(attempts, ?waited, "not ready yet: {last}");
            clock.sleep(self.interval);
        }
    }
}
