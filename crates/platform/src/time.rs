//! Time source and bounded polling.

use core::time::Duration;
use std::time::Instant;

use embedded_hal::delay::DelayNs;

use crate::stop::StopFlag;

/// Monotonic time source.
///
/// Injected wherever behaviour depends on elapsed time (ghosting interval,
/// autosave, file-server auto-off) so tests can drive time explicitly.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// [`Clock`] backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// [`DelayNs`] backed by [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

/// Outcome of a [`BoundedWait`] that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WaitError<E> {
    /// The condition never held.
    #[error("condition did not hold within {waited:?}")]
    TimedOut {
        /// Total time spent sleeping between checks.
        waited: Duration,
    },
    /// A stop was requested while waiting.
    #[error("interrupted by a stop request after {waited:?}")]
    Interrupted {
        /// Time spent sleeping before the request was seen.
        waited: Duration,
    },
    /// The condition check itself failed.
    #[error("condition check failed")]
    Check(E),
}

/// Poll a condition every `poll_interval`, giving up after `timeout`.
///
/// The bound is a poll count (`ceil(timeout / poll_interval)`), so a
/// delay source that returns early cannot stretch or shrink the budget in
/// polls, and a stuck condition costs at most `timeout` of sleeping.
///
/// With a [`StopFlag`] attached the flag is checked on every poll and a
/// pending stop ends the wait early with [`WaitError::Interrupted`].
#[derive(Debug, Clone)]
pub struct BoundedWait {
    poll_interval: Duration,
    timeout: Duration,
    stop: Option<StopFlag>,
}

impl BoundedWait {
    /// New wait. A zero `poll_interval` is treated as 1 ms.
    pub const fn new(poll_interval: Duration, timeout: Duration) -> Self {
        let poll_interval = if poll_interval.is_zero() {
            Duration::from_millis(1)
        } else {
            poll_interval
        };
        Self {
            poll_interval,
            timeout,
            stop: None,
        }
    }

    /// Check `stop` on every poll.
    #[must_use]
    pub fn with_stop(mut self, stop: StopFlag) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Interval between checks.
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Overall bound.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of sleeps before giving up.
    pub fn max_polls(&self) -> u64 {
        let poll = self.poll_interval.as_nanos();
        let polls = self.timeout.as_nanos().div_ceil(poll);
        u64::try_from(polls).unwrap_or(u64::MAX)
    }

    /// Run the wait.
    ///
    /// `done` is checked before every sleep and once after the last one.
    /// Returns the time spent sleeping.
    pub fn run<D, E, F>(&self, delay: &mut D, mut done: F) -> Result<Duration, WaitError<E>>
    where
        D: DelayNs,
        F: FnMut() -> Result<bool, E>,
    {
        let max_polls = self.max_polls();
        let step_us = u32::try_from(self.poll_interval.as_micros()).unwrap_or(u32::MAX);
        let mut waited = Duration::ZERO;
        let mut polls = 0u64;
        loop {
            if done().map_err(WaitError::Check)? {
                return Ok(waited);
            }
            if self.stop.as_ref().is_some_and(StopFlag::take_interrupt) {
                return Err(WaitError::Interrupted { waited });
            }
            if polls >= max_polls {
                return Err(WaitError::TimedOut { waited });
            }
            delay.delay_us(step_us);
            waited = waited.saturating_add(self.poll_interval);
            polls = polls.saturating_add(1);
        }
    }

    /// Sleep out the whole bound. Returns `false` if a stop request cut
    /// the sleep short.
    pub fn sleep<D: DelayNs>(&self, delay: &mut D) -> bool {
        !matches!(
            self.run(delay, || Ok::<_, core::convert::Infallible>(false)),
            Err(WaitError::Interrupted { .. })
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    /// Delay that records the total requested time instead of sleeping.
    #[derive(Default)]
    struct RecordingDelay {
        total_ns: u64,
    }

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += u64::from(ns);
        }
    }

    #[test]
    fn max_polls_rounds_up() {
        let w = BoundedWait::new(Duration::from_millis(10), Duration::from_millis(25));
        assert_eq!(w.max_polls(), 3);
        let w = BoundedWait::new(Duration::from_millis(10), Duration::from_secs(30));
        assert_eq!(w.max_polls(), 3000);
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        let w = BoundedWait::new(Duration::ZERO, Duration::from_millis(5));
        assert_eq!(w.poll_interval(), Duration::from_millis(1));
        assert_eq!(w.max_polls(), 5);
    }

    #[test]
    fn returns_immediately_when_condition_holds() {
        let w = BoundedWait::new(Duration::from_millis(10), Duration::from_secs(1));
        let mut delay = RecordingDelay::default();
        let waited = w.run(&mut delay, || Ok::<_, Infallible>(true)).unwrap();
        assert_eq!(waited, Duration::ZERO);
        assert_eq!(delay.total_ns, 0);
    }

    #[test]
    fn succeeds_after_some_polls() {
        let w = BoundedWait::new(Duration::from_millis(10), Duration::from_secs(1));
        let mut delay = RecordingDelay::default();
        let mut remaining = 3;
        let waited = w
            .run(&mut delay, || {
                remaining -= 1;
                Ok::<_, Infallible>(remaining < 0)
            })
            .unwrap();
        assert_eq!(waited, Duration::from_millis(30));
    }

    #[test]
    fn stuck_condition_times_out_after_the_bound() {
        let w = BoundedWait::new(Duration::from_millis(10), Duration::from_millis(100));
        let mut delay = RecordingDelay::default();
        let err = w.run(&mut delay, || Ok::<_, Infallible>(false)).unwrap_err();
        assert_eq!(
            err,
            WaitError::TimedOut {
                waited: Duration::from_millis(100)
            }
        );
        assert_eq!(delay.total_ns, 100_000_000);
    }

    #[test]
    fn check_error_is_propagated() {
        let w = BoundedWait::new(Duration::from_millis(10), Duration::from_millis(100));
        let mut delay = RecordingDelay::default();
        let err = w.run(&mut delay, || Err::<bool, _>("gpio")).unwrap_err();
        assert_eq!(err, WaitError::Check("gpio"));
    }

    /// Delay that raises a stop request after a number of sleeps.
    struct StoppingDelay {
        stop: StopFlag,
        after: u32,
        sleeps: u32,
    }

    impl DelayNs for StoppingDelay {
        fn delay_ns(&mut self, _ns: u32) {
            self.sleeps += 1;
            if self.sleeps == self.after {
                self.stop.set();
            }
        }
    }

    #[test]
    fn stop_request_ends_the_wait_early() {
        let stop = StopFlag::new();
        let w = BoundedWait::new(Duration::from_millis(10), Duration::from_secs(30)).with_stop(stop.clone());
        let mut delay = StoppingDelay {
            stop: stop.clone(),
            after: 3,
            sleeps: 0,
        };
        let err = w.run(&mut delay, || Ok::<_, Infallible>(false)).unwrap_err();
        assert_eq!(
            err,
            WaitError::Interrupted {
                waited: Duration::from_millis(30)
            }
        );
        assert_eq!(delay.sleeps, 3);
        assert!(stop.is_set());
    }

    #[test]
    fn only_the_first_wait_is_interrupted() {
        let stop = StopFlag::new();
        stop.set();
        let w = BoundedWait::new(Duration::from_millis(10), Duration::from_millis(50)).with_stop(stop);
        let mut delay = RecordingDelay::default();
        assert!(!w.sleep(&mut delay));
        assert_eq!(delay.total_ns, 0);
        assert!(w.sleep(&mut delay));
        assert_eq!(delay.total_ns, 50_000_000);
    }

    #[test]
    fn wait_without_flag_ignores_stop_requests() {
        let stop = StopFlag::new();
        let w = BoundedWait::new(Duration::from_millis(10), Duration::from_millis(30));
        let mut delay = StoppingDelay {
            stop: stop.clone(),
            after: 1,
            sleeps: 0,
        };
        let err = w.run(&mut delay, || Ok::<_, Infallible>(false)).unwrap_err();
        assert!(matches!(err, WaitError::TimedOut { .. }));
        assert!(stop.take_interrupt());
    }
}
