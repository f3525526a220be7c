//! Property-based tests for refresh and wait timing.
//! Verifies invariants hold for ALL valid inputs, not just fixed examples.

#![allow(clippy::unwrap_used)]

use core::convert::Infallible;
use core::time::Duration;
use std::time::Instant;

use embedded_hal::delay::DelayNs;
use platform::{BoundedWait, RefreshPolicy, WaitError};

/// Sums requested delays instead of sleeping.
#[derive(Default)]
struct CountingDelay {
    total_ns: u128,
    calls: u64,
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u128::from(ns);
        self.calls += 1;
    }
}

proptest::proptest! {
    /// A full refresh is due exactly when the interval has elapsed.
    #[test]
    fn full_refresh_due_iff_interval_elapsed(interval_s in 1u64..=3600, elapsed_s in 0u64..=7200) {
        let t0 = Instant::now();
        let mut policy = RefreshPolicy::new(Duration::from_secs(interval_s));
        policy.record_full(t0);
        let due = policy.full_refresh_due(t0 + Duration::from_secs(elapsed_s));
        assert_eq!(due, elapsed_s >= interval_s);
    }

    /// Partial counting never decreases until a full refresh resets it.
    #[test]
    fn partial_count_tracks_records(n in 0u32..500) {
        let mut policy = RefreshPolicy::default();
        for _ in 0..n {
            policy.record_partial();
        }
        assert_eq!(policy.partial_count(), n);
        policy.record_full(Instant::now());
        assert_eq!(policy.partial_count(), 0);
    }

    /// A stuck condition sleeps for at least the timeout and at most one
    /// extra poll interval.
    #[test]
    fn stuck_wait_is_bounded(poll_ms in 1u64..=50, timeout_ms in 0u64..=2000) {
        let poll = Duration::from_millis(poll_ms);
        let timeout = Duration::from_millis(timeout_ms);
        let wait = BoundedWait::new(poll, timeout);
        let mut delay = CountingDelay::default();
        let err = wait.run(&mut delay, || Ok::<_, Infallible>(false)).unwrap_err();
        let WaitError::TimedOut { waited } = err else {
            unreachable!("condition never fails");
        };
        assert!(waited >= timeout);
        assert!(waited < timeout + poll);
        assert_eq!(delay.calls, wait.max_polls());
        assert_eq!(delay.total_ns, waited.as_nanos());
    }

    /// The condition is checked once more than the number of sleeps.
    #[test]
    fn condition_checked_after_last_sleep(ready_after in 0u64..100) {
        let wait = BoundedWait::new(Duration::from_millis(10), Duration::from_secs(1));
        let mut delay = CountingDelay::default();
        let mut checks = 0u64;
        wait.run(&mut delay, || {
            checks += 1;
            Ok::<_, Infallible>(checks > ready_after)
        })
        .unwrap();
        assert_eq!(checks, delay.calls + 1);
        assert_eq!(delay.calls, ready_after);
    }
}
