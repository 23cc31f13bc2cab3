use std::{error::Error, fmt, time::Duration};

use crate::futures::{guard::SettlementGuard, promise::Promise};

/// The default reason used by [reject_on_timeout].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimedOut;

impl fmt::Display for TimedOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("task timed out")
    }
}

impl Error for TimedOut {}

/// Race `promise` against a timer.
///
/// If `promise` settles first, the returned promise mirrors its outcome. If
/// `timeout` elapses first, `on_timeout` is handed the guard of the returned
/// promise and decides how it settles. Whichever side comes second is
/// ignored, and the timer is cancelled as soon as the returned promise
/// settles.
///
/// A zero `timeout` is allowed. An input that has already settled still wins
/// over it, since its continuation is queued ahead of the timer.
pub fn race_against_timeout<T, E, A>(
    promise: Promise<T, E>,
    timeout: Duration,
    on_timeout: A,
) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
    A: FnOnce(&SettlementGuard<T, E>) + 'static,
{
    let (raced, sink) = Promise::pending();
    let guard = SettlementGuard::new(sink);

    {
        let guard = guard.clone();
        promise.on_settle(move |outcome| {
            guard.settle(outcome);
        });
    }

    guard.arm_timer(timeout, on_timeout);

    raced
}

/// Fail with [TimedOut] if `promise` has not settled within `timeout`.
///
/// # Example
///
/// ```
/// use settle::combinators::{reject_on_timeout, TimedOut};
/// use settle::futures::promise::Promise;
/// use settle::task::Executor;
/// use std::time::Duration;
///
/// let (never, _completer) = Promise::<u32, TimedOut>::pending();
/// let raced = reject_on_timeout(never, Duration::from_millis(10));
///
/// assert_eq!(Executor::block_on(raced), Err(TimedOut));
/// ```
pub fn reject_on_timeout<T, E>(promise: Promise<T, E>, timeout: Duration) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + From<TimedOut> + 'static,
{
    reject_on_timeout_with(promise, timeout, || TimedOut.into())
}

/// Fail with `reason()` if `promise` has not settled within `timeout`.
///
/// `reason` is called at most once, and only if the timer wins.
pub fn reject_on_timeout_with<T, E, R>(
    promise: Promise<T, E>,
    timeout: Duration,
    reason: R,
) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
    R: FnOnce() -> E + 'static,
{
    race_against_timeout(promise, timeout, move |guard| {
        guard.settle_failure(reason());
    })
}

/// Succeed with `fallback` if `promise` has not settled within `timeout`.
///
/// # Example
///
/// ```
/// use settle::combinators::resolve_on_timeout;
/// use settle::futures::promise::Promise;
/// use settle::task::Executor;
/// use std::time::Duration;
///
/// let (never, _completer) = Promise::<&str, ()>::pending();
/// let raced = resolve_on_timeout(never, "fallback", Duration::from_millis(10));
///
/// assert_eq!(Executor::block_on(raced), Ok("fallback"));
/// ```
pub fn resolve_on_timeout<T, E>(
    promise: Promise<T, E>,
    fallback: T,
    timeout: Duration,
) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    race_against_timeout(promise, timeout, move |guard| {
        guard.settle_success(fallback);
    })
}

#[cfg(test)]
mod tests {
    use std::{
        cell::Cell,
        rc::Rc,
        sync::mpsc,
        thread,
        time::{Duration, Instant},
    };

    use crate::{
        combinators::testing::{err_after, never, ok_after},
        futures::promise::Promise,
        task::Executor,
    };

    use super::{
        race_against_timeout, reject_on_timeout, reject_on_timeout_with, resolve_on_timeout,
        TimedOut,
    };

    #[derive(Debug, Clone, PartialEq)]
    enum Reason {
        Source(&'static str),
        Timeout,
    }

    impl From<TimedOut> for Reason {
        fn from(_: TimedOut) -> Self {
            Reason::Timeout
        }
    }

    #[test]
    fn reject_resolved_before_timeout() {
        let raced = reject_on_timeout(
            ok_after::<_, Reason>(50, "promise"),
            Duration::from_millis(150),
        );
        assert_eq!(Executor::block_on(raced), Ok("promise"));
    }

    #[test]
    fn reject_rejected_before_timeout() {
        let raced = reject_on_timeout(
            err_after::<(), _>(50, Reason::Source("promise")),
            Duration::from_millis(150),
        );
        assert_eq!(Executor::block_on(raced), Err(Reason::Source("promise")));
    }

    #[test]
    fn reject_resolved_after_timeout() {
        let raced = reject_on_timeout(
            ok_after::<_, Reason>(150, "promise"),
            Duration::from_millis(50),
        );
        assert_eq!(Executor::block_on(raced), Err(Reason::Timeout));
    }

    #[test]
    fn reject_rejected_after_timeout() {
        let raced = reject_on_timeout(
            err_after::<(), _>(150, Reason::Source("promise")),
            Duration::from_millis(50),
        );
        assert_eq!(Executor::block_on(raced), Err(Reason::Timeout));
    }

    #[test]
    fn default_reason_after_timeout() {
        let before = Instant::now();
        let raced = reject_on_timeout(never::<(), TimedOut>(), Duration::from_millis(10));

        let outcome = Executor::block_on(raced);

        assert_eq!(outcome, Err(TimedOut));
        assert_eq!(TimedOut.to_string(), "task timed out");
        assert!(before.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn custom_reason_called_once_only_on_timeout() {
        let calls = Rc::new(Cell::new(0));

        let c = calls.clone();
        let raced = reject_on_timeout_with(
            Promise::<(), _>::rejected("source"),
            Duration::from_millis(10),
            move || {
                c.set(c.get() + 1);
                "too slow"
            },
        );
        assert_eq!(Executor::block_on(raced), Err("source"));

        // Let the cancelled timer task finish too.
        Executor::run();
        assert_eq!(calls.get(), 0);

        let c = calls.clone();
        let raced = reject_on_timeout_with(never::<(), _>(), Duration::from_millis(10), move || {
            c.set(c.get() + 1);
            "too slow"
        });
        assert_eq!(Executor::block_on(raced), Err("too slow"));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn resolve_resolved_before_timeout() {
        let raced = resolve_on_timeout(
            ok_after::<_, ()>(50, "promise"),
            "timed out",
            Duration::from_millis(150),
        );
        assert_eq!(Executor::block_on(raced), Ok("promise"));
    }

    #[test]
    fn resolve_rejected_before_timeout() {
        let raced = resolve_on_timeout(
            err_after(50, "promise"),
            "timed out",
            Duration::from_millis(150),
        );
        assert_eq!(Executor::block_on(raced), Err("promise"));
    }

    #[test]
    fn resolve_resolved_after_timeout() {
        let raced = resolve_on_timeout(
            ok_after::<_, ()>(150, "promise"),
            "timed out",
            Duration::from_millis(50),
        );
        assert_eq!(Executor::block_on(raced), Ok("timed out"));
    }

    #[test]
    fn resolve_rejected_after_timeout() {
        let raced = resolve_on_timeout(
            err_after(150, "promise"),
            "timed out",
            Duration::from_millis(50),
        );
        assert_eq!(Executor::block_on(raced), Ok("timed out"));
    }

    #[test]
    fn resolve_never_settling() {
        let before = Instant::now();
        let raced = resolve_on_timeout(never::<_, ()>(), "fallback", Duration::from_millis(10));

        assert_eq!(Executor::block_on(raced), Ok("fallback"));
        assert!(before.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn settled_input_beats_zero_timeout() {
        let raced = reject_on_timeout(Promise::<_, Reason>::resolved(1), Duration::ZERO);
        assert_eq!(Executor::block_on(raced), Ok(1));
    }

    #[test]
    fn zero_timeout_on_pending_input() {
        let raced = reject_on_timeout(never::<u8, Reason>(), Duration::ZERO);
        assert_eq!(Executor::block_on(raced), Err(Reason::Timeout));
    }

    #[test]
    fn same_instant_yields_one_legal_outcome() {
        let raced = reject_on_timeout(ok_after::<_, Reason>(20, 7), Duration::from_millis(20));
        let outcome = Executor::block_on(raced);

        assert!(outcome == Ok(7) || outcome == Err(Reason::Timeout), "{outcome:?}");
    }

    #[test]
    fn early_settlement_releases_timer() {
        let before = Instant::now();

        let raced = reject_on_timeout(ok_after::<_, Reason>(10, ()), Duration::from_secs(30));
        assert_eq!(Executor::block_on(raced), Ok(()));

        // Nothing left to wait for once the timer is cancelled.
        Executor::run();
        assert!(before.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn custom_timeout_action() {
        let raced = race_against_timeout(never::<u32, &str>(), Duration::from_millis(10), |guard| {
            assert!(!guard.is_settled());
            guard.settle_success(99);
            assert!(!guard.settle_failure("late"));
        });

        assert_eq!(Executor::block_on(raced), Ok(99));
    }

    #[test]
    fn run_returns_once_raced_promise_settles() {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let (dropped, _) = Promise::<u32, TimedOut>::pending();
            let (held, _completer) = Promise::<u32, TimedOut>::pending();

            let a = reject_on_timeout(dropped, Duration::from_millis(10));
            let b = reject_on_timeout(held, Duration::from_millis(10));

            let outcomes = (Executor::block_on(a), Executor::block_on(b));
            Executor::run();

            let _ = tx.send(outcomes);
        });

        let outcomes = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("executor kept running after every raced promise settled");

        assert_eq!(outcomes, (Err(TimedOut), Err(TimedOut)));
    }
}
