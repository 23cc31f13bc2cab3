//! At-most-once settlement.
//!
//! A [SettlementGuard] sits between a [Completer] and every asynchronous
//! source that may try to settle it: an input promise finishing, a timer
//! firing, a second input finishing. Only the first attempt reaches the
//! completer; the rest are dropped. The guard also owns an optional timer and
//! cancels it as soon as the guard settles, whichever source settled it.
//!
//! # Example
//!
//! ```
//! use settle::futures::guard::SettlementGuard;
//! use settle::futures::promise::Promise;
//! use settle::task::Executor;
//! use std::time::Duration;
//!
//! let (promise, completer) = Promise::<&str, &str>::pending();
//! let guard = SettlementGuard::new(completer);
//!
//! guard.arm_timer(Duration::from_millis(10), |g| {
//!     g.settle_failure("too slow");
//! });
//!
//! assert!(guard.settle_success("first"));
//! assert!(!guard.settle_failure("second"));
//!
//! assert_eq!(Executor::block_on(promise), Ok("first"));
//! ```
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use log::trace;

use crate::lock;

use super::{
    alarm::Alarm,
    promise::{Completer, Outcome},
};

/// Race-safe, at-most-once settlement of a [Completer].
///
/// See the [module-level documentation](self) for more information.
pub struct SettlementGuard<T, E> {
    settled: AtomicBool,
    sink: Mutex<Option<Completer<T, E>>>,
    timer: Mutex<Option<Alarm>>,
}

impl<T, E> SettlementGuard<T, E> {
    /// Bind a new guard to `sink`.
    pub fn new(sink: Completer<T, E>) -> Arc<Self> {
        Arc::new(Self {
            settled: AtomicBool::new(false),
            sink: Mutex::new(Some(sink)),
            timer: Mutex::new(None),
        })
    }

    /// Settle with `outcome` unless already settled. Returns `true` if this
    /// call won.
    ///
    /// Any pending timer is cancelled either way.
    pub fn settle(&self, outcome: Outcome<T, E>) -> bool {
        let won = self
            .settled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if won {
            let sink = lock(&self.sink).take();
            if let Some(sink) = sink {
                sink.settle(outcome);
            }
        } else {
            trace!("guard already settled, dropping late attempt");
        }

        self.cancel_timer();

        won
    }

    pub fn settle_success(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    pub fn settle_failure(&self, reason: E) -> bool {
        self.settle(Err(reason))
    }

    pub fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }

    /// Run `on_fire` with this guard after `duration`, unless the guard
    /// settles first. Does nothing on a settled guard. Arming again replaces
    /// the previous timer.
    pub fn arm_timer<F>(self: &Arc<Self>, duration: Duration, on_fire: F)
    where
        F: FnOnce(&Self) + 'static,
        T: 'static,
        E: 'static,
    {
        if self.is_settled() {
            return;
        }

        let guard = self.clone();
        let alarm = Alarm::schedule(duration, move || on_fire(&*guard));

        trace!("armed settlement timer for {duration:?}");

        if let Some(previous) = lock(&self.timer).replace(alarm) {
            previous.cancel();
        }

        // Settled while the alarm was being scheduled.
        if self.is_settled() {
            self.cancel_timer();
        }
    }

    fn cancel_timer(&self) {
        if let Some(alarm) = lock(&self.timer).take() {
            trace!("cancelling settlement timer");
            alarm.cancel();
        }
    }
}
