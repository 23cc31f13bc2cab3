//! Async timer related futures.
//!
//! Timers are kept in a per-thread queue owned by the reactor. When the
//! executor runs out of work it parks until the nearest deadline. The main
//! use-case for this is to put a task to sleep for a specific period of time.
//!
//! # Example
//! Let's put a task to sleep for 200 milliseconds.
//! ```
//! use settle::futures::timer::Timer;
//! use settle::task::Executor;
//! use std::time::{Duration, Instant};
//!# Executor::block_on(
//! async {
//!     let now = Instant::now();
//!
//!     Timer::sleep(Duration::from_millis(200)).await;
//!
//!     assert!(now.elapsed() >= Duration::from_millis(200));
//! }
//!# );
//! ```

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::{Duration, Instant},
};

use crate::reactor::{Reactor, TimerKey};

/// Asynchronous timer.
///
/// This structure is a future that will expire at some point in the future. It
/// can be obtained via the [Timer::sleep] function. Dropping a pending timer
/// removes it from the reactor.
pub struct Timer {
    // `None` when the deadline is not representable; such a timer never fires.
    expiration: Option<Instant>,
    key: Option<TimerKey>,
}

impl Timer {
    #[must_use]
    /// Put the current task to sleep for the specified duration.
    ///
    /// This function returns a future, that when `.await`ed will suspend the
    /// execution of the current task until the specified duration has elapsed.
    /// At that point the runtime will queue the task for execution. Note that
    /// it is guaranteed that the task will be suspended for *at least* the
    /// specified duration; it could sleep for longer. A zero duration completes
    /// on the first poll.
    pub fn sleep(d: Duration) -> Self {
        Self {
            expiration: Instant::now().checked_add(d),
            key: None,
        }
    }

    #[must_use]
    /// Put the current task to sleep until `deadline`.
    pub fn sleep_until(deadline: Instant) -> Self {
        Self {
            expiration: Some(deadline),
            key: None,
        }
    }

    fn deregister(&mut self) {
        if let Some(key) = self.key.take() {
            Reactor::cancel_timer(key);
        }
    }
}

impl Future for Timer {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Some(expiration) = self.expiration else {
            return Poll::Pending;
        };

        if Instant::now() >= expiration {
            self.deregister();
            return Poll::Ready(());
        }

        match self.key {
            Some(key) => Reactor::update_timer(key, cx.waker()),
            None => self.key = Some(Reactor::register_timer(expiration, cx.waker())),
        }

        Poll::Pending
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.deregister();
    }
}
