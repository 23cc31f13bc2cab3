//! Cancellable delayed callbacks.
//!
//! An [Alarm] runs a callback on the current thread's executor once a delay
//! has elapsed, unless it is cancelled first. Cancellation may happen from any
//! thread; the backing task is woken straight away so its [Timer] is dropped
//! and the executor is not kept alive by a deadline nobody cares about.
//!
//! # Example
//!
//! ```
//! use settle::futures::alarm::Alarm;
//! use settle::task::Executor;
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! let rang = Rc::new(Cell::new(false));
//! let r = rang.clone();
//! let alarm = Alarm::schedule(Duration::from_secs(60), move || r.set(true));
//!
//! alarm.cancel();
//! Executor::run();
//!
//! assert!(!rang.get());
//! ```
use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    task::{Context, Poll, Waker},
    time::Duration,
};

use crate::{lock, task::Executor};

use super::timer::Timer;

struct AlarmState {
    cancelled: AtomicBool,
    waker: Mutex<Option<Waker>>,
}

/// Handle to a scheduled callback.
///
/// Dropping the handle does *not* cancel the alarm.
pub struct Alarm {
    state: Arc<AlarmState>,
}

impl Alarm {
    /// Run `on_fire` after `delay`, unless [Alarm::cancel] is called first.
    pub fn schedule<F>(delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        let state = Arc::new(AlarmState {
            cancelled: AtomicBool::new(false),
            waker: Mutex::new(None),
        });

        let expiry = Expiry {
            timer: Timer::sleep(delay),
            state: state.clone(),
        };

        Executor::spawn(async move {
            if expiry.await {
                on_fire();
            }
        });

        Self { state }
    }

    /// Prevent the callback from running. Has no effect once the callback has
    /// started.
    pub fn cancel(&self) {
        if self.state.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(waker) = lock(&self.state.waker).take() {
            waker.wake();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }
}

/// Resolves to `true` when the timer expired, `false` when cancelled.
struct Expiry {
    timer: Timer,
    state: Arc<AlarmState>,
}

impl Future for Expiry {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.state.cancelled.load(Ordering::Acquire) {
            return Poll::Ready(false);
        }

        *lock(&self.state.waker) = Some(cx.waker().clone());

        // `cancel` may have run before the waker was stored.
        if self.state.cancelled.load(Ordering::Acquire) {
            return Poll::Ready(false);
        }

        Pin::new(&mut self.timer).poll(cx).map(|()| true)
    }
}
