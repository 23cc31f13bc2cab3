pub(crate) use notify::Notifier;
pub(crate) use timers::TimerKey;

use log::debug;
use std::{
    cell::RefCell,
    task::Waker,
    time::{Duration, Instant},
};
use timers::TimerQueue;

mod notify;
mod timers;

pub(crate) struct Reactor {}

thread_local! {
    static TIMERS: RefCell<TimerQueue> = const { RefCell::new(TimerQueue::new()) };
}

impl Reactor {
    pub fn register_timer(deadline: Instant, waker: &Waker) -> TimerKey {
        TIMERS.with(|t| t.borrow_mut().insert(deadline, waker.clone()))
    }

    pub fn update_timer(key: TimerKey, waker: &Waker) {
        TIMERS.with(|t| t.borrow_mut().update_waker(key, waker))
    }

    pub fn cancel_timer(key: TimerKey) {
        // Timers can be dropped while thread-locals are being torn down.
        let _ = TIMERS.try_with(|t| t.borrow_mut().remove(key));
    }

    /// Park the thread until a timer expires or `notifier` is signalled, then
    /// wake every expired timer.
    pub fn react(notifier: &Notifier) {
        let next = TIMERS.with(|t| t.borrow().next_deadline());
        let timeout = next.map(|d| d.saturating_duration_since(Instant::now()));

        if timeout != Some(Duration::ZERO) {
            debug!("parking executor, timeout: {timeout:?}");
            notifier.wait(timeout);
        }

        let fired = TIMERS.with(|t| t.borrow_mut().expire(Instant::now()));

        for waker in fired {
            waker.wake();
        }
    }
}
