//! Settle-once result slots.
//!
//! A [Promise] is a handle onto a computation that eventually settles into
//! `Ok(value)` or `Err(reason)`, exactly once. After that its outcome never
//! changes: every clone of the promise, and every later `.await` on it,
//! observes the same value or reason. The settling side is a [Completer],
//! which is consumed by the act of settling.
//!
//! # Example
//!
//! ```
//! use settle::futures::promise::Promise;
//! use settle::task::Executor;
//!
//! let (promise, completer) = Promise::<&str, String>::pending();
//! let observer = promise.clone();
//!
//! assert!(!promise.is_settled());
//! completer.resolve("done");
//!
//! assert_eq!(Executor::block_on(promise), Ok("done"));
//! assert_eq!(Executor::block_on(observer), Ok("done"));
//! ```
use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
    task::{Context, Poll, Waker},
};

use log::debug;

use crate::{lock, task::Executor};

/// The terminal state of a [Promise].
pub type Outcome<T, E> = Result<T, E>;

struct State<T, E> {
    outcome: Option<Outcome<T, E>>,
    waiters: Vec<Waker>,
    // The completer was dropped without settling.
    abandoned: bool,
}

impl<T, E> State<T, E> {
    fn new(outcome: Option<Outcome<T, E>>) -> Self {
        Self {
            outcome,
            waiters: Vec::new(),
            abandoned: false,
        }
    }

    fn register(&mut self, waker: &Waker) {
        if !self.waiters.iter().any(|w| w.will_wake(waker)) {
            self.waiters.push(waker.clone());
        }
    }
}

/// A shared handle to a settle-once computation.
///
/// See the [module-level documentation](self) for more information.
pub struct Promise<T, E> {
    state: Arc<Mutex<State<T, E>>>,
}

/// The one-shot sink that settles a [Promise].
///
/// Dropping a completer without settling leaves its promise pending forever.
pub struct Completer<T, E> {
    state: Option<Arc<Mutex<State<T, E>>>>,
}

impl<T, E> Promise<T, E> {
    /// Create an unsettled promise together with the completer that settles
    /// it.
    pub fn pending() -> (Self, Completer<T, E>) {
        let state = Arc::new(Mutex::new(State::new(None)));

        (
            Self {
                state: state.clone(),
            },
            Completer { state: Some(state) },
        )
    }

    /// A promise that has already settled with `outcome`.
    pub fn settled(outcome: Outcome<T, E>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::new(Some(outcome)))),
        }
    }

    /// A promise that has already succeeded with `value`.
    pub fn resolved(value: T) -> Self {
        Self::settled(Ok(value))
    }

    /// A promise that has already failed with `reason`.
    pub fn rejected(reason: E) -> Self {
        Self::settled(Err(reason))
    }

    /// Spawn `fut` on the current thread's executor and settle the returned
    /// promise with its output.
    pub fn spawn<Fut>(fut: Fut) -> Self
    where
        Fut: Future<Output = Outcome<T, E>> + 'static,
        T: 'static,
        E: 'static,
    {
        let (promise, completer) = Self::pending();

        Executor::spawn(async move {
            completer.settle(fut.await);
        });

        promise
    }

    pub fn is_settled(&self) -> bool {
        lock(&self.state).outcome.is_some()
    }
}

impl<T: Clone, E: Clone> Promise<T, E> {
    /// The outcome, if the promise has settled.
    pub fn outcome(&self) -> Option<Outcome<T, E>> {
        lock(&self.state).outcome.clone()
    }

    /// Run `f` with the outcome once this promise settles.
    ///
    /// The continuation is queued on the current thread's executor; it never
    /// runs synchronously inside `on_settle`, even for a settled promise.
    /// Continuations attached on the same thread start in attachment order.
    ///
    /// A continuation waiting on an unsettled promise does not keep
    /// [Executor::run] going, and is dropped without running if the
    /// promise's [Completer] goes away unsettled.
    pub fn on_settle<F>(self, f: F)
    where
        F: FnOnce(Outcome<T, E>) + 'static,
        T: 'static,
        E: 'static,
    {
        Executor::spawn_background(async move {
            if let Some(outcome) = Settlement(self).await {
                f(outcome);
            }
        });
    }
}

/// Resolves to `None` once the promise can no longer settle.
struct Settlement<T, E>(Promise<T, E>);

impl<T: Clone, E: Clone> Future for Settlement<T, E> {
    type Output = Option<Outcome<T, E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = lock(&self.0.state);

        if let Some(outcome) = &state.outcome {
            return Poll::Ready(Some(outcome.clone()));
        }

        if state.abandoned {
            return Poll::Ready(None);
        }

        state.register(cx.waker());
        Poll::Pending
    }
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("settled", &self.is_settled())
            .finish()
    }
}

impl<T: Clone, E: Clone> Future for Promise<T, E> {
    type Output = Outcome<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = lock(&self.state);

        if let Some(outcome) = &state.outcome {
            return Poll::Ready(outcome.clone());
        }

        state.register(cx.waker());
        Poll::Pending
    }
}

impl<T, E> Completer<T, E> {
    /// Settle the promise with `outcome` and wake everything awaiting it.
    pub fn settle(mut self, outcome: Outcome<T, E>) {
        let Some(state) = self.state.take() else {
            return;
        };

        let waiters = {
            let mut state = lock(&state);
            state.outcome = Some(outcome);
            std::mem::take(&mut state.waiters)
        };

        for waker in waiters {
            waker.wake();
        }
    }

    pub fn resolve(self, value: T) {
        self.settle(Ok(value))
    }

    pub fn reject(self, reason: E) {
        self.settle(Err(reason))
    }
}

impl<T, E> Drop for Completer<T, E> {
    fn drop(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };

        debug!("completer dropped without settling, promise will never settle");

        let waiters = {
            let mut state = lock(&state);
            state.abandoned = true;
            std::mem::take(&mut state.waiters)
        };

        // Plain awaiters re-register and stay pending; continuations give up.
        for waker in waiters {
            waker.wake();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::{Cell, RefCell},
        rc::Rc,
        time::{Duration, Instant},
    };

    use crate::{futures::timer::Timer, task::Executor};

    use super::Promise;

    #[test]
    fn repeated_observation_is_identical() {
        let p = Promise::<u32, String>::rejected("boom".to_string());

        let (a, b, c) = Executor::block_on(async move {
            let a = p.clone().await;
            let b = p.clone().await;
            (a, b, p.outcome())
        });

        assert_eq!(a, Err("boom".to_string()));
        assert_eq!(a, b);
        assert_eq!(c, Some(a));
    }

    #[test]
    fn wakes_every_waiter() {
        let (p, completer) = Promise::<u32, ()>::pending();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for _ in 0..3 {
            let p = p.clone();
            let seen = seen.clone();
            Executor::spawn(async move {
                let outcome = p.await;
                seen.borrow_mut().push(outcome);
            });
        }

        Executor::spawn(async move {
            Timer::sleep(Duration::from_millis(20)).await;
            completer.resolve(5);
        });

        Executor::run();

        assert_eq!(*seen.borrow(), vec![Ok(5), Ok(5), Ok(5)]);
    }

    #[test]
    fn spawn_settles_with_output() {
        let before = Instant::now();
        let p = Promise::<&str, ()>::spawn(async {
            Timer::sleep(Duration::from_millis(30)).await;
            Ok("late")
        });

        assert!(!p.is_settled());
        assert_eq!(Executor::block_on(p.clone()), Ok("late"));
        assert!(p.is_settled());
        assert!(before.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn on_settle_is_deferred() {
        let hit = Rc::new(RefCell::new(None));

        {
            let hit = hit.clone();
            Promise::<u8, ()>::resolved(1).on_settle(move |o| *hit.borrow_mut() = Some(o));
        }

        assert!(hit.borrow().is_none());
        Executor::run();
        assert_eq!(*hit.borrow(), Some(Ok(1)));
    }

    #[test]
    fn dropped_completer_never_settles() {
        let (p, completer) = Promise::<u8, ()>::pending();
        drop(completer);

        let settled = Executor::block_on(async move {
            Timer::sleep(Duration::from_millis(20)).await;
            p.is_settled()
        });

        assert!(!settled);
    }

    #[test]
    fn abandoned_promise_drops_continuation() {
        let (p, completer) = Promise::<u8, ()>::pending();
        let ran = Rc::new(Cell::new(false));

        {
            let ran = ran.clone();
            p.on_settle(move |_| ran.set(true));
        }

        Executor::spawn(async move {
            Timer::sleep(Duration::from_millis(20)).await;
            drop(completer);
        });

        Executor::run();
        assert!(!ran.get());
    }

    #[test]
    fn pending_continuation_does_not_hold_run() {
        let (p, _completer) = Promise::<u8, ()>::pending();
        let ran = Rc::new(Cell::new(false));

        {
            let ran = ran.clone();
            p.on_settle(move |_| ran.set(true));
        }

        Executor::run();
        assert!(!ran.get());
    }
}
