use std::time::Duration;

use crate::futures::{
    promise::{Outcome, Promise},
    timer::Timer,
};

/// Run `computation` on the next turn of the executor.
///
/// This is like `Promise::settled(computation())`, except the computation is
/// deferred and never runs inside `supply` itself.
///
/// # Example
///
/// ```
/// use settle::combinators::supply;
/// use settle::task::Executor;
///
/// let supplied = supply(|| Ok::<_, ()>("supplied"));
/// assert_eq!(Executor::block_on(supplied), Ok("supplied"));
/// ```
pub fn supply<T, E, F>(computation: F) -> Promise<T, E>
where
    T: 'static,
    E: 'static,
    F: FnOnce() -> Outcome<T, E> + 'static,
{
    supply_after(Duration::ZERO, computation)
}

/// Run `computation` on the executor once `delay` has elapsed, settling the
/// returned promise with its result.
pub fn supply_after<T, E, F>(delay: Duration, computation: F) -> Promise<T, E>
where
    T: 'static,
    E: 'static,
    F: FnOnce() -> Outcome<T, E> + 'static,
{
    Promise::spawn(async move {
        Timer::sleep(delay).await;
        computation()
    })
}
