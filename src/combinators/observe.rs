use crate::futures::promise::{Outcome, Promise};

/// Map both outcomes of `promise` into a new one.
///
/// Once `promise` settles, `f` receives its outcome and the returned promise
/// settles with whatever `f` returns, so a failure can be turned into a
/// success and the other way around.
///
/// # Example
///
/// ```
/// use settle::combinators::handle;
/// use settle::futures::promise::Promise;
/// use settle::task::Executor;
///
/// let handled = handle(Promise::<u32, &str>::rejected("boom"), |outcome| {
///     Ok::<_, ()>(outcome.unwrap_or(0))
/// });
///
/// assert_eq!(Executor::block_on(handled), Ok(0));
/// ```
pub fn handle<T, E, U, E2, F>(promise: Promise<T, E>, f: F) -> Promise<U, E2>
where
    T: Clone + 'static,
    E: Clone + 'static,
    U: 'static,
    E2: 'static,
    F: FnOnce(Outcome<T, E>) -> Outcome<U, E2> + 'static,
{
    let (handled, sink) = Promise::pending();

    promise.on_settle(move |outcome| sink.settle(f(outcome)));

    handled
}

/// Observe both outcomes of `promise` without changing them.
///
/// Once `promise` settles, `f` sees its outcome by reference. The returned
/// promise then settles with the original outcome, unless `f` returns `Err`,
/// which replaces it.
pub fn when_complete<T, E, F>(promise: Promise<T, E>, f: F) -> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
    F: FnOnce(Result<&T, &E>) -> Result<(), E> + 'static,
{
    let (observed, sink) = Promise::pending();

    promise.on_settle(move |outcome| match f(outcome.as_ref()) {
        Ok(()) => sink.settle(outcome),
        Err(reason) => sink.reject(reason),
    });

    observed
}
