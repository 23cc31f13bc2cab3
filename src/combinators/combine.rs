use std::{cell::RefCell, rc::Rc};

use crate::futures::{
    guard::SettlementGuard,
    promise::{Outcome, Promise},
};

struct CombineState<T, U, F> {
    first: Option<T>,
    second: Option<U>,
    successes: u8,
    combiner: Option<F>,
}

impl<T, U, F> CombineState<T, U, F> {
    /// Count one more success. Once both inputs have succeeded, hand back
    /// everything needed to run the combiner; this happens at most once.
    fn record_success(&mut self) -> Option<(T, U, F)> {
        self.successes += 1;

        if self.successes < 2 {
            return None;
        }

        Some((self.first.take()?, self.second.take()?, self.combiner.take()?))
    }
}

/// Join two promises.
///
/// The returned promise succeeds with `combiner(first_value, second_value)`
/// once both inputs have succeeded. If either input fails, it fails with
/// that reason straight away without waiting for the other input, and
/// `combiner` is never called. If `combiner` returns `Err`, that becomes the
/// returned promise's failure.
///
/// When both inputs fail, the reason of whichever failure is processed first
/// wins. Inputs that have already failed when `combine` is called are
/// processed in argument order, so `first` wins that tie.
///
/// # Example
///
/// ```
/// use settle::combinators::combine;
/// use settle::futures::promise::Promise;
/// use settle::task::Executor;
///
/// let joined = combine(
///     Promise::<_, String>::resolved("x"),
///     Promise::resolved("y"),
///     |a, b| Ok(format!("{a}{b}")),
/// );
///
/// assert_eq!(Executor::block_on(joined), Ok("xy".to_string()));
/// ```
pub fn combine<T, U, V, E, F>(
    first: Promise<T, E>,
    second: Promise<U, E>,
    combiner: F,
) -> Promise<V, E>
where
    T: Clone + 'static,
    U: Clone + 'static,
    V: 'static,
    E: Clone + 'static,
    F: FnOnce(T, U) -> Outcome<V, E> + 'static,
{
    let (combined, sink) = Promise::pending();
    let guard = SettlementGuard::new(sink);
    let state = Rc::new(RefCell::new(CombineState {
        first: None,
        second: None,
        successes: 0,
        combiner: Some(combiner),
    }));

    {
        let guard = guard.clone();
        let state = state.clone();

        first.on_settle(move |outcome| match outcome {
            Ok(value) => {
                let ready = {
                    let mut state = state.borrow_mut();
                    state.first = Some(value);
                    state.record_success()
                };

                if let Some((a, b, combiner)) = ready {
                    guard.settle(combiner(a, b));
                }
            }
            Err(reason) => {
                guard.settle_failure(reason);
            }
        });
    }

    second.on_settle(move |outcome| match outcome {
        Ok(value) => {
            let ready = {
                let mut state = state.borrow_mut();
                state.second = Some(value);
                state.record_success()
            };

            if let Some((a, b, combiner)) = ready {
                guard.settle(combiner(a, b));
            }
        }
        Err(reason) => {
            guard.settle_failure(reason);
        }
    });

    combined
}
