//! # `settle`: at-most-once promise combinators
//!
//! This crate implements a small library of asynchronous combinators over
//! single-shot promises, together with the minimal per-thread executor they
//! run on. A [Promise](futures::promise::Promise) settles exactly once into a
//! success value or a failure reason and never changes afterward; the
//! combinators join, observe, race-against-time and defer such promises
//! without each call re-implementing the settlement bookkeeping.
//!
//! The heart of the crate is the
//! [SettlementGuard](futures::guard::SettlementGuard): many asynchronous
//! sources may try to settle one result, only the first attempt takes effect,
//! and any timer racing for the result is cancelled the moment it settles.
//!
//! For information about spawning and managing tasks, refer to the [task]
//! module. The primitives live in [futures] and the public combinators in
//! [combinators].
//!
//! ## Example
//!
//! Join two promises, then give up on a third that never settles:
//!
//! ```
//! use settle::combinators::{combine, reject_on_timeout, TimedOut};
//! use settle::futures::promise::Promise;
//! use settle::task::Executor;
//! use std::time::Duration;
//!
//! let joined = combine(
//!     Promise::<_, TimedOut>::resolved("x"),
//!     Promise::resolved("y"),
//!     |a, b| Ok(format!("{a}{b}")),
//! );
//! assert_eq!(Executor::block_on(joined), Ok("xy".to_string()));
//!
//! let (never, _completer) = Promise::<String, TimedOut>::pending();
//! let raced = reject_on_timeout(never, Duration::from_millis(10));
//! assert_eq!(Executor::block_on(raced), Err(TimedOut));
//! ```
use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod combinators;
pub mod futures;
pub(crate) mod reactor;
pub mod task;

/// Lock `m`, recovering the data if another holder panicked.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
