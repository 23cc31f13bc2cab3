//! Promise combinators.
//!
//! Each combinator takes one or more [Promise](crate::futures::promise::Promise)s
//! and returns a new one, attaching its continuations and timers to the
//! executor of the calling thread. None of them fail at construction time:
//! every failure, whether it comes from an input, a caller-supplied closure
//! or an expired timeout, is reported as the returned promise's `Err`
//! outcome.
//!
//! - [combine]: join two promises, first failure wins.
//! - [race_against_timeout], [reject_on_timeout], [reject_on_timeout_with],
//!   [resolve_on_timeout]: settle early if a promise takes too long.
//! - [supply], [supply_after]: run a computation on the executor.
//! - [handle], [when_complete]: observe both outcomes of a promise.
mod combine;
mod observe;
mod supply;
mod timeout;

pub use combine::combine;
pub use observe::{handle, when_complete};
pub use supply::{supply, supply_after};
pub use timeout::{
    race_against_timeout, reject_on_timeout, reject_on_timeout_with, resolve_on_timeout, TimedOut,
};
