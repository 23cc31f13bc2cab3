//! Future sub-modules.
//!
//! The `futures` module holds the primitives the combinators are built from.
//! Each one is a future (or a handle onto one) that the executor drives and
//! the reactor can sleep on.
//!
//! The following sub-modules are exposed by the `futures` module:
//!
//! - `timer`: Futures that complete once a duration has elapsed.
//! - `alarm`: Cancellable callbacks scheduled after a duration.
//! - `promise`: Shared, settle-once result slots ([promise::Promise]) and the
//!   one-shot sinks that fill them ([promise::Completer]).
//! - `guard`: [guard::SettlementGuard], the at-most-once arbiter between
//!   racing settlement attempts.
//!
//! The public combinators live in [crate::combinators].
pub mod alarm;
pub mod guard;
pub mod promise;
pub mod timer;
