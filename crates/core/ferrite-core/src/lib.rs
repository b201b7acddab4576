//! Core support crate for the ferrite storage stack.
//!
//! Holds the pieces every other ferrite crate leans on: leveled logging
//! ([`log`]), spin-based locks and waker queues ([`sync`]), and a minimal
//! [`task::block_on`] for callers that sit outside an executor.
//!
//! The crate is `no_std` + `alloc`. Enabling the `std` feature lets
//! [`task::block_on`] park the calling thread instead of spinning, and
//! exposes the test wakers to dependent crates.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod log;
pub mod sync;
pub mod task;
