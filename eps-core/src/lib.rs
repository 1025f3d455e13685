#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

// Device model for a satellite EPS board.
//
// The crate stays portable across embedded targets and host tooling by avoiding
// the Rust standard library. Hosts drive the board through `eps::Eps` and the
// operator console in `console`.

pub mod bus;
pub mod channel;
pub mod console;
pub mod eps;
pub mod events;
pub mod protocol;
pub mod status;
pub mod version;

/// Simulated time in milliseconds.
pub type SimTime = u64;
