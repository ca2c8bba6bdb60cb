//! Shared helpers for the crate's own test suites.
//!
//! Compiled only under `cfg(test)`; nothing here ships in release builds.

pub mod socket_guard;
