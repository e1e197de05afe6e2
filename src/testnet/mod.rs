//! Shared helpers for the unit tests: fast node configs and polling.

pub mod test_utils;

pub use test_utils::*;
