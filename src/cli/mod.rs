//! Command-line interface
//!
//! Key generation, running a single node from a config file, and an
//! in-process three-node demo.

pub mod commands;

pub use commands::{Command, Opt, PaymentArg};
