//! Configuration management
//!
//! Node identity (name, keys), listen address and mining settings, loaded
//! from a TOML file with environment overrides.

pub mod settings;

pub use settings::NodeConfig;
