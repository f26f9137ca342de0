//! CLI-specific functionality for the `actx` binary
//!
//! This module contains argument parsing and configuration discovery.

pub mod args;
pub mod config;

pub use args::{Args, ExecutionMode, RequestInput, RunConfig};
pub use config::ConfigDiscovery;
