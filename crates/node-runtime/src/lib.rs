//! # Node Runtime Library
//!
//! Startup plumbing shared by the `cx-node` binary and its tests:
//! configuration loading and logging initialization.

pub mod config;
pub mod logging;

pub use config::{apply_env_overrides, load_config, load_file, LoadError, NodeArgs};
pub use logging::{init_logging, LogFormat};
