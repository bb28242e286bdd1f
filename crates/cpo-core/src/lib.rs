//! # cpo-core
//!
//! Core library for the cpo CLI providing:
//! - Runtime configuration with hierarchical precedence
//! - CLI data directory resolution (`$HOME/.cpo` by default)
//! - Shared configuration error types

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use config::HierarchicalConfigLoader;
pub use error::{Error, Result};
pub use types::RuntimeConfig;
pub use utils::{cli_data_dir, get_home_dir};
