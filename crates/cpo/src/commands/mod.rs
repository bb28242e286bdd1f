//! Command implementations

pub mod dependency;
pub mod version;
