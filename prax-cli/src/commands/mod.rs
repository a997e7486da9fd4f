//! CLI command implementations.

pub mod squash;
pub mod version;
