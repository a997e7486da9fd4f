//! Prax Squash CLI - command-line front end for `prax-squash`.
//!
//! Plans which migrations to retire, asks for confirmation and runs the
//! squash against the configured database.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
