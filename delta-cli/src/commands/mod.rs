//! Command implementations for the storage-delta CLI
//!
//! Each command module provides a `run` function that executes the command logic.

pub mod batch;
pub mod compare;
pub mod completions;
