//! Command line interface module
//!
//! Argument parsing and validation for the proxy binary. Every option can
//! also be supplied through its environment variable.

pub mod args;

pub use args::Args;
