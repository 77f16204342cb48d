//! CLI subcommands for the `cranidx` binary.

pub mod commands;

pub use commands::{bioc_urls, broken, can_install, depends, BrokenPackage};
