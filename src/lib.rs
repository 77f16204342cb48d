//! Dependency-satisfiability index for R package repositories distributed as
//! DCF (Debian Control File) text — `PACKAGES` listings and per-package
//! `DESCRIPTION` files.
//!
//! The core is a pipeline: [`dcf`]'s lexer and parser turn bytes into a flat
//! AST, [`Repository`] ingests that AST into a columnar package table, and
//! [`Index`] answers name-keyed satisfiability queries over a snapshot of
//! it. [`orchestration`] and [`config`] sit above the core and are what a
//! driver (this crate's `cli` feature, or a foreign caller through
//! [`ffi`](mod@ffi)) actually talks to.
#![warn(missing_docs)]

mod dcf;
mod interner;
mod nvc;
mod version;

/// Bioconductor release-to-repository-URL lookup.
pub mod bioc;
#[cfg(feature = "cli")]
/// CLI commands for the library
pub mod cli;
/// Configuration for the orchestration layer.
pub mod config;
/// Known-package tables used to exclude base/recommended names from checks.
pub mod consts;
/// Error types for every fallible operation in this crate.
pub mod error;
#[cfg(feature = "capi")]
/// Opaque-handle C API, built when the `capi` feature is enabled.
pub mod ffi;
/// Name-to-version(s) snapshot index over a [`Repository`].
pub mod index;
/// DCF source reading: gzip detection and directory walks.
pub mod io;
/// Fetch, external-dependency, and install-staging orchestrations.
pub mod orchestration;
/// The structure-of-arrays package table.
pub mod repository;

pub use dcf::{Node, Parser, Span, Token, TokenTag};
pub use index::Index;
pub use interner::{InternedStr, Interner};
pub use nvc::NameAndVersionConstraint;
pub use repository::{PackageRef, Repository};
pub use version::{Operator, Version, VersionConstraint};
