//! # The packrat grammar optimizer
//!
//! This crate plumbs together the optimizer crates and provides the
//! command-line interface. It reads a grammar in its serialized form, runs
//! a plan of passes over it, and prints the result.
//! Depend on [`packrat_ir`] and [`packrat_opt`] instead of this crate to
//! use the passes as a library.
pub mod cmdline;
pub mod driver;
