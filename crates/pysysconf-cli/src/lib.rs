//! # pysysconf-cli
//!
//! Command-line interface for inspecting a Python installation's build
//! configuration.
//!
//! ## Commands
//!
//! - `pysysconf vars`: Dump configuration variables
//! - `pysysconf var`: Print a single variable
//! - `pysysconf paths`: Show header and library directories
//! - `pysysconf expand`: Expand `$(NAME)` references
//! - `pysysconf compiler`: Show the customized compiler commands
//! - `pysysconf makefile` / `config-h`: Parse a standalone build file
//! - `pysysconf doctor`: Check the interpreter description

pub mod commands;

pub use commands::Cli;
