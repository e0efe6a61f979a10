//! # pysysconf-config
//!
//! Describes the Python installation to inspect. Reads from `pysysconf.toml`
//! and `PYSYSCONF_*` environment variables, in that precedence order, with
//! defaults derived from the host.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{
    ConfigWarning, InterpreterConfig, LoggingConfig, PysysconfConfig, WarningSeverity,
};
