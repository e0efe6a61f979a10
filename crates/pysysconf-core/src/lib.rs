//! # pysysconf-core
//!
//! Core types shared by every pysysconf crate: the error type, configuration
//! values, OS families, interpreter versions and the environment lookup seam.

pub mod env;
pub mod error;
pub mod types;
pub mod value;

pub use env::{Environment, MapEnv, ProcessEnv};
pub use error::{Result, SysconfigError};
pub use types::*;
pub use value::{ConfigValue, ConfigVars};
