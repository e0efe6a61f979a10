//! # pysysconf-sysconfig
//!
//! Build configuration of a Python installation, for tools that compile and
//! install native extensions.
//!
//! The interpreter's `Makefile` and `pyconfig.h` are located from the install
//! layout, parsed once, and exposed as a name → value mapping. Path helpers
//! answer where headers and libraries live; [`Sysconfig::customize_compiler`]
//! configures a compiler driver the way the interpreter itself was built.
//!
//! ```no_run
//! use pysysconf_sysconfig::Sysconfig;
//!
//! let sysconfig = Sysconfig::global()?;
//! let cc = sysconfig.config_var("CC")?;
//! let include = sysconfig.python_inc(false, None)?;
//! # Ok::<(), pysysconf_core::SysconfigError>(())
//! ```

pub mod compiler;
pub mod config_h;
pub mod expand;
pub mod layout;
pub mod makefile;
pub mod platform;
pub mod store;
pub mod text_file;

pub use compiler::{CompilerDriver, Executables, UnixCCompiler, split_quoted};
pub use config_h::{parse_config_h, parse_config_h_file, parse_config_h_str};
pub use expand::expand_makefile_vars;
pub use layout::InstallLayout;
pub use makefile::{parse_makefile, parse_makefile_into, parse_makefile_str};
pub use store::Sysconfig;
