//! Parse standalone build files without going through an install layout.

use pysysconf_core::{ConfigVars, ProcessEnv, Result, SysconfigError};
use pysysconf_sysconfig::{parse_config_h_file, parse_makefile};
use std::path::Path;
use tracing::debug;

use super::query::render_vars;

pub(super) fn cmd_makefile(path: &Path, json: bool) -> Result<()> {
    print!("{}", render_vars(&load_makefile(path)?, json)?);
    Ok(())
}

pub(super) fn cmd_config_h(path: &Path, json: bool) -> Result<()> {
    print!("{}", render_vars(&load_config_h(path)?, json)?);
    Ok(())
}

fn load_makefile(path: &Path) -> Result<ConfigVars> {
    let vars = parse_makefile(path, &ProcessEnv).map_err(|e| SysconfigError::unreadable(path, &e))?;
    debug!(path = %path.display(), count = vars.len(), "makefile parsed");
    Ok(vars)
}

fn load_config_h(path: &Path) -> Result<ConfigVars> {
    let mut vars = ConfigVars::new();
    parse_config_h_file(path, &mut vars).map_err(|e| SysconfigError::unreadable(path, &e))?;
    debug!(path = %path.display(), count = vars.len(), "header parsed");
    Ok(vars)
}
