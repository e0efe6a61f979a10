use pysysconf_core::{ConfigValue, ConfigVars, Result, SysconfigError};
use pysysconf_sysconfig::{Sysconfig, UnixCCompiler, expand_makefile_vars};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;

pub(super) fn cmd_vars(sysconfig: &Sysconfig, names: &[String], json: bool) -> Result<()> {
    if names.is_empty() {
        print!("{}", render_vars(&*sysconfig.config_vars()?, json)?);
        return Ok(());
    }

    let lookup: Vec<&str> = names.iter().map(String::as_str).collect();
    let values = sysconfig.config_vars_for(&lookup)?;
    let missing = values.iter().filter(|v| v.is_none()).count();
    if missing > 0 {
        debug!(missing, requested = lookup.len(), "some variables are undefined");
    }
    print!("{}", render_selection(&lookup, &values, json)?);
    Ok(())
}

pub(super) fn cmd_var(sysconfig: &Sysconfig, name: &str) -> Result<()> {
    match sysconfig.config_var(name)? {
        Some(value) => {
            println!("{value}");
            Ok(())
        }
        None => Err(SysconfigError::Platform(format!(
            "{name} is not defined in the build configuration"
        ))),
    }
}

pub(super) fn cmd_paths(sysconfig: &Sysconfig, prefix: Option<&Path>) -> Result<()> {
    println!("{:<12} {}", "version", sysconfig.python_version());
    for (label, path) in install_paths(sysconfig, prefix)? {
        println!("{label:<12} {}", path.display());
    }
    Ok(())
}

pub(super) fn cmd_expand(sysconfig: &Sysconfig, text: &str) -> Result<()> {
    let vars = sysconfig.config_vars()?;
    println!("{}", expand_makefile_vars(text, &vars)?);
    Ok(())
}

pub(super) fn cmd_compiler(sysconfig: &Sysconfig, json: bool) -> Result<()> {
    let mut compiler = UnixCCompiler::new();
    sysconfig.customize_compiler(&mut compiler)?;
    print!("{}", render_compiler(&compiler, json)?);
    Ok(())
}

/// Aligned `step command` lines, or JSON carrying both the command strings
/// and their argument vectors.
fn render_compiler(compiler: &UnixCCompiler, json: bool) -> Result<String> {
    if json {
        let argv: BTreeMap<&str, Vec<String>> = compiler.executables.argv()?.into_iter().collect();
        let doc = serde_json::json!({
            "executables": compiler.executables,
            "argv": argv,
            "shared_lib_extension": compiler.shared_lib_extension,
        });
        return Ok(format!("{}\n", serde_json::to_string_pretty(&doc)?));
    }

    let mut out = String::new();
    for (label, command) in compiler.executables.steps() {
        let _ = writeln!(out, "{label:<13} {command}");
    }
    let _ = writeln!(out, "{:<13} {}", "shared_lib", compiler.shared_lib_extension);
    Ok(out)
}

fn install_paths(sysconfig: &Sysconfig, prefix: Option<&Path>) -> Result<Vec<(&'static str, PathBuf)>> {
    Ok(vec![
        ("include", sysconfig.python_inc(false, prefix)?),
        ("platinclude", sysconfig.python_inc(true, prefix)?),
        ("stdlib", sysconfig.python_lib(false, true, prefix)?),
        ("platstdlib", sysconfig.python_lib(true, true, prefix)?),
        ("purelib", sysconfig.python_lib(false, false, prefix)?),
        ("platlib", sysconfig.python_lib(true, false, prefix)?),
        ("config_h", sysconfig.config_h_filename()?),
        ("makefile", sysconfig.makefile_filename()?),
    ])
}

/// `NAME = value` lines, or a JSON object.
pub(super) fn render_vars(vars: &ConfigVars, json: bool) -> Result<String> {
    if json {
        return Ok(format!("{}\n", serde_json::to_string_pretty(vars)?));
    }
    let mut out = String::new();
    for (name, value) in vars {
        let _ = writeln!(out, "{name} = {value}");
    }
    Ok(out)
}

/// Requested variables in argument order. Undefined names render as `null`
/// in JSON.
fn render_selection(names: &[&str], values: &[Option<ConfigValue>], json: bool) -> Result<String> {
    if json {
        let selected: BTreeMap<&str, Option<&ConfigValue>> = names
            .iter()
            .copied()
            .zip(values.iter().map(Option::as_ref))
            .collect();
        return Ok(format!("{}\n", serde_json::to_string_pretty(&selected)?));
    }
    let mut out = String::new();
    for (name, value) in names.iter().zip(values) {
        match value {
            Some(value) => {
                let _ = writeln!(out, "{name} = {value}");
            }
            None => {
                let _ = writeln!(out, "{name} (undefined)");
            }
        }
    }
    Ok(out)
}
