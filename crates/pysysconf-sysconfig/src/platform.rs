//! Platform-specific fix-ups applied after the build files are loaded.

use pysysconf_core::{ConfigValue, ConfigVars, Environment, Result, SysconfigError};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::layout::InstallLayout;

/// Flag variables that carry `-arch` / `-isysroot` on universal macOS builds.
pub const ARCH_FLAG_KEYS: [&str; 5] = ["LDFLAGS", "BASECFLAGS", "CFLAGS", "PY_CFLAGS", "BLDSHARED"];

/// Darwin kernel 8 is Mac OS X 10.4, the first release that understands
/// universal-binary flags.
pub const FIRST_UNIVERSAL_KERNEL: u32 = 8;

static ARCH_RX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-arch\s+\w+\s").unwrap());
static ISYSROOT_RX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-isysroot [^ \t]*").unwrap());

fn rewrite_flags(vars: &mut ConfigVars, rewrite: impl Fn(&str) -> String) {
    for key in ARCH_FLAG_KEYS {
        let Some(value) = vars.get(key) else {
            debug!(key, "flag variable not defined, skipping");
            continue;
        };
        let flags = rewrite(&value.to_string());
        vars.insert(key.to_string(), ConfigValue::Str(flags));
    }
}

/// Remove `-arch` and `-isysroot` from the flag variables, for kernels that
/// predate universal builds.
pub fn strip_universal_flags(vars: &mut ConfigVars) {
    rewrite_flags(vars, |flags| {
        let flags = ARCH_RX.replace_all(flags, " ");
        ISYSROOT_RX.replace_all(&flags, " ").into_owned()
    });
}

/// Replace the configured `-arch` flags with the user's `ARCHFLAGS`.
pub fn apply_archflags(vars: &mut ConfigVars, archflags: &str) {
    rewrite_flags(vars, |flags| {
        let flags = ARCH_RX.replace_all(flags, " ");
        format!("{flags} {archflags}")
    });
}

fn parse_target(target: &str) -> Result<Vec<u64>> {
    target
        .split('.')
        .map(|part| part.trim().parse::<u64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| {
            SysconfigError::Platform(format!("invalid MACOSX_DEPLOYMENT_TARGET '{target}'"))
        })
}

/// Reconcile `MACOSX_DEPLOYMENT_TARGET` with the configure-time value.
///
/// Returns the value child processes should see when the environment
/// doesn't set one. Fails if the environment asks for an older target than
/// the interpreter was configured for.
pub fn check_deployment_target(
    vars: &ConfigVars,
    env: &dyn Environment,
) -> Result<Option<String>> {
    let Some(configured) = vars.get("MACOSX_DEPLOYMENT_TARGET") else {
        return Ok(None);
    };
    let configured = configured.to_string();
    let current = env.var("MACOSX_DEPLOYMENT_TARGET").unwrap_or_default();

    if current.is_empty() {
        return Ok(Some(configured));
    }
    if parse_target(&configured)? > parse_target(&current)? {
        return Err(SysconfigError::DeploymentTarget {
            current,
            configured,
        });
    }
    Ok(None)
}

/// `LDSHARED` for AIX installs that predate 2.1: the linker scripts live in
/// the installed config directory, not in `Modules/` as the Makefile says.
pub fn aix_ldshared(layout: &InstallLayout, cc: &str) -> Result<String> {
    let config_dir = layout.python_lib(false, true, None)?.join("config");
    let ld_so_aix = config_dir.join("ld_so_aix");
    let python_exp = config_dir.join("python.exp");
    Ok(format!(
        "{} {} -bI:{}",
        ld_so_aix.display(),
        cc,
        python_exp.display()
    ))
}

/// Major number of a kernel release string such as `"10.8.0"`.
pub fn kernel_major(release: &str) -> Option<u32> {
    release.split('.').next()?.trim().parse().ok()
}

/// Kernel release of the running host, as reported by `uname -r`.
#[cfg(unix)]
pub fn kernel_release() -> Option<String> {
    let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut uts) } != 0 {
        return None;
    }
    let release = unsafe { std::ffi::CStr::from_ptr(uts.release.as_ptr()) };
    Some(release.to_string_lossy().into_owned())
}

#[cfg(not(unix))]
pub fn kernel_release() -> Option<String> {
    None
}
