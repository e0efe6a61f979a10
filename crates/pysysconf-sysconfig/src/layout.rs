//! Installation layout: where headers, libraries and the generated build
//! files live for a given interpreter.
//!
//! Everything here is a pure function of the interpreter description, apart
//! from the filesystem check that detects an in-tree (uninstalled) build.

use pysysconf_config::InterpreterConfig;
use pysysconf_core::{OsFamily, PythonVersion, Result, SysconfigError};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Files whose presence under `<project_base>/Modules` marks a source tree.
const BUILD_MARKERS: [&str; 2] = ["Setup.dist", "Setup.local"];

#[derive(Debug, Clone)]
pub struct InstallLayout {
    os: OsFamily,
    platform: String,
    version: PythonVersion,
    prefix: PathBuf,
    exec_prefix: PathBuf,
    executable: PathBuf,
    project_base: PathBuf,
    python_build: bool,
    build_flags: String,
}

impl InstallLayout {
    pub fn new(interp: &InterpreterConfig) -> Result<Self> {
        let version = interp.python_version().ok_or_else(|| {
            SysconfigError::Config(format!("invalid python version '{}'", interp.version))
        })?;
        let executable = abspath(&interp.executable);
        let project_base = project_base(&interp.os, &executable);
        let python_build = interp
            .in_tree
            .unwrap_or_else(|| is_source_tree(&project_base));
        let build_flags = if python_build {
            String::new()
        } else {
            interp.abiflags.clone()
        };

        debug!(
            project_base = %project_base.display(),
            python_build,
            "resolved install layout"
        );

        Ok(Self {
            os: interp.os.clone(),
            platform: interp.platform.clone(),
            version,
            prefix: normpath(&interp.prefix),
            exec_prefix: normpath(&interp.exec_prefix),
            executable,
            project_base,
            python_build,
            build_flags,
        })
    }

    pub fn os(&self) -> &OsFamily {
        &self.os
    }

    /// `sys.platform` of the described interpreter.
    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn version(&self) -> PythonVersion {
        self.version
    }

    /// Major and minor version, e.g. `"3.2"`.
    pub fn python_version(&self) -> String {
        self.version.to_string()
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn exec_prefix(&self) -> &Path {
        &self.exec_prefix
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Directory holding the interpreter binary, adjusted out of the
    /// Windows build output directories.
    pub fn project_base(&self) -> &Path {
        &self.project_base
    }

    /// True when running from an uninstalled source/build tree.
    pub fn is_python_build(&self) -> bool {
        self.python_build
    }

    /// ABI flags baked into installed directory names; empty in-tree.
    pub fn build_flags(&self) -> &str {
        &self.build_flags
    }

    fn executable_dir(&self) -> PathBuf {
        self.executable
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn select_prefix(&self, plat_specific: bool, prefix: Option<&Path>) -> PathBuf {
        match prefix {
            Some(p) => p.to_path_buf(),
            None if plat_specific => self.exec_prefix.clone(),
            None => self.prefix.clone(),
        }
    }

    /// Directory containing the C headers.
    ///
    /// With `plat_specific` this is where `pyconfig.h` lives, otherwise where
    /// `Python.h` lives. An explicit `prefix` overrides the choice between
    /// prefix and exec_prefix. In-tree, the generic headers live under
    /// `<srcdir>/Include`, so `srcdir` must be supplied there.
    pub fn python_inc(
        &self,
        plat_specific: bool,
        prefix: Option<&Path>,
        srcdir: Option<&str>,
    ) -> Result<PathBuf> {
        let prefix = self.select_prefix(plat_specific, prefix);
        match self.os {
            OsFamily::Posix => {
                if self.python_build {
                    if plat_specific {
                        return Ok(self.executable_dir());
                    }
                    let srcdir = srcdir.ok_or_else(|| {
                        SysconfigError::Platform(
                            "srcdir is not defined by the build Makefile".into(),
                        )
                    })?;
                    return Ok(normpath(&Path::new(srcdir).join("Include")));
                }
                let python_dir = format!("python{}{}", self.version, self.build_flags);
                Ok(prefix.join("include").join(python_dir))
            }
            OsFamily::Nt => Ok(prefix.join("include")),
            OsFamily::Os2 => Ok(prefix.join("Include")),
            OsFamily::Other(ref os) => Err(SysconfigError::UnknownPlatform {
                os: os.clone(),
                what: "C header files".into(),
            }),
        }
    }

    /// Directory containing the standard library (`standard_lib`) or
    /// third-party packages.
    pub fn python_lib(
        &self,
        plat_specific: bool,
        standard_lib: bool,
        prefix: Option<&Path>,
    ) -> Result<PathBuf> {
        let prefix = self.select_prefix(plat_specific, prefix);
        match self.os {
            OsFamily::Posix => {
                let libpython = prefix.join("lib").join(format!("python{}", self.version));
                if standard_lib {
                    Ok(libpython)
                } else {
                    Ok(libpython.join("site-packages"))
                }
            }
            OsFamily::Nt => {
                if standard_lib {
                    Ok(prefix.join("Lib"))
                } else if self.version < PythonVersion::new(2, 2) {
                    Ok(prefix)
                } else {
                    Ok(prefix.join("Lib").join("site-packages"))
                }
            }
            OsFamily::Os2 => {
                if standard_lib {
                    Ok(prefix.join("Lib"))
                } else {
                    Ok(prefix.join("Lib").join("site-packages"))
                }
            }
            OsFamily::Other(ref os) => Err(SysconfigError::UnknownPlatform {
                os: os.clone(),
                what: "library".into(),
            }),
        }
    }

    /// Full path of the installed `pyconfig.h`.
    pub fn config_h_filename(&self) -> Result<PathBuf> {
        let inc_dir = if self.python_build {
            if self.os == OsFamily::Nt {
                self.project_base.join("PC")
            } else {
                self.project_base.clone()
            }
        } else {
            self.python_inc(true, None, None)?
        };
        let config_h = if self.version < PythonVersion::new(2, 2) {
            "config.h"
        } else {
            "pyconfig.h"
        };
        Ok(inc_dir.join(config_h))
    }

    /// Full path of the Makefile the interpreter was built with.
    pub fn makefile_filename(&self) -> Result<PathBuf> {
        if self.python_build {
            return Ok(self.executable_dir().join("Makefile"));
        }
        let lib_dir = self.python_lib(true, true, None)?;
        let config_dir = format!("config-{}{}", self.version, self.build_flags);
        Ok(lib_dir.join(config_dir).join("Makefile"))
    }
}

fn is_source_tree(project_base: &Path) -> bool {
    BUILD_MARKERS
        .iter()
        .any(|marker| project_base.join("Modules").join(marker).is_file())
}

/// Directory of `executable`, walked out of the Windows build directories
/// (`PCbuild`, `PC\VS7.1`, `PCbuild\amd64`).
fn project_base(os: &OsFamily, executable: &Path) -> PathBuf {
    let mut base = executable
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    if *os != OsFamily::Nt {
        return base;
    }

    let tail = |base: &Path, n: usize| -> String {
        let s = base.to_string_lossy().to_lowercase().replace('/', "\\");
        let chars: Vec<char> = s.chars().collect();
        chars[chars.len().saturating_sub(n)..].iter().collect()
    };

    if tail(&base, 8).contains("pcbuild") {
        base = normpath(&base.join(".."));
    }
    if tail(&base, 10).contains("\\pc\\v") {
        base = normpath(&base.join("..").join(".."));
    }
    if tail(&base, 14).contains("\\pcbuild\\amd64") {
        base = normpath(&base.join("..").join(".."));
    }
    base
}

/// Lexical path normalisation: drops `.` components and folds `..` into the
/// preceding component. Does not touch the filesystem.
pub fn normpath(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = Vec::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(comp),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        PathBuf::from(".")
    } else {
        out.iter().collect()
    }
}

/// `path` made absolute against the current directory, then normalised.
pub fn abspath(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return normpath(path);
    }
    match std::env::current_dir() {
        Ok(cwd) => normpath(&cwd.join(path)),
        Err(_) => normpath(path),
    }
}
