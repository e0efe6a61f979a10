use pysysconf_core::{OsFamily, PythonVersion, current_platform};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration, maps to `pysysconf.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PysysconfConfig {
    pub interpreter: InterpreterConfig,
    pub logging: LoggingConfig,
}

// ── Interpreter ────────────────────────────────────────────────

/// Describes the Python installation whose build configuration is read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Path to the interpreter binary (`sys.executable`).
    pub executable: PathBuf,
    /// Installation prefix for platform-independent files (`sys.prefix`).
    pub prefix: PathBuf,
    /// Installation prefix for platform-specific files (`sys.exec_prefix`).
    pub exec_prefix: PathBuf,
    /// Major/minor version, e.g. "3.2".
    pub version: String,
    /// ABI flags appended to include and config directories (`sys.abiflags`).
    pub abiflags: String,
    /// Value of `sys.platform`, e.g. "linux2", "darwin", "win32".
    pub platform: String,
    /// Value of `os.name`: "posix", "nt", "os2".
    pub os: OsFamily,
    /// Force in-tree build detection on or off. Auto-detected when unset.
    pub in_tree: Option<bool>,
    /// Darwin kernel major version. Read from `uname` when unset.
    pub darwin_kernel_major: Option<u32>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        let os = OsFamily::current();
        let version = PythonVersion::default();
        let (prefix, executable) = match os {
            OsFamily::Nt => {
                let prefix = PathBuf::from(format!("C:\\Python{}", version.nodot()));
                let executable = prefix.join("python.exe");
                (prefix, executable)
            }
            _ => {
                let prefix = PathBuf::from("/usr/local");
                let executable = prefix.join("bin").join(format!("python{version}"));
                (prefix, executable)
            }
        };
        Self {
            executable,
            exec_prefix: prefix.clone(),
            prefix,
            version: version.to_string(),
            abiflags: if os == OsFamily::Posix { "m".into() } else { String::new() },
            platform: current_platform().into(),
            os,
            in_tree: None,
            darwin_kernel_major: None,
        }
    }
}

impl InterpreterConfig {
    /// Parsed version; validation has already rejected unparsable values.
    pub fn python_version(&self) -> Option<PythonVersion> {
        self.version.parse().ok()
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Output format: "pretty", "json", "compact".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "pretty".into(),
        }
    }
}

// ── Validation ─────────────────────────────────────────────────

/// A single config validation issue.
#[derive(Debug)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.severity {
            WarningSeverity::Error => "error",
            WarningSeverity::Warning => "warning",
            WarningSeverity::Info => "note",
        };
        write!(f, "{}: {}: {}", label, self.field, self.message)?;
        if let Some(ref h) = self.hint {
            write!(f, "\n   ↳ {}", h)?;
        }
        Ok(())
    }
}

impl PysysconfConfig {
    /// Validate the config and return a list of warnings/errors.
    /// Returns `Err` with all messages joined if any severity is Error.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, String> {
        let mut warnings = Vec::new();
        let interp = &self.interpreter;

        // ── Version ───
        if interp.python_version().is_none() {
            warnings.push(ConfigWarning {
                field: "interpreter.version".into(),
                message: format!("cannot parse version '{}'", interp.version),
                severity: WarningSeverity::Error,
                hint: Some("Use 'major.minor', e.g. '3.2'".into()),
            });
        }

        // ── Prefixes ───
        if interp.prefix.as_os_str().is_empty() {
            warnings.push(ConfigWarning {
                field: "interpreter.prefix".into(),
                message: "prefix is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to the installation root, e.g. '/usr/local'".into()),
            });
        } else if interp.prefix.is_relative() {
            warnings.push(ConfigWarning {
                field: "interpreter.prefix".into(),
                message: format!("prefix '{}' is relative", interp.prefix.display()),
                severity: WarningSeverity::Warning,
                hint: Some("Paths will be resolved against the current directory".into()),
            });
        }
        if interp.exec_prefix.as_os_str().is_empty() {
            warnings.push(ConfigWarning {
                field: "interpreter.exec_prefix".into(),
                message: "exec_prefix is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("Usually the same as prefix".into()),
            });
        }

        // ── Executable ───
        if interp.executable.as_os_str().is_empty() {
            warnings.push(ConfigWarning {
                field: "interpreter.executable".into(),
                message: "executable is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to the interpreter binary, e.g. '/usr/local/bin/python3.2'".into()),
            });
        } else if !interp.executable.exists() {
            warnings.push(ConfigWarning {
                field: "interpreter.executable".into(),
                message: format!("'{}' does not exist", interp.executable.display()),
                severity: WarningSeverity::Info,
                hint: None,
            });
        }

        // ── OS family ───
        if !interp.os.is_known() {
            warnings.push(ConfigWarning {
                field: "interpreter.os".into(),
                message: format!("no install layout known for '{}'", interp.os),
                severity: WarningSeverity::Warning,
                hint: Some("Valid values: posix, nt, os2".into()),
            });
        }

        // ── Platform ───
        if interp.platform.is_empty() {
            warnings.push(ConfigWarning {
                field: "interpreter.platform".into(),
                message: "platform is empty".into(),
                severity: WarningSeverity::Warning,
                hint: Some("Set to sys.platform, e.g. 'linux2' or 'darwin'".into()),
            });
        }

        // ── Logging format ───
        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.format".into(),
                message: format!("unknown log format '{}'", self.logging.format),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_formats.join(", "))),
            });
        }

        // ── Logging level ───
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.level".into(),
                message: format!("unknown log level '{}'", self.logging.level),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_levels.join(", "))),
            });
        }

        // Check for hard errors
        let errors: Vec<String> = warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .map(|w| format!("{}: {}", w.field, w.message))
            .collect();

        if !errors.is_empty() {
            return Err(format!("Configuration errors:\n  • {}", errors.join("\n  • ")));
        }

        Ok(warnings)
    }
}
