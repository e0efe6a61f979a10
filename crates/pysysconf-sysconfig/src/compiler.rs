//! Compiler customization.
//!
//! Plugs the interpreter's configured compiler and linker commands into a
//! compiler driver, honouring the usual `CC`/`CFLAGS`/`LDFLAGS` environment
//! overrides.

use pysysconf_core::{Environment, Result, SysconfigError};
use serde::Serialize;

use crate::store::Sysconfig;

/// Command lines a compiler driver runs, one per build step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Executables {
    pub preprocessor: String,
    pub compiler: String,
    pub compiler_so: String,
    pub compiler_cxx: String,
    pub linker_so: String,
    pub linker_exe: String,
    pub archiver: String,
}

impl Executables {
    /// Commands in build-step order, labelled by step.
    pub fn steps(&self) -> [(&'static str, &str); 7] {
        [
            ("preprocessor", &self.preprocessor),
            ("compiler", &self.compiler),
            ("compiler_so", &self.compiler_so),
            ("compiler_cxx", &self.compiler_cxx),
            ("linker_so", &self.linker_so),
            ("linker_exe", &self.linker_exe),
            ("archiver", &self.archiver),
        ]
    }

    /// Each command split into argument vectors, ready to spawn.
    pub fn argv(&self) -> Result<Vec<(&'static str, Vec<String>)>> {
        self.steps()
            .into_iter()
            .map(|(step, command)| Ok((step, split_quoted(command)?)))
            .collect()
    }
}

/// The part of a compiler driver that customization touches.
pub trait CompilerDriver {
    /// Driver family, e.g. `"unix"` or `"msvc"`. Only `"unix"` drivers are
    /// customized.
    fn compiler_type(&self) -> &str;

    fn set_executables(&mut self, executables: Executables);

    fn set_shared_lib_extension(&mut self, extension: String);
}

/// A Unix-style `cc` driver.
#[derive(Debug, Clone, Serialize)]
pub struct UnixCCompiler {
    pub executables: Executables,
    pub shared_lib_extension: String,
}

impl Default for UnixCCompiler {
    fn default() -> Self {
        Self {
            executables: Executables {
                preprocessor: "cc -E".into(),
                compiler: "cc".into(),
                compiler_so: "cc".into(),
                compiler_cxx: "cc".into(),
                linker_so: "cc -shared".into(),
                linker_exe: "cc".into(),
                archiver: "ar -cr".into(),
            },
            shared_lib_extension: ".so".into(),
        }
    }
}

impl UnixCCompiler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CompilerDriver for UnixCCompiler {
    fn compiler_type(&self) -> &str {
        "unix"
    }

    fn set_executables(&mut self, executables: Executables) {
        self.executables = executables;
    }

    fn set_shared_lib_extension(&mut self, extension: String) {
        self.shared_lib_extension = extension;
    }
}

impl Sysconfig {
    /// Apply the configured toolchain to `compiler`. Drivers other than
    /// `"unix"` are left untouched.
    pub fn customize_compiler(&self, compiler: &mut dyn CompilerDriver) -> Result<()> {
        if compiler.compiler_type() != "unix" {
            return Ok(());
        }

        let names = [
            "CC", "CXX", "OPT", "CFLAGS", "CCSHARED", "LDSHARED", "SO", "AR", "ARFLAGS",
        ];
        let values: Vec<String> = self
            .config_vars_for(&names)?
            .into_iter()
            .map(|v| v.map(|v| v.to_string()).unwrap_or_default())
            .collect();
        let [cc, cxx, opt, cflags, ccshared, ldshared, so_ext, ar, ar_flags]: [String; 9] =
            values.try_into().map_err(|_| {
                SysconfigError::Platform("unexpected configuration lookup result".into())
            })?;

        let (executables, so_ext) = build_executables(
            Toolchain {
                cc,
                cxx,
                opt,
                cflags,
                ccshared,
                ldshared,
                so_ext,
                ar,
                ar_flags,
            },
            self.environment(),
        );

        compiler.set_executables(executables);
        compiler.set_shared_lib_extension(so_ext);
        Ok(())
    }
}

/// Toolchain settings as configured at build time.
struct Toolchain {
    cc: String,
    cxx: String,
    opt: String,
    cflags: String,
    ccshared: String,
    ldshared: String,
    so_ext: String,
    ar: String,
    ar_flags: String,
}

fn build_executables(tc: Toolchain, env: &dyn Environment) -> (Executables, String) {
    let Toolchain {
        mut cc,
        mut cxx,
        opt,
        mut cflags,
        ccshared,
        mut ldshared,
        so_ext,
        mut ar,
        ar_flags,
    } = tc;

    if let Some(v) = env.var("CC") {
        cc = v;
    }
    if let Some(v) = env.var("CXX") {
        cxx = v;
    }
    if let Some(v) = env.var("LDSHARED") {
        ldshared = v;
    }
    let mut cpp = env.var("CPP").unwrap_or_else(|| format!("{cc} -E"));
    if let Some(v) = env.var("LDFLAGS") {
        ldshared = format!("{ldshared} {v}");
    }
    if let Some(v) = env.var("CFLAGS") {
        cflags = format!("{opt} {v}");
        ldshared = format!("{ldshared} {v}");
    }
    if let Some(v) = env.var("CPPFLAGS") {
        cpp = format!("{cpp} {v}");
        cflags = format!("{cflags} {v}");
        ldshared = format!("{ldshared} {v}");
    }
    if let Some(v) = env.var("AR") {
        ar = v;
    }
    let archiver = match env.var("ARFLAGS") {
        Some(flags) => format!("{ar} {flags}"),
        None => format!("{ar} {ar_flags}"),
    };

    let cc_cmd = format!("{cc} {cflags}");
    let executables = Executables {
        preprocessor: cpp,
        compiler_so: format!("{cc_cmd} {ccshared}"),
        compiler: cc_cmd,
        compiler_cxx: cxx,
        linker_so: ldshared,
        linker_exe: cc,
        archiver,
    };
    (executables, so_ext)
}

/// Split a command line into words the way a POSIX shell would for simple
/// cases: whitespace separates words, quotes group, backslash escapes one
/// character outside quotes.
pub fn split_quoted(s: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = s.trim().char_indices();

    while let Some((pos, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            '\\' => {
                in_word = true;
                if let Some((_, escaped)) = chars.next() {
                    word.push(escaped);
                }
            }
            '\'' | '"' => {
                in_word = true;
                let quote = c;
                let mut closed = false;
                while let Some((_, q)) = chars.next() {
                    if q == quote {
                        closed = true;
                        break;
                    }
                    word.push(q);
                    if q == '\\' {
                        if let Some((_, escaped)) = chars.next() {
                            word.push(escaped);
                        }
                    }
                }
                if !closed {
                    return Err(SysconfigError::Platform(format!(
                        "bad string (mismatched {quote} quote at {pos})"
                    )));
                }
            }
            other => {
                in_word = true;
                word.push(other);
            }
        }
    }
    if in_word {
        words.push(word);
    }
    Ok(words)
}
