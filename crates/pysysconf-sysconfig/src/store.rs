use parking_lot::Mutex;
use pysysconf_config::{ConfigLoader, InterpreterConfig};
use pysysconf_core::{
    ConfigValue, ConfigVars, Environment, OsFamily, ProcessEnv, PythonVersion, Result,
    SysconfigError,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use crate::layout::{InstallLayout, abspath, normpath};
use crate::{config_h, makefile, platform};

static GLOBAL: OnceLock<Sysconfig> = OnceLock::new();

/// Configuration state built on first access.
#[derive(Clone)]
struct Loaded {
    vars: Arc<ConfigVars>,
    child_env: Arc<BTreeMap<String, String>>,
}

/// Build configuration of one Python installation.
///
/// The Makefile and `pyconfig.h` are read on the first query and the result
/// is kept for the lifetime of the store. A failed load is not remembered;
/// the next query tries again.
pub struct Sysconfig {
    layout: InstallLayout,
    darwin_kernel_major: Option<u32>,
    env: Arc<dyn Environment>,
    state: Mutex<Option<Loaded>>,
}

impl Sysconfig {
    /// Store for `interp`, reading overrides from the process environment.
    pub fn new(interp: &InterpreterConfig) -> Result<Self> {
        Self::with_env(interp, Arc::new(ProcessEnv))
    }

    pub fn with_env(interp: &InterpreterConfig, env: Arc<dyn Environment>) -> Result<Self> {
        Ok(Self {
            layout: InstallLayout::new(interp)?,
            darwin_kernel_major: interp.darwin_kernel_major,
            env,
            state: Mutex::new(None),
        })
    }

    /// Process-wide store for the interpreter described by `pysysconf.toml`.
    pub fn global() -> Result<&'static Sysconfig> {
        if let Some(store) = GLOBAL.get() {
            return Ok(store);
        }
        let config = ConfigLoader::load(None)?.into_config();
        let store = Sysconfig::new(&config.interpreter)?;
        Ok(GLOBAL.get_or_init(|| store))
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    pub fn environment(&self) -> &dyn Environment {
        self.env.as_ref()
    }

    /// Load the configuration if that hasn't happened yet. Safe to call from
    /// several threads; exactly one of them does the loading.
    pub fn ensure_initialized(&self) -> Result<Arc<ConfigVars>> {
        Ok(self.loaded()?.vars)
    }

    fn loaded(&self) -> Result<Loaded> {
        let mut state = self.state.lock();
        if let Some(loaded) = state.as_ref() {
            return Ok(loaded.clone());
        }
        let loaded = self.load()?;
        info!(count = loaded.vars.len(), "configuration variables loaded");
        *state = Some(loaded.clone());
        Ok(loaded)
    }

    /// All configuration variables. Every call returns the same `Arc`.
    pub fn config_vars(&self) -> Result<Arc<ConfigVars>> {
        self.ensure_initialized()
    }

    /// Look up several variables at once; unknown names come back as `None`.
    pub fn config_vars_for(&self, names: &[&str]) -> Result<Vec<Option<ConfigValue>>> {
        let vars = self.config_vars()?;
        Ok(names.iter().map(|name| vars.get(*name).cloned()).collect())
    }

    pub fn config_var(&self, name: &str) -> Result<Option<ConfigValue>> {
        Ok(self.config_vars()?.get(name).cloned())
    }

    /// Variables that child processes (compilers, linkers) should see in
    /// addition to the inherited environment.
    pub fn child_environment(&self) -> Result<Arc<BTreeMap<String, String>>> {
        Ok(self.loaded()?.child_env)
    }

    // ── Paths ──────────────────────────────────────────────────

    pub fn python_version(&self) -> String {
        self.layout.python_version()
    }

    pub fn python_inc(&self, plat_specific: bool, prefix: Option<&Path>) -> Result<PathBuf> {
        let needs_srcdir = self.layout.is_python_build()
            && *self.layout.os() == OsFamily::Posix
            && !plat_specific;
        if !needs_srcdir {
            return self.layout.python_inc(plat_specific, prefix, None);
        }
        let srcdir = self.config_var("srcdir")?.map(|v| v.to_string());
        self.layout.python_inc(plat_specific, prefix, srcdir.as_deref())
    }

    pub fn python_lib(
        &self,
        plat_specific: bool,
        standard_lib: bool,
        prefix: Option<&Path>,
    ) -> Result<PathBuf> {
        self.layout.python_lib(plat_specific, standard_lib, prefix)
    }

    pub fn config_h_filename(&self) -> Result<PathBuf> {
        self.layout.config_h_filename()
    }

    pub fn makefile_filename(&self) -> Result<PathBuf> {
        self.layout.makefile_filename()
    }

    // ── Bootstrap ──────────────────────────────────────────────

    fn load(&self) -> Result<Loaded> {
        let mut vars = ConfigVars::new();
        let mut child_env = BTreeMap::new();

        match self.layout.os() {
            OsFamily::Posix => self.init_posix(&mut vars, &mut child_env)?,
            OsFamily::Nt => self.init_nt(&mut vars)?,
            OsFamily::Os2 => self.init_os2(&mut vars)?,
            OsFamily::Other(os) => {
                debug!(os = %os, "no build configuration known for platform");
            }
        }

        vars.insert("prefix".into(), path_value(self.layout.prefix()));
        vars.insert("exec_prefix".into(), path_value(self.layout.exec_prefix()));

        if self.layout.is_python_build() && *self.layout.os() == OsFamily::Posix {
            self.absolutize_srcdir(&mut vars);
        }

        if self.layout.platform() == "darwin" {
            self.adjust_darwin_flags(&mut vars);
        }

        Ok(Loaded {
            vars: Arc::new(vars),
            child_env: Arc::new(child_env),
        })
    }

    fn init_posix(
        &self,
        vars: &mut ConfigVars,
        child_env: &mut BTreeMap<String, String>,
    ) -> Result<()> {
        let makefile = self.layout.makefile_filename()?;
        makefile::parse_makefile_into(&makefile, self.env.as_ref(), vars)
            .map_err(|e| SysconfigError::unreadable(&makefile, &e))?;

        let config_h = self.layout.config_h_filename()?;
        config_h::parse_config_h_file(&config_h, vars)
            .map_err(|e| SysconfigError::unreadable(&config_h, &e))?;

        if self.layout.platform() == "darwin" {
            if let Some(target) = platform::check_deployment_target(vars, self.env.as_ref())? {
                debug!(%target, "exporting configured MACOSX_DEPLOYMENT_TARGET");
                child_env.insert("MACOSX_DEPLOYMENT_TARGET".into(), target);
            }
        }

        if self.layout.is_python_build() {
            // The Makefile's LDSHARED points at scripts relative to the
            // source tree; BLDSHARED is the in-tree equivalent.
            match vars.get("BLDSHARED").cloned() {
                Some(bldshared) => {
                    vars.insert("LDSHARED".into(), bldshared);
                }
                None => warn!("in-tree build without BLDSHARED, keeping LDSHARED"),
            }
        } else if self.layout.version() < PythonVersion::new(2, 1)
            && self.layout.platform() == "aix4"
        {
            let cc = vars.get("CC").map(|v| v.to_string()).unwrap_or_default();
            let ldshared = platform::aix_ldshared(&self.layout, &cc)?;
            vars.insert("LDSHARED".into(), ConfigValue::Str(ldshared));
        }

        Ok(())
    }

    fn init_nt(&self, vars: &mut ConfigVars) -> Result<()> {
        self.init_windows_common(vars)?;
        vars.insert(
            "VERSION".into(),
            ConfigValue::Str(self.layout.version().nodot()),
        );
        let bindir = self
            .layout
            .executable()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        vars.insert("BINDIR".into(), path_value(&bindir));
        Ok(())
    }

    fn init_os2(&self, vars: &mut ConfigVars) -> Result<()> {
        self.init_windows_common(vars)
    }

    fn init_windows_common(&self, vars: &mut ConfigVars) -> Result<()> {
        let libdest = self.layout.python_lib(false, true, None)?;
        let binlibdest = self.layout.python_lib(true, true, None)?;
        let includepy = self.layout.python_inc(false, None, None)?;
        vars.insert("LIBDEST".into(), path_value(&libdest));
        vars.insert("BINLIBDEST".into(), path_value(&binlibdest));
        vars.insert("INCLUDEPY".into(), path_value(&includepy));
        vars.insert("SO".into(), ".pyd".into());
        vars.insert("EXE".into(), ".exe".into());
        Ok(())
    }

    /// `srcdir` is relative to the build directory; make it absolute when
    /// running from somewhere else.
    fn absolutize_srcdir(&self, vars: &mut ConfigVars) {
        let Some(srcdir) = vars.get("srcdir").map(|v| v.to_string()) else {
            return;
        };
        let srcdir_path = Path::new(&srcdir);
        if srcdir_path.is_absolute() {
            return;
        }
        let base = abspath(self.layout.executable())
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let cwd = std::env::current_dir().map(|d| normpath(&d)).ok();
        if cwd.as_deref() == Some(base.as_path()) {
            return;
        }
        let absolute = normpath(&base.join(srcdir_path));
        debug!(srcdir = %absolute.display(), "made srcdir absolute");
        vars.insert("srcdir".into(), path_value(&absolute));
    }

    fn adjust_darwin_flags(&self, vars: &mut ConfigVars) {
        let major = self.darwin_kernel_major.or_else(|| {
            platform::kernel_release().and_then(|r| platform::kernel_major(&r))
        });

        match major {
            Some(major) if major < platform::FIRST_UNIVERSAL_KERNEL => {
                debug!(major, "stripping universal-build flags for old kernel");
                platform::strip_universal_flags(vars);
            }
            _ => {
                if let Some(archflags) = self.env.var("ARCHFLAGS") {
                    debug!(%archflags, "applying ARCHFLAGS override");
                    platform::apply_archflags(vars, &archflags);
                }
            }
        }
    }
}

fn path_value(path: &Path) -> ConfigValue {
    ConfigValue::Str(path.to_string_lossy().into_owned())
}
