#[cfg(test)]
mod tests {
    use pysysconf_config::InterpreterConfig;
    use pysysconf_core::{ConfigValue, Environment, MapEnv, OsFamily, SysconfigError};
    use pysysconf_sysconfig::*;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tempfile::TempDir;

    const MAKEFILE: &str = "\
# Generated automatically from Makefile.pre by makesetup.
VERSION=\t3.2
prefix=\t\t/usr/local
exec_prefix=\t${prefix}
LIBDIR=\t\t$(exec_prefix)/lib
CC=\t\tgcc -pthread
CXX=\t\tg++ -pthread
OPT=\t\t-DNDEBUG -g -O3 -Wall
BASECFLAGS=\t-fno-strict-aliasing
CFLAGS=\t\t$(BASECFLAGS) $(OPT)
CCSHARED=\t-fPIC
LDSHARED=\t$(CC) -shared
BLDSHARED=\t$(CC) -shared -L.
SO=\t\t.so
AR=\t\tar
ARFLAGS=\trc
HAVE_FORK=\t0
srcdir=\t\t.
";

    const HEADER: &str = "\
/* pyconfig.h.  Generated from pyconfig.h.in by configure.  */
#define HAVE_FORK 1
#define SIZEOF_LONG 8
/* #undef WITH_DYLD */
";

    fn s(v: &str) -> ConfigValue {
        ConfigValue::Str(v.into())
    }

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn interpreter(dir: &Path, version: &str, abiflags: &str, platform: &str) -> InterpreterConfig {
        InterpreterConfig {
            executable: dir.join("bin").join(format!("python{version}")),
            prefix: dir.to_path_buf(),
            exec_prefix: dir.to_path_buf(),
            version: version.into(),
            abiflags: abiflags.into(),
            platform: platform.into(),
            os: OsFamily::Posix,
            in_tree: Some(false),
            darwin_kernel_major: None,
        }
    }

    /// Installed 3.2 layout with the build files in their usual places.
    fn posix_install(makefile: &str, header: &str) -> (TempDir, InterpreterConfig) {
        let dir = tempfile::tempdir().unwrap();
        let interp = interpreter(dir.path(), "3.2", "m", "linux2");
        write(&dir.path().join("lib/python3.2/config-3.2m/Makefile"), makefile);
        write(&dir.path().join("include/python3.2m/pyconfig.h"), header);
        (dir, interp)
    }

    fn store(interp: &InterpreterConfig, env: MapEnv) -> Sysconfig {
        Sysconfig::with_env(interp, Arc::new(env)).unwrap()
    }

    // ── Loading and memoization ────────────────────────────────

    #[test]
    fn test_installed_layout_paths() {
        let (dir, interp) = posix_install(MAKEFILE, HEADER);
        let sc = store(&interp, MapEnv::new());
        let root = dir.path();

        assert!(!sc.layout().is_python_build());
        assert_eq!(sc.python_version(), "3.2");
        assert_eq!(
            sc.makefile_filename().unwrap(),
            root.join("lib/python3.2/config-3.2m/Makefile")
        );
        assert_eq!(
            sc.config_h_filename().unwrap(),
            root.join("include/python3.2m/pyconfig.h")
        );
        assert_eq!(sc.python_inc(false, None).unwrap(), root.join("include/python3.2m"));
        assert_eq!(
            sc.python_inc(true, Some(Path::new("/opt/other"))).unwrap(),
            PathBuf::from("/opt/other/include/python3.2m")
        );
        assert_eq!(
            sc.python_lib(false, false, None).unwrap(),
            root.join("lib/python3.2/site-packages")
        );
        assert_eq!(sc.python_lib(true, true, None).unwrap(), root.join("lib/python3.2"));
    }

    #[test]
    fn test_config_vars_loaded_from_makefile_and_header() {
        let (dir, interp) = posix_install(MAKEFILE, HEADER);
        let sc = store(&interp, MapEnv::new());
        let vars = sc.config_vars().unwrap();

        assert_eq!(vars["CC"], s("gcc -pthread"));
        assert_eq!(vars["CFLAGS"], s("-fno-strict-aliasing -DNDEBUG -g -O3 -Wall"));
        assert_eq!(vars["LDSHARED"], s("gcc -pthread -shared"));
        assert_eq!(vars["SIZEOF_LONG"], ConfigValue::Int(8));
        assert_eq!(vars["WITH_DYLD"], ConfigValue::Int(0));
        // The header is read after the Makefile and wins.
        assert_eq!(vars["HAVE_FORK"], ConfigValue::Int(1));
        // prefix and exec_prefix describe this interpreter, not the build host.
        let root = dir.path().to_string_lossy().into_owned();
        assert_eq!(vars["prefix"], s(&root));
        assert_eq!(vars["exec_prefix"], s(&root));
        assert_eq!(vars["LIBDIR"], s("/usr/local/lib"));
    }

    #[test]
    fn test_config_vars_are_memoized() {
        let (_dir, interp) = posix_install(MAKEFILE, HEADER);
        let sc = store(&interp, MapEnv::new());
        let first = sc.config_vars().unwrap();
        let second = sc.config_vars().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &sc.ensure_initialized().unwrap()));
    }

    #[test]
    fn test_concurrent_first_access_loads_once() {
        let (_dir, interp) = posix_install(MAKEFILE, HEADER);
        let sc = store(&interp, MapEnv::new());

        let results: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| sc.config_vars().unwrap())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for vars in &results[1..] {
            assert!(Arc::ptr_eq(&results[0], vars));
        }
    }

    #[test]
    fn test_single_and_multiple_lookups() {
        let (_dir, interp) = posix_install(MAKEFILE, HEADER);
        let sc = store(&interp, MapEnv::new());

        assert_eq!(sc.config_var("SO").unwrap(), Some(s(".so")));
        assert_eq!(sc.config_var("NO_SUCH_VARIABLE").unwrap(), None);
        let values = sc.config_vars_for(&["CC", "MISSING", "SIZEOF_LONG"]).unwrap();
        assert_eq!(
            values,
            vec![Some(s("gcc -pthread")), None, Some(ConfigValue::Int(8))]
        );
        assert!(sc.config_vars_for(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_makefile_falls_back_to_store_environment() {
        let (_dir, interp) = posix_install("LDFLAGS = -L$(SDKROOT)/lib\n", HEADER);
        let sc = store(&interp, MapEnv::new().with("SDKROOT", "/sdk"));
        assert_eq!(sc.config_var("LDFLAGS").unwrap(), Some(s("-L/sdk/lib")));
    }

    #[test]
    fn test_expand_against_loaded_vars() {
        let (_dir, interp) = posix_install(MAKEFILE, HEADER);
        let sc = store(&interp, MapEnv::new());
        let vars = sc.config_vars().unwrap();
        let cmd = expand_makefile_vars("$(LDSHARED) ${CCSHARED} -o x$(SO)", &vars).unwrap();
        assert_eq!(cmd, "gcc -pthread -shared -fPIC -o x.so");
    }

    // ── Failures ───────────────────────────────────────────────

    #[test]
    fn test_missing_makefile_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let interp = interpreter(dir.path(), "3.2", "m", "linux2");
        let sc = store(&interp, MapEnv::new());

        let msg = sc.config_vars().unwrap_err().to_string();
        assert!(msg.starts_with("invalid Python installation: unable to open"), "{msg}");
        assert!(msg.contains("config-3.2m/Makefile"), "{msg}");
        assert!(!msg.contains("os error"), "{msg}");
    }

    #[test]
    fn test_missing_header_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let interp = interpreter(dir.path(), "3.2", "m", "linux2");
        write(&dir.path().join("lib/python3.2/config-3.2m/Makefile"), MAKEFILE);
        let sc = store(&interp, MapEnv::new());

        let msg = sc.config_var("CC").unwrap_err().to_string();
        assert!(msg.contains("pyconfig.h"), "{msg}");
    }

    #[test]
    fn test_failed_load_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let interp = interpreter(dir.path(), "3.2", "m", "linux2");
        let sc = store(&interp, MapEnv::new());
        assert!(sc.config_vars().is_err());

        write(&dir.path().join("lib/python3.2/config-3.2m/Makefile"), MAKEFILE);
        write(&dir.path().join("include/python3.2m/pyconfig.h"), HEADER);
        assert_eq!(sc.config_var("CC").unwrap(), Some(s("gcc -pthread")));
    }

    #[test]
    fn test_invalid_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let interp = interpreter(dir.path(), "three", "", "linux2");
        let err = Sysconfig::with_env(&interp, Arc::new(MapEnv::new())).err().unwrap();
        assert!(matches!(err, SysconfigError::Config(_)));
    }

    // ── Source-tree builds ─────────────────────────────────────

    #[test]
    fn test_source_tree_build() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("Modules/Setup.dist"), "");
        write(&root.join("Makefile"), MAKEFILE);
        write(&root.join("pyconfig.h"), HEADER);

        let mut interp = interpreter(root, "3.2", "m", "linux2");
        interp.executable = root.join("python");
        interp.in_tree = None;
        let sc = store(&interp, MapEnv::new());

        assert!(sc.layout().is_python_build());
        assert_eq!(sc.layout().build_flags(), "");
        assert_eq!(sc.makefile_filename().unwrap(), root.join("Makefile"));
        assert_eq!(sc.config_h_filename().unwrap(), root.join("pyconfig.h"));

        let vars = sc.config_vars().unwrap();
        assert_eq!(vars["LDSHARED"], s("gcc -pthread -shared -L."));
        assert_eq!(vars["srcdir"], s(&root.to_string_lossy()));

        assert_eq!(sc.python_inc(false, None).unwrap(), root.join("Include"));
        assert_eq!(sc.python_inc(true, None).unwrap(), root.to_path_buf());
    }

    #[test]
    fn test_source_tree_without_bldshared_keeps_ldshared() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("Makefile"), "CC = cc\nLDSHARED = $(CC) -shared\n");
        write(&root.join("pyconfig.h"), HEADER);

        let mut interp = interpreter(root, "3.2", "", "linux2");
        interp.executable = root.join("python");
        interp.in_tree = Some(true);
        let sc = store(&interp, MapEnv::new());

        assert_eq!(sc.config_var("LDSHARED").unwrap(), Some(s("cc -shared")));
    }

    // ── Other platforms ────────────────────────────────────────

    fn nt_interpreter(dir: &Path, version: &str) -> InterpreterConfig {
        InterpreterConfig {
            executable: dir.join("python.exe"),
            os: OsFamily::Nt,
            ..interpreter(dir, version, "", "win32")
        }
    }

    #[test]
    fn test_nt_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let sc = store(&nt_interpreter(root, "3.2"), MapEnv::new());
        let vars = sc.config_vars().unwrap();

        assert_eq!(vars["SO"], s(".pyd"));
        assert_eq!(vars["EXE"], s(".exe"));
        assert_eq!(vars["VERSION"], s("32"));
        assert_eq!(vars["BINDIR"], s(&root.to_string_lossy()));
        assert_eq!(vars["LIBDEST"], s(&root.join("Lib").to_string_lossy()));
        assert_eq!(vars["INCLUDEPY"], s(&root.join("include").to_string_lossy()));
        assert_eq!(
            sc.python_lib(false, false, None).unwrap(),
            root.join("Lib").join("site-packages")
        );
        assert_eq!(
            sc.config_h_filename().unwrap(),
            root.join("include").join("pyconfig.h")
        );
    }

    #[test]
    fn test_nt_before_2_2() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let sc = store(&nt_interpreter(root, "2.1"), MapEnv::new());

        assert_eq!(sc.python_lib(false, false, None).unwrap(), root.to_path_buf());
        assert_eq!(
            sc.config_h_filename().unwrap(),
            root.join("include").join("config.h")
        );
        assert_eq!(sc.config_var("VERSION").unwrap(), Some(s("21")));
    }

    #[test]
    fn test_os2_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let interp = InterpreterConfig {
            os: OsFamily::Os2,
            ..interpreter(root, "3.2", "", "os2emx")
        };
        let sc = store(&interp, MapEnv::new());

        assert_eq!(sc.config_var("SO").unwrap(), Some(s(".pyd")));
        assert_eq!(sc.config_var("VERSION").unwrap(), None);
        assert_eq!(sc.python_inc(false, None).unwrap(), root.join("Include"));
    }

    #[test]
    fn test_unknown_platform() {
        let dir = tempfile::tempdir().unwrap();
        let interp = InterpreterConfig {
            os: OsFamily::Other("riscos".into()),
            ..interpreter(dir.path(), "3.2", "", "riscos")
        };
        let sc = store(&interp, MapEnv::new());

        let vars = sc.config_vars().unwrap();
        assert_eq!(vars.len(), 2);
        assert!(vars.contains_key("prefix"));

        let err = sc.python_inc(false, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "I don't know where Python installs its C header files on platform 'riscos'"
        );
        let err = sc.python_lib(false, false, None).unwrap_err();
        assert!(err.to_string().contains("its library on platform 'riscos'"));
        assert!(sc.makefile_filename().is_err());
    }

    #[test]
    fn test_aix_before_2_1_rewrites_ldshared() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let interp = interpreter(root, "2.0", "", "aix4");
        write(
            &root.join("lib/python2.0/config-2.0/Makefile"),
            "CC = xlc_r\nLDSHARED = Modules/ld_so_aix $(CC)\n",
        );
        write(&root.join("include/python2.0/config.h"), HEADER);
        let sc = store(&interp, MapEnv::new());

        let config = root.join("lib/python2.0/config");
        let expected = format!(
            "{} xlc_r -bI:{}",
            config.join("ld_so_aix").display(),
            config.join("python.exp").display()
        );
        assert_eq!(sc.config_var("LDSHARED").unwrap(), Some(s(&expected)));
    }

    // ── Darwin ─────────────────────────────────────────────────

    const DARWIN_MAKEFILE: &str = "\
CC = gcc
CFLAGS = -arch ppc -arch i386 -isysroot /Developer/SDKs/MacOSX10.4u.sdk -O2
LDFLAGS = -arch ppc -arch i386 -isysroot /Developer/SDKs/MacOSX10.4u.sdk
MACOSX_DEPLOYMENT_TARGET = 10.4
";

    fn darwin_install(kernel: u32) -> (TempDir, InterpreterConfig) {
        let dir = tempfile::tempdir().unwrap();
        let mut interp = interpreter(dir.path(), "3.2", "m", "darwin");
        interp.darwin_kernel_major = Some(kernel);
        write(&dir.path().join("lib/python3.2/config-3.2m/Makefile"), DARWIN_MAKEFILE);
        write(&dir.path().join("include/python3.2m/pyconfig.h"), HEADER);
        (dir, interp)
    }

    #[test]
    fn test_darwin_archflags_override() {
        let (_dir, interp) = darwin_install(10);
        let sc = store(&interp, MapEnv::new().with("ARCHFLAGS", "-arch x86_64"));

        let cflags = sc.config_var("CFLAGS").unwrap().unwrap().to_string();
        assert!(!cflags.contains("ppc"), "{cflags}");
        assert!(!cflags.contains("i386"), "{cflags}");
        assert!(cflags.contains("-isysroot /Developer/SDKs/MacOSX10.4u.sdk"), "{cflags}");
        assert!(cflags.ends_with(" -arch x86_64"), "{cflags}");
    }

    #[test]
    fn test_darwin_without_archflags_keeps_flags() {
        let (_dir, interp) = darwin_install(10);
        let sc = store(&interp, MapEnv::new());
        let cflags = sc.config_var("CFLAGS").unwrap().unwrap().to_string();
        assert!(cflags.starts_with("-arch ppc -arch i386"), "{cflags}");
    }

    #[test]
    fn test_darwin_old_kernel_strips_universal_flags() {
        let (_dir, interp) = darwin_install(7);
        let sc = store(&interp, MapEnv::new().with("ARCHFLAGS", "-arch x86_64"));

        let cflags = sc.config_var("CFLAGS").unwrap().unwrap().to_string();
        assert!(!cflags.contains("-arch"), "{cflags}");
        assert!(!cflags.contains("-isysroot"), "{cflags}");
        assert!(cflags.contains("-O2"), "{cflags}");
    }

    #[test]
    fn test_darwin_exports_deployment_target() {
        let (_dir, interp) = darwin_install(10);
        let sc = store(&interp, MapEnv::new());
        let child_env = sc.child_environment().unwrap();
        assert_eq!(
            child_env.get("MACOSX_DEPLOYMENT_TARGET").map(String::as_str),
            Some("10.4")
        );
    }

    #[test]
    fn test_darwin_newer_environment_target_is_accepted() {
        let (_dir, interp) = darwin_install(10);
        let sc = store(&interp, MapEnv::new().with("MACOSX_DEPLOYMENT_TARGET", "10.10"));
        assert!(sc.child_environment().unwrap().is_empty());
    }

    #[test]
    fn test_darwin_older_environment_target_fails() {
        let (_dir, interp) = darwin_install(10);
        let sc = store(&interp, MapEnv::new().with("MACOSX_DEPLOYMENT_TARGET", "10.3"));
        let err = sc.config_vars().unwrap_err();
        assert_eq!(
            err.to_string(),
            "$MACOSX_DEPLOYMENT_TARGET mismatch: now \"10.3\" but \"10.4\" during configure"
        );
    }

    #[test]
    fn test_non_darwin_exports_nothing() {
        let (_dir, interp) = posix_install(DARWIN_MAKEFILE, HEADER);
        let sc = store(&interp, MapEnv::new());
        assert!(sc.child_environment().unwrap().is_empty());
    }

    // ── Compiler customization ─────────────────────────────────

    #[test]
    fn test_customize_unix_compiler() {
        let (_dir, interp) = posix_install(MAKEFILE, HEADER);
        let sc = store(&interp, MapEnv::new());
        let mut cc = UnixCCompiler::new();
        sc.customize_compiler(&mut cc).unwrap();

        let flags = "-fno-strict-aliasing -DNDEBUG -g -O3 -Wall";
        assert_eq!(cc.executables.preprocessor, "gcc -pthread -E");
        assert_eq!(cc.executables.compiler, format!("gcc -pthread {flags}"));
        assert_eq!(cc.executables.compiler_so, format!("gcc -pthread {flags} -fPIC"));
        assert_eq!(cc.executables.compiler_cxx, "g++ -pthread");
        assert_eq!(cc.executables.linker_so, "gcc -pthread -shared");
        assert_eq!(cc.executables.linker_exe, "gcc -pthread");
        assert_eq!(cc.executables.archiver, "ar rc");
        assert_eq!(cc.shared_lib_extension, ".so");
    }

    #[test]
    fn test_customize_compiler_honours_environment() {
        let (_dir, interp) = posix_install(MAKEFILE, HEADER);
        let env = MapEnv::new()
            .with("CC", "clang")
            .with("CFLAGS", "-g0")
            .with("LDSHARED", "clang -bundle");
        let sc = store(&interp, env);
        let mut cc = UnixCCompiler::new();
        sc.customize_compiler(&mut cc).unwrap();

        assert_eq!(cc.executables.compiler, "clang -DNDEBUG -g -O3 -Wall -g0");
        assert_eq!(cc.executables.linker_so, "clang -bundle -g0");
        assert_eq!(cc.executables.linker_exe, "clang");
        assert!(sc.environment().contains("CC"));
    }

    struct MsvcDriver {
        touched: bool,
    }

    impl CompilerDriver for MsvcDriver {
        fn compiler_type(&self) -> &str {
            "msvc"
        }

        fn set_executables(&mut self, _executables: Executables) {
            self.touched = true;
        }

        fn set_shared_lib_extension(&mut self, _extension: String) {
            self.touched = true;
        }
    }

    #[test]
    fn test_customize_ignores_other_driver_types() {
        // No build files at all: a non-unix driver must not trigger loading.
        let dir = tempfile::tempdir().unwrap();
        let sc = store(&interpreter(dir.path(), "3.2", "m", "linux2"), MapEnv::new());
        let mut driver = MsvcDriver { touched: false };
        sc.customize_compiler(&mut driver).unwrap();
        assert!(!driver.touched);
    }
}
