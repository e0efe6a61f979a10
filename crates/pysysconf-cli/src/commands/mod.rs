use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::path::PathBuf;
use tracing::{debug, warn};

use pysysconf_config::{ConfigLoader, PysysconfConfig, WarningSeverity};
use pysysconf_core::{Result, SysconfigError};
use pysysconf_sysconfig::Sysconfig;

mod files;
mod query;

/// Inspect the build configuration of a Python installation
#[derive(Parser)]
#[command(name = "pysysconf", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to pysysconf.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Print configuration variables (all of them when no names are given)
    Vars {
        /// Variable names to look up
        names: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the value of one configuration variable
    Var {
        /// Variable name, e.g. CC or LDSHARED
        name: String,
    },
    /// Show where headers, libraries and build files live
    Paths {
        /// Resolve against this prefix instead of the configured one
        #[arg(long)]
        prefix: Option<PathBuf>,
    },
    /// Expand $(NAME) and ${NAME} references using the configuration variables
    Expand {
        /// Text to expand, e.g. '$(LIBDEST)/site-packages'
        text: String,
    },
    /// Show the compiler commands an extension build would use
    Compiler {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse a Makefile and print the variables it defines
    Makefile {
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse a pyconfig.h-style header and print its defines
    #[command(name = "config-h")]
    ConfigH {
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show current configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check the interpreter description and its build files
    Doctor,
    /// Generate shell completions for bash, zsh, or fish
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Show version and build info
    Version,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        // Load config first so we can use it for log format
        let config_loader = ConfigLoader::load(self.config.as_deref())?;
        let config = config_loader.get().clone();

        // Resolve log level: --verbose > --quiet > --log-level > config
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            self.log_level.as_deref().unwrap_or(config.logging.level.as_str())
        };
        init_tracing(&config.logging.format, log_level);
        debug!(
            path = %config_loader.path().display(),
            command = ?self.command,
            "configuration loaded"
        );

        match self.command {
            Commands::Vars { names, json } => query::cmd_vars(&store(&config)?, &names, json),
            Commands::Var { name } => query::cmd_var(&store(&config)?, &name),
            Commands::Paths { prefix } => query::cmd_paths(&store(&config)?, prefix.as_deref()),
            Commands::Expand { text } => query::cmd_expand(&store(&config)?, &text),
            Commands::Compiler { json } => query::cmd_compiler(&store(&config)?, json),
            Commands::Makefile { file, json } => files::cmd_makefile(&file, json),
            Commands::ConfigH { file, json } => files::cmd_config_h(&file, json),
            Commands::Config { json } => Self::cmd_config(&config, json),
            Commands::Doctor => Self::cmd_doctor(&config),
            Commands::Completions { shell } => Self::cmd_completions(shell),
            Commands::Version => Self::cmd_version(),
        }
    }

    fn cmd_config(config: &PysysconfConfig, json: bool) -> Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(config)
                    .map_err(|e| SysconfigError::Config(e.to_string()))?
            );
        }
        Ok(())
    }

    fn cmd_doctor(config: &PysysconfConfig) -> Result<()> {
        println!("🩺 pysysconf doctor");
        println!();

        let warnings = match config.validate() {
            Ok(w) => w,
            Err(e) => {
                warn!(error = %e, "configuration failed validation");
                println!("{e}");
                return Ok(());
            }
        };

        let mut warn_count = 0;
        let mut info_count = 0;
        for w in &warnings {
            println!("  {w}");
            match w.severity {
                WarningSeverity::Warning => warn_count += 1,
                WarningSeverity::Info => info_count += 1,
                WarningSeverity::Error => {}
            }
        }

        let sysconfig = store(config)?;
        let layout = sysconfig.layout();
        let mut ok_count = 0;
        let mut error_count = 0;

        if layout.is_python_build() {
            println!("  note: running from a source tree at {}", layout.project_base().display());
        }

        for (label, path) in [
            ("Makefile", sysconfig.makefile_filename()),
            ("pyconfig.h", sysconfig.config_h_filename()),
        ] {
            match path {
                Ok(p) if p.is_file() => {
                    println!("  ✅ {label}: {}", p.display());
                    ok_count += 1;
                }
                Ok(p) => {
                    println!("  ❌ {label}: {} not found", p.display());
                    error_count += 1;
                }
                Err(e) => {
                    warn!(error = %e, file = label, "could not locate build file");
                    println!("  ❌ {label}: {e}");
                    error_count += 1;
                }
            }
        }

        match sysconfig.config_vars() {
            Ok(vars) => {
                println!("  ✅ {} configuration variables loaded", vars.len());
                ok_count += 1;
            }
            Err(e) => {
                warn!(error = %e, "failed to load configuration variables");
                println!("  ❌ {e}");
                error_count += 1;
            }
        }

        println!();
        println!(
            "  ✅ {ok_count} checks passed, ❌ {error_count} failed, ⚠️  {warn_count} warnings, 💡 {info_count} suggestions"
        );
        Ok(())
    }

    fn cmd_version() -> Result<()> {
        println!("pysysconf v{}", env!("CARGO_PKG_VERSION"));
        println!("   Rust edition: 2024");
        println!("   Target: {}", std::env::consts::ARCH);
        println!("   OS: {}", std::env::consts::OS);
        #[cfg(debug_assertions)]
        println!("   Profile: debug");
        #[cfg(not(debug_assertions))]
        println!("   Profile: release");
        Ok(())
    }

    fn cmd_completions(shell: Shell) -> Result<()> {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "pysysconf", &mut std::io::stdout());
        Ok(())
    }
}

fn store(config: &PysysconfConfig) -> Result<Sysconfig> {
    Sysconfig::new(&config.interpreter)
}

/// Logs go to stderr; stdout carries command output.
fn init_tracing(format: &str, log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        "json" => builder.json().with_target(true).init(),
        "compact" => builder.compact().with_target(false).init(),
        _ => builder.with_target(false).init(),
    }
}
