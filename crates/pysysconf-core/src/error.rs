use thiserror::Error;

/// Unified error type for pysysconf.
#[derive(Error, Debug)]
pub enum SysconfigError {
    // ── Platform configuration errors ──────────────────────────
    #[error("{0}")]
    Platform(String),

    #[error("I don't know where Python installs its {what} on platform '{os}'")]
    UnknownPlatform { os: String, what: String },

    #[error(
        "$MACOSX_DEPLOYMENT_TARGET mismatch: now \"{current}\" but \"{configured}\" during configure"
    )]
    DeploymentTarget { current: String, configured: String },

    // ── Expansion errors ───────────────────────────────────────
    #[error("undefined variable in expansion: {0}")]
    UndefinedVariable(String),

    #[error("variable keeps expanding to further references: {0}")]
    RecursiveExpansion(String),

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl SysconfigError {
    /// The error raised when one of the installation's generated files can't be read.
    pub fn unreadable(path: &std::path::Path, err: &std::io::Error) -> Self {
        SysconfigError::Platform(format!(
            "invalid Python installation: unable to open {} ({})",
            path.display(),
            strerror(err)
        ))
    }
}

/// The OS reason string without Rust's "(os error N)" suffix.
fn strerror(err: &std::io::Error) -> String {
    let text = err.to_string();
    match text.rfind(" (os error") {
        Some(pos) => text[..pos].to_string(),
        None => text,
    }
}

pub type Result<T> = std::result::Result<T, SysconfigError>;
