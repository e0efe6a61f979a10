use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Interpreter OS family, the value of Python's `os.name`.
///
/// Install layouts are only known for `posix`, `nt` and `os2`; anything else
/// is carried through so path helpers can name it in their errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OsFamily {
    Posix,
    Nt,
    Os2,
    Other(String),
}

impl OsFamily {
    pub fn current() -> Self {
        #[cfg(unix)]
        {
            OsFamily::Posix
        }
        #[cfg(windows)]
        {
            OsFamily::Nt
        }
        #[cfg(not(any(unix, windows)))]
        {
            OsFamily::Other(std::env::consts::FAMILY.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OsFamily::Posix => "posix",
            OsFamily::Nt => "nt",
            OsFamily::Os2 => "os2",
            OsFamily::Other(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, OsFamily::Other(_))
    }
}

impl From<String> for OsFamily {
    fn from(s: String) -> Self {
        match s.as_str() {
            "posix" => OsFamily::Posix,
            "nt" => OsFamily::Nt,
            "os2" => OsFamily::Os2,
            _ => OsFamily::Other(s),
        }
    }
}

impl From<&str> for OsFamily {
    fn from(s: &str) -> Self {
        OsFamily::from(s.to_string())
    }
}

impl From<OsFamily> for String {
    fn from(os: OsFamily) -> Self {
        os.as_str().to_string()
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `sys.platform` for the host, as the interpreter would report it.
pub fn current_platform() -> &'static str {
    match std::env::consts::OS {
        "linux" => "linux2",
        "macos" => "darwin",
        "windows" => "win32",
        "freebsd" => "freebsd8",
        other => other,
    }
}

/// Major/minor interpreter version, ordered numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PythonVersion {
    pub major: u32,
    pub minor: u32,
}

impl PythonVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// `"32"` for 3.2, used by the Windows `VERSION` variable.
    pub fn nodot(&self) -> String {
        format!("{}{}", self.major, self.minor)
    }
}

impl Default for PythonVersion {
    fn default() -> Self {
        Self::new(3, 2)
    }
}

impl FromStr for PythonVersion {
    type Err = String;

    /// Accepts `"3.2"` as well as a full `"3.2.1"`; the patchlevel is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('.');
        let major = parts
            .next()
            .and_then(|p| p.parse::<u32>().ok())
            .ok_or_else(|| format!("invalid python version '{s}'"))?;
        let minor = parts
            .next()
            .and_then(|p| p.parse::<u32>().ok())
            .ok_or_else(|| format!("invalid python version '{s}'"))?;
        Ok(Self { major, minor })
    }
}

impl TryFrom<String> for PythonVersion {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PythonVersion> for String {
    fn from(v: PythonVersion) -> Self {
        v.to_string()
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
