//! `pyconfig.h` parser.

use pysysconf_core::{ConfigValue, ConfigVars};
use regex::Regex;
use std::io::BufRead;
use std::path::Path;
use std::sync::LazyLock;
use tracing::info;

static DEFINE_RX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#define ([A-Z][A-Za-z0-9_]+) (.*)$").unwrap());
static UNDEF_RX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/[*] #undef ([A-Z][A-Za-z0-9_]+) [*]/$").unwrap());

/// Parse the header at `path`, merging its defines into `vars`.
pub fn parse_config_h_file(path: &Path, vars: &mut ConfigVars) -> std::io::Result<()> {
    info!(path = %path.display(), "parsing config header");
    let file = std::fs::File::open(path)?;
    parse_config_h(std::io::BufReader::new(file), vars)
}

/// `#define NAME VALUE` lines become variables (integers when they parse),
/// `/* #undef NAME */` markers become `0`. Everything else is ignored.
pub fn parse_config_h<R: BufRead>(mut reader: R, vars: &mut ConfigVars) -> std::io::Result<()> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        if let Some((name, value)) = parse_line(line) {
            vars.insert(name, value);
        }
    }
    Ok(())
}

pub fn parse_config_h_str(content: &str) -> ConfigVars {
    let mut vars = ConfigVars::new();
    for line in content.lines() {
        if let Some((name, value)) = parse_line(line) {
            vars.insert(name, value);
        }
    }
    vars
}

fn parse_line(line: &str) -> Option<(String, ConfigValue)> {
    if let Some(caps) = DEFINE_RX.captures(line) {
        return Some((caps[1].to_string(), ConfigValue::parse(&caps[2])));
    }
    UNDEF_RX
        .captures(line)
        .map(|caps| (caps[1].to_string(), ConfigValue::Int(0)))
}
