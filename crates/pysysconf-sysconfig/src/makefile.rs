//! Makefile variable parser.
//!
//! Only `NAME = VALUE` assignments are understood. Values referencing other
//! variables through `$(NAME)` or `${NAME}` are expanded eagerly, falling
//! back to the environment like `make` does. Rules, conditionals and
//! includes are ignored.

use pysysconf_core::value::parse_int;
use pysysconf_core::{ConfigValue, ConfigVars, Environment};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::text_file;

static VARIABLE_RX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-zA-Z][a-zA-Z0-9_]*)\s*=\s*(.*)").unwrap());
static PAREN_REF_RX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\(([A-Za-z][A-Za-z0-9_]*)\)").unwrap());
static BRACE_REF_RX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z][A-Za-z0-9_]*)\}").unwrap());

/// Variables the Makefile also defines with a `PY_` prefix. The prefixed
/// form is published under the bare name once resolved.
pub const RENAMED_VARIABLES: [&str; 3] = ["CFLAGS", "LDFLAGS", "CPPFLAGS"];

/// Upper bound on resolution sweeps before leftovers are forced to resolve.
pub const MAX_SWEEPS: usize = 1000;

/// A `$(NAME)` or `${NAME}` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub start: usize,
    pub end: usize,
    pub name: String,
}

/// First variable reference in `text`. The parenthesised form wins even when
/// a braced reference appears earlier.
pub fn find_reference(text: &str) -> Option<Reference> {
    let caps = PAREN_REF_RX
        .captures(text)
        .or_else(|| BRACE_REF_RX.captures(text))?;
    let whole = caps.get(0)?;
    Some(Reference {
        start: whole.start(),
        end: whole.end(),
        name: caps[1].to_string(),
    })
}

/// Whether `text` still needs expansion once `$$` escapes are set aside.
fn has_live_reference(text: &str) -> bool {
    text.replace("$$", "").contains('$')
}

fn renamed_base(name: &str) -> Option<&str> {
    name.strip_prefix("PY_")
        .filter(|base| RENAMED_VARIABLES.contains(base))
}

/// Parse the Makefile at `path` into a fresh mapping.
pub fn parse_makefile(path: &Path, env: &dyn Environment) -> std::io::Result<ConfigVars> {
    let mut vars = ConfigVars::new();
    parse_makefile_into(path, env, &mut vars)?;
    Ok(vars)
}

/// Parse the Makefile at `path`, merging its variables into `vars`.
pub fn parse_makefile_into(
    path: &Path,
    env: &dyn Environment,
    vars: &mut ConfigVars,
) -> std::io::Result<()> {
    info!(path = %path.display(), "parsing makefile");
    let lines = text_file::read_logical_lines(path)?;
    vars.extend(parse_makefile_lines(&lines, env));
    Ok(())
}

/// Parse Makefile source text.
pub fn parse_makefile_str(content: &str, env: &dyn Environment) -> ConfigVars {
    parse_makefile_lines(&text_file::logical_lines(content), env)
}

/// Resolve already-joined logical lines.
pub fn parse_makefile_lines<S: AsRef<str>>(lines: &[S], env: &dyn Environment) -> ConfigVars {
    let mut resolver = Resolver::new(env);

    for line in lines {
        let Some(caps) = VARIABLE_RX.captures(line.as_ref()) else {
            continue;
        };
        let name = caps[1].to_string();
        let value = caps[2].trim();

        if has_live_reference(value) {
            resolver.pending.insert(name, value.to_string());
        } else {
            let literal = match parse_int(value) {
                Some(n) => ConfigValue::Int(n),
                None => ConfigValue::Str(value.replace("$$", "$")),
            };
            resolver.done.insert(name, literal);
        }
    }

    resolver.run()
}

/// Pending variables in definition order. Redefining a name keeps its
/// original position.
#[derive(Default)]
struct Pending {
    order: Vec<String>,
    values: HashMap<String, String>,
}

impl Pending {
    fn insert(&mut self, name: String, value: String) {
        if !self.values.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.values.insert(name, value);
    }

    fn remove(&mut self, name: &str) {
        if self.values.remove(name).is_some() {
            self.order.retain(|n| n != name);
        }
    }

    fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    fn get(&self, name: &str) -> Option<&String> {
        self.values.get(name)
    }

    fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

enum Lookup {
    Found(String),
    Deferred,
}

struct Resolver<'a> {
    done: ConfigVars,
    pending: Pending,
    env: &'a dyn Environment,
}

impl<'a> Resolver<'a> {
    fn new(env: &'a dyn Environment) -> Self {
        Self {
            done: ConfigVars::new(),
            pending: Pending::default(),
            env,
        }
    }

    fn run(mut self) -> ConfigVars {
        let mut sweeps = 0;
        while !self.pending.is_empty() {
            if sweeps >= MAX_SWEEPS {
                self.finish_leftovers();
                break;
            }
            sweeps += 1;
            if !self.sweep() {
                self.break_cycle();
            }
        }

        for value in self.done.values_mut() {
            if let ConfigValue::Str(s) = value {
                let trimmed = s.trim();
                if trimmed.len() != s.len() {
                    *s = trimmed.to_string();
                }
            }
        }
        self.done
    }

    /// One pass over every pending variable, expanding at most one reference
    /// each. Returns whether anything changed.
    fn sweep(&mut self) -> bool {
        let mut progress = false;

        for name in self.pending.names() {
            let Some(value) = self.pending.get(&name).cloned() else {
                continue;
            };

            let Some(reference) = find_reference(&value) else {
                debug!(variable = %name, value = %value, "dropping malformed variable reference");
                self.pending.remove(&name);
                progress = true;
                continue;
            };

            let Lookup::Found(item) = self.lookup(&name, &reference.name) else {
                continue;
            };

            progress = true;
            self.substitute(&name, &value, &reference, &item);
        }

        progress
    }

    /// Called when a sweep stalls: every pending variable waits on another
    /// pending one, so at least one of them sits on a cycle. Expand the first
    /// reference of one cycle member to the empty string and leave the rest
    /// to ordinary sweeps, so variables merely downstream of the cycle still
    /// see the final values.
    fn break_cycle(&mut self) {
        let names = self.pending.names();
        let Some(name) = names
            .iter()
            .find(|name| self.on_cycle(name))
            .or_else(|| names.first())
            .cloned()
        else {
            return;
        };
        let Some(value) = self.pending.get(&name).cloned() else {
            return;
        };
        let Some(reference) = find_reference(&value) else {
            self.pending.remove(&name);
            return;
        };

        warn!(
            variable = %name,
            reference = %reference.name,
            "circular variable reference, substituting an empty string"
        );
        self.substitute(&name, &value, &reference, "");
    }

    /// Pending variable that `name`'s first reference is waiting on, if any.
    fn waits_on(&self, name: &str) -> Option<String> {
        let reference = find_reference(self.pending.get(name)?)?;
        let referenced = reference.name;
        if self.done.contains_key(&referenced) {
            return None;
        }
        if self.pending.contains(&referenced) {
            return Some(referenced);
        }
        if self.env.contains(&referenced) {
            return None;
        }
        if RENAMED_VARIABLES.contains(&referenced.as_str()) && renamed_base(name).is_none() {
            let prefixed = format!("PY_{referenced}");
            if self.pending.contains(&prefixed) {
                return Some(prefixed);
            }
        }
        None
    }

    /// Whether following first references from `start` leads back to it.
    fn on_cycle(&self, start: &str) -> bool {
        let mut seen = HashSet::new();
        let mut current = start.to_string();
        while let Some(next) = self.waits_on(&current) {
            if next == start {
                return true;
            }
            if !seen.insert(next.clone()) {
                return false;
            }
            current = next;
        }
        false
    }

    fn lookup(&mut self, name: &str, referenced: &str) -> Lookup {
        if let Some(value) = self.done.get(referenced) {
            return Lookup::Found(value.to_string());
        }
        if self.pending.contains(referenced) {
            return Lookup::Deferred;
        }
        if let Some(value) = self.env.var(referenced) {
            return Lookup::Found(value);
        }
        if RENAMED_VARIABLES.contains(&referenced) {
            // PY_CFLAGS referring to $(CFLAGS) would otherwise pull the
            // flags in twice.
            if renamed_base(name).is_some() {
                return Lookup::Found(String::new());
            }
            let prefixed = format!("PY_{referenced}");
            if self.pending.contains(&prefixed) {
                return Lookup::Deferred;
            }
            if let Some(value) = self.done.get(&prefixed) {
                return Lookup::Found(value.to_string());
            }
        }
        self.done
            .insert(referenced.to_string(), ConfigValue::Str(String::new()));
        Lookup::Found(String::new())
    }

    fn substitute(&mut self, name: &str, value: &str, reference: &Reference, item: &str) {
        let after = &value[reference.end..];
        let expanded = format!("{}{}{}", &value[..reference.start], item, after);

        if has_live_reference(after) {
            self.pending.insert(name.to_string(), expanded);
        } else {
            self.pending.remove(name);
            self.publish(name, &expanded);
        }
    }

    fn publish(&mut self, name: &str, text: &str) {
        if let Some(base) = renamed_base(name) {
            // The alias keeps the untrimmed text until the final trim, so
            // references resolved against it in the meantime see it as is.
            if !self.done.contains_key(base) {
                self.done.insert(base.to_string(), ConfigValue::parse(text));
            }
        }
        let resolved = match parse_int(text) {
            Some(n) => ConfigValue::Int(n),
            None => ConfigValue::Str(text.trim().to_string()),
        };
        self.done.insert(name.to_string(), resolved);
    }

    fn finish_leftovers(&mut self) {
        warn!(
            pending = ?self.pending.names(),
            "variable expansion did not settle, blanking remaining references"
        );
        for name in self.pending.names() {
            let Some(value) = self.pending.get(&name).cloned() else {
                continue;
            };
            let blanked = PAREN_REF_RX.replace_all(&value, "");
            let blanked = BRACE_REF_RX.replace_all(&blanked, "");
            self.pending.remove(&name);
            self.publish(&name, &blanked);
        }
    }
}
