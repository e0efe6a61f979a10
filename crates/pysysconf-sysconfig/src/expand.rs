use pysysconf_core::{ConfigVars, Result, SysconfigError};

use crate::makefile::find_reference;

/// Substitutions allowed before a value is assumed to expand to itself.
const MAX_SUBSTITUTIONS: usize = 1_000;

/// Expand `$(NAME)` / `${NAME}` references in `s` using `vars`.
///
/// Expansion repeats until no reference is left, so a value that itself
/// contains references is expanded in turn. `vars` should already be fully
/// resolved, as [`parse_makefile`](crate::makefile::parse_makefile) returns
/// it. Unlike the parser, a name missing from `vars` is an error.
pub fn expand_makefile_vars(s: &str, vars: &ConfigVars) -> Result<String> {
    let mut s = s.to_string();
    let mut substitutions = 0;

    while let Some(reference) = find_reference(&s) {
        let value = vars
            .get(&reference.name)
            .ok_or_else(|| SysconfigError::UndefinedVariable(reference.name.clone()))?;

        substitutions += 1;
        if substitutions > MAX_SUBSTITUTIONS {
            return Err(SysconfigError::RecursiveExpansion(reference.name));
        }

        s.replace_range(reference.start..reference.end, &value.to_string());
    }

    Ok(s)
}
