//! User identity resolution for CLI commands.
//!
//! The resolution chain: `--user` flag > `RETRO_USER` env > `USER` env (TTY only)
//! > `name` in the user config. Mutating commands require an identity;
//! read-only commands work without one and see public records only.

use std::env;

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
    fn is_tty(&self) -> bool;
}

/// Real environment reader.
struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    fn is_tty(&self) -> bool {
        use std::io::IsTerminal;
        std::io::stdin().is_terminal()
    }
}

fn resolve_user_with(
    cli_flag: Option<&str>,
    config_name: Option<&str>,
    env: &dyn EnvReader,
) -> Option<String> {
    if let Some(user) = cli_flag.map(str::trim).filter(|u| !u.is_empty()) {
        return Some(user.to_string());
    }

    if let Some(val) = env.get("RETRO_USER") {
        return Some(val.trim().to_string());
    }

    // USER is only trusted interactively; scripts must name themselves.
    if let Some(val) = env.get("USER").filter(|_| env.is_tty()) {
        return Some(val.trim().to_string());
    }

    config_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Resolve the acting identity, or `None` when no source names one.
pub fn resolve_user(cli_flag: Option<&str>, config_name: Option<&str>) -> Option<String> {
    resolve_user_with(cli_flag, config_name, &RealEnv)
}
