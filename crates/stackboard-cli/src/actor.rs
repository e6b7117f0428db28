//! Acting-user resolution for CLI commands.
//!
//! The resolution chain: `--user` flag > `STACKBOARD_USER` env > `USER` env.
//! Reorders require a user; reads use one only to resolve `@me`.

use crate::output::CliError;
use stackboard_core::error::ErrorCode;
use std::env;

/// Environment reader trait for dependency injection in tests.
trait EnvReader {
    fn get(&self, key: &str) -> Option<String>;
}

struct RealEnv;

impl EnvReader for RealEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

fn resolve_actor_with(cli_flag: Option<&str>, env: &dyn EnvReader) -> Option<String> {
    if let Some(user) = cli_flag.map(str::trim).filter(|u| !u.is_empty()) {
        return Some(user.to_string());
    }

    env.get("STACKBOARD_USER").or_else(|| env.get("USER"))
}

/// Resolve the acting user, or `None` when nothing is set.
pub fn resolve_actor(cli_flag: Option<&str>) -> Option<String> {
    resolve_actor_with(cli_flag, &RealEnv)
}

/// Resolve the acting user for a mutating command.
pub fn require_actor(cli_flag: Option<&str>) -> Result<String, CliError> {
    resolve_actor(cli_flag).ok_or_else(|| {
        CliError {
            message: "a user identity is required for this command".to_string(),
            suggestion: Some("Pass --user or set STACKBOARD_USER.".to_string()),
            error_code: Some(ErrorCode::InvalidPayload.code().to_string()),
        }
    })
}
