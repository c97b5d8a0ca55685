//! Environment variable support for [`RuntimeBuilder`](super::builder::RuntimeBuilder).
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic**: values set via builder methods (`log_defects(false)`)
//! 2. **Environment variables**: values from `EFFECTUM_*` env vars
//! 3. **Defaults**: built-in defaults from [`RuntimeConfig::default()`]
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `EFFECTUM_RUNTIME_NAME` | `String` | `name` |
//! | `EFFECTUM_LOG_DEFECTS` | `bool` | `log_defects` |

use crate::error::ConfigError;
use crate::runtime::config::RuntimeConfig;

/// Environment variable name for the runtime name.
pub const ENV_RUNTIME_NAME: &str = "EFFECTUM_RUNTIME_NAME";
/// Environment variable name for the defect logging toggle.
pub const ENV_LOG_DEFECTS: &str = "EFFECTUM_LOG_DEFECTS";

/// Apply environment variable overrides to a [`RuntimeConfig`].
///
/// Only variables that are set in the environment are applied.
/// Returns an error if a variable is set but contains an unparseable value.
pub fn apply_env_overrides(config: &mut RuntimeConfig) -> Result<(), ConfigError> {
    if let Some(val) = read_env(ENV_RUNTIME_NAME) {
        config.name = val;
    }
    if let Some(val) = read_env(ENV_LOG_DEFECTS) {
        config.log_defects = parse_bool(ENV_LOG_DEFECTS, &val)?;
    }
    Ok(())
}

/// Read an environment variable, returning `None` if unset.
fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_bool(var: &'static str, val: &str) -> Result<bool, ConfigError> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var,
            value: val.to_string(),
            expected: "bool (true/false/1/0/yes/no)",
        }),
    }
}
