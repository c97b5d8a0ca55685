//! Runtime configuration types.
//!
//! These types hold the concrete values that drive runtime behavior. In most
//! cases you should use [`RuntimeBuilder`](super::builder::RuntimeBuilder) to
//! construct a runtime rather than creating a [`RuntimeConfig`] directly.
//!
//! # Defaults
//!
//! | Field | Default |
//! |-------|---------|
//! | `name` | `"effectum"` |
//! | `log_defects` | true |
//! | `root_context` | empty |

use crate::env::Context;

/// Default runtime name.
pub const DEFAULT_RUNTIME_NAME: &str = "effectum";

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Name attached to the runtime's log events.
    pub name: String,
    /// Emit a `warn!` event whenever a run ends in a defect.
    pub log_defects: bool,
    /// Dependency context installed in every root environment.
    pub root_context: Context,
}

impl RuntimeConfig {
    /// Normalize configuration values to safe defaults.
    pub fn normalize(&mut self) {
        let trimmed = self.name.trim();
        if trimmed.len() != self.name.len() {
            self.name = trimmed.to_string();
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_RUNTIME_NAME.to_string(),
            log_defects: true,
            root_context: Context::new(),
        }
    }
}
