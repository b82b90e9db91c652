//! External geometry kernel invocation.

use serde::{Deserialize, Serialize};

/// How to launch the native tessellation engine.
///
/// The command is run once per conversion with `args` after placeholder
/// substitution. Supported placeholders: `{input}`, `{format}`,
/// `{deflection}`, `{angular_deflection}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Executable path. Empty means no kernel is configured and
    /// kernel-backed input formats cannot be converted.
    pub command: String,

    /// Argument template.
    pub args: Vec<String>,

    /// Largest stdout payload accepted from the kernel, in bytes.
    pub max_output_bytes: u64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            args: default_args(),
            max_output_bytes: 512 * 1024 * 1024,
        }
    }
}

fn default_args() -> Vec<String> {
    [
        "--format",
        "{format}",
        "--deflection",
        "{deflection}",
        "--angular-deflection",
        "{angular_deflection}",
        "{input}",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl KernelConfig {
    /// Whether a kernel executable has been configured.
    pub fn is_configured(&self) -> bool {
        !self.command.trim().is_empty()
    }
}
