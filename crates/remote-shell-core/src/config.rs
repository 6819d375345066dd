//! Shell configuration.

use serde::{Deserialize, Serialize};

/// Script interpreter invoked by `run_script`.
pub const DEFAULT_SCRIPT_HOST: &str = "powershell";

/// Flag telling the script host its argument is base64 of a UTF-16LE script.
pub const DEFAULT_ENCODED_COMMAND_FLAG: &str = "-encodedcommand";

/// Commands a copy may run through one shell before recycling it.
pub const DEFAULT_MAX_OPERATIONS_PER_SHELL: usize = 15;

/// Settings for script invocation and shell recycling.
///
/// Every field has a default, so partial configuration documents are valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Script interpreter command.
    pub script_host: String,

    /// Flag passed to the script host before the encoded payload.
    pub encoded_command_flag: String,

    /// Operation budget handed to the copy collaborator.
    pub max_operations_per_shell: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            script_host: DEFAULT_SCRIPT_HOST.to_string(),
            encoded_command_flag: DEFAULT_ENCODED_COMMAND_FLAG.to_string(),
            max_operations_per_shell: DEFAULT_MAX_OPERATIONS_PER_SHELL,
        }
    }
}

impl ShellConfig {
    /// Override the script host command.
    #[must_use]
    pub fn script_host(mut self, host: impl Into<String>) -> Self {
        self.script_host = host.into();
        self
    }

    /// Override the encoded-command flag.
    #[must_use]
    pub fn encoded_command_flag(mut self, flag: impl Into<String>) -> Self {
        self.encoded_command_flag = flag.into();
        self
    }

    /// Override the per-shell operation budget.
    #[must_use]
    pub fn max_operations_per_shell(mut self, max: usize) -> Self {
        self.max_operations_per_shell = max;
        self
    }
}
