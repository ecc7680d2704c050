//! Post-call process runner
//!
//! A generator may end with one rendered command. The command is split on
//! whitespace (no shell), run synchronously, and its output logged.

use std::path::Path;
use std::process::Command;

use crate::error::{GenError, Result};

/// Captured result of a command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs post-call commands
pub trait CommandRunner {
    fn run(&self, command: &str, working_dir: &Path) -> Result<CommandOutput>;
}

/// Spawns a child process and waits for it
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, command: &str, working_dir: &Path) -> Result<CommandOutput> {
        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or_else(|| GenError::PostCall {
            command: command.to_string(),
            message: "empty command".to_string(),
        })?;

        let output = Command::new(program)
            .args(parts)
            .current_dir(working_dir)
            .output()
            .map_err(|e| GenError::PostCall {
                command: command.to_string(),
                message: e.to_string(),
            })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code(),
        })
    }
}

/// Resolve a relative program path (`scripts/gen.sh`) against `base_path`.
///
/// Bare program names are left to `PATH`.
pub fn resolve_command(command: &str, base_path: &Path) -> String {
    let command = command.trim();
    let program = command.split_whitespace().next().unwrap_or_default();
    if program.starts_with('/') || !program.contains('/') {
        return command.to_string();
    }
    format!("{}/{}", base_path.display(), command)
}
