//! Subprocess collaborator.
//!
//! Runs a command to completion with the terminal's stdio inherited and maps
//! the exit status to success or failure. Optional commands treat a missing
//! executable as a soft skip.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    /// Downgrade "not installed" to a warning.
    pub optional: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Completed,
    Skipped,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            optional: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append a path argument.
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Command line as shown in logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(display_arg)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn display_arg(arg: &str) -> String {
    if arg.is_empty() {
        "''".to_string()
    } else if arg.contains(|c: char| c.is_whitespace() || c == '\'' || c == '"') {
        format!("'{}'", arg.replace('\'', "'\\''"))
    } else {
        arg.to_string()
    }
}

/// Run `spec` with inherited stdio.
///
/// A missing working directory is reported as such before spawning, so
/// "not found" from the spawn always means the program itself is missing.
pub fn run(spec: &ProcessSpec) -> Result<ProcessStatus> {
    let command_line = spec.display();

    if let Some(dir) = &spec.cwd {
        if !dir.is_dir() {
            return Err(Error::internal_io(
                format!("Working directory {} does not exist", dir.display()),
                Some(format!("spawn {}", command_line)),
            ));
        }
    }

    crate::log_status!("exec", "Running: {}", command_line);

    let mut command = Command::new(&spec.program);
    command.args(&spec.args);
    if let Some(dir) = &spec.cwd {
        command.current_dir(dir);
    }
    for (key, value) in &spec.env {
        command.env(key, value);
    }

    let status = match command.status() {
        Ok(status) => status,
        Err(e) if e.kind() == ErrorKind::NotFound && spec.optional => {
            tracing::warn!(
                "Skipping `{}` as `{}` isn't available",
                command_line,
                spec.program
            );
            return Ok(ProcessStatus::Skipped);
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(Error::tool_not_found(&spec.program));
        }
        Err(e) => {
            return Err(Error::internal_io(
                e.to_string(),
                Some(format!("spawn {}", command_line)),
            ));
        }
    };

    if status.success() {
        Ok(ProcessStatus::Completed)
    } else {
        Err(Error::process_failed(
            command_line,
            status.code(),
            spec.cwd.as_ref().map(|dir| dir.display().to_string()),
        ))
    }
}
