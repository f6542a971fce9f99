//! Captured-output command primitives.
//!
//! Pipeline steps that stream to the terminal go through `process`; these
//! helpers are for short checks whose output the caller inspects.

use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command, Output};

use crate::error::{Error, Result};

/// Run a command in `dir` and return its trimmed stdout on success.
pub fn run_in(dir: &Path, program: &str, args: &[&str], context: &str) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::tool_not_found(program)
            } else {
                Error::internal_io(
                    format!("Failed to run {}: {}", context, e),
                    Some(context.to_string()),
                )
            }
        })?;

    if !output.status.success() {
        let mut err = Error::process_failed(
            format!("{} {}", program, args.join(" ")),
            output.status.code(),
            Some(dir.display().to_string()),
        );
        err.details["stderr"] = serde_json::Value::String(error_text(&output));
        return Err(err);
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Whether `program` can be spawned at all. Exit status is ignored.
pub fn is_available(program: &str) -> bool {
    match Command::new(program).arg("--version").output() {
        Ok(_) => true,
        Err(e) => e.kind() != ErrorKind::NotFound,
    }
}

/// Extract error text from command output.
///
/// Prefers stderr, falls back to stdout if stderr is empty.
pub fn error_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        stderr.trim().to_string()
    } else {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_in_returns_trimmed_stdout() {
        let result = run_in(Path::new("/tmp"), "echo", &["hello"], "echo test");
        assert_eq!(result.unwrap(), "hello");
    }

    #[test]
    fn run_in_reports_missing_tool() {
        let err = run_in(Path::new("/tmp"), "nonexistent_command_xyz", &[], "version check").unwrap_err();
        assert_eq!(err.code.as_str(), "process.tool_not_found");
    }

    #[test]
    fn run_in_reports_exit_status_and_stderr() {
        let err = run_in(
            Path::new("/tmp"),
            "sh",
            &["-c", "echo broken >&2; exit 3"],
            "failing check",
        )
        .unwrap_err();
        assert_eq!(err.code.as_str(), "process.failed");
        assert_eq!(err.details["exitCode"], 3);
        assert_eq!(err.details["stderr"], "broken");
    }

    #[test]
    fn availability_check() {
        assert!(is_available("sh"));
        assert!(!is_available("nonexistent_command_xyz"));
    }

    #[test]
    fn error_text_prefers_stderr() {
        let output = Output {
            status: std::process::ExitStatus::default(),
            stdout: b"stdout content".to_vec(),
            stderr: b"stderr content".to_vec(),
        };
        assert_eq!(error_text(&output), "stderr content");
    }

    #[test]
    fn error_text_falls_back_to_stdout() {
        let output = Output {
            status: std::process::ExitStatus::default(),
            stdout: b"stdout content".to_vec(),
            stderr: b"".to_vec(),
        };
        assert_eq!(error_text(&output), "stdout content");
    }
}
