use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigInvalidJson,
    ConfigInvalidValue,

    ValidationInvalidArgument,

    RegistryDuplicateName,
    PipelineNotFound,

    TaskFailed,
    CompositionFailed,
    PolicyViolation,

    ProcessFailed,
    ToolNotFound,
    FetchFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::RegistryDuplicateName => "registry.duplicate_name",
            ErrorCode::PipelineNotFound => "pipeline.not_found",

            ErrorCode::TaskFailed => "task.failed",
            ErrorCode::CompositionFailed => "composition.failed",
            ErrorCode::PolicyViolation => "policy.violation",

            ErrorCode::ProcessFailed => "process.failed",
            ErrorCode::ToolNotFound => "process.tool_not_found",
            ErrorCode::FetchFailed => "fetch.failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessFailedDetails {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyViolationDetails {
    pub policy: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// One failed leaf inside a composition failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedTaskDetails {
    pub task: String,
    /// Composition nodes between the root and the failed leaf, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.details.get("error").and_then(Value::as_str) {
            Some(cause) if !cause.is_empty() => write!(f, "{}: {}", self.message, cause),
            _ => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for Error {}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        let problem = problem.into();
        let details = to_details(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.clone(),
            id,
            tried,
        });

        Self::new(ErrorCode::ValidationInvalidArgument, problem, details)
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = to_details(ConfigInvalidJsonDetails {
            path: path.into(),
            error: err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            details,
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let details = to_details(ConfigInvalidValueDetails {
            key: key.into(),
            value,
            problem: problem.into(),
        });

        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            details,
        )
    }

    pub fn registry_duplicate_name(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorCode::RegistryDuplicateName,
            format!("Pipeline '{}' is already registered", name),
            serde_json::json!({ "name": name }),
        )
    }

    pub fn pipeline_not_found(name: impl Into<String>, available: Vec<String>) -> Self {
        let name = name.into();
        let hint = format!("Available pipelines: {}", available.join(", "));
        Self::new(
            ErrorCode::PipelineNotFound,
            format!("Pipeline '{}' not found", name),
            serde_json::json!({ "name": name, "available": available }),
        )
        .with_hint(hint)
        .with_hint("Run 'morphir-build --list' to see pipeline definitions")
    }

    /// Wraps the cause reported by a leaf collaborator with the leaf's identity.
    pub fn task_failed(task: impl Into<String>, cause: &Error) -> Self {
        let task = task.into();
        Self {
            code: ErrorCode::TaskFailed,
            message: format!("Task '{}' failed: {}", task, cause),
            details: serde_json::json!({
                "task": task,
                "cause": {
                    "code": cause.code.as_str(),
                    "message": cause.to_string(),
                    "details": cause.details,
                },
            }),
            hints: cause.hints.clone(),
            retryable: cause.retryable,
        }
    }

    pub fn composition_failed(node: impl Into<String>, failed: Vec<FailedTaskDetails>) -> Self {
        let node = node.into();
        let names: Vec<&str> = failed.iter().map(|f| f.task.as_str()).collect();
        let message = format!(
            "'{}' failed: {} task(s) failed ({})",
            node,
            failed.len(),
            names.join(", ")
        );
        Self::new(
            ErrorCode::CompositionFailed,
            message,
            serde_json::json!({ "node": node, "failed": failed }),
        )
    }

    pub fn policy_violation(
        policy: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
        source: Option<String>,
    ) -> Self {
        let details = to_details(PolicyViolationDetails {
            policy: policy.into(),
            subject: subject.into(),
            source,
        });

        Self::new(ErrorCode::PolicyViolation, message, details)
    }

    pub fn process_failed(
        command: impl Into<String>,
        exit_code: Option<i32>,
        cwd: Option<String>,
    ) -> Self {
        let command = command.into();
        let message = match exit_code {
            Some(code) => format!("Command '{}' exited with status {}", command, code),
            None => format!("Command '{}' was terminated by a signal", command),
        };
        let details = to_details(ProcessFailedDetails {
            command,
            exit_code,
            cwd,
        });

        Self::new(ErrorCode::ProcessFailed, message, details)
    }

    pub fn tool_not_found(program: impl Into<String>) -> Self {
        let program = program.into();
        Self::new(
            ErrorCode::ToolNotFound,
            format!("'{}' is not installed or not on PATH", program),
            serde_json::json!({ "program": program }),
        )
        .with_hint(format!("Install '{}' and re-run the pipeline", program))
    }

    pub fn fetch_failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        let url = url.into();
        let mut err = Self::new(
            ErrorCode::FetchFailed,
            format!("Failed to fetch {}", url),
            serde_json::json!({ "url": url, "error": error.into() }),
        );
        err.retryable = Some(true);
        err
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalIoErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalJsonErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::internal_unexpected(message)
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_underlying_cause() {
        let err = Error::internal_io("permission denied", Some("read lockfile".to_string()));
        assert_eq!(err.to_string(), "IO error: permission denied");
    }

    #[test]
    fn task_failed_keeps_cause_code_and_hints() {
        let cause = Error::tool_not_found("mill");
        let err = Error::task_failed("build-scala", &cause);

        assert_eq!(err.code, ErrorCode::TaskFailed);
        assert_eq!(err.details["task"], "build-scala");
        assert_eq!(err.details["cause"]["code"], "process.tool_not_found");
        assert_eq!(err.hints.len(), 1);
        assert!(err.message.contains("'mill' is not installed"));
    }

    #[test]
    fn pipeline_not_found_lists_available() {
        let err = Error::pipeline_not_found("bild", vec!["build".to_string(), "test".to_string()]);
        assert_eq!(err.code.as_str(), "pipeline.not_found");
        assert!(err.hints[0].message.contains("build, test"));
    }

    #[test]
    fn fetch_failures_are_retryable() {
        let err = Error::fetch_failed("https://example.com/repo", "connection reset");
        assert_eq!(err.retryable, Some(true));
        assert_eq!(err.to_string(), "Failed to fetch https://example.com/repo: connection reset");
    }
}
