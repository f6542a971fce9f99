//! JSON envelope written to stdout and the error-code to exit-code map.
//!
//! Every invocation prints exactly one envelope: `{"success": true, "data": ...}`
//! for a finished command, `{"success": false, "error": ...}` otherwise.

use std::io::{self, Write};

use morphir_build::error::Hint;
use morphir_build::{Error, ErrorCode, Result};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
struct Envelope {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    details: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    hints: Vec<Hint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retryable: Option<bool>,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        Self {
            code: err.code.as_str(),
            message: err.message.clone(),
            details: err.details.clone(),
            hints: err.hints.clone(),
            retryable: err.retryable,
        }
    }
}

impl Envelope {
    fn from_result(result: Result<Value>) -> Self {
        match result {
            Ok(data) => Self {
                success: true,
                data: Some(data),
                error: None,
            },
            Err(err) => Self {
                success: false,
                data: None,
                error: Some(ErrorBody::from(&err)),
            },
        }
    }
}

/// Serialize a command result into its data and exit code.
pub fn map_cmd_result_to_json<T: Serialize>(result: Result<(T, i32)>) -> (Result<Value>, i32) {
    match result {
        Ok((data, exit_code)) => match serde_json::to_value(data) {
            Ok(value) => (Ok(value), exit_code),
            Err(err) => (
                Err(Error::internal_json(err.to_string(), Some("serialize response".to_string()))),
                1,
            ),
        },
        Err(err) => {
            let exit_code = exit_code_for_error(err.code);
            (Err(err), exit_code)
        }
    }
}

fn exit_code_for_error(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::ConfigInvalidJson
        | ErrorCode::ConfigInvalidValue
        | ErrorCode::ValidationInvalidArgument
        | ErrorCode::RegistryDuplicateName => 2,

        ErrorCode::PolicyViolation => 3,

        ErrorCode::PipelineNotFound => 4,

        ErrorCode::TaskFailed
        | ErrorCode::CompositionFailed
        | ErrorCode::ProcessFailed
        | ErrorCode::ToolNotFound
        | ErrorCode::FetchFailed => 1,

        ErrorCode::InternalIoError | ErrorCode::InternalJsonError | ErrorCode::InternalUnexpected => 1,
    }
}

fn render(result: Result<Value>) -> Result<String> {
    serde_json::to_string_pretty(&Envelope::from_result(result))
        .map_err(|e| Error::internal_json(e.to_string(), Some("serialize response".to_string())))
}

pub fn print_json_result(result: Result<Value>) -> Result<()> {
    let payload = render(result)?;
    let mut stdout = io::stdout().lock();
    match writeln!(stdout, "{}", payload) {
        Ok(()) => Ok(()),
        // Reader went away (`morphir-build --list | head`).
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Err(e) => Err(Error::internal_io(e.to_string(), Some("write stdout".to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(result: Result<Value>) -> Value {
        serde_json::from_str(&render(result).unwrap()).unwrap()
    }

    #[test]
    fn policy_violation_exits_with_three() {
        let err = Error::policy_violation("runtime-dependency", "binwrap", "detected", None);
        let (result, code) = map_cmd_result_to_json::<()>(Err(err));
        assert!(result.is_err());
        assert_eq!(code, 3);
    }

    #[test]
    fn unknown_pipeline_exits_with_four() {
        let err = Error::pipeline_not_found("bild", vec!["build".to_string()]);
        assert_eq!(map_cmd_result_to_json::<()>(Err(err)).1, 4);
    }

    #[test]
    fn success_keeps_command_exit_code() {
        let (result, code) = map_cmd_result_to_json(Ok((serde_json::json!({"pipeline": "clean"}), 0)));
        assert_eq!(result.unwrap()["pipeline"], "clean");
        assert_eq!(code, 0);
    }

    #[test]
    fn success_envelope_has_data_only() {
        let json = parsed(Ok(serde_json::json!({"pipeline": "clean", "status": "success"})));
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["pipeline"], "clean");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn error_envelope_carries_hints() {
        let json = parsed(Err(Error::pipeline_not_found("bild", vec!["build".to_string()])));
        assert_eq!(json["success"], false);
        assert!(json.get("data").is_none());
        assert_eq!(json["error"]["code"], "pipeline.not_found");
        assert!(json["error"]["hints"].is_array());
    }

    #[test]
    fn error_envelope_omits_empty_hints() {
        let json = parsed(Err(Error::internal_unexpected("boom")));
        assert_eq!(json["error"]["code"], "internal.unexpected");
        assert!(json["error"].get("hints").is_none());
    }
}
