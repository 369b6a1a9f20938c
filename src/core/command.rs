//! External program wrapper for schema generation and autofill
//!
//! Shells out to a configured command. The request is written to the
//! program's stdin as JSON and the response is read from its stdout.
//! All arguments are passed via std::process::Command args, never a shell.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

use crate::core::services::{
    AutofillRequest, AutofillResponse, Autofiller, ExternalCallError, GenerationRequest,
    GenerationResponse, SchemaGenerator,
};

/// Errors that can occur while running an external program
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("No {what} command configured")]
    NotConfigured { what: String },

    #[error("Failed to start '{program}': {message}")]
    SpawnFailed { program: String, message: String },

    #[error("{message}")]
    Failed { message: String },

    #[error("Unreadable response from '{program}': {message}")]
    InvalidResponse { program: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CommandError> for ExternalCallError {
    fn from(err: CommandError) -> Self {
        ExternalCallError::new(err.to_string())
    }
}

/// Client for a JSON-over-stdio external program
#[derive(Debug, Clone)]
pub struct CommandClient {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandClient {
    /// Build a client from a command line such as `"./gen.sh --fast"`
    pub fn from_command_line(what: &str, command_line: &str) -> Result<Self, CommandError> {
        let mut parts = command_line.split_whitespace().map(String::from);
        let program = parts.next().ok_or_else(|| CommandError::NotConfigured {
            what: what.to_string(),
        })?;
        Ok(Self {
            program,
            args: parts.collect(),
            working_dir: None,
        })
    }

    /// Run the program from this directory
    pub fn with_working_dir(mut self, dir: &Path) -> Self {
        self.working_dir = Some(dir.to_path_buf());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Send one request and decode the response
    pub fn call<Req, Resp>(&self, request: &Req) -> Result<Resp, CommandError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let input = serde_json::to_vec(request).map_err(|e| CommandError::InvalidResponse {
            program: self.program.clone(),
            message: e.to_string(),
        })?;

        tracing::debug!(program = %self.program, args = ?self.args, "calling external program");

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(ref dir) = self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| CommandError::SpawnFailed {
            program: self.program.clone(),
            message: e.to_string(),
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A program that exits without reading is reported by its status
            if let Err(e) = stdin.write_all(&input) {
                tracing::debug!(error = %e, "external program closed stdin early");
            }
        }

        let output = child.wait_with_output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("'{}' exited with {}", self.program, output.status)
            } else {
                stderr
            };
            tracing::warn!(program = %self.program, %message, "external program failed");
            return Err(CommandError::Failed { message });
        }

        let value: Value =
            serde_json::from_slice(&output.stdout).map_err(|e| CommandError::InvalidResponse {
                program: self.program.clone(),
                message: e.to_string(),
            })?;

        if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
            let message = error
                .as_str()
                .map(String::from)
                .unwrap_or_else(|| error.to_string());
            tracing::warn!(program = %self.program, %message, "external program reported an error");
            return Err(CommandError::Failed { message });
        }

        serde_json::from_value(value).map_err(|e| CommandError::InvalidResponse {
            program: self.program.clone(),
            message: e.to_string(),
        })
    }
}

impl SchemaGenerator for CommandClient {
    fn generate_schema(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ExternalCallError> {
        Ok(self.call(request)?)
    }
}

impl Autofiller for CommandClient {
    fn autofill(&self, request: &AutofillRequest) -> Result<AutofillResponse, ExternalCallError> {
        Ok(self.call(request)?)
    }
}

/// Generator that answers every request with the same document
///
/// Used for hand-authored schema files in place of a generator program.
#[derive(Debug, Clone)]
pub struct StaticGenerator {
    schema: Value,
}

impl StaticGenerator {
    pub fn new(schema: Value) -> Self {
        Self { schema }
    }

    /// Read a schema document from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, ExternalCallError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ExternalCallError::new(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let schema = serde_json::from_str(&contents).map_err(|e| {
            ExternalCallError::new(format!("{} is not valid JSON: {}", path.display(), e))
        })?;
        Ok(Self::new(schema))
    }
}

impl SchemaGenerator for StaticGenerator {
    fn generate_schema(
        &self,
        _request: &GenerationRequest,
    ) -> Result<GenerationResponse, ExternalCallError> {
        Ok(GenerationResponse {
            schema: self.schema.clone(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::services::InterviewAnswers;
    use serde_json::json;

    fn request() -> GenerationRequest {
        GenerationRequest {
            name: "Acme".into(),
            description: String::new(),
            domain: String::new(),
            interview_answers: InterviewAnswers {
                directory_type: "orgs".into(),
                ..Default::default()
            },
        }
    }

    fn script(dir: &Path, body: &str) -> String {
        let path = dir.join("program.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        format!("sh {}", path.display())
    }

    #[test]
    fn test_empty_command_line_not_configured() {
        let err = CommandClient::from_command_line("generator", "   ").unwrap_err();
        assert!(matches!(err, CommandError::NotConfigured { .. }));
    }

    #[test]
    fn test_generate_schema_success() {
        let tmp = tempfile::tempdir().unwrap();
        let cmd = script(
            tmp.path(),
            r#"cat > /dev/null; echo '{"schema": {"properties": {"name": {"type": "string"}}}}'"#,
        );
        let client = CommandClient::from_command_line("generator", &cmd).unwrap();
        let response = client.generate_schema(&request()).unwrap();
        assert_eq!(response.schema["properties"]["name"]["type"], json!("string"));
    }

    #[test]
    fn test_request_is_sent_on_stdin() {
        let tmp = tempfile::tempdir().unwrap();
        // Echo the request back inside the schema slot
        let cmd = script(tmp.path(), r#"printf '{"schema": '; cat; printf '}'"#);
        let client = CommandClient::from_command_line("generator", &cmd).unwrap();
        let response = client.generate_schema(&request()).unwrap();
        assert_eq!(response.schema["interviewAnswers"]["directoryType"], json!("orgs"));
    }

    #[test]
    fn test_failure_message_is_stderr_verbatim() {
        let tmp = tempfile::tempdir().unwrap();
        let cmd = script(tmp.path(), "cat > /dev/null; echo 'quota exceeded' >&2; exit 3");
        let client = CommandClient::from_command_line("generator", &cmd).unwrap();
        let err = client.generate_schema(&request()).unwrap_err();
        assert_eq!(err.message(), "quota exceeded");
    }

    #[test]
    fn test_error_field_becomes_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let cmd = script(tmp.path(), r#"cat > /dev/null; echo '{"error": "unknown entity"}'"#);
        let client = CommandClient::from_command_line("autofill", &cmd).unwrap();
        let err = client
            .autofill(&AutofillRequest {
                directory_id: crate::core::identity::RecordId::new(
                    crate::core::identity::RecordPrefix::Dir,
                ),
                entity_name: "Nobody".into(),
            })
            .unwrap_err();
        assert_eq!(err.message(), "unknown entity");
    }

    #[test]
    fn test_garbage_output_is_invalid_response() {
        let tmp = tempfile::tempdir().unwrap();
        let cmd = script(tmp.path(), "cat > /dev/null; echo 'not json'");
        let client = CommandClient::from_command_line("generator", &cmd).unwrap();
        let err = client.generate_schema(&request()).unwrap_err();
        assert!(err.message().starts_with("Unreadable response from 'sh'"));
    }

    #[test]
    fn test_missing_program_spawn_failure() {
        let client =
            CommandClient::from_command_line("generator", "tdk-no-such-program-xyz").unwrap();
        let err = client.generate_schema(&request()).unwrap_err();
        assert!(err.message().contains("Failed to start"));
    }

    #[test]
    fn test_static_generator_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("schema.json");
        std::fs::write(&path, r#"{"properties": {"city": {}}}"#).unwrap();
        let generator = StaticGenerator::from_file(&path).unwrap();
        let response = generator.generate_schema(&request()).unwrap();
        assert!(response.schema["properties"].get("city").is_some());

        std::fs::write(&path, "{").unwrap();
        assert!(StaticGenerator::from_file(&path).is_err());
    }
}
