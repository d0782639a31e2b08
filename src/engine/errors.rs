use thiserror::Error;

use crate::external::CommandError;

/// How the caller should treat an engine failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Worth another attempt later: lock contention, a timed-out call.
    Transient,
    /// Retrying will not help: bad workflow definition, missing binary.
    Fatal,
}

/// Failure reported by a workflow engine call.
#[derive(Debug, Error, Clone)]
pub enum EngineError {
    #[error("{program} exited with status {status_code}: {stderr}")]
    CommandFailed {
        program: String,
        status_code: i32,
        stderr: String,
    },
    #[error("{program} not found")]
    NotFound { program: String },
    #[error("{program} timed out after {timeout_ms}ms")]
    Timeout { program: String, timeout_ms: u64 },
    #[error("failed to run {program}: {message}")]
    Io { program: String, message: String },
}

// Phrases the engine prints when its database is held by another process.
const CONTENTION_PHRASES: &[&str] = &[
    "database is locked",
    "could not acquire lock",
    "temporarily unavailable",
];

fn reports_contention(stderr: &str) -> bool {
    let stderr = stderr.to_lowercase();
    CONTENTION_PHRASES.iter().any(|phrase| stderr.contains(phrase))
        || stderr
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|word| word == "busy")
}

impl EngineError {
    pub fn from_command(program: &str, error: CommandError) -> Self {
        match error {
            CommandError::CommandNotFound { command } => EngineError::NotFound { program: command },
            CommandError::Timeout { timeout_ms } => EngineError::Timeout {
                program: program.to_string(),
                timeout_ms,
            },
            CommandError::ExecutionFailed { message } | CommandError::Io { message } => {
                EngineError::Io {
                    program: program.to_string(),
                    message,
                }
            }
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            EngineError::Timeout { .. } => ErrorClass::Transient,
            EngineError::CommandFailed { stderr, .. } if reports_contention(stderr) => {
                ErrorClass::Transient
            }
            EngineError::CommandFailed { .. } => ErrorClass::Fatal,
            EngineError::NotFound { .. } | EngineError::Io { .. } => ErrorClass::Fatal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}
