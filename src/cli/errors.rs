//! CLI-specific error types
//!
//! Every CLI error maps to a process exit code. Pipeline aborts keep the
//! code of their abort reason; configuration and I/O problems exit 1.

use std::fmt;
use std::io;

use crate::pipeline::{AbortReason, PipelineError};

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (input files, stdout)
    IoError,
    /// A pipeline run or one of its steps aborted
    Aborted(AbortReason),
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "GEOREF_CLI_CONFIG_ERROR",
            Self::IoError => "GEOREF_CLI_IO_ERROR",
            Self::Aborted(reason) => reason.code(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigError | Self::IoError => 1,
            Self::Aborted(reason) => reason.exit_code(),
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn aborted(reason: AbortReason, msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::Aborted(reason), msg)
    }

    /// Get the error code
    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn exit_code(&self) -> i32 {
        self.code.exit_code()
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ERROR] {}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        Self::aborted(e.reason(), e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
