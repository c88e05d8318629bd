// SPDX-License-Identifier: MPL-2.0

//! Error types for the video pipeline
//!
//! Stages report a [`StageError`]; the runner wraps it in a [`PipelineError`]
//! that records which stage failed and in which lifecycle phase.

use crate::media::picture::Geometry;
use std::fmt;

/// Result type for stage operations
pub type StageResult<T> = Result<T, StageError>;

/// Result type for pipeline construction and execution
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for configuration handling
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised by an individual stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// Transport connect/read failure
    Transport(String),
    /// Encoded data could not be decoded
    Decode(String),
    /// Decoded content disagrees with the configured picture geometry
    GeometryMismatch { expected: Geometry, actual: Geometry },
    /// Pixel format conversion failed
    Conversion(String),
    /// Recording tap could not write its output
    Recording(String),
    /// The external consumer rejected a call
    Consumer(String),
    /// Stage called in the wrong lifecycle state
    InvalidState(String),
}

/// Errors reported by the pipeline runner and builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A stage could not acquire its resources
    OpenFailure { stage: String, source: StageError },
    /// A stage failed mid-iteration
    ProcessFailure { stage: String, source: StageError },
    /// A stage failed to release its resources
    CloseFailure { stage: String, source: StageError },
    /// The stage list violates the pipeline topology
    InvalidDefinition(String),
}

/// Configuration loading and validation errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Reading or writing the config file failed
    Io(String),
    /// The config file is not valid JSON for this schema
    Parse(String),
    /// The values are inconsistent
    Invalid(String),
}

impl PipelineError {
    /// Name of the stage that failed, if any
    pub fn stage(&self) -> Option<&str> {
        match self {
            PipelineError::OpenFailure { stage, .. }
            | PipelineError::ProcessFailure { stage, .. }
            | PipelineError::CloseFailure { stage, .. } => Some(stage),
            PipelineError::InvalidDefinition(_) => None,
        }
    }

    /// Underlying stage error, if any
    pub fn stage_error(&self) -> Option<&StageError> {
        match self {
            PipelineError::OpenFailure { source, .. }
            | PipelineError::ProcessFailure { source, .. }
            | PipelineError::CloseFailure { source, .. } => Some(source),
            PipelineError::InvalidDefinition(_) => None,
        }
    }

    /// True for a process failure caused by a decoded geometry mismatch
    pub fn is_geometry_mismatch(&self) -> bool {
        matches!(
            self,
            PipelineError::ProcessFailure {
                source: StageError::GeometryMismatch { .. },
                ..
            }
        )
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::Transport(msg) => write!(f, "Transport error: {}", msg),
            StageError::Decode(msg) => write!(f, "Decode error: {}", msg),
            StageError::GeometryMismatch { expected, actual } => write!(
                f,
                "Geometry mismatch: expected {}, got {}",
                expected, actual
            ),
            StageError::Conversion(msg) => write!(f, "Conversion error: {}", msg),
            StageError::Recording(msg) => write!(f, "Recording error: {}", msg),
            StageError::Consumer(msg) => write!(f, "Consumer error: {}", msg),
            StageError::InvalidState(msg) => write!(f, "Invalid stage state: {}", msg),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::OpenFailure { stage, source } => {
                write!(f, "Failed to open stage '{}': {}", stage, source)
            }
            PipelineError::ProcessFailure { stage, source } => {
                write!(f, "Stage '{}' failed: {}", stage, source)
            }
            PipelineError::CloseFailure { stage, source } => {
                write!(f, "Failed to close stage '{}': {}", stage, source)
            }
            PipelineError::InvalidDefinition(msg) => {
                write!(f, "Invalid pipeline definition: {}", msg)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Config I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for StageError {}
impl std::error::Error for ConfigError {}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.stage_error()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// Conversions for I/O errors
impl From<std::io::Error> for StageError {
    fn from(err: std::io::Error) -> Self {
        StageError::Transport(err.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
