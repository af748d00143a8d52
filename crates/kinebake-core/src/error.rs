//! Error types for kinebake
//!
//! Every failure is fatal for the run. Variants fall into three kinds:
//! malformed input, a frame the evaluator could not resolve, and an
//! artifact that could not be written.

use std::path::PathBuf;

use thiserror::Error;

/// Coarse failure category
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or shape-inconsistent input
    Format,
    /// The evaluator failed to resolve a frame
    Evaluator,
    /// The output destination is not writable
    Write,
}

/// Core kinebake errors
#[derive(Error, Debug)]
pub enum MotionError {
    // Format errors
    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Shape mismatch in {field}: expected {expected}, got {actual}")]
    ShapeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Frame count mismatch: {field} has {actual} frames, expected {expected}")]
    FrameCountMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("Too few frames: need at least {required}, got {actual}")]
    TooFewFrames { required: usize, actual: usize },

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f64),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Evaluator errors
    #[error("Evaluator failed at frame {frame}: {reason}")]
    EvaluatorFailed { frame: usize, reason: String },

    #[error("Evaluator rejected command: {0}")]
    EvaluatorRejected(String),

    #[error("Evaluator state not resolved")]
    StateNotResolved,

    // Write errors
    #[error("Invalid output name: {0:?}")]
    InvalidOutputName(String),

    #[error("Cannot write {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}

impl MotionError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            MotionError::MissingField(_)
            | MotionError::ShapeMismatch { .. }
            | MotionError::FrameCountMismatch { .. }
            | MotionError::TooFewFrames { .. }
            | MotionError::InvalidSampleRate(_)
            | MotionError::InvalidFormat(_)
            | MotionError::InvalidModel(_)
            | MotionError::Read { .. } => ErrorKind::Format,
            MotionError::EvaluatorFailed { .. }
            | MotionError::EvaluatorRejected(_)
            | MotionError::StateNotResolved => ErrorKind::Evaluator,
            MotionError::InvalidOutputName(_) | MotionError::Write { .. } => ErrorKind::Write,
        }
    }

    pub fn is_format(&self) -> bool {
        self.kind() == ErrorKind::Format
    }

    pub fn is_evaluator(&self) -> bool {
        self.kind() == ErrorKind::Evaluator
    }

    pub fn is_write(&self) -> bool {
        self.kind() == ErrorKind::Write
    }

    /// Shape mismatch with displayable expected/actual shapes
    pub fn shape(field: &str, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        MotionError::ShapeMismatch {
            field: field.to_string(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Result type for kinebake operations
pub type MotionResult<T> = Result<T, MotionError>;
