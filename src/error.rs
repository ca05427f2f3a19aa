//! Pipeline error taxonomy.
//!
//! Three fatal outcomes are distinguished at the top level: a dataset that
//! cannot be fetched, an external tool that exited non-zero, and a user
//! interrupt. Nothing is retried; the external tool's diagnostic is carried
//! through unchanged so the caller sees what the tool reported.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The use-case selector did not match any known dataset.
    #[error("unsupported use case '{0}' (expected ellipsoid, left_atrium, or femur)")]
    UnsupportedUseCase(String),

    /// The dataset archive was absent locally and could not be fetched.
    #[error("missing dataset '{archive}': {reason}")]
    MissingDataset { archive: String, reason: String },

    /// An external toolkit executable exited with a non-zero status.
    #[error("{tool} exited with code {code}: {stderr}")]
    ToolFailed {
        tool: String,
        code: i32,
        stderr: String,
    },

    /// An external toolkit executable could not be started at all.
    #[error("failed to launch {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// A grooming input had no paired file (e.g. a mesh without its image).
    #[error("missing input file: {0}")]
    MissingInput(PathBuf),

    /// A file-discovery glob was malformed.
    #[error("invalid file pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    /// The selected optimization preset failed construction-time validation.
    #[error("invalid optimization parameters: {0}")]
    InvalidParams(String),

    /// The user interrupted the run (ctrl-c); distinct from a tool failure.
    #[error("pipeline interrupted")]
    Interrupted,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Process exit code for this error: 1 for an interrupt, the external
    /// tool's own code for a tool failure, 2 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Interrupted => 1,
            PipelineError::ToolFailed { code, .. } if *code > 0 => *code,
            _ => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(PipelineError::Interrupted.exit_code(), 1);
        assert_eq!(
            PipelineError::ToolFailed {
                tool: "PadVolumeWithConstant".into(),
                code: 17,
                stderr: String::new(),
            }
            .exit_code(),
            17
        );
        // Killed-by-signal style codes fall back to the generic failure code
        assert_eq!(
            PipelineError::ToolFailed {
                tool: "PadVolumeWithConstant".into(),
                code: -1,
                stderr: String::new(),
            }
            .exit_code(),
            2
        );
        assert_eq!(
            PipelineError::UnsupportedUseCase("sphere".into()).exit_code(),
            2
        );
    }
}
