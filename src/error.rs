//! Error types for the DTVCC layer.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::constants::{EXIT_BUG, EXIT_FAILURE, EXIT_FILE_CREATION_FAILED};

/// Errors raised while assembling packets or managing service pipelines.
///
/// Fatal variants mean the session cannot continue: shared state is
/// inconsistent or the configuration is unusable.
#[derive(Error, Debug)]
pub enum DtvccError {
    /// A tuple carried a cc_type other than CONTINUE (2) or START (3).
    #[error("illegal cc_type {0} in DTVCC data")]
    IllegalCcType(u8),

    /// A character set converter could not be opened.
    #[error("can't create converter for charset \"{charset}\": {reason}")]
    ConverterOpen { charset: String, reason: String },

    /// Invalid session configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A per-service output file could not be created.
    #[error("failed to create output file {}: {source}", .path.display())]
    OutputOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Output sink failure.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl DtvccError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        DtvccError::Io { context: context.into(), source }
    }

    /// Returns true if the session must be terminated.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DtvccError::Io { .. })
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            DtvccError::IllegalCcType(_) => EXIT_BUG,
            DtvccError::OutputOpen { .. } => EXIT_FILE_CREATION_FAILED,
            _ => EXIT_FAILURE,
        }
    }
}

pub type Result<T> = std::result::Result<T, DtvccError>;
