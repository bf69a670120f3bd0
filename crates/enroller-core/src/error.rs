use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::Step;

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, EnrollError>;

/// Errors that can occur while provisioning identities
#[derive(Error, Debug)]
pub enum EnrollError {
    /// Invalid or incomplete configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// A required identity is absent from the declared identity set
    #[error("required identity {name:?} is not declared; add an identity like {hint}")]
    MissingIdentity {
        /// Name of the missing identity
        name: String,
        /// Example declaration the operator can add
        hint: String,
    },

    /// The same identity was declared twice with different secrets or types
    #[error("identity {name:?} is declared more than once with conflicting secret or type")]
    ConflictingIdentity {
        /// Name of the identity
        name: String,
    },

    /// The CA already knows the identity under a secret other than the requested one
    #[error("identity {name:?} is already registered on {ca} with a different secret")]
    ConflictingRegistration {
        /// Name of the identity
        name: String,
        /// CA name the identity is registered on
        ca: String,
    },

    /// The CA tool could not be started
    #[error("failed to launch {program}: {source}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Underlying OS error
        source: std::io::Error,
    },

    /// The CA tool exited unsuccessfully
    #[error("`{command}` failed ({status})\n{output}")]
    CommandFailed {
        /// Command line with secrets redacted
        command: String,
        /// Exit status description
        status: String,
        /// Combined stdout and stderr
        output: String,
    },

    /// The CA tool did not finish in time
    #[error("`{command}` timed out after {}s", .after.as_secs())]
    Timeout {
        /// Command line with secrets redacted
        command: String,
        /// Timeout that elapsed
        after: Duration,
    },

    /// Expected CA output is absent
    #[error("missing material: no files match {pattern} in {}", .dir.display())]
    MissingMaterial {
        /// Directory that was searched
        dir: PathBuf,
        /// Pattern that matched nothing
        pattern: String,
    },

    /// More than one file matched where exactly one was required
    #[error("ambiguous material: {count} files match {pattern} in {}", .dir.display())]
    AmbiguousMaterial {
        /// Directory that was searched
        dir: PathBuf,
        /// Pattern that matched
        pattern: String,
        /// Number of matches
        count: usize,
    },

    /// Filesystem operation failed
    #[error("{}: {source}", .path.display())]
    Io {
        /// Path involved in the failed operation
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A pipeline step failed
    #[error("{step}: {source}")]
    Step {
        /// The step that failed
        step: Step,
        /// What went wrong inside the step
        source: Box<EnrollError>,
    },
}

/// Coarse error classes used to decide how an operator should react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fix the declared configuration and re-run
    Configuration,
    /// The CA rejected a request
    Subprocess,
    /// The CA did not answer in time; re-running may help
    Timeout,
    /// Expected files are missing or malformed
    Filesystem,
}

impl EnrollError {
    /// Build an [`EnrollError::Io`] for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap this error with the step it happened in.
    #[must_use]
    pub fn in_step(self, step: Step) -> Self {
        Self::Step {
            step,
            source: Box::new(self),
        }
    }

    /// Innermost error, with step wrappers removed
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Step { source, .. } => source.root(),
            other => other,
        }
    }

    /// The step this error was raised in, if any
    #[must_use]
    pub const fn step(&self) -> Option<&Step> {
        match self {
            Self::Step { step, .. } => Some(step),
            _ => None,
        }
    }

    /// Classify the error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            Self::Config(_)
            | Self::MissingIdentity { .. }
            | Self::ConflictingIdentity { .. }
            | Self::ConflictingRegistration { .. } => ErrorKind::Configuration,
            Self::Spawn { .. } | Self::CommandFailed { .. } => ErrorKind::Subprocess,
            Self::Timeout { .. } => ErrorKind::Timeout,
            _ => ErrorKind::Filesystem,
        }
    }

    /// Returns true if the CA did not answer in time
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }

    /// Returns true if re-running the same pipeline unchanged may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.is_timeout()
    }
}
