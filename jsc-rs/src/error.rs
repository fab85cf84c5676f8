//! Error types shared across the shell.
//!
//! Engine-level failures stay as [`boa_engine::JsError`]; the types here
//! cover everything that happens outside script evaluation.

use std::path::PathBuf;

use thiserror::Error;

/// A malformed command line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    /// A value-taking flag (`-f`, `-e`, `-p`) was the last token.
    #[error("option {flag} requires an argument")]
    MissingValue { flag: &'static str },
}

/// A script file could not be opened.
#[derive(Debug, Error)]
#[error("Could not open file: {}", path.display())]
pub struct LoadError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Failure to write the profiler report.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot encode profile: {0}")]
    Encode(#[from] serde_json::Error),
}
