//! Error taxonomy.
//!
//! - [`ConfigError`] aborts the whole run before any job starts.
//! - [`CredentialError`] aborts only the job that needed the credential.
//! - [`MigrationError`] is the fatal outcome of one job.
//! - [`CleanupError`] is only ever logged.

use std::path::PathBuf;

use thiserror::Error;

use crate::step::Step;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No configuration file found (searched: {})", display_paths(.0))]
    NotFound(Vec<PathBuf>),

    #[error("Failed to read configuration file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("No repositories configured for migration")]
    NoJobs,

    #[error("Invalid job {job}: {field} {reason}")]
    Validation {
        job: String,
        field: &'static str,
        reason: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Unsupported repository host: {0}")]
    UnsupportedHost(String),

    #[error("Missing credential for {family}: environment variable {variable} is not set")]
    MissingCredential {
        family: &'static str,
        variable: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("{step} failed: {message}")]
    GitOperation { step: Step, message: String },

    #[error("Interrupted before {0}")]
    Interrupted(Step),
}

#[derive(Error, Debug)]
#[error("Failed to remove working directory {path}")]
pub struct CleanupError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
