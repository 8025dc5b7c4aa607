//! Error categories for policy loading, analysis, configuration and the CLI.

use std::path::PathBuf;
use thiserror::Error;

/// Invalid requirement found while converting a policy document.
#[derive(Debug, Error)]
pub enum RequirementError {
    #[error("requirement #{index}: unknown type '{kind}'")]
    UnknownType { index: usize, kind: String },

    #[error("requirement #{index} ({kind}): value list is empty")]
    EmptyValue { index: usize, kind: String },

    #[error("requirement #{index}: invalid pattern '{pattern}': {source}")]
    Pattern {
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("requirement #{index}: invalid whitelist glob '{pattern}': {source}")]
    Whitelist {
        index: usize,
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("requirement #{index}: unknown level '{level}' (expected error|warning)")]
    Level { index: usize, level: String },
}

/// Failure to produce the shared policy. Aborts the whole run.
#[derive(Debug, Error)]
pub enum PolicyLoadError {
    #[error("cannot read policy file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("policy file {} is malformed: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("policy file {} has invalid requirements: {source}", .path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: RequirementError,
    },
}

/// Failure analyzing one input. Reported, then the run moves on.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("input not found: {0}")]
    NotFound(String),

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("analysis task failed: {0}")]
    Task(String),

    #[error("{0}")]
    Failed(String),
}

/// Failure loading an explicitly requested configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {} is malformed: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
}

/// Top-level CLI errors mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("no inputs given")]
    Usage,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Usage => -1,
            Self::Config(_) => 1,
            Self::Io(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Usage.exit_code(), -1);
        let err = CliError::from(ConfigError::Parse {
            path: PathBuf::from("lintrun.toml"),
            message: "eof".into(),
        });
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("lintrun.toml"));
    }
}
