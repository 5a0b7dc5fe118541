//! Error types for the IaC module.

use std::collections::BTreeSet;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for IaC operations.
pub type IacResult<T> = Result<T, IacError>;

/// Errors that can occur while loading infra configuration or running infra tasks.
#[derive(Error, Debug)]
pub enum IacError {
    #[error("{what} not found at {}", .path.display())]
    NotFound { what: String, path: PathBuf },

    #[error(
        "Could not find {file} in {} or any parent directory. \
         Pass the project root explicitly or create {file}",
        .start.display()
    )]
    DescriptorNotFound { file: String, start: PathBuf },

    #[error("'{section}' section not found in {}. Please define {section} in it", .path.display())]
    MissingSection { section: String, path: PathBuf },

    #[error("Missing '{field}' for env '{entry}' in {section} of {}", .path.display())]
    MissingField {
        section: String,
        entry: String,
        field: String,
        path: PathBuf,
    },

    #[error(
        "Env '{name}' in {section} of {} collides with '{existing}'; env names are case-insensitive",
        .path.display()
    )]
    DuplicateEnv {
        section: String,
        name: String,
        existing: String,
        path: PathBuf,
    },

    #[error("Expected {expected} at '{location}' in {}, found {found}", .path.display())]
    TypeMismatch {
        location: String,
        expected: &'static str,
        found: &'static str,
        path: PathBuf,
    },

    #[error(
        "tfvars keys {} do not match envs keys {} in {}. They must have the same environments",
        name_set(.tfvars),
        name_set(.envs),
        .path.display()
    )]
    SchemaMismatch {
        tfvars: BTreeSet<String>,
        envs: BTreeSet<String>,
        path: PathBuf,
    },

    #[error(
        "tfvars for env '{env}' do not match {}: missing required variables {}; extra keys not in variables.tf {}",
        .declarations.display(),
        name_list(.missing),
        name_list(.extra)
    )]
    ValidationFailure {
        env: String,
        declarations: PathBuf,
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error("No {kind} configured for '{requested}'. Available: {}", name_list(.available))]
    UnknownKey {
        kind: &'static str,
        requested: String,
        available: Vec<String>,
    },

    #[error("Unsupported hosted_on: '{0}'")]
    UnsupportedProvider(String),

    #[error("Cannot {action}: no {identifier} configured for env '{env}'")]
    MissingProviderIdentifier {
        action: &'static str,
        identifier: &'static str,
        env: String,
    },

    #[error("{0} not available: install it and make sure it is on PATH")]
    ToolNotAvailable(String),

    #[error("Command failed with exit code {exit_code}: {command}\n{output}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        output: String,
    },

    #[error("Invalid YAML in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Runner error: {0}")]
    Runner(#[from] stratus_runner::RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IacError {
    /// True for every "file or directory is absent" flavour.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::DescriptorNotFound { .. })
    }

    /// True for descriptor contents that are incomplete or malformed.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::MissingSection { .. }
                | Self::MissingField { .. }
                | Self::DuplicateEnv { .. }
                | Self::TypeMismatch { .. }
                | Self::SchemaMismatch { .. }
                | Self::Yaml { .. }
        )
    }
}

fn name_list(names: &[String]) -> String {
    format!("[{}]", names.join(", "))
}

fn name_set(names: &BTreeSet<String>) -> String {
    let joined: Vec<&str> = names.iter().map(String::as_str).collect();
    format!("{{{}}}", joined.join(", "))
}
