use crate::oracle::OracleError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("no action sections found in request body")]
    NoSections,

    #[error("section '{section}' is missing required field '{key}'")]
    MissingField { section: String, key: String },

    #[error("section '{0}' is declared more than once")]
    DuplicateSection(String),

    #[error("section '{section}' sets '{key}' more than once")]
    DuplicateKey { section: String, key: String },

    #[error("line {line}: expected 'key = value', found '{content}'")]
    InvalidLine { line: usize, content: String },

    #[error("section '{section}': invalid action name '{name}', expected owner/repo")]
    InvalidName { section: String, name: String },

    #[error("section '{section}': invalid requested version '{version}'")]
    InvalidVersion { section: String, version: String },

    #[error("{found} actions requested, at most {max} allowed per run")]
    TooManyRequests { found: usize, max: usize },

    #[error("validation failed for {name}@{version}: {cause}")]
    ValidationFailed {
        name: String,
        version: String,
        #[source]
        cause: OracleError,
    },

    #[error("workspace error: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("allow-list not found: {0}")]
    AllowListNotFound(PathBuf),

    #[error("allow-list {path} is not valid YAML: {source}")]
    AllowListInvalid {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("allow-list {0} is locked by another run")]
    AllowListLocked(PathBuf),

    #[error("failed to write allow-list {path}: {source}")]
    AllowListWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write receipt {path}: {source}")]
    ReceiptWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    InvalidConfig {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("receipt path {0} is the allow-list; refusing to overwrite it")]
    ReceiptClash(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl IntakeError {
    /// Stable machine-readable code, exposed in run reports.
    pub fn code(&self) -> &'static str {
        match self {
            IntakeError::NoSections => "malformed_input",
            IntakeError::MissingField { .. } => "missing_field",
            IntakeError::DuplicateSection(_) => "duplicate_section",
            IntakeError::DuplicateKey { .. } => "duplicate_key",
            IntakeError::InvalidLine { .. } => "invalid_line",
            IntakeError::InvalidName { .. } => "invalid_name",
            IntakeError::InvalidVersion { .. } => "invalid_version",
            IntakeError::TooManyRequests { .. } => "too_many_requests",
            IntakeError::ValidationFailed { .. } => "validation_failure",
            IntakeError::Workspace(_) => "workspace_failure",
            IntakeError::AllowListNotFound(_) | IntakeError::AllowListInvalid { .. } => {
                "store_load_failure"
            }
            IntakeError::AllowListLocked(_) => "store_locked",
            IntakeError::AllowListWrite { .. } => "store_write_failure",
            IntakeError::ReceiptWrite { .. } => "receipt_write_failure",
            IntakeError::InvalidConfig { .. } | IntakeError::ReceiptClash(_) => "invalid_config",
            IntakeError::Io(_) => "io",
            IntakeError::Yaml(_) => "yaml",
        }
    }
}

pub type Result<T> = std::result::Result<T, IntakeError>;
