use crate::error::{IntakeError, Result};
use crate::oracle::OracleKind;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// OracleConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OracleConfig {
    #[serde(default)]
    pub kind: OracleKind,
    /// Explicit binary; defaults to `gh` or `git` on `PATH`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<PathBuf>,
    /// Per ref-resolution attempt. `0` disables the timeout.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            kind: OracleKind::default(),
            program: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl OracleConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Relative paths resolve against the project root.
    #[serde(default = "default_allow_list")]
    pub allow_list: PathBuf,
    /// `null` disables the receipt.
    #[serde(default = "default_receipt")]
    pub receipt: Option<PathBuf>,
    /// Parent of the per-run workspace; the system temp dir when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,
    /// `None` means unbounded, `1` is single-request mode.
    #[serde(default)]
    pub max_requests_per_run: Option<usize>,
    /// `false` validates without touching the allow-list.
    #[serde(default = "default_persist")]
    pub persist: bool,
    #[serde(default)]
    pub oracle: OracleConfig,
}

fn default_allow_list() -> PathBuf {
    PathBuf::from(paths::DEFAULT_ALLOW_LIST)
}

fn default_receipt() -> Option<PathBuf> {
    Some(PathBuf::from(paths::DEFAULT_RECEIPT))
}

fn default_persist() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            allow_list: default_allow_list(),
            receipt: default_receipt(),
            workspace_root: None,
            max_requests_per_run: None,
            persist: default_persist(),
            oracle: OracleConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from `explicit`, or from the default location under `root`.
    ///
    /// Only the default location may be absent (yielding defaults); a missing
    /// explicit path is an error.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => paths::resolve(root, p),
            None => {
                let path = paths::config_path(root);
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&data).map_err(|source| IntakeError::InvalidConfig { path, source })
    }

    pub fn allow_list_path(&self, root: &Path) -> PathBuf {
        paths::resolve(root, &self.allow_list)
    }

    pub fn receipt_path(&self, root: &Path) -> Option<PathBuf> {
        self.receipt.as_deref().map(|p| paths::resolve(root, p))
    }

    pub fn workspace_root(&self, root: &Path) -> PathBuf {
        self.workspace_root
            .as_deref()
            .map(|p| paths::resolve(root, p))
            .unwrap_or_else(std::env::temp_dir)
    }

    /// True when writing the receipt would clobber the allow-list.
    pub fn receipt_overwrites_allow_list(&self, root: &Path) -> bool {
        self.receipt_path(root)
            .is_some_and(|receipt| paths::same_file(&receipt, &self.allow_list_path(root)))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Findings for unusual values. `root` resolves the configured paths, so
    /// differently spelled paths to the same file are still caught.
    pub fn validate(&self, root: &Path) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.max_requests_per_run == Some(0) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "max_requests_per_run is 0: every request will be rejected".to_string(),
            });
        }

        if self.oracle.timeout_seconds == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "oracle.timeout_seconds is 0: ref resolution may hang indefinitely"
                    .to_string(),
            });
        } else if self.oracle.timeout_seconds > 600 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "oracle.timeout_seconds={} (>600 is unusual)",
                    self.oracle.timeout_seconds
                ),
            });
        }

        if self.receipt_overwrites_allow_list(root) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "receipt and allow_list both point at '{}'",
                    self.allow_list_path(root).display()
                ),
            });
        }

        if !self.persist && self.receipt.is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "persist is false and receipt is disabled: runs leave no artifact"
                    .to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
