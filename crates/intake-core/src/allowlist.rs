//! The persisted allow-list of approved `owner/repo/version` entries.
//!
//! The document is a YAML mapping whose `actions` key holds the entries.
//! Any other top-level keys are carried through load/save untouched. Writes
//! always replace the whole file atomically; a run that fails before the save
//! leaves the file byte-identical.

use crate::error::{IntakeError, Result};
use crate::io::{self, LockFile};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// `owner/repo` + `version` → `owner/repo/version`.
pub fn composite_key(name: &str, version: &str) -> String {
    format!("{name}/{version}")
}

// ---------------------------------------------------------------------------
// AllowListDocument
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllowListDocument {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub actions: Vec<String>,
    /// Unrecognized top-level keys, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_yaml::Mapping,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl AllowListDocument {
    /// Load the document. A missing file is an error, not an empty list.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(IntakeError::AllowListNotFound(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut doc: Self =
            serde_yaml::from_str(&data).map_err(|source| IntakeError::AllowListInvalid {
                path: path.to_path_buf(),
                source,
            })?;
        let removed = doc.dedup();
        if removed > 0 {
            tracing::warn!(path = %path.display(), removed, "dropped duplicate allow-list entries");
        }
        Ok(doc)
    }

    /// Keep the first occurrence of each entry. Returns how many were dropped.
    pub fn dedup(&mut self) -> usize {
        let before = self.actions.len();
        let mut seen = HashSet::new();
        self.actions.retain(|a| seen.insert(a.clone()));
        before - self.actions.len()
    }

    /// Replace the file's contents with this document in one operation.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(path, data.as_bytes()).map_err(|source| IntakeError::AllowListWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.actions.iter().any(|a| a == key)
    }

    /// Add `key` unless already present. Returns whether it was added.
    pub fn merge(&mut self, key: &str) -> bool {
        if self.contains(key) {
            return false;
        }
        self.actions.push(key.to_string());
        true
    }
}

// ---------------------------------------------------------------------------
// Locked read-modify-write
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub added: Vec<String>,
    pub already_present: Vec<String>,
}

/// Merge `keys` into the allow-list at `path` under an exclusive lock.
///
/// The file is only rewritten when at least one key was added.
pub fn merge_into(path: &Path, keys: &[String]) -> Result<MergeSummary> {
    let lock = LockFile::try_acquire(path)
        .map_err(|source| IntakeError::AllowListWrite {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| IntakeError::AllowListLocked(path.to_path_buf()))?;
    tracing::debug!(lock = %lock.path().display(), "acquired allow-list lock");

    let mut doc = AllowListDocument::load(path)?;
    let mut summary = MergeSummary::default();
    for key in keys {
        if doc.merge(key) {
            tracing::info!(entry = %key, "added to allow-list");
            summary.added.push(key.clone());
        } else {
            tracing::info!(entry = %key, "already present in allow-list");
            summary.already_present.push(key.clone());
        }
    }

    if !summary.added.is_empty() {
        doc.save(path)?;
    }
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
