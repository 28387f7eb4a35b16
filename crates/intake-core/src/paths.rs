use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// File and directory constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = ".github/action-intake.yaml";
pub const DEFAULT_ALLOW_LIST: &str = "github-actions-allow-list.yml";
pub const DEFAULT_RECEIPT: &str = "action-request.txt";

pub const WORKSPACE_PREFIX: &str = "action-intake-";
pub const CHECKOUT_DIR: &str = "checkout";
pub const VCS_METADATA_DIR: &str = ".git";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Resolve `path` against `root` unless it is already absolute.
pub fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Drop `.` components and fold `..` lexically, without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Whether `a` and `b` name the same file. Symlinks are followed when both exist.
pub fn same_file(a: &Path, b: &Path) -> bool {
    if normalize(a) == normalize(b) {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Action identity validation
// ---------------------------------------------------------------------------

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_.][A-Za-z0-9_.\-]*/[A-Za-z0-9_.][A-Za-z0-9_.\-]*$").unwrap()
    })
}

/// `owner/repo` with exactly one `/`.
pub fn is_valid_action_name(name: &str) -> bool {
    name.len() <= 140 && name_re().is_match(name)
}

/// Refs are opaque, but they end up as a subprocess argument.
pub fn is_valid_version(version: &str) -> bool {
    !version.is_empty() && !version.starts_with('-') && !version.chars().any(char::is_whitespace)
}
