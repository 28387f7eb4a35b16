//! Existence checks for `owner/repo` at a given ref.
//!
//! The pipeline only asks one question: can this ref be materialized? The
//! answer comes from an [`ExistenceOracle`]. [`ProcessOracle`] shells out to
//! `gh` or `git` and clones into the run workspace; [`InMemoryOracle`] is a
//! fixed table used by tests and dry runs.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// OracleError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("repository or ref not found: {0}")]
    NotFound(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("oracle program unavailable: {0}")]
    Unavailable(String),

    #[error("checkout failed: {0}")]
    Failed(String),
}

// ---------------------------------------------------------------------------
// ExistenceOracle
// ---------------------------------------------------------------------------

pub trait ExistenceOracle {
    /// Materialize `identity` (`owner/repo`) at `reference` into `destination`.
    ///
    /// `destination` must not exist yet. Implementations never retry.
    fn resolve(
        &self,
        identity: &str,
        reference: &str,
        destination: &Path,
    ) -> Result<(), OracleError>;
}

impl<T: ExistenceOracle + ?Sized> ExistenceOracle for &T {
    fn resolve(
        &self,
        identity: &str,
        reference: &str,
        destination: &Path,
    ) -> Result<(), OracleError> {
        (**self).resolve(identity, reference, destination)
    }
}

// ---------------------------------------------------------------------------
// OracleKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleKind {
    /// `gh repo clone`, authenticated with the run's token.
    #[default]
    Gh,
    /// Anonymous `git clone` over https.
    Git,
}

impl OracleKind {
    pub fn default_program(&self) -> &'static str {
        match self {
            OracleKind::Gh => "gh",
            OracleKind::Git => "git",
        }
    }
}

impl std::fmt::Display for OracleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.default_program())
    }
}

impl std::str::FromStr for OracleKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gh" => Ok(OracleKind::Gh),
            "git" => Ok(OracleKind::Git),
            other => Err(format!("unknown oracle '{other}'; valid: gh, git")),
        }
    }
}

// ---------------------------------------------------------------------------
// ProcessOracle
// ---------------------------------------------------------------------------

/// Clones the requested ref with an external program.
#[derive(Clone)]
pub struct ProcessOracle {
    kind: OracleKind,
    program: PathBuf,
    token: Option<String>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for ProcessOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessOracle")
            .field("kind", &self.kind)
            .field("program", &self.program)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProcessOracle {
    /// `program` defaults to `gh`/`git` on `PATH`; it is looked up on each
    /// resolve, so a missing binary only fails runs that need it.
    ///
    /// `timeout` of `None` waits indefinitely.
    pub fn new(kind: OracleKind, program: Option<&Path>, timeout: Option<Duration>) -> Self {
        let program = program
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(kind.default_program()));
        Self {
            kind,
            program,
            token: None,
            timeout,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn kind(&self) -> OracleKind {
        self.kind
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(
        &self,
        program: &Path,
        identity: &str,
        reference: &str,
        destination: &Path,
    ) -> Command {
        let mut cmd = Command::new(program);
        match self.kind {
            OracleKind::Gh => {
                cmd.args(["repo", "clone", identity])
                    .arg(destination)
                    .args(["--", "--branch", reference, "--depth", "1"]);
                cmd.env("GH_PROMPT_DISABLED", "1");
                if let Some(token) = &self.token {
                    cmd.env("GH_TOKEN", token);
                }
            }
            OracleKind::Git => {
                cmd.args(["clone", "--depth", "1", "--branch", reference])
                    .arg(format!("https://github.com/{identity}.git"))
                    .arg(destination);
            }
        }
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl ExistenceOracle for ProcessOracle {
    fn resolve(
        &self,
        identity: &str,
        reference: &str,
        destination: &Path,
    ) -> Result<(), OracleError> {
        let program = which::which(&self.program).map_err(|e| {
            OracleError::Unavailable(format!("{}: {e}", self.program.display()))
        })?;
        let cmd = self.command(&program, identity, reference, destination);
        tracing::debug!(
            program = %program.display(),
            identity,
            reference,
            "resolving ref"
        );
        let (success, output) = run_with_timeout(cmd, self.timeout)?;
        if success {
            Ok(())
        } else {
            Err(classify_failure(&output))
        }
    }
}

/// Run `cmd` to completion. Returns (success, combined output).
///
/// stdout/stderr are drained on dedicated threads so a chatty child cannot
/// block on a full pipe; the wait happens on a third thread so the timeout
/// is a plain `recv_timeout`.
fn run_with_timeout(
    mut cmd: Command,
    timeout: Option<Duration>,
) -> Result<(bool, String), OracleError> {
    // Own process group, so a timeout also reaches what `gh` spawns (git).
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            OracleError::Unavailable(e.to_string())
        } else {
            OracleError::Failed(format!("failed to spawn: {e}"))
        }
    })?;
    let child_pid = child.id();

    let stdout_handle = child.stdout.take();
    let stderr_handle = child.stderr.take();
    let stdout_thread = std::thread::spawn(move || drain(stdout_handle));
    let stderr_thread = std::thread::spawn(move || drain(stderr_handle));

    let wait_result = match timeout {
        None => child.wait(),
        Some(timeout_dur) => {
            let (tx, rx) = std::sync::mpsc::channel();
            std::thread::spawn(move || {
                let _ = tx.send(child.wait());
            });
            match rx.recv_timeout(timeout_dur) {
                Ok(result) => result,
                Err(_) => {
                    kill_process(child_pid);
                    return Err(OracleError::Timeout(timeout_dur));
                }
            }
        }
    };

    let stdout_buf = stdout_thread.join().unwrap_or_default();
    let stderr_buf = stderr_thread.join().unwrap_or_default();

    let status = wait_result.map_err(|e| OracleError::Failed(format!("wait failed: {e}")))?;
    Ok((status.success(), combine_output(&stdout_buf, &stderr_buf)))
}

fn drain<R: Read>(handle: Option<R>) -> String {
    let mut buf = String::new();
    if let Some(mut r) = handle {
        let _ = r.read_to_string(&mut buf);
    }
    buf
}

/// Combine stdout/stderr and cap to the last 2KB.
fn combine_output(stdout: &str, stderr: &str) -> String {
    const MAX_OUTPUT: usize = 2 * 1024;
    let output = match (stdout.trim(), stderr.trim()) {
        ("", err) => err.to_string(),
        (out, "") => out.to_string(),
        (out, err) => format!("{out}\n{err}"),
    };
    if output.len() <= MAX_OUTPUT {
        return output;
    }
    let mut start = output.len() - MAX_OUTPUT;
    while !output.is_char_boundary(start) {
        start += 1;
    }
    output[start..].to_string()
}

/// SIGKILL the process group led by `pid`. Best-effort.
#[cfg(unix)]
fn kill_process(pid: u32) {
    let _ = Command::new("kill")
        .args(["-9", "--", &format!("-{pid}")])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

#[cfg(not(unix))]
fn kill_process(pid: u32) {
    let _ = Command::new("taskkill")
        .args(["/F", "/T", "/PID", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

const NOT_FOUND_MARKERS: &[&str] = &[
    "could not resolve to a repository",
    "repository not found",
    "not found in upstream",
    "couldn't find remote ref",
    "remote branch",
    "http 404",
];

const AUTH_MARKERS: &[&str] = &[
    "authentication failed",
    "bad credentials",
    "http 401",
    "http 403",
    "gh auth login",
    "could not read username",
    "permission denied",
];

const NETWORK_MARKERS: &[&str] = &[
    "could not resolve host",
    "unable to access",
    "connection refused",
    "connection reset",
    "connection timed out",
    "network is unreachable",
    "gnutls",
    "ssl certificate",
    "ssl_connect",
];

/// Map the clone program's output onto the oracle taxonomy.
pub fn classify_failure(output: &str) -> OracleError {
    let lower = output.to_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));
    let detail = output
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("no output")
        .trim()
        .to_string();

    if has(NOT_FOUND_MARKERS) {
        OracleError::NotFound(detail)
    } else if has(AUTH_MARKERS) {
        OracleError::Auth(detail)
    } else if has(NETWORK_MARKERS) {
        OracleError::Network(detail)
    } else {
        OracleError::Failed(detail)
    }
}

// ---------------------------------------------------------------------------
// InMemoryOracle
// ---------------------------------------------------------------------------

/// Resolves only the `(identity, ref)` pairs it was seeded with.
///
/// A successful resolve writes a minimal checkout, `.git` included, so the
/// workspace handling downstream is exercised exactly as with a real clone.
#[derive(Debug, Default)]
pub struct InMemoryOracle {
    known: HashSet<(String, String)>,
    failures: HashMap<(String, String), OracleError>,
    calls: Mutex<Vec<(String, String)>>,
}

impl InMemoryOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ref(mut self, identity: &str, reference: &str) -> Self {
        self.known
            .insert((identity.to_string(), reference.to_string()));
        self
    }

    pub fn with_failure(mut self, identity: &str, reference: &str, error: OracleError) -> Self {
        self.failures
            .insert((identity.to_string(), reference.to_string()), error);
        self
    }

    /// Every `(identity, ref)` asked for, in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl ExistenceOracle for InMemoryOracle {
    fn resolve(
        &self,
        identity: &str,
        reference: &str,
        destination: &Path,
    ) -> Result<(), OracleError> {
        let key = (identity.to_string(), reference.to_string());
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(key.clone());
        }
        if let Some(err) = self.failures.get(&key) {
            return Err(err.clone());
        }
        if !self.known.contains(&key) {
            return Err(OracleError::NotFound(format!(
                "Remote branch {reference} not found in upstream origin"
            )));
        }
        if destination.exists() {
            return Err(OracleError::Failed(format!(
                "destination path '{}' already exists",
                destination.display()
            )));
        }
        let materialize = || -> std::io::Result<()> {
            std::fs::create_dir_all(destination.join(crate::paths::VCS_METADATA_DIR))?;
            std::fs::write(
                destination.join(crate::paths::VCS_METADATA_DIR).join("HEAD"),
                format!("ref: refs/heads/{reference}\n"),
            )?;
            std::fs::write(
                destination.join("action.yml"),
                format!("name: {identity}\nruns:\n  using: node20\n"),
            )
        };
        materialize().map_err(|e| OracleError::Failed(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
