//! Sequencing of one intake run: parse → validate → receipt → merge → cleanup.
//!
//! Every stage short-circuits the rest. The allow-list is only written after
//! all requests validated, and the workspace is torn down on every exit path.
//! [`Pipeline::run`] never returns an error: failures are folded into the
//! [`RunReport`] so the caller only has to map `success()` to an exit status.

use crate::allowlist::{self, AllowListDocument};
use crate::config::PipelineConfig;
use crate::context::IssueContext;
use crate::error::IntakeError;
use crate::oracle::ExistenceOracle;
use crate::receipt;
use crate::request::{self, ActionRequest};
use crate::validator;
use crate::workspace::Workspace;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Config,
    Parse,
    Validate,
    Receipt,
    Merge,
    Cleanup,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Config => "config",
            Stage::Parse => "parse",
            Stage::Validate => "validate",
            Stage::Receipt => "receipt",
            Stage::Merge => "merge",
            Stage::Cleanup => "cleanup",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Start,
    Parsed,
    Validated,
    Merged,
    Cleaned,
    Done,
    Failed { stage: Stage },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The body declared no sections at all.
    NoOp,
    Completed {
        accepted: Vec<ActionRequest>,
        added: Vec<String>,
        already_present: Vec<String>,
        /// False in validate-only deployments.
        persisted: bool,
    },
    Failed {
        stage: Stage,
        code: String,
        message: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub issue: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub states: Vec<RunState>,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup_warning: Option<String>,
}

impl RunReport {
    pub fn success(&self) -> bool {
        !matches!(self.outcome, Outcome::Failed { .. })
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

type StageResult<T> = std::result::Result<T, (Stage, IntakeError)>;

fn at(stage: Stage) -> impl FnOnce(IntakeError) -> (Stage, IntakeError) {
    move |e| (stage, e)
}

pub struct Pipeline<O> {
    root: PathBuf,
    config: PipelineConfig,
    oracle: O,
}

impl<O: ExistenceOracle> Pipeline<O> {
    /// `root` anchors the relative paths in `config`.
    pub fn new(root: impl Into<PathBuf>, config: PipelineConfig, oracle: O) -> Self {
        Self {
            root: root.into(),
            config,
            oracle,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn run(&self, ctx: &IssueContext) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("intake", %run_id, issue = %ctx.number);
        let _guard = span.enter();

        let started_at = Utc::now();
        let mut states = vec![RunState::Start];
        let mut workspace: Option<Workspace> = None;

        let result = self.execute(ctx, &mut states, &mut workspace);

        let outcome = match result {
            Ok(outcome) => outcome,
            Err((stage, err)) => {
                tracing::error!(%stage, code = err.code(), "{err}");
                states.push(RunState::Failed { stage });
                Outcome::Failed {
                    stage,
                    code: err.code().to_string(),
                    message: err.to_string(),
                }
            }
        };

        let cleanup_warning = workspace.and_then(teardown);
        states.push(RunState::Cleaned);
        if !matches!(outcome, Outcome::Failed { .. }) {
            states.push(RunState::Done);
            tracing::info!("issue processed successfully");
        }

        RunReport {
            run_id,
            issue: ctx.number.clone(),
            started_at,
            finished_at: Utc::now(),
            states,
            outcome,
            cleanup_warning,
        }
    }

    fn execute(
        &self,
        ctx: &IssueContext,
        states: &mut Vec<RunState>,
        workspace: &mut Option<Workspace>,
    ) -> StageResult<Outcome> {
        let allow_list = self.config.allow_list_path(&self.root);
        if self.config.receipt_overwrites_allow_list(&self.root) {
            return Err((Stage::Config, IntakeError::ReceiptClash(allow_list)));
        }

        tracing::info!(title = %ctx.title, author = %ctx.author, "reading issue body");

        let requests = match request::parse(&ctx.body) {
            Err(IntakeError::NoSections) => {
                tracing::info!("no actions requested in issue body");
                states.push(RunState::Parsed);
                return Ok(Outcome::NoOp);
            }
            other => other.map_err(at(Stage::Parse))?,
        };
        request::enforce_limit(&requests, self.config.max_requests_per_run)
            .map_err(at(Stage::Parse))?;
        for r in &requests {
            tracing::info!(section = %r.section, name = %r.name, version = %r.version, "parsed request");
        }
        states.push(RunState::Parsed);

        // Fail on a missing or broken allow-list before any side effect.
        if self.config.persist {
            AllowListDocument::load(&allow_list).map_err(at(Stage::Merge))?;
        }

        let ws = Workspace::create(&self.config.workspace_root(&self.root))
            .map_err(at(Stage::Validate))?;
        tracing::debug!(path = %ws.path().display(), "created workspace");
        let ws = workspace.insert(ws);
        validator::validate_all(&self.oracle, &requests, ws).map_err(at(Stage::Validate))?;
        tracing::info!(count = requests.len(), "all requests validated");
        states.push(RunState::Validated);

        if let Some(path) = self.config.receipt_path(&self.root) {
            receipt::write(&path, &requests).map_err(at(Stage::Receipt))?;
            tracing::info!(path = %path.display(), "wrote receipt");
        }

        if !self.config.persist {
            tracing::info!("validate-only run, allow-list left untouched");
            return Ok(Outcome::Completed {
                accepted: requests,
                added: Vec::new(),
                already_present: Vec::new(),
                persisted: false,
            });
        }

        let keys: Vec<String> = requests.iter().map(ActionRequest::composite_key).collect();
        let summary = allowlist::merge_into(&allow_list, &keys).map_err(at(Stage::Merge))?;
        states.push(RunState::Merged);

        Ok(Outcome::Completed {
            accepted: requests,
            added: summary.added,
            already_present: summary.already_present,
            persisted: true,
        })
    }
}

/// Remove the workspace; a failure is reported, never escalated.
fn teardown(workspace: Workspace) -> Option<String> {
    let path = workspace.path().to_path_buf();
    match workspace.close() {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "cleaned up workspace");
            None
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "error cleaning up workspace");
            Some(format!("failed to remove {}: {e}", path.display()))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
