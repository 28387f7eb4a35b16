use super::BodyArgs;
use crate::output::{print_json, print_report};
use anyhow::Context;
use clap::Args;
use intake_core::config::{PipelineConfig, WarnLevel};
use intake_core::context::IssueContext;
use intake_core::oracle::{OracleKind, ProcessOracle};
use intake_core::pipeline::{Outcome, Pipeline};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct ProcessArgs {
    #[command(flatten)]
    pub body: BodyArgs,

    /// Issue title
    #[arg(long, env = "GH_ISSUE_TITLE", default_value = "")]
    pub title: String,

    /// Issue number
    #[arg(long, env = "GH_ISSUE_NUMBER", default_value = "")]
    pub number: String,

    /// Issue author
    #[arg(long, env = "GH_ISSUE_AUTHOR", default_value = "")]
    pub author: String,

    /// Token handed to the oracle (gh) for repository access
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Allow-list file (overrides config)
    #[arg(long)]
    pub allow_list: Option<PathBuf>,

    /// Maximum requests accepted in one run (overrides config)
    #[arg(long)]
    pub max_requests: Option<usize>,

    /// Validate requests without touching the allow-list
    #[arg(long)]
    pub validate_only: bool,

    /// Do not write the receipt file
    #[arg(long)]
    pub no_receipt: bool,

    /// Existence oracle: gh or git (overrides config)
    #[arg(long)]
    pub oracle: Option<OracleKind>,

    /// Explicit oracle binary (overrides config)
    #[arg(long, value_name = "PATH")]
    pub oracle_program: Option<PathBuf>,

    /// Seconds allowed per ref resolution, 0 for none (overrides config)
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Parent directory for the per-run workspace (overrides config)
    #[arg(long, value_name = "PATH")]
    pub workspace_root: Option<PathBuf>,
}

impl ProcessArgs {
    fn apply(&self, cfg: &mut PipelineConfig) {
        if let Some(p) = &self.allow_list {
            cfg.allow_list = p.clone();
        }
        if self.max_requests.is_some() {
            cfg.max_requests_per_run = self.max_requests;
        }
        if self.validate_only {
            cfg.persist = false;
        }
        if self.no_receipt {
            cfg.receipt = None;
        }
        if let Some(kind) = self.oracle {
            cfg.oracle.kind = kind;
        }
        if let Some(p) = &self.oracle_program {
            cfg.oracle.program = Some(p.clone());
        }
        if let Some(t) = self.timeout {
            cfg.oracle.timeout_seconds = t;
        }
        if let Some(p) = &self.workspace_root {
            cfg.workspace_root = Some(p.clone());
        }
    }
}

pub fn run(
    root: &Path,
    config: Option<&Path>,
    args: ProcessArgs,
    json: bool,
) -> anyhow::Result<()> {
    let mut cfg = PipelineConfig::load(root, config).context("failed to load config")?;
    args.apply(&mut cfg);
    let findings = cfg.validate(root);
    for w in &findings {
        match w.level {
            WarnLevel::Warning => tracing::warn!("config: {}", w.message),
            WarnLevel::Error => tracing::error!("config: {}", w.message),
        }
    }
    if findings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config has errors; run `action-intake config validate` for details");
    }

    let ctx = IssueContext {
        title: args.title.clone(),
        body: args.body.read()?,
        number: args.number.clone(),
        author: args.author.clone(),
        token: args.token.clone(),
    };

    let oracle = ProcessOracle::new(
        cfg.oracle.kind,
        cfg.oracle.program.as_deref(),
        cfg.oracle.timeout(),
    )
    .with_token(ctx.token.clone());

    let report = Pipeline::new(root, cfg, oracle).run(&ctx);

    if json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }

    if let Outcome::Failed { stage, code, .. } = &report.outcome {
        anyhow::bail!("issue processing failed at {stage} ({code})");
    }
    Ok(())
}
