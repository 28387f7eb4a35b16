use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use intake_core::config::{PipelineConfig, WarnLevel};
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration
    Show,

    /// Validate the config for common mistakes
    Validate,
}

pub fn run(
    root: &Path,
    config: Option<&Path>,
    subcmd: ConfigSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    let cfg = PipelineConfig::load(root, config).context("failed to load config")?;
    match subcmd {
        ConfigSubcommand::Show => show(root, &cfg, json),
        ConfigSubcommand::Validate => validate(root, &cfg, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(root: &Path, cfg: &PipelineConfig, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(cfg);
    }
    print!("{}", serde_yaml::to_string(cfg)?);
    println!("# allow-list: {}", cfg.allow_list_path(root).display());
    println!("# workspace:  {}", cfg.workspace_root(root).display());
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(root: &Path, cfg: &PipelineConfig, json: bool) -> anyhow::Result<()> {
    let warnings = cfg.validate(root);

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
