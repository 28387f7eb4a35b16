use crate::output::print_json;
use anyhow::Context;
use intake_core::allowlist::AllowListDocument;
use intake_core::config::PipelineConfig;
use std::path::Path;

pub fn run(
    root: &Path,
    config: Option<&Path>,
    contains: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let cfg = PipelineConfig::load(root, config).context("failed to load config")?;
    let path = cfg.allow_list_path(root);
    let doc = AllowListDocument::load(&path).context("failed to load allow-list")?;

    if let Some(key) = contains {
        let present = doc.contains(key);
        if json {
            print_json(&serde_json::json!({ "entry": key, "present": present }))?;
        } else if present {
            println!("{key} is allowed.");
        }
        if !present {
            anyhow::bail!("{key} is not in {}", path.display());
        }
        return Ok(());
    }

    if json {
        return print_json(&doc.actions);
    }
    if doc.actions.is_empty() {
        println!("No actions allowed yet.");
    }
    for entry in &doc.actions {
        println!("{entry}");
    }
    Ok(())
}
