pub mod config;
pub mod list;
pub mod parse;
pub mod process;

use anyhow::Context;
use clap::Args;
use std::io::Read;
use std::path::PathBuf;

/// Where the issue body comes from.
#[derive(Args)]
pub struct BodyArgs {
    /// Issue body text
    #[arg(long, env = "GH_ISSUE_BODY", default_value = "", hide_env_values = true)]
    pub body: String,

    /// Read the body from a file instead (`-` for stdin)
    #[arg(long, value_name = "PATH")]
    pub body_file: Option<PathBuf>,
}

impl BodyArgs {
    pub fn read(&self) -> anyhow::Result<String> {
        match &self.body_file {
            None => Ok(self.body.clone()),
            Some(path) if path.as_os_str() == "-" => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("failed to read body from stdin")?;
                Ok(buf)
            }
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read body from {}", path.display())),
        }
    }
}
