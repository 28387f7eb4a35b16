mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, process::ProcessArgs, BodyArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "action-intake",
    about = "Turn action requests from issues into vetted allow-list entries",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root holding the allow-list (default: auto-detect from .git/)
    #[arg(long, global = true, env = "INTAKE_ROOT")]
    root: Option<PathBuf>,

    /// Pipeline config (default: .github/action-intake.yaml under the root)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse, validate and merge the actions requested in an issue
    Process(ProcessArgs),

    /// Parse an issue body and print the requests without side effects
    Parse {
        #[command(flatten)]
        body: BodyArgs,
    },

    /// Show the allow-list entries
    List {
        /// Check a single `owner/repo/version` entry; exits non-zero when absent
        #[arg(long)]
        contains: Option<String>,
    },

    /// Inspect and validate the pipeline configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Process(_) => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Process(args) => cmd::process::run(&root, config, args, cli.json),
        Commands::Parse { body } => cmd::parse::run(&body, cli.json),
        Commands::List { contains } => {
            cmd::list::run(&root, config, contains.as_deref(), cli.json)
        }
        Commands::Config { subcommand } => cmd::config::run(&root, config, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
