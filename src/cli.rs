use crate::config::resolve_config_dir;
use crate::skills::cli::command::{InstallArgs, InstallOptions};
use anyhow::Result;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration directory (env: SKILLSYNC_CONFIG_DIR, default: platform config dir)
    #[arg(short = 'C', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Print the resolved configuration directory path and exit
    #[arg(long)]
    pub print_config_dir_path: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[command(flatten)]
    pub install: InstallArgs,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_dir = resolve_config_dir(cli.config_dir.as_deref())?;

    if cli.print_config_dir_path {
        println!("{}", config_dir.display());
        return Ok(());
    }

    let options = InstallOptions::from_args(&cli.install, config_dir);
    crate::skills::cli::command::run(&options)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
