// pystub_cli - CLI functionality (library interface for testing)
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

pub mod commands;

pub const DEFAULT_CONFIG: &str = "pystub.toml";

#[derive(Debug, Parser)]
#[command(name = "pystub")]
#[command(about = "Generate Python interface stubs from JVM dependencies")]
#[command(version)]
pub struct Cli {
    /// Workspace configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Resolve dependencies and print the dependency tree
    Resolve {
        /// Emit the snapshot and unresolved report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve dependencies, update the lock and write stub trees
    Generate {
        /// Do nothing when the lock snapshot is unchanged
        #[arg(long)]
        skip_unchanged: bool,
    },
}

/// Default filter directive for the given verbosity.
pub fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "warn,pystub_cli=debug,pystub_deps=debug,pystub_build=debug"
    } else {
        "warn,pystub_cli=info,pystub_deps=info,pystub_build=info"
    }
}

pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    match &cli.command {
        Commands::Resolve { json } => commands::resolve::run(&cli.config, *json, out),
        Commands::Generate { skip_unchanged } => {
            commands::generate::run(&cli.config, *skip_unchanged, out).map(|_| ())
        }
    }
}
