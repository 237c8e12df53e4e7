mod cli;
mod commands;
mod config;
mod data_sources;
mod engine;
mod error;
mod filter;
mod progress;
mod provider;
mod resources;
mod schema;
mod state;
mod structure;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::ProviderConfig;
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// Declaration file
    pub file: PathBuf,
    /// State file
    pub state: PathBuf,
    /// Provider settings from flags and environment
    pub overrides: ProviderConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        file: cli.file,
        state: cli.state,
        overrides: ProviderConfig {
            access_token: cli.access_token,
            api_url: cli.api_url,
        },
    };

    match cli.command {
        Command::Plan(args) => commands::declarative::plan(&ctx, &args),
        Command::Apply(args) => commands::declarative::apply(&ctx, &args),
        Command::Refresh(args) => commands::declarative::refresh(&ctx, &args),
        Command::Destroy(args) => commands::declarative::destroy(&ctx, &args),
        Command::Show => commands::declarative::show(&ctx),
        Command::Lookup(cmd) => commands::lookup::run(&ctx, cmd),
        Command::Sweep(args) => commands::sweep::run(&ctx, &args),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "runscope-provider", &mut io::stdout());
            Ok(())
        }
    }
}
