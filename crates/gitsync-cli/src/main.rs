//! gitsync CLI - authenticated fetch, push, clone, pull and ls-remote.
//!
//! Credentials come from the configuration files and the environment only;
//! the binary never prompts.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod commands;
mod context;
mod output;

use clap::Parser;
use commands::{Cli, Commands};
use context::Context;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 if cli.quiet => Level::ERROR,
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    output::init(cli.ansi_override());

    let ctx = match Context::new(&cli.to_context_args()) {
        Ok(ctx) => ctx,
        Err(e) => {
            output::report(&e.context("Failed to initialize"));
            return ExitCode::FAILURE;
        }
    };

    match run_command(&cli, &ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::report(&e);
            ExitCode::FAILURE
        }
    }
}

fn run_command(cli: &Cli, ctx: &Context) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Fetch(args) => commands::fetch::run(args, ctx),
        Commands::FetchPr(args) => commands::fetch::run_pull_requests(args, ctx),
        Commands::Push(args) => commands::push::run(args, ctx),
        Commands::Clone(args) => commands::clone::run(args, ctx),
        Commands::LsRemote(args) => commands::ls_remote::run(args, ctx),
        Commands::Pull(args) => commands::pull::run(args, ctx),
    }
}
