//! CLI commands for gitsync.

pub mod clone;
pub mod fetch;
pub mod ls_remote;
pub mod pull;
pub mod push;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// gitsync - fetch, push, clone and pull with automatic credential negotiation
///
/// SSH remotes are tried with an explicit key, ssh-agent identities and the
/// default key pair; HTTPS remotes with configured tokens and passwords.
#[derive(Parser, Debug)]
#[command(name = "gitsync")]
#[command(author = "Gitsync Contributors")]
#[command(version)]
#[command(about = "Authenticated git fetch, push, clone and pull", long_about = None)]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
#[command(styles = get_styles())]
pub struct Cli {
    /// Do not output any message
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Force ANSI output (colors and formatting)
    #[arg(long, global = true, conflicts_with = "no_ansi")]
    pub ansi: bool,

    /// Disable ANSI output (colors and formatting)
    #[arg(long, global = true)]
    pub no_ansi: bool,

    /// Never ask for secrets that are not configured
    #[arg(short = 'n', long, global = true)]
    pub no_interaction: bool,

    /// Use the specified directory as working directory
    #[arg(short = 'd', long = "working-dir", global = true, value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Private key to offer before any other SSH identity
    #[arg(short = 'i', long = "ssh-key", global = true, value_name = "FILE")]
    pub ssh_key: Option<PathBuf>,

    /// Do not offer ssh-agent identities
    #[arg(long, global = true)]
    pub no_agent: bool,

    /// Increase the verbosity of messages: -v for verbose, -vv for very verbose, -vvv for debug
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Convert to context args
    pub fn to_context_args(&self) -> crate::context::ContextArgs {
        crate::context::ContextArgs {
            working_dir: self.working_dir.clone(),
            verbosity: self.verbose,
            quiet: self.quiet,
            no_interaction: self.no_interaction,
            ssh_key: self.ssh_key.clone(),
            no_agent: self.no_agent,
        }
    }

    /// Explicit color choice, if any.
    pub const fn ansi_override(&self) -> Option<bool> {
        if self.ansi {
            Some(true)
        } else if self.no_ansi {
            Some(false)
        } else {
            None
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download objects and refs from a remote
    Fetch(fetch::FetchArgs),

    /// Fetch pull request heads into refs/remotes/<remote>/pr/<n>
    #[command(name = "fetch-pr")]
    FetchPr(fetch::FetchPrArgs),

    /// Update remote refs along with their objects
    Push(push::PushArgs),

    /// Clone a repository into a new directory
    Clone(clone::CloneArgs),

    /// List references in a remote repository
    #[command(name = "ls-remote")]
    LsRemote(ls_remote::LsRemoteArgs),

    /// Fetch the upstream of the current branch and integrate it
    Pull(pull::PullArgs),
}

/// Get clap styles for colored help
const fn get_styles() -> clap::builder::Styles {
    clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Green.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Green.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default())
        .placeholder(clap::builder::styling::AnsiColor::Yellow.on_default())
}
