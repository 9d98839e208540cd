//! ls-remote command implementation.

use crate::context::Context;
use crate::output::table;
use anyhow::Result;
use clap::{Args, ValueEnum};
use gitsync_transport::RemoteRef;
use tracing::{debug, info};

/// Arguments for the ls-remote command.
#[derive(Args, Debug, Clone)]
pub struct LsRemoteArgs {
    /// Remote name or URL (defaults to the branch's remote, then origin)
    pub remote: Option<String>,

    /// Only show references under refs/heads
    #[arg(long)]
    pub heads: bool,

    /// Only show references under refs/tags
    #[arg(short, long)]
    pub tags: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Output format for the reference listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// `<oid>\t<name>` lines, as git prints them
    #[default]
    Text,
    /// Human-readable table format
    Table,
}

impl LsRemoteArgs {
    fn keeps(&self, reference: &RemoteRef) -> bool {
        let heads = self.heads && reference.name.starts_with("refs/heads/");
        let tags = self.tags && reference.name.starts_with("refs/tags/");
        (!self.heads && !self.tags) || heads || tags
    }
}

/// Run the ls-remote command.
pub fn run(args: &LsRemoteArgs, ctx: &Context) -> Result<()> {
    info!("running ls-remote command");

    // A URL works from anywhere; a remote name needs the repository.
    let repo = match ctx.open_repo() {
        Ok(repo) => Some(repo),
        Err(e) => {
            debug!("listing without a repository: {e:#}");
            None
        }
    };

    let secrets = ctx.secrets();
    let sink = ctx.sink();
    let refs = ctx
        .client(&secrets, &sink)
        .ls_remote(repo.as_ref(), args.remote.as_deref());
    sink.finish();

    let refs: Vec<RemoteRef> = refs?.into_iter().filter(|r| args.keeps(r)).collect();
    match args.format {
        OutputFormat::Text => {
            for reference in &refs {
                println!("{}\t{}", reference.oid, reference.name);
            }
        }
        OutputFormat::Table => println!("{}", table::remote_refs(&refs)),
    }
    Ok(())
}
