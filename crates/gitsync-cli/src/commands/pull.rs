//! Pull command implementation.

use crate::context::Context;
use anyhow::Result;
use clap::Args;
use tracing::info;

/// Arguments for the pull command.
#[derive(Args, Debug, Clone)]
pub struct PullArgs {
    /// Remote to fetch from (defaults to the branch's remote)
    pub remote: Option<String>,

    /// Replay local commits onto the upstream instead of merging
    #[arg(short, long)]
    pub rebase: bool,
}

/// Run the pull command.
///
/// The outcome is reported by the client as a notice.
pub fn run(args: &PullArgs, ctx: &Context) -> Result<()> {
    info!(rebase = args.rebase, "running pull command");

    let repo = ctx.open_repo()?;
    let secrets = ctx.secrets();
    let sink = ctx.sink();
    let outcome = ctx
        .client(&secrets, &sink)
        .pull(&repo, args.remote.as_deref(), args.rebase);
    sink.finish();

    outcome?;
    Ok(())
}
