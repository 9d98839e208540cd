//! Fetch and fetch-pr command implementations.

use crate::context::Context;
use crate::output;
use anyhow::Result;
use clap::Args;
use tracing::info;

/// Arguments for the fetch command.
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Remote to fetch from (defaults to the branch's remote, then origin)
    pub remote: Option<String>,

    /// Refspecs to fetch instead of the remote's configured ones
    pub refspecs: Vec<String>,

    /// Remove remote-tracking references that no longer exist on the remote
    #[arg(short, long)]
    pub prune: bool,
}

/// Arguments for the fetch-pr command.
#[derive(Args, Debug, Clone)]
pub struct FetchPrArgs {
    /// Pull request number, or '*' for every pull request
    #[arg(default_value = "*")]
    pub pr: String,

    /// Remote hosting the pull requests
    #[arg(short, long, default_value = gitsync_transport::DEFAULT_REMOTE)]
    pub remote: String,
}

/// Run the fetch command.
pub fn run(args: &FetchArgs, ctx: &Context) -> Result<()> {
    info!("running fetch command");

    let repo = ctx.open_repo()?;
    let secrets = ctx.secrets();
    let sink = ctx.sink();
    let outcome = ctx.client(&secrets, &sink).fetch(
        &repo,
        args.remote.as_deref(),
        &args.refspecs,
        args.prune,
    );
    sink.finish();

    output::transfer_summary(&outcome?.summary, ctx.quiet);
    Ok(())
}

/// Run the fetch-pr command.
pub fn run_pull_requests(args: &FetchPrArgs, ctx: &Context) -> Result<()> {
    info!(pr = %args.pr, remote = %args.remote, "running fetch-pr command");

    let repo = ctx.open_repo()?;
    let secrets = ctx.secrets();
    let sink = ctx.sink();
    let outcome = ctx.client(&secrets, &sink).fetch_pull_requests(
        &repo,
        Some(&args.pr),
        Some(&args.remote),
    );
    sink.finish();

    output::transfer_summary(&outcome?.summary, ctx.quiet);
    Ok(())
}
